use catneep_domain_sheet::{
    export_notesheet_path, groups_from_note_infos, import_notesheet_path, note_infos_from_groups,
    NoteGroup, NoteInfo, Song,
};
use catneep_ports::storage::{SettingsDto, StorageError, StoragePort};
use catneep_ports::types::{Difficulty, LaneTable};
use std::fs;
use std::path::{Path, PathBuf};

/// Extension of recorded note lists.
pub const NOTE_INFO_EXTENSION: &str = "ns";

/// Directory name under the platform config dir, or under the working
/// directory when there is none.
pub const APP_DIR_NAME: &str = "Catneep";

/// Settings and songs as JSON under one base directory:
///
/// ```text
/// <base>/settings.json
/// <base>/songs/<id>.json
/// <base>/notes/<name>.ns
/// ```
pub struct FsStorage {
    base_dir: PathBuf,
}

impl FsStorage {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_base_dir() -> Result<PathBuf, StorageError> {
        let base = dirs_next::config_dir()
            .ok_or_else(|| StorageError::Io("config dir not found".to_string()))?;
        Ok(base.join(APP_DIR_NAME))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn save_song(&self, id: &str, song: &Song) -> Result<(), StorageError> {
        Self::write_json(&self.song_path(id), song)
    }

    /// Loads a song with group times already projected for both sheets.
    pub fn load_song(&self, id: &str) -> Result<Song, StorageError> {
        let mut song: Song = Self::read_json(&self.song_path(id))?;
        song.easy.update_group_times();
        song.hard.update_group_times();
        Ok(song)
    }

    /// Ids of every stored song, sorted.
    pub fn list_songs(&self) -> Result<Vec<String>, StorageError> {
        let dir = self.songs_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&dir).map_err(|e| StorageError::Io(e.to_string()))?;
        let mut ids = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StorageError::Io(e.to_string()))?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Replaces one sheet of `song` with a notesheet text file. The sheet is
    /// left untouched when the file fails to parse.
    pub fn import_notesheet(
        &self,
        song: &mut Song,
        difficulty: Difficulty,
        path: &Path,
    ) -> Result<usize, StorageError> {
        let groups =
            import_notesheet_path(path).map_err(|e| StorageError::Import(e.to_string()))?;
        let count = groups.len();
        song.notesheet_mut(difficulty).replace_groups(groups);
        log::info!(
            "imported {count} groups into {} ({difficulty}) from {}",
            song.title,
            path.display()
        );
        Ok(count)
    }

    pub fn export_notesheet(
        &self,
        song: &Song,
        difficulty: Difficulty,
        lanes: &LaneTable,
        path: &Path,
    ) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        export_notesheet_path(song, difficulty, lanes.lane_count(difficulty), path)
            .map_err(|e| StorageError::Io(e.to_string()))
    }

    pub fn save_note_infos(&self, path: &Path, notes: &[NoteInfo]) -> Result<(), StorageError> {
        Self::write_json(path, &notes)
    }

    pub fn load_note_infos(&self, path: &Path) -> Result<Vec<NoteInfo>, StorageError> {
        Self::read_json(path)
    }

    pub fn save_groups_as_note_infos(
        &self,
        path: &Path,
        groups: &[NoteGroup],
        lane_count: u8,
        bpm: f64,
    ) -> Result<(), StorageError> {
        self.save_note_infos(path, &note_infos_from_groups(groups, lane_count, bpm))
    }

    pub fn load_note_infos_as_groups(
        &self,
        path: &Path,
        bpm: f64,
    ) -> Result<Vec<NoteGroup>, StorageError> {
        let notes = self.load_note_infos(path)?;
        Ok(groups_from_note_infos(&notes, bpm))
    }

    /// `<base>/notes/<name>.ns`
    pub fn note_info_path(&self, name: &str) -> PathBuf {
        self.base_dir
            .join("notes")
            .join(format!("{name}.{NOTE_INFO_EXTENSION}"))
    }

    fn settings_path(&self) -> PathBuf {
        self.base_dir.join("settings.json")
    }

    fn songs_dir(&self) -> PathBuf {
        self.base_dir.join("songs")
    }

    fn song_path(&self, id: &str) -> PathBuf {
        self.songs_dir().join(format!("{id}.json"))
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
        let data = fs::read(path).map_err(|e| StorageError::Io(e.to_string()))?;
        serde_json::from_slice(&data).map_err(|e| StorageError::Serde(e.to_string()))
    }

    fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        let data =
            serde_json::to_vec_pretty(value).map_err(|e| StorageError::Serde(e.to_string()))?;
        fs::write(path, data).map_err(|e| StorageError::Io(e.to_string()))
    }
}

impl Default for FsStorage {
    fn default() -> Self {
        let base_dir = Self::default_base_dir().unwrap_or_else(|e| {
            let fallback = PathBuf::from(APP_DIR_NAME);
            log::warn!("{e}, storing data in {}", fallback.display());
            fallback
        });
        Self { base_dir }
    }
}

impl StoragePort for FsStorage {
    fn load_settings(&self) -> Result<SettingsDto, StorageError> {
        let path = self.settings_path();
        if !path.exists() {
            return Ok(SettingsDto::default());
        }
        Self::read_json(&path)
    }

    fn save_settings(&self, s: &SettingsDto) -> Result<(), StorageError> {
        Self::write_json(&self.settings_path(), s)
    }
}
