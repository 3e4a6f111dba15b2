use catneep_domain_sheet::{AudioRef, NoteGroup, NoteInfo, NoteSheet, Song};
use catneep_infra_storage_fs::{FsStorage, APP_DIR_NAME};
use catneep_ports::storage::{SettingsDto, StorageError, StoragePort};
use catneep_ports::types::{Difficulty, LaneMask, LaneTable};
use pretty_assertions::assert_eq;
use std::fs;

fn song() -> Song {
    let mut song = Song::new(
        "Neep Step",
        128.0,
        Some(AudioRef {
            path: "songs/neep_step.ogg".to_string(),
            length_seconds: 95.5,
        }),
    );
    song.easy = NoteSheet::new(vec![
        NoteGroup::new(LaneMask(0b0001), 16, 0),
        NoteGroup::new(LaneMask(0b0110), 8, 32),
    ]);
    song.hard = NoteSheet::new(vec![NoteGroup::new(LaneMask(0b100001), 4, 0)]);
    song
}

#[test]
fn settings_default_when_missing_and_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = FsStorage::new(dir.path().join("config"));

    assert_eq!(storage.load_settings().expect("load"), SettingsDto::default());

    let settings = SettingsDto {
        max_time_tolerance: 0.08,
        skip_to_beat: Some(32.0),
        lanes: LaneTable { easy: 3, hard: 5 },
        ..SettingsDto::default()
    };
    storage.save_settings(&settings).expect("save");

    assert_eq!(storage.load_settings().expect("reload"), settings);
}

#[test]
fn partial_settings_file_fills_in_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("settings.json"), r#"{ "tap_score_amount": 10 }"#).expect("write");
    let storage = FsStorage::new(dir.path().to_path_buf());

    let settings = storage.load_settings().expect("load");

    assert_eq!(settings.tap_score_amount, 10);
    assert_eq!(settings.max_time_tolerance, 0.1);
    assert_eq!(settings.lanes, LaneTable::default());
}

#[test]
fn corrupt_settings_file_is_a_serde_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("settings.json"), "not json").expect("write");
    let storage = FsStorage::new(dir.path().to_path_buf());

    assert!(matches!(storage.load_settings(), Err(StorageError::Serde(_))));
}

#[test]
fn songs_round_trip_with_group_times() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = FsStorage::new(dir.path().to_path_buf());
    let original = song();

    storage.save_song("neep_step", &original).expect("save");
    let loaded = storage.load_song("neep_step").expect("load");

    assert_eq!(loaded, original);
    assert_eq!(loaded.easy.groups()[1].substep(), 24);
}

#[test]
fn list_songs_returns_sorted_ids() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = FsStorage::new(dir.path().to_path_buf());
    assert!(storage.list_songs().expect("empty").is_empty());

    storage.save_song("zeta", &song()).expect("save");
    storage.save_song("alpha", &song()).expect("save");
    fs::write(dir.path().join("songs").join("notes.txt"), "ignored").expect("write");

    assert_eq!(storage.list_songs().expect("list"), vec!["alpha", "zeta"]);
}

#[test]
fn notesheet_text_exports_and_imports_into_a_song() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = FsStorage::new(dir.path().to_path_buf());
    let source = song();
    let path = dir.path().join("sheets").join("easy.txt");

    storage
        .export_notesheet(&source, Difficulty::Easy, &LaneTable::default(), &path)
        .expect("export");

    let mut target = Song::new("Blank", 128.0, None);
    let count = storage
        .import_notesheet(&mut target, Difficulty::Easy, &path)
        .expect("import");

    assert_eq!(count, 2);
    assert_eq!(target.easy, source.easy);
}

#[test]
fn broken_notesheet_leaves_the_sheet_alone() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = FsStorage::new(dir.path().to_path_buf());
    let path = dir.path().join("broken.txt");
    fs::write(&path, "@1\n1000\n@1\n10x0\n").expect("write");
    let mut target = song();

    let result = storage.import_notesheet(&mut target, Difficulty::Easy, &path);

    match result {
        Err(StorageError::Import(message)) => assert!(message.contains("line 4")),
        other => panic!("expected import error, got {other:?}"),
    }
    assert_eq!(target.easy, song().easy);
}

#[test]
fn note_infos_convert_through_the_stored_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = FsStorage::new(dir.path().to_path_buf());
    let path = storage.note_info_path("recording");
    assert!(path.ends_with("notes/recording.ns"));

    let groups = vec![
        NoteGroup::new(LaneMask(0b0011), 16, 0),
        NoteGroup::new(LaneMask(0b1000), 16, 8),
    ];
    storage
        .save_groups_as_note_infos(&path, &groups, 4, 60.0)
        .expect("save");

    let notes = storage.load_note_infos(&path).expect("load");
    assert_eq!(
        notes,
        vec![
            NoteInfo::new(0, 1.0, 0.0),
            NoteInfo::new(1, 1.0, 0.0),
            NoteInfo::new(3, 2.0, 0.5),
        ]
    );

    let rebuilt = storage.load_note_infos_as_groups(&path, 60.0).expect("groups");
    assert_eq!(rebuilt, groups);
}

#[test]
fn default_storage_lives_in_the_app_directory() {
    let storage = FsStorage::default();

    assert!(storage.base_dir().ends_with(APP_DIR_NAME));
    if let Ok(dir) = FsStorage::default_base_dir() {
        assert_eq!(storage.base_dir(), dir.as_path());
    }
}
