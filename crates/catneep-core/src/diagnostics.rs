use crate::clock::ClockState;
use catneep_domain_eval::JudgeSnapshot;
use catneep_ports::input::InputEvent;
use catneep_ports::storage::{SettingsDto, StorageError};
use catneep_ports::types::SongPosition;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Serialize)]
struct AppVersion {
    name: String,
    version: String,
}

#[derive(Serialize)]
struct PlatformInfo {
    os: String,
    arch: String,
}

#[derive(Serialize)]
struct RecentInputs {
    events: Vec<InputEvent>,
}

/// Where a session stands, for bug reports.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub song_title: Option<String>,
    pub clock_state: ClockState,
    pub paused: bool,
    pub position: SongPosition,
    pub velocity: f64,
    pub judge: JudgeSnapshot,
}

pub fn export_diagnostics(
    dir: &Path,
    settings: &SettingsDto,
    session: &SessionSnapshot,
    recent_inputs: Vec<InputEvent>,
) -> Result<(), StorageError> {
    fs::create_dir_all(dir).map_err(|e| StorageError::Io(e.to_string()))?;

    let app_version = AppVersion {
        name: "Catneep".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let platform = PlatformInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
    };

    write_json(&dir.join("app_version.json"), &app_version)?;
    write_json(&dir.join("platform.json"), &platform)?;
    write_json(&dir.join("settings.json"), settings)?;
    write_json(&dir.join("session.json"), session)?;
    write_json(
        &dir.join("recent_inputs.json"),
        &RecentInputs {
            events: recent_inputs,
        },
    )?;

    log::info!("diagnostics exported to {}", dir.display());
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let data = serde_json::to_vec_pretty(value).map_err(|e| StorageError::Serde(e.to_string()))?;
    fs::write(path, data).map_err(|e| StorageError::Io(e.to_string()))
}
