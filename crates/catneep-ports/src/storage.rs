use crate::types::LaneTable;
use serde::{Deserialize, Serialize};

fn default_max_time_tolerance() -> f64 {
    0.1
}

fn default_tap_score_amount() -> i64 {
    5
}

fn default_long_note_score_per_step() -> i64 {
    1
}

fn default_streak_step_size() -> u32 {
    20
}

fn default_max_multiplier() -> u32 {
    3
}

fn default_start_song_delay() -> f64 {
    3.0
}

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serde(String),
    #[error("import error: {0}")]
    Import(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsDto {
    /// Seconds either side of a group in which a press counts.
    #[serde(default = "default_max_time_tolerance")]
    pub max_time_tolerance: f64,
    #[serde(default = "default_tap_score_amount")]
    pub tap_score_amount: i64,
    #[serde(default = "default_long_note_score_per_step")]
    pub long_note_score_per_step: i64,
    #[serde(default = "default_streak_step_size")]
    pub streak_step_size: u32,
    #[serde(default = "default_max_multiplier")]
    pub max_multiplier: u32,
    /// Count-in before beat 0, in seconds.
    #[serde(default = "default_start_song_delay")]
    pub start_song_delay: f64,
    pub skip_to_beat: Option<f64>,
    pub lanes: LaneTable,
}

impl Default for SettingsDto {
    fn default() -> Self {
        Self {
            max_time_tolerance: 0.1,
            tap_score_amount: 5,
            long_note_score_per_step: 1,
            streak_step_size: 20,
            max_multiplier: 3,
            start_song_delay: 3.0,
            skip_to_beat: None,
            lanes: LaneTable::default(),
        }
    }
}

pub trait StoragePort: Send + Sync {
    fn load_settings(&self) -> Result<SettingsDto, StorageError>;
    fn save_settings(&self, s: &SettingsDto) -> Result<(), StorageError>;
}
