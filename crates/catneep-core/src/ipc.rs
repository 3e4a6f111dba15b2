use crate::clock::ClockState;
use catneep_domain_eval::JudgeSnapshot;
use catneep_domain_sheet::Song;
use catneep_ports::input::InputEvent;
use catneep_ports::storage::SettingsDto;
use catneep_ports::types::{Difficulty, NoteEvent, SongPosition};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Command {
    LoadSong {
        song: Song,
        difficulty: Difficulty,
        difficulty_bonus: f64,
    },
    /// The song audio finished loading; start the count-in.
    StartSong,
    Seek { seconds: f64 },
    Pause,
    Resume,
    SetVelocity { velocity: f64 },
    ChangeVelocity { increment: bool },
    /// For hosts that deliver edges through commands instead of the queue.
    Input { event: InputEvent },
    UpdateSettings { settings: SettingsDto },
    ExportDiagnostics { path: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    SongLoaded {
        title: String,
        difficulty: Difficulty,
        lane_count: u8,
        group_count: usize,
    },
    SongStarted,
    ClockStateUpdated { state: ClockState, paused: bool },
    PositionUpdated {
        position: SongPosition,
        velocity: f64,
        progress: f64,
    },
    Note { event: NoteEvent },
    FocusChanged { group_index: Option<usize> },
    StreakUpdated { streak: u32, multiplier: f64 },
    ScoreUpdated { score: i64 },
    SongEnded { score: i64 },
    SettingsUpdated { settings: SettingsDto },
    JudgeSnapshotUpdated { snapshot: JudgeSnapshot },
}
