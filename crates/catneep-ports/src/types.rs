use serde::{Deserialize, Serialize};
use std::fmt;

pub type Substep = i32; // note timeline position, 16 per beat
pub type Lane = u8;

/// Widest lane set a group can describe.
pub const MAX_LANES: u8 = 8;

/// Lane bitset: bit `i` set means lane `i` takes part.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaneMask(pub u8);

impl LaneMask {
    pub const EMPTY: LaneMask = LaneMask(0);

    pub fn from_lanes<I: IntoIterator<Item = Lane>>(lanes: I) -> Self {
        let mut mask = Self::EMPTY;
        for lane in lanes {
            mask.insert(lane);
        }
        mask
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, lane: Lane) -> bool {
        lane < MAX_LANES && self.0 & (1 << lane) != 0
    }

    pub fn insert(&mut self, lane: Lane) {
        if lane < MAX_LANES {
            self.0 |= 1 << lane;
        }
    }

    pub fn remove(&mut self, lane: Lane) {
        if lane < MAX_LANES {
            self.0 &= !(1 << lane);
        }
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Drops every lane at or above `lane_count`.
    pub fn truncated(self, lane_count: u8) -> Self {
        if lane_count >= MAX_LANES {
            return self;
        }
        Self(self.0 & ((1u16 << lane_count) - 1) as u8)
    }

    /// Set lanes in ascending order.
    pub fn iter(self) -> impl Iterator<Item = Lane> {
        (0..MAX_LANES).filter(move |lane| self.contains(*lane))
    }

    /// `lane_count` characters, lane 0 first: `1` for set, `0` for clear.
    pub fn to_binary_text(self, lane_count: u8) -> String {
        (0..lane_count)
            .map(|lane| if self.contains(lane) { '1' } else { '0' })
            .collect()
    }
}

impl fmt::Display for LaneMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_binary_text(MAX_LANES))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 2] = [Difficulty::Easy, Difficulty::Hard];
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "Easy"),
            Difficulty::Hard => write!(f, "Hard"),
        }
    }
}

/// How many lanes each difficulty plays with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneTable {
    pub easy: u8,
    pub hard: u8,
}

impl LaneTable {
    pub fn lane_count(&self, difficulty: Difficulty) -> u8 {
        let count = match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Hard => self.hard,
        };
        count.min(MAX_LANES)
    }
}

impl Default for LaneTable {
    fn default() -> Self {
        Self { easy: 4, hard: 6 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteEventType {
    Hit,
    Miss,
    Release,
    /// The group just became the next one to play.
    Upcoming,
}

/// Per-lane notification for the presentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub group_index: usize,
    pub lane: Lane,
    pub kind: NoteEventType,
}

/// Where playback is on the song timeline, as the judge reads it each tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SongPosition {
    /// Seconds from beat 0; negative while counting in.
    pub seconds: f64,
    pub beat: f64,
    pub substep: Substep,
    /// Seconds per beat at the song's tempo.
    pub beat_duration: f64,
}
