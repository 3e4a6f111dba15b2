use crate::subdivision::{SUBSTEPS_PER_BEAT, SUBSTEP_SIZE};
use catneep_ports::types::{Difficulty, Lane, LaneMask, NoteEvent, NoteEventType, Substep};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Notes struck together.
///
/// Only `notes`, `relative_time` and `duration` are stored; the absolute
/// position is projected by [`NoteSheet::update_group_times`] every time a
/// sheet is loaded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredNoteGroup", into = "StoredNoteGroup")]
pub struct NoteGroup {
    notes: LaneMask,
    relative_time: Substep,
    duration: Substep,
    start_substep: Substep,
    start_beat: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredNoteGroup {
    notes: LaneMask,
    #[serde(default = "default_relative_time")]
    relative_time: Substep,
    #[serde(default)]
    duration: Substep,
}

fn default_relative_time() -> Substep {
    SUBSTEPS_PER_BEAT
}

impl From<StoredNoteGroup> for NoteGroup {
    fn from(stored: StoredNoteGroup) -> Self {
        NoteGroup::new(stored.notes, stored.relative_time, stored.duration)
    }
}

impl From<NoteGroup> for StoredNoteGroup {
    fn from(group: NoteGroup) -> Self {
        Self {
            notes: group.notes,
            relative_time: group.relative_time,
            duration: group.duration,
        }
    }
}

impl NoteGroup {
    /// Negative times are clamped to zero.
    pub fn new(notes: LaneMask, relative_time: Substep, duration: Substep) -> Self {
        Self {
            notes,
            relative_time: relative_time.max(0),
            duration: duration.max(0),
            start_substep: 0,
            start_beat: 0.0,
        }
    }

    /// Saturates at `Substep::MAX` for absurdly long rests.
    pub fn update_start_time(&mut self, previous_substep: Substep) {
        self.start_substep = self.relative_time.saturating_add(previous_substep);
        self.start_beat = self.start_substep as f64 * SUBSTEP_SIZE;
    }

    pub fn notes(&self) -> LaneMask {
        self.notes
    }

    pub fn relative_time(&self) -> Substep {
        self.relative_time
    }

    pub fn duration(&self) -> Substep {
        self.duration
    }

    pub fn substep(&self) -> Substep {
        self.start_substep
    }

    pub fn beat_time(&self) -> f64 {
        self.start_beat
    }

    pub fn end_substep(&self) -> Substep {
        self.start_substep.saturating_add(self.duration)
    }

    pub fn has_notes(&self) -> bool {
        !self.notes.is_empty()
    }

    pub fn is_long_note(&self) -> bool {
        self.duration > 0
    }

    pub fn lane(&self, lane: Lane) -> bool {
        self.notes.contains(lane)
    }

    /// Lanes of this group below `lane_count`, ascending.
    pub fn lanes(&self, lane_count: u8) -> impl Iterator<Item = Lane> {
        self.notes.truncated(lane_count).iter()
    }

    pub fn fire_all<E>(&self, kind: NoteEventType, group_index: usize, lane_count: u8, sink: &mut E)
    where
        E: Extend<NoteEvent>,
    {
        sink.extend(self.lanes(lane_count).map(|lane| NoteEvent {
            group_index,
            lane,
            kind,
        }));
    }

    pub fn fire_one<E>(&self, kind: NoteEventType, group_index: usize, lane: Lane, sink: &mut E)
    where
        E: Extend<NoteEvent>,
    {
        sink.extend(std::iter::once(NoteEvent {
            group_index,
            lane,
            kind,
        }));
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteSheet {
    #[serde(default)]
    groups: Vec<NoteGroup>,
}

impl NoteSheet {
    pub fn new(groups: Vec<NoteGroup>) -> Self {
        let mut sheet = Self { groups };
        sheet.update_group_times();
        sheet
    }

    pub fn groups(&self) -> &[NoteGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn push(&mut self, group: NoteGroup) {
        self.groups.push(group);
        self.update_group_times();
    }

    /// Swaps in a whole new group list, e.g. after a successful import.
    pub fn replace_groups(&mut self, groups: Vec<NoteGroup>) {
        self.groups = groups;
        self.update_group_times();
    }

    /// Recomputes absolute times from the relative ones, in sheet order.
    pub fn update_group_times(&mut self) {
        let mut previous = 0;
        for group in &mut self.groups {
            group.update_start_time(previous);
            previous = group.substep();
        }
    }

    pub fn validated_groups(&mut self) -> &[NoteGroup] {
        self.update_group_times();
        &self.groups
    }

    /// Playable timeline: non-empty groups, one per absolute substep (first
    /// seen wins), ascending.
    pub fn resolved_groups(&self) -> Vec<NoteGroup> {
        let mut groups = self.groups.clone();
        let mut previous = 0;
        for group in &mut groups {
            group.update_start_time(previous);
            previous = group.substep();
        }

        let mut seen = HashSet::new();
        let mut resolved: Vec<NoteGroup> = groups
            .into_iter()
            .filter(|group| group.has_notes())
            .filter(|group| seen.insert(group.substep()))
            .collect();
        resolved.sort_by_key(|group| group.substep());
        resolved
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AudioRef {
    pub path: String,
    pub length_seconds: f64,
}

fn default_bpm() -> f64 {
    100.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_bpm")]
    pub bpm: f64,
    /// Seconds before beat 0 sounds.
    #[serde(default)]
    pub beat_offset: f64,
    pub audio: Option<AudioRef>,
    #[serde(default)]
    pub easy: NoteSheet,
    #[serde(default)]
    pub hard: NoteSheet,
}

impl Song {
    pub fn new(title: impl Into<String>, bpm: f64, audio: Option<AudioRef>) -> Self {
        Self {
            title: title.into(),
            author: "unknown".to_string(),
            description: String::new(),
            bpm,
            beat_offset: 0.0,
            audio,
            easy: NoteSheet::default(),
            hard: NoteSheet::default(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.audio.is_some() && self.bpm > 0.0
    }

    pub fn notesheet(&self, difficulty: Difficulty) -> &NoteSheet {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Hard => &self.hard,
        }
    }

    pub fn notesheet_mut(&mut self, difficulty: Difficulty) -> &mut NoteSheet {
        match difficulty {
            Difficulty::Easy => &mut self.easy,
            Difficulty::Hard => &mut self.hard,
        }
    }

    pub fn beats_per_second(&self) -> f64 {
        self.bpm / 60.0
    }

    pub fn beat_duration(&self) -> f64 {
        60.0 / self.bpm
    }

    pub fn length_seconds(&self) -> f64 {
        self.audio.as_ref().map(|a| a.length_seconds).unwrap_or(0.0)
    }
}
