use crate::model::NoteGroup;
use crate::subdivision::{SUBSTEPS_PER_BEAT, SUBSTEP_SIZE};
use catneep_ports::types::{Lane, LaneMask, Substep};
use serde::{Deserialize, Serialize};

/// One note placed in seconds, the way a recording tool captures it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteInfo {
    pub lane: Lane,
    pub start: f64,
    pub duration: f64,
}

impl NoteInfo {
    pub fn new(lane: Lane, start: f64, duration: f64) -> Self {
        Self {
            lane,
            start: start.max(0.0),
            duration: duration.max(0.0),
        }
    }
}

/// Flattens groups into per-lane notes at `bpm`, in sheet order.
pub fn note_infos_from_groups(groups: &[NoteGroup], lane_count: u8, bpm: f64) -> Vec<NoteInfo> {
    let substep_seconds = SUBSTEP_SIZE * 60.0 / bpm;
    let mut notes = Vec::new();
    let mut time = 0.0;
    for group in groups {
        time += group.relative_time() as f64 * substep_seconds;
        let duration = group.duration() as f64 * substep_seconds;
        for lane in group.lanes(lane_count) {
            notes.push(NoteInfo::new(lane, time, duration));
        }
    }
    notes
}

/// Quantizes notes to substeps at `bpm` and merges notes landing on the same
/// substep into one group. A group takes the duration of its last note.
pub fn groups_from_note_infos(notes: &[NoteInfo], bpm: f64) -> Vec<NoteGroup> {
    let seconds_to_substep = bpm / 60.0 * SUBSTEPS_PER_BEAT as f64;
    let to_substep = |seconds: f64| (seconds * seconds_to_substep).round_ties_even() as Substep;

    let mut sorted = notes.to_vec();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut groups = Vec::new();
    let mut last_group_step = 0;
    let mut lanes = LaneMask::EMPTY;
    for (i, note) in sorted.iter().enumerate() {
        let step = to_substep(note.start);
        lanes.insert(note.lane);

        let closes_group = sorted
            .get(i + 1)
            .map_or(true, |next| to_substep(next.start) > step);
        if closes_group {
            groups.push(NoteGroup::new(
                lanes,
                step - last_group_step,
                to_substep(note.duration),
            ));
            lanes = LaneMask::EMPTY;
            last_group_step = step;
        }
    }
    groups
}
