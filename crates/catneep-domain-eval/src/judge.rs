use catneep_domain_sheet::{NoteGroup, NoteSheet, SUBSTEPS_PER_BEAT};
use catneep_ports::input::InputFrame;
use catneep_ports::storage::SettingsDto;
use catneep_ports::types::{
    Difficulty, Lane, LaneMask, LaneTable, NoteEvent, NoteEventType, SongPosition, Substep,
    MAX_LANES,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JudgeConfig {
    /// Seconds either side of a group in which a press counts.
    pub max_time_tolerance: f64,
    pub tap_score_amount: i64,
    pub long_note_score_per_step: i64,
    /// Consecutive hits needed for each multiplier step.
    pub streak_step_size: u32,
    pub max_multiplier: u32,
    pub lanes: LaneTable,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self::from(&SettingsDto::default())
    }
}

impl From<&SettingsDto> for JudgeConfig {
    fn from(settings: &SettingsDto) -> Self {
        Self {
            max_time_tolerance: settings.max_time_tolerance,
            tap_score_amount: settings.tap_score_amount,
            long_note_score_per_step: settings.long_note_score_per_step,
            streak_step_size: settings.streak_step_size,
            max_multiplier: settings.max_multiplier,
            lanes: settings.lanes,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum JudgeEvent {
    Note(NoteEvent),
    /// `None` once the sheet has no groups left.
    FocusChanged { group_index: Option<usize> },
    StreakChanged { streak: u32, multiplier: f64 },
    ScoreUpdated { score: i64 },
}

/// A long note currently held down on one lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongNoteHold {
    pub group_index: usize,
    pub start_step: Substep,
    pub duration: Substep,
}

impl LongNoteHold {
    pub fn end_step(&self) -> Substep {
        self.start_step.saturating_add(self.duration)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JudgeSnapshot {
    pub difficulty: Difficulty,
    pub lane_count: u8,
    pub current_group: Option<usize>,
    pub remaining_lanes: String,
    pub long_notes: String,
    pub score: i64,
    pub streak: u32,
    pub multiplier: f64,
}

/// `min(streak / step + 1, max)`, before the difficulty bonus.
pub fn streak_multiplier_for(streak: u32, step_size: u32, max_multiplier: u32) -> u32 {
    (streak / step_size.max(1) + 1).min(max_multiplier.max(1))
}

// Routes per-lane group notifications into the judge's event list.
struct NoteEvents<'a>(&'a mut Vec<JudgeEvent>);

impl Extend<NoteEvent> for NoteEvents<'_> {
    fn extend<T: IntoIterator<Item = NoteEvent>>(&mut self, iter: T) {
        self.0.extend(iter.into_iter().map(JudgeEvent::Note));
    }
}

pub struct NoteJudge {
    cfg: JudgeConfig,
    difficulty: Difficulty,
    difficulty_bonus: f64,
    lane_count: u8,
    groups: Vec<NoteGroup>,
    idx: usize,
    remaining: LaneMask,
    holds: [Option<LongNoteHold>; MAX_LANES as usize],
    score: i64,
    score_dirty: bool,
    streak: u32,
    streak_multiplier: u32,
    multiplier: f64,
    last_substep: Substep,
}

impl NoteJudge {
    pub fn new(cfg: JudgeConfig) -> Self {
        Self {
            cfg,
            difficulty: Difficulty::Easy,
            difficulty_bonus: 1.0,
            lane_count: cfg.lanes.lane_count(Difficulty::Easy),
            groups: Vec::new(),
            idx: 0,
            remaining: LaneMask::EMPTY,
            holds: [None; MAX_LANES as usize],
            score: 0,
            score_dirty: false,
            streak: 0,
            streak_multiplier: 1,
            multiplier: 1.0,
            last_substep: 0,
        }
    }

    /// Takes effect for scoring at once; the lane count applies on the next
    /// [`load_sheet`](Self::load_sheet).
    pub fn set_difficulty(&mut self, difficulty: Difficulty, bonus: f64) {
        self.difficulty = difficulty;
        self.difficulty_bonus = bonus;
        self.update_multiplier();
    }

    /// Swaps the tuning without touching progress. Tolerance and scoring apply
    /// from the next tick, the streak multiplier is recomputed at once and the
    /// lane table applies on the next [`load_sheet`](Self::load_sheet).
    pub fn set_config(&mut self, cfg: JudgeConfig) {
        self.cfg = cfg;
        self.streak_multiplier =
            streak_multiplier_for(self.streak, cfg.streak_step_size, cfg.max_multiplier);
        self.update_multiplier();
    }

    pub fn load_sheet(&mut self, sheet: &NoteSheet) {
        let started = Instant::now();
        self.lane_count = self.cfg.lanes.lane_count(self.difficulty);
        self.groups = sheet.resolved_groups();
        self.reset();
        log::debug!(
            "loaded {} note groups ({} lanes) in {:?}",
            self.groups.len(),
            self.lane_count,
            started.elapsed()
        );
    }

    /// Clears progress and scoring; the loaded groups stay.
    pub fn reset(&mut self) {
        self.idx = self.groups.len();
        self.remaining = LaneMask::EMPTY;
        self.holds = [None; MAX_LANES as usize];
        self.score = 0;
        self.score_dirty = false;
        self.streak = 0;
        self.streak_multiplier = 1;
        self.last_substep = 0;
        self.update_multiplier();
    }

    /// Re-targets the first group at or after the new position.
    pub fn on_time_set(&mut self, position: &SongPosition) -> Vec<JudgeEvent> {
        let mut events = Vec::new();
        let current_step = position.beat * SUBSTEPS_PER_BEAT as f64;
        self.idx = self
            .groups
            .partition_point(|group| (group.substep() as f64) < current_step);
        self.holds = [None; MAX_LANES as usize];
        self.focus_current(&mut events);
        self.last_substep = position.substep;
        events
    }

    pub fn on_tick(&mut self, position: &SongPosition, input: &InputFrame) -> Vec<JudgeEvent> {
        let mut events = Vec::new();
        let tolerance = self.cfg.max_time_tolerance;

        if let Some(group_beat) = self.current_group().map(NoteGroup::beat_time) {
            let time_difference = (position.beat - group_beat) * position.beat_duration;
            let can_hit = time_difference.abs() <= tolerance;

            // Highest lane first; an out-of-window press ends input handling for the tick.
            for lane in (0..self.lane_count).rev() {
                if !input.down.contains(lane) {
                    continue;
                }
                if !can_hit {
                    self.set_streak(0, &mut events);
                    break;
                }
                self.handle_input_down(lane, &mut events);
            }

            if time_difference > tolerance {
                self.miss_current_group(&mut events);
            }
        }

        self.update_long_notes(position.substep, input.up, &mut events);
        self.last_substep = position.substep;

        if self.score_dirty {
            self.score_dirty = false;
            events.push(JudgeEvent::ScoreUpdated { score: self.score });
        }
        events
    }

    /// Groups from `start_index` whose beat falls before `current_beat + beat_range`.
    pub fn group_range(&self, start_index: usize, current_beat: f64, beat_range: f64) -> &[NoteGroup] {
        let Some(start) = self.groups.get(start_index) else {
            return &[];
        };
        let max_beat = current_beat + beat_range;
        if beat_range <= 0.0 || start.beat_time() >= max_beat {
            return &[];
        }
        let tail = &self.groups[start_index + 1..];
        let end = start_index + 1 + tail.partition_point(|group| group.beat_time() <= max_beat);
        &self.groups[start_index..end]
    }

    pub fn groups(&self) -> &[NoteGroup] {
        &self.groups
    }

    pub fn current_group_index(&self) -> Option<usize> {
        (self.idx < self.groups.len()).then_some(self.idx)
    }

    pub fn current_group(&self) -> Option<&NoteGroup> {
        self.groups.get(self.idx)
    }

    pub fn remaining_lanes(&self) -> LaneMask {
        self.remaining
    }

    pub fn long_note(&self, lane: Lane) -> Option<LongNoteHold> {
        self.holds.get(lane as usize).copied().flatten()
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn lane_count(&self) -> u8 {
        self.lane_count
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn streak_multiplier(&self) -> u32 {
        self.streak_multiplier
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn snapshot(&self) -> JudgeSnapshot {
        let held = LaneMask::from_lanes(
            (0..self.lane_count).filter(|lane| self.holds[*lane as usize].is_some()),
        );
        JudgeSnapshot {
            difficulty: self.difficulty,
            lane_count: self.lane_count,
            current_group: self.current_group_index(),
            remaining_lanes: self.remaining.to_binary_text(self.lane_count),
            long_notes: held.to_binary_text(self.lane_count),
            score: self.score,
            streak: self.streak,
            multiplier: self.multiplier,
        }
    }

    fn handle_input_down(&mut self, lane: Lane, events: &mut Vec<JudgeEvent>) {
        if !self.remaining.contains(lane) {
            // A lane the group doesn't need costs the whole group.
            self.miss_current_group(events);
            return;
        }

        self.remaining.remove(lane);
        let idx = self.idx;
        if let Some(group) = self.groups.get(idx) {
            group.fire_one(NoteEventType::Hit, idx, lane, &mut NoteEvents(events));
            if group.is_long_note() {
                self.holds[lane as usize] = Some(LongNoteHold {
                    group_index: idx,
                    start_step: group.substep(),
                    duration: group.duration(),
                });
            }
        }

        self.add_score(self.cfg.tap_score_amount);
        self.set_streak(self.streak + 1, events);

        if self.remaining.is_empty() {
            self.next_group(events);
        }
    }

    fn miss_current_group(&mut self, events: &mut Vec<JudgeEvent>) {
        if let Some(group) = self.groups.get(self.idx) {
            let mut sink = NoteEvents(events);
            for lane in self.remaining.iter() {
                group.fire_one(NoteEventType::Miss, self.idx, lane, &mut sink);
            }
        }
        self.set_streak(0, events);
        self.next_group(events);
    }

    fn next_group(&mut self, events: &mut Vec<JudgeEvent>) {
        self.idx = (self.idx + 1).min(self.groups.len());
        self.focus_current(events);
    }

    fn focus_current(&mut self, events: &mut Vec<JudgeEvent>) {
        match self.groups.get(self.idx) {
            Some(group) => {
                self.remaining = group.notes().truncated(self.lane_count);
                group.fire_all(
                    NoteEventType::Upcoming,
                    self.idx,
                    self.lane_count,
                    &mut NoteEvents(events),
                );
                events.push(JudgeEvent::FocusChanged {
                    group_index: Some(self.idx),
                });
            }
            None => {
                self.remaining = LaneMask::EMPTY;
                events.push(JudgeEvent::FocusChanged { group_index: None });
            }
        }
    }

    fn update_long_notes(&mut self, substep: Substep, released: LaneMask, events: &mut Vec<JudgeEvent>) {
        for lane in 0..self.lane_count {
            let Some(hold) = self.holds[lane as usize] else {
                continue;
            };

            let count_from = self.last_substep.max(hold.start_step);
            let count_to = substep.min(hold.end_step());
            let steps = i64::from(count_to) - i64::from(count_from);
            self.add_score(steps * self.cfg.long_note_score_per_step);

            let off_time = substep >= hold.end_step();
            if off_time || released.contains(lane) {
                if !off_time {
                    if let Some(group) = self.groups.get(hold.group_index) {
                        group.fire_one(
                            NoteEventType::Release,
                            hold.group_index,
                            lane,
                            &mut NoteEvents(events),
                        );
                    }
                }
                self.holds[lane as usize] = None;
            }
        }
    }

    fn add_score(&mut self, amount: i64) {
        if amount <= 0 {
            return;
        }
        self.score += (amount as f64 * self.multiplier).round() as i64;
        self.score_dirty = true;
    }

    fn set_streak(&mut self, streak: u32, events: &mut Vec<JudgeEvent>) {
        let changed = streak != self.streak;
        self.streak = streak;
        self.streak_multiplier =
            streak_multiplier_for(streak, self.cfg.streak_step_size, self.cfg.max_multiplier);
        self.update_multiplier();
        if changed {
            events.push(JudgeEvent::StreakChanged {
                streak,
                multiplier: self.multiplier,
            });
        }
    }

    fn update_multiplier(&mut self) {
        self.multiplier = self.streak_multiplier as f64 * self.difficulty_bonus;
    }
}
