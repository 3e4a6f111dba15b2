use catneep_domain_eval::{streak_multiplier_for, JudgeConfig, JudgeEvent, NoteJudge};
use catneep_domain_sheet::{NoteGroup, NoteSheet};
use catneep_ports::input::InputFrame;
use catneep_ports::storage::SettingsDto;
use catneep_ports::types::{
    Difficulty, LaneMask, LaneTable, NoteEvent, NoteEventType, SongPosition,
};
use pretty_assertions::assert_eq;

// At 60 BPM one beat is one second, so tolerance reads directly in beats.
fn at_beat(beat: f64) -> SongPosition {
    SongPosition {
        seconds: beat,
        beat,
        substep: (beat * 16.0).floor() as i32,
        beat_duration: 1.0,
    }
}

fn at_substep(substep: i32) -> SongPosition {
    at_beat(substep as f64 / 16.0)
}

fn group(lanes: &[u8], relative_beats: i32, duration_substeps: i32) -> NoteGroup {
    NoteGroup::new(
        LaneMask::from_lanes(lanes.iter().copied()),
        relative_beats * 16,
        duration_substeps,
    )
}

fn judge_with(groups: Vec<NoteGroup>) -> NoteJudge {
    let mut judge = NoteJudge::new(JudgeConfig::default());
    judge.set_difficulty(Difficulty::Easy, 1.0);
    judge.load_sheet(&NoteSheet::new(groups));
    judge.on_time_set(&at_beat(0.0));
    judge
}

fn note_events(events: &[JudgeEvent], kind: NoteEventType) -> Vec<NoteEvent> {
    events
        .iter()
        .filter_map(|event| match event {
            JudgeEvent::Note(note) if note.kind == kind => Some(*note),
            _ => None,
        })
        .collect()
}

fn note(group_index: usize, lane: u8, kind: NoteEventType) -> NoteEvent {
    NoteEvent {
        group_index,
        lane,
        kind,
    }
}

#[test]
fn time_set_focuses_first_group_and_announces_it() {
    let mut judge = NoteJudge::new(JudgeConfig::default());
    judge.load_sheet(&NoteSheet::new(vec![group(&[0, 2], 1, 0)]));

    let events = judge.on_time_set(&at_beat(0.0));

    assert_eq!(
        events,
        vec![
            JudgeEvent::Note(note(0, 0, NoteEventType::Upcoming)),
            JudgeEvent::Note(note(0, 2, NoteEventType::Upcoming)),
            JudgeEvent::FocusChanged {
                group_index: Some(0)
            },
        ]
    );
    assert_eq!(judge.remaining_lanes(), LaneMask(0b101));
}

#[test]
fn hitting_both_lanes_scores_twice_and_advances() {
    let mut judge = judge_with(vec![group(&[0, 2], 1, 0), group(&[1], 1, 0)]);

    let first = judge.on_tick(&at_beat(1.0), &InputFrame::new().press(0));
    assert_eq!(
        note_events(&first, NoteEventType::Hit),
        vec![note(0, 0, NoteEventType::Hit)]
    );
    assert_eq!(judge.score(), 5);
    assert_eq!(judge.current_group_index(), Some(0));

    let second = judge.on_tick(&at_beat(1.05), &InputFrame::new().press(2));
    assert_eq!(
        note_events(&second, NoteEventType::Hit),
        vec![note(0, 2, NoteEventType::Hit)]
    );
    assert_eq!(judge.score(), 10);
    assert_eq!(judge.streak(), 2);
    assert_eq!(judge.current_group_index(), Some(1));
    assert!(second.contains(&JudgeEvent::ScoreUpdated { score: 10 }));
    assert!(second.contains(&JudgeEvent::Note(note(1, 1, NoteEventType::Upcoming))));
}

#[test]
fn simultaneous_presses_are_handled_highest_lane_first() {
    let mut judge = judge_with(vec![group(&[0, 2], 1, 0)]);

    let events = judge.on_tick(&at_beat(1.0), &InputFrame::new().press(0).press(2));

    assert_eq!(
        note_events(&events, NoteEventType::Hit),
        vec![
            note(0, 2, NoteEventType::Hit),
            note(0, 0, NoteEventType::Hit)
        ]
    );
    assert_eq!(judge.current_group_index(), None);
}

#[test]
fn unexpected_lane_misses_the_whole_group() {
    let mut judge = judge_with(vec![group(&[3], 1, 0), group(&[0, 2], 1, 0)]);
    judge.on_tick(&at_beat(1.0), &InputFrame::new().press(3));
    assert_eq!(judge.streak(), 1);

    let events = judge.on_tick(&at_beat(2.0), &InputFrame::new().press(1));

    assert_eq!(
        note_events(&events, NoteEventType::Miss),
        vec![
            note(1, 0, NoteEventType::Miss),
            note(1, 2, NoteEventType::Miss)
        ]
    );
    assert_eq!(judge.streak(), 0);
    assert!(events.contains(&JudgeEvent::StreakChanged {
        streak: 0,
        multiplier: 1.0
    }));
    assert_eq!(judge.current_group_index(), None);
}

#[test]
fn early_press_breaks_streak_without_consuming_group() {
    let mut judge = judge_with(vec![group(&[0], 1, 0), group(&[0, 1], 1, 0)]);
    judge.on_tick(&at_beat(1.0), &InputFrame::new().press(0));
    assert_eq!(judge.streak(), 1);

    let events = judge.on_tick(&at_beat(1.5), &InputFrame::new().press(0).press(1));

    assert_eq!(judge.streak(), 0);
    assert!(note_events(&events, NoteEventType::Hit).is_empty());
    assert!(note_events(&events, NoteEventType::Miss).is_empty());
    assert_eq!(judge.current_group_index(), Some(1));
    assert_eq!(judge.remaining_lanes(), LaneMask(0b11));
}

#[test]
fn late_group_is_missed_once_the_window_closes() {
    let mut judge = judge_with(vec![group(&[1, 3], 1, 0)]);

    let inside = judge.on_tick(&at_beat(1.08), &InputFrame::new());
    assert!(note_events(&inside, NoteEventType::Miss).is_empty());

    let after = judge.on_tick(&at_beat(1.2), &InputFrame::new());
    assert_eq!(
        note_events(&after, NoteEventType::Miss),
        vec![
            note(0, 1, NoteEventType::Miss),
            note(0, 3, NoteEventType::Miss)
        ]
    );
    assert!(after.contains(&JudgeEvent::FocusChanged { group_index: None }));
    assert_eq!(judge.score(), 0);
}

#[test]
fn held_long_note_accrues_one_point_per_substep() {
    let mut judge = judge_with(vec![group(&[0], 1, 16)]);
    judge.on_tick(&at_substep(15), &InputFrame::new());
    judge.on_tick(&at_substep(16), &InputFrame::new().press(0));
    assert_eq!(judge.score(), 5);
    assert!(judge.long_note(0).is_some());

    for substep in 17..=32 {
        judge.on_tick(&at_substep(substep), &InputFrame::new());
    }

    assert_eq!(judge.score(), 5 + 16);
    assert_eq!(judge.long_note(0), None);
}

#[test]
fn early_release_fires_release_and_stops_accrual() {
    let mut judge = judge_with(vec![group(&[0], 1, 16)]);
    judge.on_tick(&at_substep(16), &InputFrame::new().press(0));
    for substep in 17..24 {
        judge.on_tick(&at_substep(substep), &InputFrame::new());
    }

    let events = judge.on_tick(&at_substep(24), &InputFrame::new().release(0));
    assert_eq!(
        note_events(&events, NoteEventType::Release),
        vec![note(0, 0, NoteEventType::Release)]
    );
    assert_eq!(judge.score(), 5 + 8);

    for substep in 25..=40 {
        judge.on_tick(&at_substep(substep), &InputFrame::new());
    }
    assert_eq!(judge.score(), 5 + 8);
}

#[test]
fn natural_expiry_fires_no_release() {
    let mut judge = judge_with(vec![group(&[2], 1, 4)]);
    judge.on_tick(&at_substep(16), &InputFrame::new().press(2));

    let events = judge.on_tick(&at_substep(20), &InputFrame::new().release(2));

    assert!(note_events(&events, NoteEventType::Release).is_empty());
    assert_eq!(judge.score(), 5 + 4);
}

#[test]
fn multiplier_follows_streak_steps() {
    assert_eq!(streak_multiplier_for(0, 20, 3), 1);
    assert_eq!(streak_multiplier_for(19, 20, 3), 1);
    assert_eq!(streak_multiplier_for(20, 20, 3), 2);
    assert_eq!(streak_multiplier_for(45, 20, 3), 3);
    assert_eq!(streak_multiplier_for(400, 20, 3), 3);
}

#[test]
fn twenty_first_hit_scores_double() {
    let groups = (0..21).map(|_| group(&[0], 1, 0)).collect();
    let mut judge = judge_with(groups);

    for beat in 1..=21 {
        judge.on_tick(&at_beat(beat as f64), &InputFrame::new().press(0));
    }

    assert_eq!(judge.streak(), 21);
    assert_eq!(judge.streak_multiplier(), 2);
    assert_eq!(judge.score(), 20 * 5 + 10);
}

#[test]
fn difficulty_bonus_scales_and_rounds_scores() {
    let mut judge = NoteJudge::new(JudgeConfig::default());
    judge.set_difficulty(Difficulty::Hard, 1.5);
    judge.load_sheet(&NoteSheet::new(vec![group(&[5], 1, 0)]));
    judge.on_time_set(&at_beat(0.0));

    assert_eq!(judge.lane_count(), 6);
    assert_eq!(judge.multiplier(), 1.5);

    judge.on_tick(&at_beat(1.0), &InputFrame::new().press(5));
    assert_eq!(judge.score(), 8);
}

#[test]
fn lanes_beyond_the_difficulty_are_not_judged() {
    let mut judge = judge_with(vec![group(&[0, 5], 1, 0)]);

    assert_eq!(judge.lane_count(), 4);
    assert_eq!(judge.remaining_lanes(), LaneMask(0b1));

    judge.on_tick(&at_beat(1.0), &InputFrame::new().press(0));
    assert_eq!(judge.current_group_index(), None);
}

#[test]
fn time_set_targets_first_group_at_or_after_position() {
    let mut judge = judge_with(vec![
        group(&[0], 1, 0),
        group(&[1], 1, 0),
        group(&[2], 1, 0),
    ]);

    judge.on_time_set(&at_beat(1.5));
    assert_eq!(judge.current_group_index(), Some(1));

    judge.on_time_set(&at_beat(2.0));
    assert_eq!(judge.current_group_index(), Some(1));

    let events = judge.on_time_set(&at_beat(3.5));
    assert_eq!(judge.current_group_index(), None);
    assert_eq!(events, vec![JudgeEvent::FocusChanged { group_index: None }]);
}

#[test]
fn time_set_drops_active_holds() {
    let mut judge = judge_with(vec![group(&[0], 1, 32)]);
    judge.on_tick(&at_substep(16), &InputFrame::new().press(0));
    assert!(judge.long_note(0).is_some());

    judge.on_time_set(&at_beat(0.0));

    assert_eq!(judge.long_note(0), None);
    assert_eq!(judge.current_group_index(), Some(0));
}

#[test]
fn duplicate_and_empty_groups_are_resolved_away() {
    let judge = judge_with(vec![
        group(&[0], 1, 0),
        group(&[1], 0, 0),
        group(&[], 1, 0),
        group(&[2], 1, 0),
    ]);

    let substeps: Vec<i32> = judge.groups().iter().map(NoteGroup::substep).collect();
    assert_eq!(substeps, vec![16, 48]);
}

#[test]
fn group_range_covers_the_look_ahead_window() {
    let judge = judge_with((0..4).map(|_| group(&[0], 1, 0)).collect());

    let beats: Vec<f64> = judge
        .group_range(0, 0.0, 2.5)
        .iter()
        .map(NoteGroup::beat_time)
        .collect();
    assert_eq!(beats, vec![1.0, 2.0]);

    assert_eq!(judge.group_range(1, 0.0, 2.5).len(), 1);
    assert_eq!(judge.group_range(2, 0.0, 2.5).len(), 0);
    assert_eq!(judge.group_range(0, 0.0, 0.0).len(), 0);
    assert_eq!(judge.group_range(9, 0.0, 10.0).len(), 0);
}

#[test]
fn snapshot_and_reset() {
    let mut judge = NoteJudge::new(JudgeConfig::default());
    judge.set_difficulty(Difficulty::Hard, 1.0);
    judge.load_sheet(&NoteSheet::new(vec![group(&[0, 2], 1, 16)]));
    judge.on_time_set(&at_beat(0.0));
    judge.on_tick(&at_substep(16), &InputFrame::new().press(2));

    let snapshot = judge.snapshot();
    assert_eq!(snapshot.lane_count, 6);
    assert_eq!(snapshot.current_group, Some(0));
    assert_eq!(snapshot.remaining_lanes, "100000");
    assert_eq!(snapshot.long_notes, "001000");
    assert_eq!(snapshot.score, 5);
    assert_eq!(snapshot.streak, 1);

    judge.reset();
    assert_eq!(judge.score(), 0);
    assert_eq!(judge.streak(), 0);
    assert_eq!(judge.current_group_index(), None);
    assert_eq!(judge.long_note(2), None);
    assert_eq!(judge.groups().len(), 1);
}

#[test]
fn config_swap_keeps_progress() {
    let mut judge = judge_with(vec![group(&[0], 1, 0), group(&[1], 1, 0)]);
    judge.on_tick(&at_beat(1.0), &InputFrame::new().press(0));
    assert_eq!(judge.score(), 5);

    judge.set_config(JudgeConfig {
        tap_score_amount: 10,
        streak_step_size: 1,
        ..JudgeConfig::default()
    });

    assert_eq!(judge.score(), 5);
    assert_eq!(judge.streak(), 1);
    assert_eq!(judge.current_group_index(), Some(1));
    assert_eq!(judge.multiplier(), 2.0);

    judge.on_tick(&at_beat(2.0), &InputFrame::new().press(1));

    assert_eq!(judge.score(), 25);
    assert_eq!(judge.streak(), 2);
}

#[test]
fn long_note_ending_past_the_last_substep_stops_at_it() {
    let start = i32::MAX - 16;
    let mut judge = judge_with(vec![NoteGroup::new(LaneMask(0b1), start, 64)]);

    judge.on_tick(&at_substep(start), &InputFrame::new().press(0));
    assert_eq!(judge.long_note(0).map(|hold| hold.end_step()), Some(i32::MAX));

    judge.on_tick(&at_substep(i32::MAX), &InputFrame::new());

    assert_eq!(judge.score(), 5 + 16);
    assert_eq!(judge.long_note(0), None);
}

#[test]
fn config_follows_settings() {
    let defaults = JudgeConfig::default();
    assert_eq!(defaults.max_time_tolerance, SettingsDto::default().max_time_tolerance);
    assert_eq!(defaults.tap_score_amount, SettingsDto::default().tap_score_amount);

    let settings = SettingsDto {
        max_time_tolerance: 0.25,
        long_note_score_per_step: 3,
        max_multiplier: 4,
        lanes: LaneTable { easy: 3, hard: 5 },
        ..SettingsDto::default()
    };
    let cfg = JudgeConfig::from(&settings);

    assert_eq!(cfg.max_time_tolerance, 0.25);
    assert_eq!(cfg.long_note_score_per_step, 3);
    assert_eq!(cfg.max_multiplier, 4);
    assert_eq!(cfg.lanes, LaneTable { easy: 3, hard: 5 });
    assert_eq!(cfg.streak_step_size, defaults.streak_step_size);
}
