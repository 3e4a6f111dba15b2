use crate::clock::{ClockConfig, ClockEvent, ClockState, PlaybackClock};
use crate::diagnostics::{export_diagnostics, SessionSnapshot};
use crate::input_queue::{input_queue, InputReceiver, InputSender};
use crate::ipc::{Command, Event};
use catneep_domain_eval::{JudgeConfig, JudgeEvent, NoteJudge};
use catneep_domain_sheet::Song;
use catneep_ports::audio::{AudioError, AudioPlaybackPort};
use catneep_ports::input::{InputEvent, InputFrame};
use catneep_ports::storage::{SettingsDto, StorageError, StoragePort};
use catneep_ports::types::{Difficulty, SongPosition};
use std::collections::VecDeque;
use std::path::Path;
use std::time::{Duration, Instant};

const RECENT_INPUT_LIMIT: usize = 20;
const POSITION_EMIT_INTERVAL: Duration = Duration::from_millis(33);

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("clock error: {0}")]
    Clock(#[from] crate::clock::ClockError),
    #[error("audio error: {0}")]
    Audio(#[from] AudioError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Owns one play session: the clock, the judge and the song they share.
///
/// The host feeds it [`Command`]s and a tick delta per frame, then drains the
/// queued [`Event`]s.
pub struct GameSession {
    audio: Box<dyn AudioPlaybackPort>,
    storage: Option<Box<dyn StoragePort>>,
    settings: SettingsDto,
    clock: PlaybackClock,
    judge: NoteJudge,
    song: Option<Song>,
    difficulty: Difficulty,
    difficulty_bonus: f64,
    input_rx: Option<InputReceiver>,
    pending_input: InputFrame,
    events: VecDeque<Event>,
    recent_inputs: VecDeque<InputEvent>,
    last_clock_state: (ClockState, bool),
    last_position_emit: Instant,
}

impl GameSession {
    pub fn new(audio: Box<dyn AudioPlaybackPort>, storage: Option<Box<dyn StoragePort>>) -> Self {
        let settings = match storage.as_ref() {
            Some(storage) => storage.load_settings().unwrap_or_else(|e| {
                log::warn!("using default settings: {e}");
                SettingsDto::default()
            }),
            None => SettingsDto::default(),
        };

        let clock = PlaybackClock::new(clock_config(&settings));
        let judge = NoteJudge::new(JudgeConfig::from(&settings));

        Self {
            audio,
            storage,
            settings,
            clock,
            judge,
            song: None,
            difficulty: Difficulty::Easy,
            difficulty_bonus: 1.0,
            input_rx: None,
            pending_input: InputFrame::default(),
            events: VecDeque::new(),
            recent_inputs: VecDeque::with_capacity(RECENT_INPUT_LIMIT),
            last_clock_state: (ClockState::Idle, false),
            last_position_emit: Instant::now(),
        }
    }

    /// Opens a fresh input queue; edges from any previous sender are dropped.
    pub fn connect_input(&mut self, capacity: usize) -> InputSender {
        let (sender, receiver) = input_queue(capacity);
        self.input_rx = Some(receiver);
        sender
    }

    pub fn handle_command(&mut self, cmd: Command) -> Result<(), SessionError> {
        match cmd {
            Command::LoadSong {
                song,
                difficulty,
                difficulty_bonus,
            } => {
                self.load_song(song, difficulty, difficulty_bonus)?;
            }
            Command::StartSong => {
                let events = self.clock.start()?;
                self.apply_clock_events(events, &InputFrame::default())?;
            }
            Command::Seek { seconds } => {
                let events = self.clock.seek(seconds)?;
                self.apply_clock_events(events, &InputFrame::default())?;
            }
            Command::Pause => {
                let events = self.clock.pause();
                self.apply_clock_events(events, &InputFrame::default())?;
                self.events.push_back(Event::JudgeSnapshotUpdated {
                    snapshot: self.judge.snapshot(),
                });
            }
            Command::Resume => {
                let events = self.clock.resume();
                self.apply_clock_events(events, &InputFrame::default())?;
            }
            Command::SetVelocity { velocity } => {
                let events = self.clock.set_velocity(velocity);
                self.apply_clock_events(events, &InputFrame::default())?;
            }
            Command::ChangeVelocity { increment } => {
                let events = self.clock.change_velocity(increment);
                self.apply_clock_events(events, &InputFrame::default())?;
            }
            Command::Input { event } => {
                self.record_recent_input(event);
                self.pending_input.record(event);
            }
            Command::UpdateSettings { settings } => {
                self.settings = settings;
                self.clock.set_config(clock_config(&self.settings));
                self.judge.set_config(JudgeConfig::from(&self.settings));
                self.events.push_back(Event::SettingsUpdated {
                    settings: self.settings.clone(),
                });
                self.save_settings();
            }
            Command::ExportDiagnostics { path } => {
                export_diagnostics(
                    Path::new(&path),
                    &self.settings,
                    &self.snapshot(),
                    self.recent_inputs.iter().copied().collect(),
                )?;
            }
        }
        self.emit_clock_state();
        Ok(())
    }

    /// Advances the session by `dt` seconds of audio-device time.
    pub fn tick(&mut self, dt: f64) -> Result<(), SessionError> {
        let mut frame = std::mem::take(&mut self.pending_input);
        let queued = self
            .input_rx
            .as_mut()
            .map(InputReceiver::drain)
            .unwrap_or_default();
        for event in queued {
            self.record_recent_input(event);
            frame.record(event);
        }

        let events = self.clock.tick(dt);
        let result = self.apply_clock_events(events, &frame);
        self.emit_clock_state();
        result
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    pub fn settings(&self) -> &SettingsDto {
        &self.settings
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn judge(&self) -> &NoteJudge {
        &self.judge
    }

    pub fn song(&self) -> Option<&Song> {
        self.song.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            song_title: self.song.as_ref().map(|song| song.title.clone()),
            clock_state: self.clock.state(),
            paused: self.clock.is_paused(),
            position: self.clock.position(),
            velocity: self.clock.velocity(),
            judge: self.judge.snapshot(),
        }
    }

    fn load_song(
        &mut self,
        song: Song,
        difficulty: Difficulty,
        difficulty_bonus: f64,
    ) -> Result<(), SessionError> {
        let clock_events = self.clock.load(&song)?;

        self.difficulty = difficulty;
        self.difficulty_bonus = difficulty_bonus;
        self.judge.set_difficulty(difficulty, difficulty_bonus);
        self.judge.load_sheet(song.notesheet(difficulty));

        self.events.push_back(Event::SongLoaded {
            title: song.title.clone(),
            difficulty,
            lane_count: self.judge.lane_count(),
            group_count: self.judge.groups().len(),
        });
        self.song = Some(song);
        self.apply_clock_events(clock_events, &InputFrame::default())
    }

    // Audio failures don't stop the remaining events from reaching the judge.
    fn apply_clock_events(
        &mut self,
        events: Vec<ClockEvent>,
        input: &InputFrame,
    ) -> Result<(), SessionError> {
        let mut audio_error = None;
        for event in events {
            let audio_result = match event {
                ClockEvent::SongStarted => {
                    self.events.push_back(Event::SongStarted);
                    Ok(())
                }
                ClockEvent::TimeSet { position } => {
                    let judge_events = self.judge.on_time_set(&position);
                    self.push_judge_events(judge_events);
                    self.emit_position(position, true);
                    Ok(())
                }
                ClockEvent::Advanced { position, .. } => {
                    let judge_events = self.judge.on_tick(&position, input);
                    self.push_judge_events(judge_events);
                    self.emit_position(position, false);
                    Ok(())
                }
                ClockEvent::SongEnded => {
                    self.events.push_back(Event::SongEnded {
                        score: self.judge.score(),
                    });
                    self.events.push_back(Event::JudgeSnapshotUpdated {
                        snapshot: self.judge.snapshot(),
                    });
                    Ok(())
                }
                ClockEvent::AudioStart { at_seconds } => self.audio.play_from(at_seconds),
                ClockEvent::AudioStop => self.audio.stop(),
                ClockEvent::AudioPause => self.audio.pause(),
                ClockEvent::AudioResume => self.audio.resume(),
                ClockEvent::VelocityChanged { velocity } => {
                    self.emit_position(self.clock.position(), true);
                    self.audio.set_pitch(velocity)
                }
            };
            if let Err(e) = audio_result {
                log::warn!("audio request failed: {e}");
                audio_error.get_or_insert(e);
            }
        }
        match audio_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    fn push_judge_events(&mut self, judge_events: Vec<JudgeEvent>) {
        for event in judge_events {
            let event = match event {
                JudgeEvent::Note(event) => Event::Note { event },
                JudgeEvent::FocusChanged { group_index } => Event::FocusChanged { group_index },
                JudgeEvent::StreakChanged { streak, multiplier } => {
                    Event::StreakUpdated { streak, multiplier }
                }
                JudgeEvent::ScoreUpdated { score } => Event::ScoreUpdated { score },
            };
            self.events.push_back(event);
        }
    }

    fn emit_position(&mut self, position: SongPosition, force: bool) {
        let now = Instant::now();
        if !force && now.duration_since(self.last_position_emit) < POSITION_EMIT_INTERVAL {
            return;
        }
        self.events.push_back(Event::PositionUpdated {
            position,
            velocity: self.clock.velocity(),
            progress: self.clock.progress(),
        });
        self.last_position_emit = now;
    }

    fn emit_clock_state(&mut self) {
        let current = (self.clock.state(), self.clock.is_paused());
        if current == self.last_clock_state {
            return;
        }
        self.last_clock_state = current;
        self.events.push_back(Event::ClockStateUpdated {
            state: current.0,
            paused: current.1,
        });
    }

    fn record_recent_input(&mut self, event: InputEvent) {
        if self.recent_inputs.len() >= RECENT_INPUT_LIMIT {
            self.recent_inputs.pop_front();
        }
        self.recent_inputs.push_back(event);
    }

    fn save_settings(&self) {
        if let Some(storage) = self.storage.as_ref() {
            if let Err(e) = storage.save_settings(&self.settings) {
                log::warn!("failed to save settings: {e}");
            }
        }
    }
}

fn clock_config(settings: &SettingsDto) -> ClockConfig {
    ClockConfig {
        start_delay: settings.start_song_delay,
        skip_to_beat: settings.skip_to_beat,
    }
}
