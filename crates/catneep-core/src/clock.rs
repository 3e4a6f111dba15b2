use catneep_domain_sheet::{Song, SUBSTEPS_PER_BEAT};
use catneep_ports::types::{SongPosition, Substep};
use serde::{Deserialize, Serialize};

/// Playback speeds reachable with [`PlaybackClock::change_velocity`].
pub const VELOCITY_PRESETS: [f64; 12] = [-3.0, -1.0, -0.5, 0.0, 0.25, 0.5, 0.75, 0.9, 1.0, 1.5, 2.0, 3.0];
pub const NORMAL_VELOCITY_INDEX: usize = 8;
pub const STOP_VELOCITY_INDEX: usize = 3;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ClockError {
    #[error("no song loaded")]
    NoSongLoaded,
    #[error("invalid song: {0}")]
    InvalidSong(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockState {
    Idle,
    Loading,
    CountingIn,
    Playing,
    Ended,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ClockEvent {
    SongStarted,
    TimeSet { position: SongPosition },
    /// Begin the song audio at `at_seconds` into the clip.
    AudioStart { at_seconds: f64 },
    AudioStop,
    AudioPause,
    AudioResume,
    Advanced { position: SongPosition, delta: f64 },
    SongEnded,
    VelocityChanged { velocity: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClockConfig {
    /// Count-in before beat 0 when starting from the top.
    pub start_delay: f64,
    pub skip_to_beat: Option<f64>,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            start_delay: 3.0,
            skip_to_beat: None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct SongTiming {
    beats_per_second: f64,
    beat_duration: f64,
    beat_offset: f64,
    length: f64,
}

#[derive(Clone, Debug)]
pub struct PlaybackClock {
    config: ClockConfig,
    timing: Option<SongTiming>,
    state: ClockState,
    paused: bool,
    audio_started: bool,
    position_seconds: f64,
    beat: f64,
    substep: Substep,
    velocity: f64,
    velocity_index: Option<usize>,
}

impl PlaybackClock {
    pub fn new(config: ClockConfig) -> Self {
        Self {
            config,
            timing: None,
            state: ClockState::Idle,
            paused: false,
            audio_started: false,
            position_seconds: 0.0,
            beat: 0.0,
            substep: 0,
            velocity: 1.0,
            velocity_index: Some(NORMAL_VELOCITY_INDEX),
        }
    }

    pub fn set_config(&mut self, config: ClockConfig) {
        self.config = config;
    }

    pub fn load(&mut self, song: &Song) -> Result<Vec<ClockEvent>, ClockError> {
        if !(song.bpm.is_finite() && song.bpm > 0.0) {
            return Err(ClockError::InvalidSong(format!("bpm must be positive, got {}", song.bpm)));
        }
        let Some(audio) = song.audio.as_ref() else {
            return Err(ClockError::InvalidSong("no audio assigned".to_string()));
        };
        if audio.length_seconds.is_nan() || audio.length_seconds <= 0.0 {
            return Err(ClockError::InvalidSong(format!("audio {} has no length", audio.path)));
        }

        self.timing = Some(SongTiming {
            beats_per_second: song.beats_per_second(),
            beat_duration: song.beat_duration(),
            beat_offset: song.beat_offset,
            length: audio.length_seconds,
        });
        self.state = ClockState::Loading;
        self.paused = false;
        self.audio_started = false;
        self.position_seconds = 0.0;
        self.update_times();
        log::info!("loading song \"{}\" at {} bpm", song.title, song.bpm);
        Ok(vec![ClockEvent::AudioStop])
    }

    /// Signals that the song's audio is ready and begins the count-in.
    pub fn start(&mut self) -> Result<Vec<ClockEvent>, ClockError> {
        let timing = self.timing.ok_or(ClockError::NoSongLoaded)?;
        let target = match self.config.skip_to_beat {
            Some(beat) => beat * timing.beat_duration,
            None => -self.config.start_delay.max(0.0),
        };
        log::info!("starting song at {target:.3}s");

        let mut events = vec![ClockEvent::SongStarted];
        events.extend(self.seek(target)?);
        Ok(events)
    }

    /// Jumps to `seconds` of song audio time; negative values count in.
    pub fn seek(&mut self, seconds: f64) -> Result<Vec<ClockEvent>, ClockError> {
        let timing = self.timing.ok_or(ClockError::NoSongLoaded)?;
        log::debug!("setting song time to {seconds:.3}s");

        let mut events = vec![ClockEvent::AudioStop];
        self.audio_started = false;
        self.position_seconds = seconds - timing.beat_offset;
        self.update_times();

        if seconds >= 0.0 && seconds < timing.length {
            self.audio_started = true;
            events.push(ClockEvent::AudioStart { at_seconds: seconds });
        }

        self.state = if self.position_seconds < 0.0 {
            ClockState::CountingIn
        } else {
            ClockState::Playing
        };
        events.push(ClockEvent::TimeSet {
            position: self.position(),
        });
        Ok(events)
    }

    pub fn tick(&mut self, dt: f64) -> Vec<ClockEvent> {
        let Some(timing) = self.timing else {
            return Vec::new();
        };
        if self.paused || !matches!(self.state, ClockState::CountingIn | ClockState::Playing) {
            return Vec::new();
        }

        let mut events = Vec::new();
        let delta = dt * self.velocity;
        self.position_seconds += delta;

        if !self.audio_started && self.position_seconds >= 0.0 {
            self.audio_started = true;
            events.push(ClockEvent::AudioStart {
                at_seconds: (self.position_seconds + timing.beat_offset).max(0.0),
            });
        }
        if self.state == ClockState::CountingIn && self.position_seconds >= 0.0 {
            self.state = ClockState::Playing;
        }

        self.update_times();
        events.push(ClockEvent::Advanced {
            position: self.position(),
            delta,
        });

        if self.position_seconds > timing.length {
            self.state = ClockState::Ended;
            log::info!("song ended at {:.3}s", self.position_seconds);
            events.push(ClockEvent::SongEnded);
        }
        events
    }

    /// Applies at once; 0 keeps the clock ticking in place.
    pub fn set_velocity(&mut self, velocity: f64) -> Vec<ClockEvent> {
        self.velocity = velocity;
        self.velocity_index = VELOCITY_PRESETS.iter().position(|v| *v == velocity);
        vec![ClockEvent::VelocityChanged { velocity }]
    }

    pub fn set_velocity_index(&mut self, index: usize) -> Vec<ClockEvent> {
        let Some(velocity) = VELOCITY_PRESETS.get(index).copied() else {
            return Vec::new();
        };
        let events = self.set_velocity(velocity);
        self.velocity_index = Some(index);
        events
    }

    /// Steps one preset up or down; no-op at either end of the ladder.
    pub fn change_velocity(&mut self, increment: bool) -> Vec<ClockEvent> {
        let current = self.velocity_index.unwrap_or_else(|| self.nearest_preset_index());
        let next = if increment {
            current + 1
        } else {
            match current.checked_sub(1) {
                Some(next) => next,
                None => return Vec::new(),
            }
        };
        if next >= VELOCITY_PRESETS.len() {
            return Vec::new();
        }
        self.set_velocity_index(next)
    }

    pub fn pause(&mut self) -> Vec<ClockEvent> {
        if self.paused {
            return Vec::new();
        }
        self.paused = true;
        if self.audio_started && self.is_running() {
            vec![ClockEvent::AudioPause]
        } else {
            Vec::new()
        }
    }

    pub fn resume(&mut self) -> Vec<ClockEvent> {
        if !self.paused {
            return Vec::new();
        }
        self.paused = false;
        if self.audio_started && self.is_running() {
            vec![ClockEvent::AudioResume]
        } else {
            Vec::new()
        }
    }

    pub fn position(&self) -> SongPosition {
        SongPosition {
            seconds: self.position_seconds,
            beat: self.beat,
            substep: self.substep,
            beat_duration: self.timing.map(|t| t.beat_duration).unwrap_or(0.0),
        }
    }

    /// Position relative to the audio length, 0.0 to 1.0 while playing.
    pub fn progress(&self) -> f64 {
        match self.timing {
            Some(timing) => self.position_seconds / timing.length,
            None => 0.0,
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, ClockState::CountingIn | ClockState::Playing)
    }

    pub fn is_playing(&self) -> bool {
        self.is_running() && !self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn audio_started(&self) -> bool {
        self.audio_started
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn velocity_index(&self) -> Option<usize> {
        self.velocity_index
    }

    pub fn song_length(&self) -> Option<f64> {
        self.timing.map(|t| t.length)
    }

    fn update_times(&mut self) {
        let bps = self.timing.map(|t| t.beats_per_second).unwrap_or(0.0);
        self.beat = self.position_seconds * bps;
        self.substep = (self.beat * SUBSTEPS_PER_BEAT as f64).floor() as Substep;
    }

    fn nearest_preset_index(&self) -> usize {
        VELOCITY_PRESETS
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (*a - self.velocity)
                    .abs()
                    .total_cmp(&(*b - self.velocity).abs())
            })
            .map(|(index, _)| index)
            .unwrap_or(NORMAL_VELOCITY_INDEX)
    }
}
