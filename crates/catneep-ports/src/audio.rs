#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    #[error("clip not loaded: {0}")]
    NotLoaded(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// The song's audio source, owned by the host engine.
///
/// Positions are in seconds of the clip. The core only issues transport
/// requests; the device clock itself reaches the core as tick deltas.
pub trait AudioPlaybackPort: Send + Sync {
    fn play_from(&self, at_seconds: f64) -> Result<(), AudioError>;
    fn stop(&self) -> Result<(), AudioError>;
    fn pause(&self) -> Result<(), AudioError>;
    fn resume(&self) -> Result<(), AudioError>;
    fn set_pitch(&self, velocity: f64) -> Result<(), AudioError>;
}
