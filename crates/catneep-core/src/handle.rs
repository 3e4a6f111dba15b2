use crate::ipc::{Command, Event};
use crate::session::{GameSession, SessionError};
use parking_lot::Mutex;
use std::sync::Arc;

/// Cloneable handle for hosts that drive a session from more than one thread.
/// Every call takes the lock, so calls never interleave.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<GameSession>>,
}

impl SessionHandle {
    pub fn new(session: GameSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub fn handle_command(&self, cmd: Command) -> Result<(), SessionError> {
        self.inner.lock().handle_command(cmd)
    }

    pub fn tick(&self, dt: f64) -> Result<(), SessionError> {
        self.inner.lock().tick(dt)
    }

    pub fn drain_events(&self) -> Vec<Event> {
        self.inner.lock().drain_events()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut GameSession) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
