use crate::types::{Lane, LaneMask};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputEdge {
    Down,
    Up,
}

/// A button edge captured by the host, not yet tied to a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEvent {
    pub lane: Lane,
    pub edge: InputEdge,
}

impl InputEvent {
    pub fn down(lane: Lane) -> Self {
        Self {
            lane,
            edge: InputEdge::Down,
        }
    }

    pub fn up(lane: Lane) -> Self {
        Self {
            lane,
            edge: InputEdge::Up,
        }
    }
}

/// Every edge that arrived during one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputFrame {
    pub down: LaneMask,
    pub up: LaneMask,
}

impl InputFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(mut self, lane: Lane) -> Self {
        self.down.insert(lane);
        self
    }

    pub fn release(mut self, lane: Lane) -> Self {
        self.up.insert(lane);
        self
    }

    pub fn record(&mut self, event: InputEvent) {
        match event.edge {
            InputEdge::Down => self.down.insert(event.lane),
            InputEdge::Up => self.up.insert(event.lane),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.down.is_empty() && self.up.is_empty()
    }
}

impl FromIterator<InputEvent> for InputFrame {
    fn from_iter<I: IntoIterator<Item = InputEvent>>(iter: I) -> Self {
        let mut frame = InputFrame::default();
        for event in iter {
            frame.record(event);
        }
        frame
    }
}
