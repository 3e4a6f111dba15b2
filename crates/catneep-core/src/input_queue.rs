use catneep_ports::input::{InputEvent, InputFrame};
use parking_lot::Mutex;
use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::Arc;

pub const DEFAULT_INPUT_CAPACITY: usize = 256;

/// Input-thread side of the queue.
pub struct InputSender {
    producer: Producer<InputEvent>,
}

/// Session side of the queue, drained once per tick.
pub struct InputReceiver {
    consumer: Consumer<InputEvent>,
}

pub fn input_queue(capacity: usize) -> (InputSender, InputReceiver) {
    let (producer, consumer) = RingBuffer::new(capacity.max(1));
    (InputSender { producer }, InputReceiver { consumer })
}

impl InputSender {
    /// Returns `false` when the queue is full and the edge was dropped.
    pub fn push(&mut self, event: InputEvent) -> bool {
        self.producer.push(event).is_ok()
    }

    /// Wraps the sender for device callbacks that only get `&self`.
    pub fn into_callback(self) -> impl Fn(InputEvent) + Send + Sync + 'static {
        let producer = Arc::new(Mutex::new(self.producer));
        move |event: InputEvent| {
            if let Some(mut guard) = producer.try_lock() {
                if guard.push(event).is_err() {
                    log::warn!("input queue full, dropped {:?}", event);
                }
            }
        }
    }
}

impl InputReceiver {
    pub fn drain(&mut self) -> Vec<InputEvent> {
        let mut pending = Vec::with_capacity(self.consumer.slots());
        while let Ok(event) = self.consumer.pop() {
            pending.push(event);
        }
        pending
    }

    /// Collapses everything queued since the last call into one frame.
    pub fn drain_frame(&mut self) -> InputFrame {
        self.drain().into_iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }
}
