pub mod events;

use self::events::LaneInput;
use crossbeam_channel::{unbounded, Receiver, Sender};

pub struct InputQueue {
    sender: Sender<LaneInput>,
    receiver: Receiver<LaneInput>,
}

impl InputQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// Pushes a lane press. Safe to call from an input polling thread.
    pub fn push(&self, input: LaneInput) {
        let _ = self.sender.send(input);
    }

    /// Non-blocking. Returns None if the queue is empty.
    pub fn pop(&self) -> Option<LaneInput> {
        self.receiver.try_recv().ok()
    }

    /// Takes every press queued so far, oldest first.
    pub fn drain(&self) -> Vec<LaneInput> {
        self.receiver.try_iter().collect()
    }

    /// Discards every queued press.
    pub fn clear(&self) -> usize {
        self.receiver.try_iter().count()
    }

    pub fn sender(&self) -> Sender<LaneInput> {
        self.sender.clone()
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}
