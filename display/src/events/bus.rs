use std::sync::mpsc::{channel, Receiver, Sender};

use parking_lot::Mutex;

use crate::events::types::DisplayEvent;

/// Fan-out of display events to any number of subscribers
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<DisplayEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<DisplayEvent> {
        let (tx, rx) = channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Send to every live subscriber, forgetting the ones that hung up
    pub fn publish(&self, event: DisplayEvent) {
        self.subscribers.lock().retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
