//! In-process event bus for republish events.

use std::sync::mpsc::{channel, Receiver, Sender};

use parking_lot::Mutex;

use crate::telemetry::events::EventEnvelope;
use crate::telemetry::sinks::PublishObserver;

/// Observer that forwards every envelope over a channel
pub struct EventBus {
    sender: Mutex<Sender<EventEnvelope>>,
}

impl EventBus {
    pub fn new_pair() -> (Self, Receiver<EventEnvelope>) {
        let (sender, receiver) = channel();
        (
            Self {
                sender: Mutex::new(sender),
            },
            receiver,
        )
    }
}

impl PublishObserver for EventBus {
    fn on_event(&self, envelope: &EventEnvelope) {
        // A dropped receiver only means nobody is listening any more.
        let _ = self.sender.lock().send(envelope.clone());
    }
}
