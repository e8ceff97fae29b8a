//! Typed network events delivered over channels.

use std::sync::mpsc::{Receiver, Sender, channel};

use uuid::Uuid;

use super::node::ProcessorId;
use crate::model::port::PortConnection;

#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    ProcessorAdded(ProcessorId),
    ProcessorRemoved(ProcessorId),
    PortConnected(PortConnection),
    PortDisconnected(PortConnection),
    PropertyChanged { processor_id: ProcessorId, key: String },
    ProcessorInvalidated(ProcessorId),
    ProcessorEvaluated(ProcessorId),
    ProcessorFailed { processor_id: ProcessorId, message: String },
    PassCompleted {
        pass_id: Uuid,
        executed: usize,
        skipped: usize,
        failed: usize,
    },
}

/// Fan-out of network events to every live subscriber.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Sender<NetworkEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<NetworkEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver `event`; subscribers whose receiver was dropped are forgotten.
    pub fn emit(&mut self, event: NetworkEvent) {
        if self.subscribers.is_empty() {
            return;
        }
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
