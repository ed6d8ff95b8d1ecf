use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use serde::Serialize;

use crate::model::BlockId;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScheduleEvent {
    RequestStarted { token: u64 },
    /// A superseded request finished; its result was thrown away.
    RequestDiscarded { token: u64 },
    BuildFailed { token: u64, reason: String },
    ScheduleReplaced { blocks: usize },
    BlockAdded { id: BlockId },
    BlockChanged { id: BlockId },
    BlockRemoved { id: BlockId },
    /// The block list was renumbered (repair).
    BlocksRenumbered { blocks: usize },
    EditRejected { reason: String },
    LayoutUpdated { events: usize, max_lanes: usize },
    SuggestionsUpdated { suggestions: Vec<String>, score: u8 },
}

/// Fan-out of [`ScheduleEvent`]s to any number of channel subscribers.
/// Subscribers whose receiver was dropped are pruned on the next publish.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<ScheduleEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<ScheduleEvent> {
        let (tx, rx) = mpsc::channel::<ScheduleEvent>();
        self.subscribers.push(tx);
        rx
    }

    pub fn publish(&mut self, event: ScheduleEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// Trailing-edge debounce over a caller-supplied clock.
///
/// Every `poke` pushes the deadline out to `now + delay`; `poll` reports
/// `true` exactly once when the deadline has passed.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Duration>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn poke(&mut self, now: Duration) {
        self.deadline = Some(now + self.delay);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn poll(&mut self, now: Duration) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
