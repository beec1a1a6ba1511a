//! Event sink that collects emitted events for assertions.

use std::sync::Mutex;

use async_trait::async_trait;

use sentra_auth::events::{EventSink, SecurityEvent};

/// Collects every emitted event.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<SecurityEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The events emitted so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events.lock().unwrap().clone()
    }

    /// The dotted kinds of the events emitted so far, in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.kind().to_string())
            .collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: SecurityEvent) {
        self.events.lock().unwrap().push(event);
    }
}
