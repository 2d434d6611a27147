use parking_lot::Mutex;
use std::sync::Arc;

/// Snapshot of one outbound command, captured at issuance.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandStartedEvent {
    pub command_name: String,
    pub database_name: String,
    pub command: bson::Document,
}

impl CommandStartedEvent {
    /// JSON rendering of the command body, for logs and diagnostics.
    #[must_use]
    pub fn command_json(&self) -> String {
        serde_json::to_string(&self.command).unwrap_or_default()
    }
}

/// Observer for outbound commands. Implementations receive events in the
/// order commands are issued.
pub trait CommandListener: Send + Sync {
    fn command_started(&self, event: CommandStartedEvent);
}

/// Listener that records every event, for assertions in tests.
#[derive(Default)]
pub struct EventRecorder {
    events: Mutex<Vec<CommandStartedEvent>>,
}

impl EventRecorder {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[must_use]
    pub fn started_events(&self) -> Vec<CommandStartedEvent> {
        self.events.lock().clone()
    }

    #[must_use]
    pub fn command_names(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.command_name.clone()).collect()
    }

    pub fn reset(&self) {
        self.events.lock().clear();
    }
}

impl CommandListener for EventRecorder {
    fn command_started(&self, event: CommandStartedEvent) {
        self.events.lock().push(event);
    }
}
