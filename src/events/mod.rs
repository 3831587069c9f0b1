//! Lifecycle events and event handling.
//!
//! The run driver emits an [`Event`] at every stage and command boundary so
//! that observers (the CLI's log output, tests) can follow a run without
//! parsing the ledger.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::core::types::{RunId, StageKind, SubjectId};

/// Lifecycle events emitted during a run.
#[derive(Debug, Clone)]
pub enum Event {
    /// The workspace and ledger are ready and stages are about to run.
    RunStarted {
        run_id: RunId,
        subject: SubjectId,
        stages: Vec<StageKind>,
        timestamp: Instant,
    },

    /// A stage has started.
    StageStarted {
        stage: StageKind,
        timestamp: Instant,
    },

    /// A stage's mutating commands were skipped because its outputs exist.
    StageSkipped {
        stage: StageKind,
        timestamp: Instant,
    },

    /// An external command finished, successfully or not.
    CommandFinished {
        stage: StageKind,
        command: String,
        exit_code: i32,
        duration: Duration,
        timestamp: Instant,
    },

    /// A stage finished all of its commands.
    StageCompleted {
        stage: StageKind,
        duration: Duration,
        timestamp: Instant,
    },

    /// The scratch directory was cleaned.
    CleanupFinished {
        removed: usize,
        timestamp: Instant,
    },

    /// The run reached a terminal state.
    RunFinished {
        run_id: RunId,
        success: bool,
        duration: Duration,
        timestamp: Instant,
    },
}

impl Event {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> Instant {
        match self {
            Event::RunStarted { timestamp, .. } => *timestamp,
            Event::StageStarted { timestamp, .. } => *timestamp,
            Event::StageSkipped { timestamp, .. } => *timestamp,
            Event::CommandFinished { timestamp, .. } => *timestamp,
            Event::StageCompleted { timestamp, .. } => *timestamp,
            Event::CleanupFinished { timestamp, .. } => *timestamp,
            Event::RunFinished { timestamp, .. } => *timestamp,
        }
    }

    /// The stage this event belongs to, if any.
    pub fn stage(&self) -> Option<StageKind> {
        match self {
            Event::StageStarted { stage, .. }
            | Event::StageSkipped { stage, .. }
            | Event::CommandFinished { stage, .. }
            | Event::StageCompleted { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Create a RunStarted event.
    pub fn run_started(run_id: RunId, subject: SubjectId, stages: Vec<StageKind>) -> Self {
        Event::RunStarted {
            run_id,
            subject,
            stages,
            timestamp: Instant::now(),
        }
    }

    /// Create a StageStarted event.
    pub fn stage_started(stage: StageKind) -> Self {
        Event::StageStarted {
            stage,
            timestamp: Instant::now(),
        }
    }

    /// Create a StageSkipped event.
    pub fn stage_skipped(stage: StageKind) -> Self {
        Event::StageSkipped {
            stage,
            timestamp: Instant::now(),
        }
    }

    /// Create a CommandFinished event.
    pub fn command_finished(
        stage: StageKind,
        command: String,
        exit_code: i32,
        duration: Duration,
    ) -> Self {
        Event::CommandFinished {
            stage,
            command,
            exit_code,
            duration,
            timestamp: Instant::now(),
        }
    }

    /// Create a StageCompleted event.
    pub fn stage_completed(stage: StageKind, duration: Duration) -> Self {
        Event::StageCompleted {
            stage,
            duration,
            timestamp: Instant::now(),
        }
    }

    /// Create a CleanupFinished event.
    pub fn cleanup_finished(removed: usize) -> Self {
        Event::CleanupFinished {
            removed,
            timestamp: Instant::now(),
        }
    }

    /// Create a RunFinished event.
    pub fn run_finished(run_id: RunId, success: bool, duration: Duration) -> Self {
        Event::RunFinished {
            run_id,
            success,
            duration,
            timestamp: Instant::now(),
        }
    }
}

/// Handler for receiving lifecycle events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event.
    async fn handle(&self, event: &Event);
}

/// Event bus for distributing events to registered handlers.
pub struct EventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    /// Create a new event bus with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Register an event handler.
    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().await;
        handlers.push(handler);
    }

    /// Emit an event to all registered handlers, in registration order.
    pub async fn emit(&self, event: Event) {
        let handlers = self.handlers.read().await;
        for handler in handlers.iter() {
            handler.handle(&event).await;
        }
    }

    /// Get the number of registered handlers.
    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingHandler;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Test handler that counts events.
    struct CountingHandler {
        count: AtomicU32,
    }

    impl CountingHandler {
        fn new() -> Self {
            Self {
                count: AtomicU32::new(0),
            }
        }

        fn count(&self) -> u32 {
            self.count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _event: &Event) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_emit_stage_started_event() {
        let handler = Arc::new(RecordingHandler::new());
        let bus = EventBus::new();
        bus.register(handler.clone()).await;

        bus.emit(Event::stage_started(StageKind::Head)).await;

        let events = handler.events().await;
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::StageStarted { stage, .. } => assert_eq!(*stage, StageKind::Head),
            _ => panic!("Expected StageStarted event"),
        }
    }

    #[tokio::test]
    async fn test_emit_command_finished_event() {
        let handler = Arc::new(RecordingHandler::new());
        let bus = EventBus::new();
        bus.register(handler.clone()).await;

        bus.emit(Event::command_finished(
            StageKind::Brain,
            "recon-all -all".to_string(),
            1,
            Duration::from_millis(150),
        ))
        .await;

        let events = handler.events().await;
        match &events[0] {
            Event::CommandFinished {
                stage,
                command,
                exit_code,
                duration,
                ..
            } => {
                assert_eq!(*stage, StageKind::Brain);
                assert_eq!(command, "recon-all -all");
                assert_eq!(*exit_code, 1);
                assert_eq!(*duration, Duration::from_millis(150));
            }
            _ => panic!("Expected CommandFinished event"),
        }
    }

    #[tokio::test]
    async fn test_emit_run_finished_event() {
        let handler = Arc::new(RecordingHandler::new());
        let bus = EventBus::new();
        bus.register(handler.clone()).await;
        let run_id = RunId::new();

        bus.emit(Event::run_finished(run_id.clone(), false, Duration::from_secs(3)))
            .await;

        match &handler.events().await[0] {
            Event::RunFinished {
                run_id: id,
                success,
                ..
            } => {
                assert_eq!(id, &run_id);
                assert!(!success);
            }
            _ => panic!("Expected RunFinished event"),
        }
    }

    #[tokio::test]
    async fn test_multiple_handlers_receive_same_event() {
        let first = Arc::new(CountingHandler::new());
        let second = Arc::new(CountingHandler::new());
        let bus = EventBus::new();
        bus.register(first.clone()).await;
        bus.register(second.clone()).await;

        assert_eq!(bus.handler_count().await, 2);

        bus.emit(Event::cleanup_finished(3)).await;

        assert_eq!(first.count(), 1);
        assert_eq!(second.count(), 1);
    }

    #[tokio::test]
    async fn test_event_stage_accessor() {
        assert_eq!(
            Event::stage_skipped(StageKind::Head).stage(),
            Some(StageKind::Head)
        );
        assert_eq!(Event::cleanup_finished(0).stage(), None);
    }

    #[tokio::test]
    async fn test_no_handlers_does_not_panic() {
        let bus = EventBus::new();
        bus.emit(Event::stage_started(StageKind::Mni)).await;
        assert_eq!(bus.handler_count().await, 0);
    }
}
