//! Fan-out of run events to any number of observers.

use stepwise_types::event::ExecutionEvent;
use tokio::sync::broadcast;

use super::sink::EventSink;

/// Broadcast sink: every subscriber sees every event published after it
/// subscribed.
///
/// Publishing never blocks. With no subscribers the event is dropped; a
/// subscriber that falls more than `capacity` events behind receives
/// `RecvError::Lagged` and skips ahead.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: ExecutionEvent) {
        // Err only means nobody is listening.
        let _ = self.sender.send(event);
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::ScriptedProvider;
    use crate::workflow::{RunController, StepExecutor};
    use stepwise_types::event::EventKind;
    use stepwise_types::workflow::{ModelName, Step, Workflow};

    fn controller(bus: &EventBus) -> RunController {
        let provider = Arc::new(ScriptedProvider::replying("done").boxed());
        RunController::new(StepExecutor::new(provider, Arc::new(bus.clone())))
    }

    fn one_step_workflow() -> Workflow {
        Workflow::new(
            "bus",
            vec![Step::new("only", 1, ModelName::KimiK2Instruct, "{{context}}")],
        )
    }

    #[tokio::test]
    async fn every_subscriber_sees_the_whole_run() {
        let bus = EventBus::new(64);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        let run = controller(&bus).run(&one_step_workflow(), "seed").await;

        for rx in [&mut first, &mut second] {
            let mut kinds = Vec::new();
            while let Ok(event) = rx.try_recv() {
                assert_eq!(event.run_id, run.id);
                kinds.push(event.kind);
            }
            assert_eq!(kinds.first(), Some(&EventKind::RunStarted));
            assert_eq!(kinds.last(), Some(&EventKind::RunCompleted));
        }
    }

    #[tokio::test]
    async fn run_without_subscribers_still_completes() {
        let bus = EventBus::new(1);
        let run = controller(&bus).run(&one_step_workflow(), "seed").await;
        assert_eq!(run.final_output.as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn slow_subscriber_lags_instead_of_blocking() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();

        controller(&bus).run(&one_step_workflow(), "seed").await;

        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(_))
        ));
        // After the lag notice the newest events are still there.
        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event.kind);
        }
        assert_eq!(last, Some(EventKind::RunCompleted));
    }
}
