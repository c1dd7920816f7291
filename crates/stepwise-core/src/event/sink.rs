//! The `EventSink` notification capability and its basic implementations.

use std::panic::AssertUnwindSafe;

use stepwise_types::event::ExecutionEvent;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Receiver of execution events.
///
/// Called synchronously at each transition. Implementations must return
/// promptly; delivery is fire-and-forget and never retried.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ExecutionEvent);
}

/// Any `Fn(ExecutionEvent)` closure is a sink.
impl<F> EventSink for F
where
    F: Fn(ExecutionEvent) + Send + Sync,
{
    fn emit(&self, event: ExecutionEvent) {
        self(event)
    }
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: ExecutionEvent) {}
}

/// Bounded single-consumer handoff.
///
/// `emit` uses `try_send`: when the queue is full the event is dropped with
/// a warning, and once the receiver is gone events are discarded silently.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<ExecutionEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver that drains it.
    ///
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ExecutionEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: ExecutionEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(
                    run_id = %event.run_id,
                    kind = %event.kind,
                    "event queue full, dropping event"
                );
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Deliver `event` to `sink`, containing any panic raised by the sink.
///
/// A misbehaving observer must never take the run down with it.
pub fn emit_guarded(sink: &dyn EventSink, event: ExecutionEvent) {
    let kind = event.kind;
    if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| sink.emit(event))) {
        let message = crate::panic_message(panic.as_ref());
        tracing::warn!(%kind, %message, "event sink panicked; event dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use stepwise_types::event::EventKind;
    use uuid::Uuid;

    fn sample(kind: EventKind) -> ExecutionEvent {
        ExecutionEvent::run(kind, Uuid::now_v7(), serde_json::Map::new())
    }

    #[tokio::test]
    async fn channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::new(8);
        sink.emit(sample(EventKind::RunStarted));
        sink.emit(sample(EventKind::RunCompleted));

        assert_eq!(rx.recv().await.unwrap().kind, EventKind::RunStarted);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::RunCompleted);
    }

    #[test]
    fn channel_sink_drops_when_full_without_blocking() {
        let (sink, mut rx) = ChannelSink::new(1);
        sink.emit(sample(EventKind::RunStarted));
        sink.emit(sample(EventKind::StepStarted));

        assert_eq!(rx.try_recv().unwrap().kind, EventKind::RunStarted);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn channel_sink_after_receiver_dropped_is_silent() {
        let (sink, rx) = ChannelSink::new(4);
        drop(rx);
        sink.emit(sample(EventKind::RunFailed));
    }

    #[test]
    fn closure_is_a_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |event: ExecutionEvent| seen.lock().unwrap().push(event.kind);
        sink.emit(sample(EventKind::LlmOutput));
        assert_eq!(*seen.lock().unwrap(), vec![EventKind::LlmOutput]);
    }

    struct PanickingSink;

    impl EventSink for PanickingSink {
        fn emit(&self, _event: ExecutionEvent) {
            panic!("observer crashed");
        }
    }

    #[test]
    fn emit_guarded_contains_panicking_sink() {
        emit_guarded(&PanickingSink, sample(EventKind::RunStarted));
    }
}
