#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in formula
//!
//! Library crates never print. They report progress by sending domain events
//! over an unbounded channel; the CLI renders them and mirrors them into
//! `tracing`.

pub mod events;
pub use events::{AppEvent, DownloadEvent, FailureContext, GeneralEvent, PipelineEvent};

use tokio::sync::mpsc::UnboundedSender;

/// Type alias for event sender using the `AppEvent` system
pub type EventSender = UnboundedSender<AppEvent>;

/// Type alias for event receiver using the `AppEvent` system
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<AppEvent>;

/// Create a new event channel with the `AppEvent` system
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout formula
///
/// This trait provides a single, consistent API for emitting events regardless of
/// whether you have a raw `EventSender` or a struct that contains one.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(event);
        }
    }

    /// Emit a debug log event
    fn emit_debug(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::debug(message)));
    }

    /// Emit a debug log event with context
    fn emit_debug_with_context(
        &self,
        message: impl Into<String>,
        context: std::collections::BTreeMap<String, String>,
    ) {
        self.emit(AppEvent::General(GeneralEvent::debug_with_context(
            message, context,
        )));
    }

    /// Emit a warning event
    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(message)));
    }

    /// Emit a warning event with context
    fn emit_warning_with_context(&self, message: impl Into<String>, context: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning_with_context(
            message, context,
        )));
    }

    /// Emit a download started event
    fn emit_download_started(
        &self,
        url: impl Into<String>,
        archive: impl Into<String>,
        total_size: Option<u64>,
    ) {
        self.emit(AppEvent::Download(DownloadEvent::Started {
            url: url.into(),
            archive: archive.into(),
            total_size,
        }));
    }

    /// Emit a download completed event
    fn emit_download_completed(
        &self,
        url: impl Into<String>,
        archive: impl Into<String>,
        final_size: u64,
        total_time: std::time::Duration,
    ) {
        self.emit(AppEvent::Download(DownloadEvent::Completed {
            url: url.into(),
            archive: archive.into(),
            final_size,
            total_time,
        }));
    }
}

/// Implementation of `EventEmitter` for the raw `EventSender`
/// This allows `EventSender` to be used directly where `EventEmitter` is expected
impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

/// An emitter that drops every event; handy where no UI is attached
impl EventEmitter for Option<EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_through_sender() {
        let (tx, mut rx) = channel();
        tx.emit_warning("disk almost full");
        tx.emit_download_started("https://example.com/a.zip", "a.zip", Some(10));

        match rx.recv().await.unwrap() {
            AppEvent::General(GeneralEvent::Warning { message, context }) => {
                assert_eq!(message, "disk almost full");
                assert!(context.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(
            rx.recv().await.unwrap(),
            AppEvent::Download(DownloadEvent::Started { total_size: Some(10), .. })
        ));
    }

    #[test]
    fn test_emit_after_receiver_dropped() {
        let (tx, rx) = channel();
        drop(rx);
        // Must not panic
        tx.emit_debug("nobody is listening");

        let none: Option<EventSender> = None;
        none.emit_debug("also fine");
    }

    #[test]
    fn test_event_json_shape() {
        let event = AppEvent::Pipeline(PipelineEvent::Step {
            run_id: uuid::Uuid::nil(),
            stage: formula_types::Stage::Unpack,
            detail: "dcmtk-3.6.2.zip".to_string(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["domain"], "pipeline");
        assert_eq!(json["event"]["type"], "Step");
        assert_eq!(json["event"]["stage"], "unpack");
    }
}
