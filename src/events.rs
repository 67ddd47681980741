//! UI Events Module
//!
//! Signals the core emits for whatever UI shell is attached: user-visible
//! notices and the request to return to the login entry point.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

const EVENT_CAPACITY: usize = 64;

/// Severity of a user-visible notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A human-readable message for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Events delivered to the UI layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    Notice(Notice),
    /// The session is gone; the UI should show its login entry point
    NavigateToLogin { path: String },
}

/// Fan-out channel for [`UiEvent`]s.
///
/// Cloning shares the underlying channel. Emitting with no subscribers is
/// not an error.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<UiEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: UiEvent) {
        debug!("Emitting UI event: {:?}", event);
        let _ = self.sender.send(event);
    }

    pub fn notice(&self, notice: Notice) {
        self.emit(UiEvent::Notice(notice));
    }

    pub fn navigate_to_login(&self, path: &str) {
        self.emit(UiEvent::NavigateToLogin {
            path: path.to_string(),
        });
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

    #[test]
    fn emit_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.notice(Notice::info("nobody listening"));
    }

    #[test]
    fn subscribers_receive_events_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.notice(Notice::error("boom"));
        bus.navigate_to_login("/login");

        assert_eq!(rx.try_recv().unwrap(), UiEvent::Notice(Notice::error("boom")));
        assert_eq!(
            rx.try_recv().unwrap(),
            UiEvent::NavigateToLogin {
                path: "/login".to_string()
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn clones_share_the_channel() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.clone().notice(Notice::info("hi"));

        assert!(matches!(rx.try_recv(), Ok(UiEvent::Notice(_))));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(UiEvent::NavigateToLogin {
            path: "/login".into(),
        })
        .unwrap();

        assert_eq!(json["type"], "navigate_to_login");
        assert_eq!(json["path"], "/login");
    }
}
