//! # event
//!
//! The lifecycle event vocabulary observers are notified with.

use crate::frame::Frame;

/// The four points in the worker loop an observer can be registered against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Received,
    Translated,
    Sent,
    Unknown,
}

impl EventKind {
    /// Parses the external event-name vocabulary used by `add_listener`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "received" => Some(EventKind::Received),
            "translated" => Some(EventKind::Translated),
            "sent" => Some(EventKind::Sent),
            "unknown" => Some(EventKind::Unknown),
            _ => None,
        }
    }
}

/// The payload handed to an observer callback: the frame that triggered the
/// event, and — for `translated` only — the frame produced from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub frame: Frame,
    pub result: Option<Frame>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_event_names() {
        assert_eq!(EventKind::parse("received"), Some(EventKind::Received));
        assert_eq!(EventKind::parse("translated"), Some(EventKind::Translated));
        assert_eq!(EventKind::parse("sent"), Some(EventKind::Sent));
        assert_eq!(EventKind::parse("unknown"), Some(EventKind::Unknown));
    }

    #[test]
    fn rejects_unknown_event_names() {
        assert_eq!(EventKind::parse("bogus"), None);
    }
}
