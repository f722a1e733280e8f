//! The merged dashboard event type.
//!
//! Every producer (connection task, stdin reader, render timer) is funneled
//! into one channel of these, so a single dispatch loop can run each handler
//! to completion with no concurrent state mutation.

use crate::network::ServerMessage;
use crossterm::event::{KeyCode, KeyModifiers};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Connection lifecycle or world-state message from the server task.
    Server(ServerMessage),
    /// Key press from the terminal.
    Key {
        code: KeyCode,
        modifiers: KeyModifiers,
    },
    /// Terminal resize; the next tick redraws at the new size.
    Resize,
    /// Render timer fired.
    Tick,
}

impl Event {
    pub fn key(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self::Key { code, modifiers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let key_event = Event::key(KeyCode::Char('t'), KeyModifiers::NONE);
        assert!(matches!(key_event, Event::Key { .. }));
        assert_eq!(Event::Tick, Event::Tick);
    }
}
