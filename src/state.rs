//! Dashboard state
//!
//! One mutable record owned by the dispatch loop: connection status, the last
//! world-state snapshot from the server, the active screen, and a bounded
//! rolling log used only for display.

use serde_json::{Map, Value};
use std::collections::VecDeque;

/// Maximum number of entries kept in the rolling log.
pub const LOG_CAPACITY: usize = 10;

/// Which body the renderer draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    WorldState,
}

impl Screen {
    /// Screen name as shown in the footer.
    pub fn name(&self) -> &'static str {
        match self {
            Screen::Home => "home",
            Screen::WorldState => "worldState",
        }
    }
}

/// Mirror of the connection task's lifecycle.
///
/// `connected` and `reconnecting` are never both true: every lifecycle
/// handler that sets one clears the other.
#[derive(Debug, Clone, Default)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub reconnecting: bool,

    /// Session id reported by the server, kept across disconnects so the
    /// home screen can show the last known id while reconnecting.
    pub id: Option<String>,
}

/// The single dashboard state record.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// False until the startup sequence completes; gates key handling.
    pub initialized: bool,

    /// Connection lifecycle as last observed.
    pub connection: ConnectionStatus,

    /// Last world-state snapshot, replaced wholesale on each update.
    /// Iteration order is the snapshot's own field order.
    pub world_state: Map<String, Value>,

    /// Screen selector for the renderer.
    pub current_screen: Screen,

    /// Rolling display log, oldest first.
    pub log: VecDeque<String>,
}

impl Default for DashboardState {
    fn default() -> Self {
        // Seed the snapshot the server would send, so the world-state screen
        // has content before the first update arrives.
        let mut world_state = Map::new();
        world_state.insert("timeOfDay".into(), Value::from(6500)); // 0 - 24000
        world_state.insert("connections".into(), Value::from(0));

        Self {
            initialized: false,
            connection: ConnectionStatus::default(),
            world_state,
            current_screen: Screen::Home,
            log: VecDeque::with_capacity(LOG_CAPACITY),
        }
    }
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a log entry, evicting the oldest once past capacity.
    pub fn append_log(&mut self, message: impl Into<String>) {
        self.log.push_back(message.into());
        while self.log.len() > LOG_CAPACITY {
            self.log.pop_front();
        }
    }

    /// Replace the whole log with a single cleared-console marker.
    pub fn clear_log(&mut self) {
        self.log.clear();
        self.log.push_back("cleared console".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_evicts_oldest_past_capacity() {
        let mut state = DashboardState::new();
        for i in 0..15 {
            state.append_log(format!("entry {}", i));
        }
        assert_eq!(state.log.len(), LOG_CAPACITY);
        // Most recent entries survive, in arrival order
        assert_eq!(state.log.front().unwrap(), "entry 5");
        assert_eq!(state.log.back().unwrap(), "entry 14");
        let entries: Vec<&String> = state.log.iter().collect();
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(**entry, format!("entry {}", i + 5));
        }
    }

    #[test]
    fn test_clear_log_leaves_single_marker() {
        let mut state = DashboardState::new();
        state.append_log("opened socket");
        state.append_log("closed socket");
        state.clear_log();
        assert_eq!(state.log.len(), 1);
        assert_eq!(state.log.front().unwrap(), "cleared console");
    }

    #[test]
    fn test_default_world_state_seed() {
        let state = DashboardState::new();
        assert_eq!(state.world_state.get("timeOfDay"), Some(&Value::from(6500)));
        assert_eq!(state.current_screen, Screen::Home);
        assert!(!state.initialized);
        assert!(!state.connection.connected);
        assert!(!state.connection.reconnecting);
    }

    #[test]
    fn test_screen_names() {
        assert_eq!(Screen::Home.name(), "home");
        assert_eq!(Screen::WorldState.name(), "worldState");
    }
}
