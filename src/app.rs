//! Event handlers for the dashboard.
//!
//! `App` owns the dashboard state and the connection control channel. The
//! dispatch loop in main feeds it one event at a time, so every handler sees
//! and leaves a fully consistent state.

use crate::network::{ConnectionControl, ServerMessage};
use crate::state::{DashboardState, Screen};
use crossterm::event::{KeyCode, KeyModifiers};
use tokio::sync::mpsc;
use tracing::debug;

pub struct App {
    pub state: DashboardState,
    control_tx: mpsc::UnboundedSender<ConnectionControl>,
    /// Set by the kill keys; main tears down the terminal and exits.
    pub should_quit: bool,
}

impl App {
    pub fn new(control_tx: mpsc::UnboundedSender<ConnectionControl>) -> Self {
        Self {
            state: DashboardState::new(),
            control_tx,
            should_quit: false,
        }
    }

    /// Ask the connection task to open the socket.
    pub fn open_connection(&self) {
        let _ = self.control_tx.send(ConnectionControl::Open);
    }

    /// Ask the connection task to drop the socket.
    pub fn close_connection(&self) {
        let _ = self.control_tx.send(ConnectionControl::Close);
    }

    /// Mirror a connection-task message into the dashboard state.
    pub fn handle_server_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Connected { id } => {
                self.state.connection.connected = true;
                self.state.connection.reconnecting = false;
                self.state.connection.id = Some(id);
            }
            ServerMessage::Disconnected => {
                self.state.connection.connected = false;
                self.state.connection.reconnecting = false;
            }
            ServerMessage::ReconnectAttempt => {
                self.state.connection.reconnecting = true;
            }
            ServerMessage::ReconnectError => {
                // Connected state left untouched
                self.state.connection.reconnecting = false;
            }
            ServerMessage::WorldState(snapshot) => {
                // Wholesale replace, never a merge
                self.state.world_state = snapshot;
            }
        }
    }

    /// Map a key press to a state transition.
    ///
    /// The kill check runs first and unconditionally; everything else is
    /// gated on initialization having completed.
    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        // Raw mode means no terminal-driven SIGINT; Ctrl+C is ours to handle
        let is_kill = matches!(code, KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL))
            || matches!(code, KeyCode::Char('x') if modifiers.is_empty());
        if is_kill {
            self.should_quit = true;
            return;
        }

        if !self.state.initialized {
            return;
        }

        match code {
            KeyCode::Char('w') => self.state.current_screen = Screen::WorldState,
            KeyCode::Char('s') => self.state.current_screen = Screen::Home,
            KeyCode::Char('t') => {
                if self.state.connection.connected || self.state.connection.reconnecting {
                    self.close_connection();
                    self.state.append_log("closed socket");
                } else {
                    self.open_connection();
                    self.state.append_log("opened socket");
                }
            }
            KeyCode::Char('c') => self.state.clear_log(),
            other => debug!("Ignoring key {:?}", other),
        }
    }
}
