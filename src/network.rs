//! Connection client for the Grandquest game server.
//!
//! Speaks newline-framed JSON over TCP. The task owns the socket and the
//! whole reconnection policy; the dashboard only sends `Open`/`Close` and
//! observes the resulting [`ServerMessage`] stream.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Initial retry delay after a lost connection.
const BACKOFF_INITIAL: Duration = Duration::from_millis(500);
/// Retry delay ceiling.
const BACKOFF_MAX: Duration = Duration::from_secs(10);
/// How long to wait for the server's hello before falling back to the
/// socket's local address as the session id.
const HELLO_TIMEOUT: Duration = Duration::from_millis(250);

/// Messages emitted by the connection task.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Connection established; carries the session id.
    Connected { id: String },
    /// Connection closed (server side or operator close).
    Disconnected,
    /// About to retry a lost connection.
    ReconnectAttempt,
    /// A retry failed; another follows after backoff.
    ReconnectError,
    /// Full world-state snapshot, replaces the previous one.
    WorldState(Map<String, Value>),
}

/// Operator commands to the connection task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionControl {
    Open,
    Close,
}

/// Inbound wire envelope: `{"event": "...", ...}` per line.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WireEvent {
    Hello { id: String },
    WorldState { data: Map<String, Value> },
}

/// Parse one line from the server into a message, if it is one we consume.
/// Unknown events and malformed lines are dropped.
pub(crate) fn parse_server_line(line: &str) -> Option<ServerMessage> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<WireEvent>(line) {
        Ok(WireEvent::Hello { id }) => Some(ServerMessage::Connected { id }),
        Ok(WireEvent::WorldState { data }) => Some(ServerMessage::WorldState(data)),
        Err(e) => {
            debug!("Ignoring unparseable server line: {} ({})", line, e);
            None
        }
    }
}

/// Why a connected session ended.
enum SessionEnd {
    /// Operator sent `Close`; back to idle, no reconnection.
    Closed,
    /// Server went away; enter the reconnection loop.
    Lost,
    /// Control channel dropped; the process is going down.
    Shutdown,
}

pub struct GameConnection;

impl GameConnection {
    /// Run the connection task until the control channel closes.
    ///
    /// Auto-connect is disabled: the task idles until the first `Open`.
    pub async fn start(
        host: String,
        port: u16,
        server_tx: mpsc::UnboundedSender<ServerMessage>,
        mut control_rx: mpsc::UnboundedReceiver<ConnectionControl>,
    ) -> Result<()> {
        let addr = format!("{}:{}", host, port);

        // Idle until opened
        loop {
            match control_rx.recv().await {
                Some(ConnectionControl::Open) => {}
                Some(ConnectionControl::Close) => continue,
                None => return Ok(()),
            }

            info!("Opening connection to {}", addr);
            let mut reconnecting = false;
            let mut backoff = BACKOFF_INITIAL;

            // Connect-and-serve until closed or shut down
            let end = loop {
                if reconnecting {
                    let _ = server_tx.send(ServerMessage::ReconnectAttempt);
                }
                let stream = tokio::select! {
                    result = TcpStream::connect(addr.as_str()) => result,
                    ctl = control_rx.recv() => match ctl {
                        Some(ConnectionControl::Close) => break SessionEnd::Closed,
                        Some(ConnectionControl::Open) => continue,
                        None => break SessionEnd::Shutdown,
                    },
                };

                match stream {
                    Ok(stream) => {
                        backoff = BACKOFF_INITIAL;
                        match serve(stream, &server_tx, &mut control_rx).await {
                            SessionEnd::Lost => {
                                let _ = server_tx.send(ServerMessage::Disconnected);
                                reconnecting = true;
                            }
                            end => break end,
                        }
                    }
                    Err(e) => {
                        warn!("Connection to {} failed: {}", addr, e);
                        if reconnecting {
                            let _ = server_tx.send(ServerMessage::ReconnectError);
                        } else {
                            // Initial open failed; retries take over from here
                            let _ = server_tx.send(ServerMessage::Disconnected);
                            reconnecting = true;
                        }
                        // Back off, but let Close interrupt the wait
                        tokio::select! {
                            _ = tokio::time::sleep(backoff) => {}
                            ctl = control_rx.recv() => match ctl {
                                Some(ConnectionControl::Close) => break SessionEnd::Closed,
                                Some(ConnectionControl::Open) => {}
                                None => break SessionEnd::Shutdown,
                            },
                        }
                        backoff = (backoff * 2).min(BACKOFF_MAX);
                    }
                }
            };

            match end {
                SessionEnd::Closed => {
                    info!("Connection to {} closed by operator", addr);
                    let _ = server_tx.send(ServerMessage::Disconnected);
                }
                SessionEnd::Shutdown => return Ok(()),
                SessionEnd::Lost => unreachable!("lost sessions reconnect in place"),
            }
        }
    }
}

/// Read server lines until the connection drops or the operator closes it.
async fn serve(
    stream: TcpStream,
    server_tx: &mpsc::UnboundedSender<ServerMessage>,
    control_rx: &mut mpsc::UnboundedReceiver<ConnectionControl>,
) -> SessionEnd {
    let local_addr = stream
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let mut reader = BufReader::new(stream);

    // The server greets with a hello carrying the session id; fall back to
    // the local address if data (or nothing) arrives first.
    let mut pending: Option<ServerMessage> = None;
    let mut line = String::new();
    let greeting = tokio::time::timeout(HELLO_TIMEOUT, reader.read_line(&mut line)).await;
    let id = match greeting {
        Ok(Ok(0)) => {
            info!("Connection closed by server before greeting");
            return SessionEnd::Lost;
        }
        Ok(Ok(_)) => match parse_server_line(&line) {
            Some(ServerMessage::Connected { id }) => id,
            other => {
                pending = other;
                local_addr
            }
        },
        Ok(Err(e)) => {
            warn!("Error reading greeting: {}", e);
            return SessionEnd::Lost;
        }
        Err(_) => local_addr,
    };

    info!("Connected with session id {}", id);
    let _ = server_tx.send(ServerMessage::Connected { id });
    if let Some(msg) = pending {
        let _ = server_tx.send(msg);
    }

    loop {
        line.clear();
        tokio::select! {
            result = reader.read_line(&mut line) => match result {
                Ok(0) => {
                    info!("Connection closed by server");
                    return SessionEnd::Lost;
                }
                Ok(_) => {
                    if let Some(msg) = parse_server_line(&line) {
                        let _ = server_tx.send(msg);
                    }
                }
                Err(e) => {
                    warn!("Error reading from server: {}", e);
                    return SessionEnd::Lost;
                }
            },
            ctl = control_rx.recv() => match ctl {
                Some(ConnectionControl::Close) => return SessionEnd::Closed,
                Some(ConnectionControl::Open) => {}
                None => return SessionEnd::Shutdown,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hello() {
        let msg = parse_server_line(r#"{"event":"hello","id":"abc123"}"#);
        assert_eq!(
            msg,
            Some(ServerMessage::Connected {
                id: "abc123".to_string()
            })
        );
    }

    #[test]
    fn test_parse_world_state_preserves_field_order() {
        let msg = parse_server_line(
            r#"{"event":"world_state","data":{"timeOfDay":100,"weather":"rain"}}"#,
        )
        .unwrap();
        let ServerMessage::WorldState(map) = msg else {
            panic!("expected world state");
        };
        let keys: Vec<&String> = map.keys().collect();
        assert_eq!(keys, ["timeOfDay", "weather"]);
        assert_eq!(map["timeOfDay"], serde_json::json!(100));
        assert_eq!(map["weather"], serde_json::json!("rain"));
    }

    #[test]
    fn test_parse_drops_garbage_and_unknown_events() {
        assert_eq!(parse_server_line(""), None);
        assert_eq!(parse_server_line("   "), None);
        assert_eq!(parse_server_line("not json"), None);
        assert_eq!(parse_server_line(r#"{"event":"chat","text":"hi"}"#), None);
    }

    #[tokio::test]
    async fn test_task_idles_until_open_and_exits_on_channel_drop() {
        let (server_tx, mut server_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(GameConnection::start(
            "127.0.0.1".to_string(),
            1, // nothing listens here
            server_tx,
            control_rx,
        ));

        // Close while idle is a no-op
        control_tx.send(ConnectionControl::Close).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(server_rx.try_recv().is_err());

        // Dropping the control channel ends the task
        drop(control_tx);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_failed_open_reports_disconnected_then_retries() {
        let (server_tx, mut server_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(GameConnection::start(
            "127.0.0.1".to_string(),
            1,
            server_tx,
            control_rx,
        ));

        control_tx.send(ConnectionControl::Open).unwrap();
        // First failure surfaces as a disconnect, then retries begin
        assert_eq!(server_rx.recv().await, Some(ServerMessage::Disconnected));
        assert_eq!(server_rx.recv().await, Some(ServerMessage::ReconnectAttempt));

        control_tx.send(ConnectionControl::Close).unwrap();
        drop(control_tx);
        handle.await.unwrap().unwrap();
    }
}
