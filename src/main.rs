//! Grandquest terminal dashboard.
//!
//! Connects to the Grandquest game server, mirrors its connection lifecycle
//! and world-state snapshots into one state record, and redraws the terminal
//! on a fixed timer. Single-key commands switch screens, toggle the
//! connection, clear the log, or exit.

mod app;
mod events;
mod network;
mod state;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use crossterm::{
    event::{Event as CrosstermEvent, KeyEventKind},
    execute,
    style::Stylize,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use events::Event;
use network::GameConnection;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, IsTerminal};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Render timer period.
const REFRESH_RATE: Duration = Duration::from_millis(75);

#[derive(Parser)]
#[command(name = "grandquest-cli")]
#[command(about = "Terminal dashboard for the Grandquest game server", long_about = None)]
struct Cli {
    /// Game server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Game server port
    #[arg(long, default_value_t = 5000)]
    port: u16,
}

fn main() -> Result<()> {
    // Initialize logging to file (use RUST_LOG env var to control level)
    // TUI apps can't log to stdout, so we write to a file
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("grandquest-cli.log")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false) // No color codes in log file
        .init();

    let cli = Cli::parse();

    // Raw keystroke capture needs a real terminal on stdin
    if !io::stdin().is_terminal() {
        eprintln!(
            "Could not enable raw input on stdin. Run grandquest-cli from an interactive terminal."
        );
        std::process::exit(1);
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to setup terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;
    terminal.hide_cursor()?;

    // One inbound channel merges connection messages, key presses, and
    // render ticks, so a single loop runs every handler to completion.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let (server_tx, mut server_rx) = mpsc::unbounded_channel();
    let (control_tx, control_rx) = mpsc::unbounded_channel();

    // Connection task owns the socket and the reconnection policy
    let host = cli.host.clone();
    tokio::spawn(async move {
        if let Err(e) = GameConnection::start(host, cli.port, server_tx, control_rx).await {
            tracing::error!(error = ?e, "Connection task error");
        }
    });

    // Forward connection messages into the merged channel
    let server_event_tx = event_tx.clone();
    tokio::spawn(async move {
        while let Some(msg) = server_rx.recv().await {
            if server_event_tx.send(Event::Server(msg)).is_err() {
                break;
            }
        }
    });

    // Blocking stdin reader; dies with the process or when the channel closes
    let key_event_tx = event_tx.clone();
    std::thread::spawn(move || loop {
        match crossterm::event::read() {
            Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                if key_event_tx
                    .send(Event::key(key.code, key.modifiers))
                    .is_err()
                {
                    break;
                }
            }
            Ok(CrosstermEvent::Resize(..)) => {
                if key_event_tx.send(Event::Resize).is_err() {
                    break;
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Error reading terminal input: {}", e);
                break;
            }
        }
    });

    let mut dashboard = App::new(control_tx);

    // Startup order: clear display, open the connection, mark initialization
    // complete, then start the render timer
    terminal.clear()?;
    dashboard.open_connection();
    dashboard.state.initialized = true;

    let tick_event_tx = event_tx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(REFRESH_RATE);
        loop {
            interval.tick().await;
            if tick_event_tx.send(Event::Tick).is_err() {
                break;
            }
        }
    });

    let result = dispatch(&mut terminal, &mut dashboard, &mut event_rx).await;

    // Restore terminal before printing anything
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if result.is_ok() {
        println!("{}", "Goodbye!".yellow());
    }
    result
}

/// Consume the merged event stream until the kill key or a render error.
async fn dispatch(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    dashboard: &mut App,
    event_rx: &mut mpsc::UnboundedReceiver<Event>,
) -> Result<()> {
    let mut last_tick = Instant::now();

    while let Some(event) = event_rx.recv().await {
        match event {
            Event::Server(msg) => dashboard.handle_server_message(msg),
            Event::Key { code, modifiers } => {
                dashboard.handle_key(code, modifiers);
                if dashboard.should_quit {
                    break;
                }
            }
            // The next tick redraws at the new size
            Event::Resize => {}
            Event::Tick => {
                let now_ms = chrono::Utc::now().timestamp_millis();
                let lag_ms =
                    last_tick.elapsed().as_millis() as i64 - REFRESH_RATE.as_millis() as i64;
                terminal
                    .draw(|frame| ui::render(frame, &dashboard.state, now_ms, lag_ms))
                    .context("Failed to draw frame")?;
                last_tick = Instant::now();
            }
        }
    }
    Ok(())
}
