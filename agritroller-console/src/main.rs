//! `agritroller-console`: terminal operator console for the AgriTroller
//! field controller.
//!
//! Streams Wi-Fi status and system notifications from the controller and
//! renders them in the terminal. Configuration via CLI flags, environment
//! variables, or config file (`~/.config/agritroller/console.toml`).
//!
//! ```bash
//! # Local controller (or `agritroller-bus`) on the default port
//! cargo run --bin agritroller-console
//!
//! # Remote controller
//! cargo run --bin agritroller-console -- --api-base-url http://farm.local:8080/api
//!
//! # Or via environment variables
//! AGRITROLLER_API_BASE_URL=https://farm.example/api cargo run --bin agritroller-console
//! ```

use std::io;
use std::path::Path;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing_appender::non_blocking::WorkerGuard;

use agritroller_console::app::App;
use agritroller_console::config::{CliArgs, ConsoleConfig};
use agritroller_console::notify::NotificationFeed;
use agritroller_console::stream::{EventStream, StreamHandle, shared};
use agritroller_console::transport::ws::WsConnector;
use agritroller_console::ui;
use agritroller_console::wifi::WifiStore;

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    let config = match ConsoleConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ConsoleConfig::default()
        }
    };

    let stream_config = match config.to_stream_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    // Logs go to a file; the terminal belongs to ratatui.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!(endpoint = %stream_config.endpoint, "agritroller-console starting");

    let connector = WsConnector::new().with_connect_timeout(config.connect_timeout);
    let stream = EventStream::spawn(
        stream_config,
        connector,
        shared(WifiStore::new()),
        shared(NotificationFeed::new()),
    );
    if config.autoconnect
        && let Err(e) = stream.connect()
    {
        tracing::error!(err = %e, "could not start the event stream");
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &stream, &config);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = stream.shutdown().await {
        tracing::warn!(err = %e, "event stream already stopped");
    }
    tracing::info!("agritroller-console exiting");
    result
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("agritroller-console.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Main UI loop: refresh from the stream, draw, handle one key.
///
/// Runs on the runtime's main thread while the driver runs on a worker, so
/// blocking on `event::poll` never stalls the stream.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    stream: &StreamHandle,
    config: &ConsoleConfig,
) -> io::Result<()> {
    let mut app = App::new(config.timestamp_format.clone());

    loop {
        app.refresh(stream);
        terminal.draw(|frame| ui::draw(frame, &app))?;

        if event::poll(config.poll_timeout)?
            && let Event::Key(key) = event::read()?
        {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if let Some(action) = app.handle_key_event(key) {
                tracing::debug!(?action, "key action");
                if let Err(e) = action.apply(stream) {
                    tracing::error!(err = %e, "action failed");
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
