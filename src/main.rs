mod app;
mod clock;
mod config;
mod controller;
mod endpoint;
mod error;
mod logging;
mod model;
mod network;
mod terminal;
mod transport;
mod ui;

use crate::app::{intent_for, App};
use crate::config::Config;
use crate::controller::ConnectionController;
use crate::network::WsConnector;
use crate::terminal::TerminalGuard;
use crate::transport::Envelope;
use anyhow::Context;
use clap::Parser;
use crossterm::event::{self, Event};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    io::{self, Stdout},
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    time::{Duration, Instant},
};

const FRAME: Duration = Duration::from_millis(16);
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    logging::init(&config.log_level, config.log_file.as_deref())?;

    let url = config.endpoint().context("deriving the websocket endpoint")?;
    tracing::info!(origin = %config.origin, %url, "starting");

    let guard = TerminalGuard::enter(io::stdout())?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    terminal.clear()?;

    let (tx, rx) = mpsc::channel::<Envelope>();
    let controller = ConnectionController::new(WsConnector::new(tx), url);
    let mut app = App::new(controller);
    if config.auto_connect {
        app.controller.connect();
    }

    let result = run(&mut terminal, &mut app, &rx);

    app.controller.dispose();
    drop(terminal);
    drop(guard);

    wait_for_close(&mut app, &rx);
    tracing::info!(phase = ?app.controller.phase(), "exiting");

    result
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App<WsConnector>,
    rx: &Receiver<Envelope>,
) -> anyhow::Result<()> {
    while !app.quit {
        while let Ok(envelope) = rx.try_recv() {
            app.controller.handle_event(envelope);
        }
        app.controller.tick();

        let endpoint = app.controller.url().to_string();
        terminal.draw(|f| ui::draw(f, app.controller.view(), &endpoint, app.editing))?;

        if event::poll(FRAME)? {
            if let Event::Key(key) = event::read()? {
                if let Some(intent) = intent_for(key, app.editing) {
                    app.apply(intent);
                }
            }
        }
    }
    Ok(())
}

/// Gives the close handshake a moment so the server sees a proper goodbye.
fn wait_for_close(app: &mut App<WsConnector>, rx: &Receiver<Envelope>) {
    let deadline = Instant::now() + SHUTDOWN_GRACE;
    while !app.controller.pending().is_empty() {
        let left = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(left) {
            Ok(envelope) => app.controller.handle_event(envelope),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                tracing::debug!(pending = ?app.controller.pending(), "gave up waiting for close");
                break;
            }
        }
    }
}
