// Framework bootstrap: logging, listeners, watchdogs, and shutdown.

use crate::frameworks::config::{self, ServerSettings};
use crate::interface_adapters::handlers::{GameHandler, MatchmakerHandler};
use crate::interface_adapters::net;
use crate::interface_adapters::state::AppState;
use crate::use_cases::watchdog;

use std::io::Result;
use std::sync::Arc;
use tokio::net::TcpListener;

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

// Serve both listeners and the watchdogs until the process is interrupted.
pub async fn run(
    matchmaker_listener: TcpListener,
    game_listener: TcpListener,
    settings: ServerSettings,
) -> Result<()> {
    let matchmaker_addr = matchmaker_listener.local_addr()?;
    let game_addr = game_listener.local_addr()?;

    let state = Arc::new(AppState::new(settings.clone()));

    tokio::spawn(net::serve(
        matchmaker_listener,
        Arc::new(MatchmakerHandler::new(state.clone())),
    ));
    tokio::spawn(net::serve(
        game_listener,
        Arc::new(GameHandler::new(state.clone())),
    ));

    tokio::spawn(watchdog::queue_watchdog(
        state.matchmaker.clone(),
        state.sessions.clone(),
        settings.lobby_size,
        settings.heartbeat_timeout,
        settings.num_tiles,
        settings.colour_selection_timeout,
    ));
    tokio::spawn(watchdog::session_watchdog(state.sessions.clone()));

    tracing::info!(
        matchmaker_addr = %matchmaker_addr,
        game_addr = %game_addr,
        lobby_size = settings.lobby_size,
        num_tiles = settings.num_tiles,
        "listening"
    );

    // Run until interrupted; the listeners and watchdogs die with the runtime.
    tokio::signal::ctrl_c().await?;
    tracing::info!("interrupt received; shutting down");
    Ok(())
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let host = config::bind_host();
    let settings = ServerSettings::from_env();

    // Bind both listeners up front and report errors rather than panicking.
    let matchmaker_listener = net::bind(&host, config::matchmaker_port()).inspect_err(|e| {
        tracing::error!(host = %host, port = config::matchmaker_port(), error = %e, "failed to bind matchmaker listener");
    })?;
    let game_listener = net::bind(&host, config::game_port()).inspect_err(|e| {
        tracing::error!(host = %host, port = config::game_port(), error = %e, "failed to bind game listener");
    })?;

    run(matchmaker_listener, game_listener, settings).await
}
