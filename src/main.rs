use std::path::PathBuf;

use anyhow::Context;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod api;
mod bot;
mod config;
mod error;
mod gateway;
mod worker;

pub use config::Config;

const DEFAULT_LOG_FILTER: &str = "funbot=info,tower_http=warn";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Local development keeps the token in .env; absence is fine.
    dotenvy::dotenv().ok();

    let config_path = std::env::var("FUNBOT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("funbot.toml"));

    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // When invoked as a Docker HEALTHCHECK, hit / and exit immediately.
    if std::env::args().nth(1).as_deref() == Some("--healthcheck") {
        let healthy = check_health(&healthcheck_url(&config.server)).await;
        std::process::exit(if healthy { 0 } else { 1 });
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    config.log_level.as_deref().unwrap_or(DEFAULT_LOG_FILTER),
                )
            }),
        )
        .init();

    info!(
        port = config.server.port,
        prefix = %config.bot.prefix(),
        "funbot starting"
    );

    // The worker runs on its own thread; a missing token leaves only the
    // liveness endpoint up.
    let bot_worker = match config.bot.token() {
        Some(token) => Some(worker::spawn(config.bot.clone(), token)?),
        None => {
            error!(env = %config.bot.token_env, "bot token not set; bot worker not started");
            None
        }
    };

    let quit_signal = quit_signal(bot_worker.as_ref(), config.bot.quit_stops_process);

    let listener = tokio::net::TcpListener::bind((config.server.bind.as_str(), config.server.port))
        .await
        .with_context(|| format!("binding {}:{}", config.server.bind, config.server.port))?;
    info!(addr = %listener.local_addr()?, "liveness endpoint listening");

    serve(listener, quit_signal).await?;

    if let Some(worker) = bot_worker {
        if !worker.is_finished() {
            info!("stopping bot worker");
        }
        worker.stop();
        // Worker failures were already logged on the worker thread.
        if let Err(e) = tokio::task::spawn_blocking(move || worker.join()).await {
            warn!(error = %e, "bot worker join failed");
        }
    }

    info!("funbot stopped");
    Ok(())
}

/// The token the liveness server watches, if `quit` should stop the process.
fn quit_signal(
    handle: Option<&worker::BotHandle>,
    quit_stops_process: bool,
) -> Option<CancellationToken> {
    handle
        .filter(|_| quit_stops_process)
        .map(worker::BotHandle::shutdown_token)
}

/// Serve the liveness endpoint until a termination signal, or until `quit`
/// is cancelled when one is given.
async fn serve(
    listener: tokio::net::TcpListener,
    quit: Option<CancellationToken>,
) -> anyhow::Result<()> {
    let app = api::liveness::router().layer(
        tower_http::trace::TraceLayer::new_for_http()
            .make_span_with(tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO))
            .on_response(tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO)),
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown(quit))
        .await
        .context("liveness server error")
}

/// Resolves on SIGINT/SIGTERM, or when `quit` is given and the bot quits.
async fn shutdown(quit: Option<CancellationToken>) {
    let quit = async move {
        match quit {
            Some(token) => token.cancelled().await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = shutdown_signal() => info!("shutdown signal received"),
        _ = quit => info!("bot quit, stopping liveness endpoint"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// URL requested by `funbot --healthcheck`.
///
/// Wildcard binds are reached over loopback; a specific address is used as-is.
fn healthcheck_url(server: &config::ServerConfig) -> String {
    let host = match server.bind.parse::<std::net::IpAddr>() {
        Ok(ip) if ip.is_unspecified() && ip.is_ipv6() => "[::1]".to_string(),
        Ok(ip) if ip.is_unspecified() => "127.0.0.1".to_string(),
        Ok(std::net::IpAddr::V6(ip)) => format!("[{ip}]"),
        _ => server.bind.clone(),
    };
    format!("http://{host}:{}/", server.port)
}

/// Lightweight healthcheck: true when GET `url` answers 2xx.
/// `funbot --healthcheck` exits 0 on true, 1 otherwise (Docker HEALTHCHECK).
async fn check_health(url: &str) -> bool {
    match reqwest::get(url).await {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}
