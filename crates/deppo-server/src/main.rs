//! Deppo server binary.
//!
//! Loads configuration, sets up structured logging, checks the token signing
//! settings, and serves the health endpoints until SIGTERM/SIGINT.

use deppo_auth::TokenHandler;
use deppo_server::config::{self, LoggingConfig};
use deppo_server::{app, AppState};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Where the configuration path came from, for the startup log.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    CliArg,
    EnvVar,
    Default,
}

/// Picks the config file: first CLI argument, then `DEPPO_CONFIG_PATH`,
/// then `config.toml` in the working directory.
fn config_path() -> (String, ConfigSource) {
    let non_blank = |value: &String| !value.trim().is_empty();

    if let Some(path) = std::env::args().nth(1).filter(non_blank) {
        return (path, ConfigSource::CliArg);
    }
    match std::env::var("DEPPO_CONFIG_PATH").ok().filter(non_blank) {
        Some(path) => (path, ConfigSource::EnvVar),
        None => (DEFAULT_CONFIG_PATH.to_string(), ConfigSource::Default),
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[tokio::main]
async fn main() {
    let (path, source) = config_path();
    let config = config::load_config(Some(&path))
        .expect("failed to load configuration: the server cannot start without valid config");

    init_tracing(&config.logging);
    tracing::info!(?source, %path, "loaded configuration");

    // A bad signing key stops startup.
    let token_handler = TokenHandler::new(&config.token_settings())
        .expect("invalid token settings: check token.security_key in config");
    tracing::info!(?token_handler, "token signing configured");

    let state = AppState::from_config(&config);
    tracing::info!(
        connection_string = %config.database.connection_string,
        procedures = config.procedures.len(),
        "repository configured"
    );

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address: is another process using this port?");
    tracing::info!(%addr, "deppo server listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("deppo server shut down");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
