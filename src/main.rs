use std::{net::SocketAddr, sync::Arc};
use teloxide::Bot;
use tokio::signal;
use tracing::{error, info, warn};

use tg_user_registry::{
    bot::{self, BotSettings},
    config::Config,
    create_router,
    db::Database,
    middleware::init_tracing,
    SharedStore,
};

#[tokio::main]
async fn main() {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_tracing(&config.environment) {
        eprintln!("Failed to initialize tracing: {}", e);
        std::process::exit(1);
    }
    info!("Configuration loaded successfully");

    let database = match Database::new(&config.database) {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to prepare database access: {}", e);
            std::process::exit(1);
        }
    };

    // The service keeps running without the table; readers answer 404 until it exists
    if let Err(e) = database.migrate().await {
        warn!("Database migrations failed, continuing: {}", e);
    }

    let store: SharedStore = Arc::new(database);
    let app = create_router(store.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            info!("API server listening on {}", addr);
            listener
        }
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    let telegram = Bot::new(config.bot.token.clone());
    let settings = BotSettings {
        webapp_url: config.bot.webapp_url.clone(),
    };

    let server = async {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
    };

    // Whichever side stops first ends the process
    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                std::process::exit(1);
            }
        }
        () = bot::run(telegram, store, settings) => {
            warn!("Telegram dispatcher exited, shutting down");
        }
    }

    info!("Shutdown complete");
}

/// Graceful shutdown signal handler
/// Listens for SIGTERM and SIGINT signals
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, initiating graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM signal, initiating graceful shutdown");
        },
    }
}
