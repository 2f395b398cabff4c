use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use matchlink_core::{
    load_config, validate_config, FsGameFiles, HttpBackend, HttpGameServices, MatchContext,
    MatchOrchestrator, MatchmakingClient, ProcessSupervisor, SessionPoller, SystemProcessTable,
    TokenStore, WsConnector,
};

use matchlink_server::api::create_router;
use matchlink_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("MATCHLINK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!(region = %config.poller.region, "Polling region");

    // Startup prerequisites
    let supervisor = Arc::new(ProcessSupervisor::new(
        config.supervisor.clone(),
        Arc::new(SystemProcessTable::new()),
    ));
    supervisor
        .verify_installation()
        .await
        .context("Startup prerequisites missing")?;
    info!(
        helper = %config.supervisor.helper_path.display(),
        game = %config.supervisor.game_path.display(),
        "Helper and game executable found"
    );

    // Credentials
    let tokens = Arc::new(TokenStore::new(
        config.services.account_host(),
        config.services.game_host(),
    ));
    match config.credentials.account_token.as_deref() {
        Some(token) if !token.is_empty() => tokens.set_token(token),
        _ => warn!("No account token configured; requests will be rejected until one is set"),
    }

    // Remote services
    let services = Arc::new(
        HttpGameServices::new(
            config.services.clone(),
            config.credentials.clone(),
            Arc::clone(&tokens),
        )
        .context("Failed to create game service client")?,
    );
    let backend = Arc::new(
        HttpBackend::new(config.backend.clone()).context("Failed to create backend client")?,
    );

    // Components
    let poller = Arc::new(SessionPoller::new(
        config.poller.clone(),
        Arc::clone(&services) as _,
    ));
    let matchmaking = Arc::new(MatchmakingClient::new(
        config.matchmaking.clone(),
        Arc::clone(&services) as _,
        backend,
        Arc::new(WsConnector::new()),
        Arc::clone(&supervisor) as _,
    ));
    let game_files = Arc::new(FsGameFiles::new(
        config.game_files.clone(),
        config.supervisor.game_path.clone(),
    ));

    let ctx = MatchContext {
        tokens,
        poller,
        accounts: services,
        process: supervisor,
        matchmaking,
        game_files,
    };
    let orchestrator = Arc::new(MatchOrchestrator::new(config.orchestrator.clone(), ctx));

    if config.orchestrator.enabled {
        orchestrator.start();
    } else {
        info!("Orchestrator disabled in config");
    }

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), Arc::clone(&orchestrator)));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Kill the client and close matchmaking before exiting
    info!("Stopping orchestrator...");
    orchestrator.stop().await;
    info!("Server shut down");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
