// Binary Outcome Market - Main Entry Point

use std::sync::Arc;

use binary_outcome_market::{build_router, AppState, ServerConfig, SharedState};

#[tokio::main]
async fn main() {
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_target(false)
        .init();

    let addr = config.bind_addr;

    // Initialize application state
    let state: SharedState = Arc::new(AppState::load(config));

    // Clone state for shutdown handler before moving into router
    let shutdown_state = state.clone();

    let app = build_router(state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "binary outcome market listening");
    tracing::info!("   GET  /markets                        - List markets");
    tracing::info!("   POST /markets                        - Create market");
    tracing::info!("   POST /faucet | /approve              - Collateral and allowances");
    tracing::info!("   POST /markets/:id/initialize         - Seed the pool (risk %)");
    tracing::info!("   POST /markets/:id/buy | /sell        - Trade one side");
    tracing::info!("   POST /markets/:id/liquidity/*        - add, zap, remove, remove-zap");
    tracing::info!("   POST /markets/:id/mint|burn|resolve|claim - Vault");

    // Save a snapshot on Ctrl-C, then exit
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl-C handler");
            return;
        }
        tracing::info!("shutdown signal received, saving snapshot");
        if let Err(e) = shutdown_state.save_to_disk() {
            tracing::error!("failed to save snapshot: {}", e);
        }
        std::process::exit(0);
    });

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server error");
    }
}
