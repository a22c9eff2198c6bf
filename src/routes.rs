// HTTP routing table

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::app_state::SharedState;
use crate::handlers::*;

/// Every endpoint, with CORS, bound to `state`.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        // ===== HEALTH CHECK =====
        .route("/", get(health_check))
        .route("/health", get(health_check))

        // ===== MARKET ENDPOINTS =====
        .route("/markets", get(get_markets).post(create_market))
        .route("/markets/:id", get(get_market))

        // ===== ACCOUNT ENDPOINTS =====
        .route("/faucet", post(faucet))
        .route("/approve", post(approve))
        .route("/balances/:market/:account", get(get_balances))

        // ===== ROUTER ENDPOINTS =====
        .route("/markets/:id/initialize", post(initialize))
        .route("/markets/:id/buy", post(buy))
        .route("/markets/:id/sell", post(sell))
        .route("/markets/:id/liquidity/add", post(add_liquidity))
        .route("/markets/:id/liquidity/zap", post(add_liquidity_zap))
        .route("/markets/:id/liquidity/remove", post(remove_liquidity))
        .route("/markets/:id/liquidity/remove-zap", post(remove_liquidity_zap))
        .route("/markets/:id/quote/buy", get(quote_buy))
        .route("/markets/:id/quote/sell", get(quote_sell))

        // ===== VAULT ENDPOINTS =====
        .route("/markets/:id/mint", post(mint))
        .route("/markets/:id/burn", post(burn))
        .route("/markets/:id/resolve", post(resolve))
        .route("/markets/:id/claim", post(claim))

        // Apply CORS and state
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
