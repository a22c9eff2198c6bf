// HTTP request handlers for the market API

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app_state::SharedState;
use crate::book::{Asset, MarketView};
use crate::error::{ErrorKind, MarketError};
use crate::fixed_point::to_wad;
use crate::models::*;

// ===== ERRORS =====

/// Error surface of every handler: a typed engine error, rendered as
/// `{ success: false, error, kind }` with a status derived from its kind.
#[derive(Debug)]
pub struct ApiError(pub MarketError);

impl From<MarketError> for ApiError {
    fn from(e: MarketError) -> Self {
        Self(e)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::State => StatusCode::CONFLICT,
        ErrorKind::Liquidity => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Transfer => StatusCode::PAYMENT_REQUIRED,
        ErrorKind::Arithmetic => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let body = Json(json!({
            "success": false,
            "error": self.0.to_string(),
            "kind": kind,
        }));
        (status_for(kind), body).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

// ===== HEALTH =====

pub async fn health_check(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "markets": state.book.list_markets().len(),
        "timestamp": chrono::Utc::now(),
    }))
}

// ===== MARKET ENDPOINTS =====

pub async fn get_markets(State(state): State<SharedState>) -> ApiResult {
    let markets: Vec<MarketResponse> = state
        .book
        .list_markets()
        .into_iter()
        .map(MarketResponse::from)
        .collect();
    Ok(Json(json!({ "success": true, "markets": markets })))
}

pub async fn create_market(
    State(state): State<SharedState>,
    Json(payload): Json<CreateMarketRequest>,
) -> ApiResult {
    if payload.name.trim().is_empty() {
        return Err(MarketError::InvalidAmount("market name must not be empty".to_string()).into());
    }
    let view = state
        .book
        .create_market(payload.name.trim(), &payload.si_symbol, &payload.no_symbol);
    Ok(Json(json!({ "success": true, "market": MarketResponse::from(view) })))
}

pub async fn get_market(State(state): State<SharedState>, Path(id): Path<Uuid>) -> ApiResult {
    let view = state.book.market_view(id)?;
    Ok(Json(json!({ "success": true, "market": MarketResponse::from(view) })))
}

// ===== ACCOUNT ENDPOINTS =====

/// POST /faucet - issue test collateral, capped by FAUCET_LIMIT
pub async fn faucet(State(state): State<SharedState>, Json(payload): Json<FaucetRequest>) -> ApiResult {
    if payload.amount > state.config.faucet_limit {
        return Err(MarketError::InvalidAmount(format!(
            "faucet is limited to {} per request",
            state.config.faucet_limit
        ))
        .into());
    }
    let balance = state.book.fund(&payload.account, to_wad(payload.amount)?)?;
    Ok(Json(json!({
        "success": true,
        "account": payload.account,
        "balance": WireAmount(balance),
    })))
}

/// POST /approve - grant an allowance on collateral, SI, NO or LP shares
pub async fn approve(State(state): State<SharedState>, Json(payload): Json<ApproveRequest>) -> ApiResult {
    let amount = to_wad(payload.amount)?;
    let spender = match (payload.spender.as_str(), payload.market) {
        ("router", Some(id)) => state.book.market_view(id)?.router_account,
        ("vault", Some(id)) => state.book.market_view(id)?.vault_account,
        (account, _) => account.to_string(),
    };
    let market = match payload.asset {
        Asset::Collateral => None,
        _ => payload.market,
    };
    state
        .book
        .approve(market, payload.asset, &payload.owner, &spender, amount)?;
    Ok(Json(json!({
        "success": true,
        "owner": payload.owner,
        "spender": spender,
        "asset": payload.asset,
        "amount": payload.amount,
    })))
}

pub async fn get_balances(
    State(state): State<SharedState>,
    Path((market, account)): Path<(Uuid, String)>,
) -> ApiResult {
    let balances = state.book.balances(market, &account)?;
    Ok(Json(json!({
        "success": true,
        "account": account,
        "balances": AmountsResponse::from(balances),
    })))
}

// ===== ROUTER ENDPOINTS =====

pub async fn initialize(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<InitializeRequest>,
) -> ApiResult {
    let receipt = state
        .book
        .initialize(id, &payload.account, to_wad(payload.amount)?, payload.risk_percent)?;
    respond(&state, id, "receipt", InitializeResponse::from(receipt))
}

pub async fn buy(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TradeRequest>,
) -> ApiResult {
    let receipt = state
        .book
        .buy(id, &payload.account, to_wad(payload.amount)?, payload.side)?;
    respond(&state, id, "receipt", TradeResponse::from(receipt))
}

pub async fn sell(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TradeRequest>,
) -> ApiResult {
    let receipt = state
        .book
        .sell(id, &payload.account, to_wad(payload.amount)?, payload.side)?;
    respond(&state, id, "receipt", TradeResponse::from(receipt))
}

pub async fn add_liquidity(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AmountRequest>,
) -> ApiResult {
    let receipt = state
        .book
        .add_liquidity(id, &payload.account, to_wad(payload.amount)?)?;
    respond(&state, id, "receipt", LiquidityResponse::from(receipt))
}

pub async fn add_liquidity_zap(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AmountRequest>,
) -> ApiResult {
    let receipt = state
        .book
        .add_liquidity_zap(id, &payload.account, to_wad(payload.amount)?)?;
    respond(&state, id, "receipt", LiquidityResponse::from(receipt))
}

pub async fn remove_liquidity(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<WithdrawRequest>,
) -> ApiResult {
    let receipt = state
        .book
        .remove_liquidity(id, &payload.account, to_wad(payload.lp_amount)?)?;
    respond(&state, id, "receipt", WithdrawResponse::from(receipt))
}

pub async fn remove_liquidity_zap(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<WithdrawRequest>,
) -> ApiResult {
    let receipt = state
        .book
        .remove_liquidity_zap(id, &payload.account, to_wad(payload.lp_amount)?)?;
    respond(&state, id, "receipt", WithdrawResponse::from(receipt))
}

// ===== VAULT ENDPOINTS =====

pub async fn mint(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AmountRequest>,
) -> ApiResult {
    state.book.mint(id, &payload.account, to_wad(payload.amount)?)?;
    respond(&state, id, "minted", payload.amount)
}

pub async fn burn(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AmountRequest>,
) -> ApiResult {
    state.book.burn(id, &payload.account, to_wad(payload.amount)?)?;
    respond(&state, id, "burned", payload.amount)
}

/// POST /markets/:id/resolve - admin surface, authorization lives outside
pub async fn resolve(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResolveRequest>,
) -> ApiResult {
    state.book.resolve(id, to_wad(payload.scale)?)?;
    respond(&state, id, "scale", payload.scale)
}

pub async fn claim(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TradeRequest>,
) -> ApiResult {
    let payout = state
        .book
        .claim(id, &payload.account, to_wad(payload.amount)?, payload.side)?;
    respond(&state, id, "payout", WireAmount(payout))
}

// ===== QUOTES =====

pub async fn quote_buy(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(query): Query<QuoteQuery>,
) -> ApiResult {
    let quote = state.book.quote_buy(id, to_wad(query.amount)?, query.side)?;
    Ok(Json(json!({ "success": true, "quote": QuoteResponse::from(quote) })))
}

pub async fn quote_sell(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(query): Query<QuoteQuery>,
) -> ApiResult {
    let quote = state.book.quote_sell(id, to_wad(query.amount)?, query.side)?;
    Ok(Json(json!({ "success": true, "quote": QuoteResponse::from(quote) })))
}

/// Success body: the operation result under `key` plus the market afterwards.
/// Nothing here can fail once the operation has committed.
fn respond(state: &SharedState, id: Uuid, key: &str, result: impl serde::Serialize) -> ApiResult {
    let market: MarketView = state.book.market_view(id)?;
    let mut body = json!({
        "success": true,
        "market": MarketResponse::from(market),
    });
    body[key] = json!(result);
    Ok(Json(body))
}
