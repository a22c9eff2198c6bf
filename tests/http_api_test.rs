// HTTP API tests, driving the router in-process

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

use binary_outcome_market::{build_router, AppState, ServerConfig};

fn app() -> Router {
    let mut config = ServerConfig::default();
    config.faucet_limit = dec!(50000);
    build_router(Arc::new(AppState::new(config)))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .unwrap_or_else(|| panic!("expected a decimal string, got {}", value))
        .parse()
        .unwrap()
}

async fn create_market(app: &Router) -> String {
    let (status, body) = call(app, "POST", "/markets", Some(json!({ "name": "Rain tomorrow?" }))).await;
    assert_eq!(status, StatusCode::OK);
    body["market"]["id"].as_str().unwrap().to_string()
}

/// Fund `account` and approve the market's router on every asset.
async fn onboard(app: &Router, market: &str, account: &str, amount: &str) {
    let (status, _) = call(app, "POST", "/faucet", Some(json!({ "account": account, "amount": amount }))).await;
    assert_eq!(status, StatusCode::OK);
    for asset in ["collateral", "si", "no", "lp"] {
        let (status, _) = call(
            app,
            "POST",
            "/approve",
            Some(json!({
                "market": market,
                "asset": asset,
                "owner": account,
                "spender": "router",
                "amount": "1000000000",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}

async fn initialized_market(app: &Router) -> String {
    let market = create_market(app).await;
    onboard(app, &market, "alice", "20000").await;
    let (status, body) = call(
        app,
        "POST",
        &format!("/markets/{}/initialize", market),
        Some(json!({ "account": "alice", "amount": "10000", "risk_percent": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    market
}

#[tokio::test]
async fn test_health_check() {
    let app = app();
    let (status, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_and_list_markets() {
    let app = app();
    let market = create_market(&app).await;

    let (status, body) = call(&app, "GET", "/markets", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["markets"].as_array().unwrap().len(), 1);

    let (status, body) = call(&app, "GET", &format!("/markets/{}", market), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["market"]["lifecycle"], "created");
    assert_eq!(body["market"]["si_symbol"], "SI");
}

#[tokio::test]
async fn test_initialize_buy_and_sell_back() {
    let app = app();
    let market = initialized_market(&app).await;

    let (_, body) = call(&app, "GET", &format!("/markets/{}", market), None).await;
    assert_eq!(body["market"]["lifecycle"], "active");
    assert!(decimal(&body["market"]["probability_si"]) > dec!(0.5));

    onboard(&app, &market, "bob", "5000").await;
    let (status, body) = call(
        &app,
        "POST",
        &format!("/markets/{}/buy", market),
        Some(json!({ "account": "bob", "side": "SI", "amount": "1000" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let bought = decimal(&body["receipt"]["amount_out"]);
    assert!(bought > dec!(1000));

    let (status, body) = call(
        &app,
        "POST",
        &format!("/markets/{}/sell", market),
        Some(json!({ "account": "bob", "side": "SI", "amount": bought.to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let returned = decimal(&body["receipt"]["amount_out"]);
    assert!(returned >= dec!(950));
    assert!(returned <= dec!(1000));

    let (status, body) = call(&app, "GET", &format!("/balances/{}/bob", market), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["balances"]["collateral"]), dec!(4000) + returned);
}

#[tokio::test]
async fn test_liquidity_endpoints() {
    let app = app();
    let market = initialized_market(&app).await;
    onboard(&app, &market, "carol", "1000").await;

    let (status, body) = call(
        &app,
        "POST",
        &format!("/markets/{}/liquidity/zap", market),
        Some(json!({ "account": "carol", "amount": "100" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let lp = decimal(&body["receipt"]["lp_minted"]);
    assert!(lp > Decimal::ZERO);
    assert!(decimal(&body["market"]["reserves"]["si"]) >= dec!(99));

    let (status, body) = call(
        &app,
        "POST",
        &format!("/markets/{}/liquidity/remove-zap", market),
        Some(json!({ "account": "carol", "lp_amount": lp.to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    // the pool leans towards SI, so the NO surplus comes back as tokens
    assert!(decimal(&body["receipt"]["delivered"]["collateral"]) > dec!(95));
    assert!(decimal(&body["receipt"]["delivered"]["no"]) > Decimal::ZERO);
    assert_eq!(decimal(&body["receipt"]["delivered"]["si"]), Decimal::ZERO);
}

#[tokio::test]
async fn test_vault_endpoints_and_resolution() {
    let app = app();
    let market = initialized_market(&app).await;
    onboard(&app, &market, "dave", "100").await;
    let (status, _) = call(
        &app,
        "POST",
        "/approve",
        Some(json!({
            "market": market,
            "asset": "collateral",
            "owner": "dave",
            "spender": "vault",
            "amount": "100",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        "POST",
        &format!("/markets/{}/mint", market),
        Some(json!({ "account": "dave", "amount": "40" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let resolve = format!("/markets/{}/resolve", market);
    let (status, body) = call(&app, "POST", &resolve, Some(json!({ "scale": "1.5" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, _) = call(&app, "POST", &resolve, Some(json!({ "scale": "0.8" }))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = call(&app, "POST", &resolve, Some(json!({ "scale": "0.2" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "state");

    let (status, body) = call(
        &app,
        "POST",
        &format!("/markets/{}/claim", market),
        Some(json!({ "account": "dave", "side": "SI", "amount": "40" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(decimal(&body["payout"]), dec!(32));
    assert_eq!(body["market"]["lifecycle"], "draining");
}

#[tokio::test]
async fn test_quotes() {
    let app = app();
    let market = initialized_market(&app).await;

    let (status, body) = call(
        &app,
        "GET",
        &format!("/markets/{}/quote/buy?side=NO&amount=250", market),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(decimal(&body["quote"]["amount_out"]) > dec!(250));

    let (status, body) = call(
        &app,
        "GET",
        &format!("/markets/{}/quote/sell?side=SI&amount=250", market),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(decimal(&body["quote"]["amount_out"]) < dec!(250));
}

#[tokio::test]
async fn test_error_statuses() {
    let app = app();
    let market = initialized_market(&app).await;

    let (status, body) = call(&app, "GET", &format!("/markets/{}", uuid::Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _) = call(
        &app,
        "POST",
        &format!("/markets/{}/initialize", market),
        Some(json!({ "account": "alice", "amount": "10", "risk_percent": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(&app, "POST", "/faucet", Some(json!({ "account": "eve", "amount": "50001" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        "POST",
        &format!("/markets/{}/buy", market),
        Some(json!({ "account": "eve", "side": "NO", "amount": "10" })),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["kind"], "transfer");

    let (status, _) = call(
        &app,
        "POST",
        &format!("/markets/{}/buy", market),
        Some(json!({ "account": "alice", "side": "NO", "amount": "0.0000000000000000001" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_amounts_beyond_decimal_range_are_reported() {
    let mut config = ServerConfig::default();
    config.faucet_limit = dec!(1000000000000);
    let app = build_router(Arc::new(AppState::new(config)));
    let market = create_market(&app).await;

    // 1e11 whole units is 1e29 base units, past what Decimal can hold
    let (status, body) = call(
        &app,
        "POST",
        "/faucet",
        Some(json!({ "account": "whale", "amount": "100000000000" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["balance"], "100000000000");

    let (status, _) = call(
        &app,
        "POST",
        "/approve",
        Some(json!({
            "market": market,
            "asset": "collateral",
            "owner": "whale",
            "spender": "vault",
            "amount": "100000000000",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        "POST",
        &format!("/markets/{}/mint", market),
        Some(json!({ "account": "whale", "amount": "99999999999.5" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["market"]["collateral_reserve"], "99999999999.5");
    assert_eq!(body["market"]["si_supply"], "99999999999.5");

    let (status, body) = call(&app, "GET", &format!("/balances/{}/whale", market), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balances"]["collateral"], "0.5");
    assert_eq!(body["balances"]["no"], "99999999999.5");
}
