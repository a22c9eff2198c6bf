// Request / response models for the market HTTP API
//
// Amounts cross the wire as decimal strings in whole units ("12.5" = 12.5
// collateral); internally they are 18-decimal integers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::book::{Asset, Balances, Lifecycle, MarketView};
use crate::fixed_point::format_wad;
use crate::market::Reserves;
use crate::outcome::Side;
use crate::router::{InitializeReceipt, LiquidityReceipt, Quote, Swept, TradeReceipt, WithdrawReceipt};

// ===== REQUESTS =====

#[derive(Debug, Deserialize)]
pub struct CreateMarketRequest {
    pub name: String,
    #[serde(default = "default_si_symbol")]
    pub si_symbol: String,
    #[serde(default = "default_no_symbol")]
    pub no_symbol: String,
}

fn default_si_symbol() -> String {
    "SI".to_string()
}

fn default_no_symbol() -> String {
    "NO".to_string()
}

#[derive(Debug, Deserialize)]
pub struct FaucetRequest {
    pub account: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    /// Required for every asset except collateral
    #[serde(default)]
    pub market: Option<Uuid>,
    pub asset: Asset,
    pub owner: String,
    /// An account, or "router" / "vault" for the market's own accounts
    pub spender: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct InitializeRequest {
    pub account: String,
    pub amount: Decimal,
    pub risk_percent: u8,
}

#[derive(Debug, Deserialize)]
pub struct TradeRequest {
    pub account: String,
    pub side: Side,
    pub amount: Decimal,
}

/// Collateral-denominated request (liquidity deposits, vault mint/burn).
#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub account: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub account: String,
    pub lp_amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    /// Settlement value of one SI in [0, 1]
    pub scale: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub side: Side,
    pub amount: Decimal,
}

// ===== RESPONSES =====

/// An 18-decimal amount on the wire: a decimal string in whole units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireAmount(pub u128);

impl Serialize for WireAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_wad(self.0))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReservesResponse {
    pub si: WireAmount,
    pub no: WireAmount,
}

impl From<Reserves> for ReservesResponse {
    fn from(reserves: Reserves) -> Self {
        Self {
            si: WireAmount(reserves.si),
            no: WireAmount(reserves.no),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AmountsResponse {
    pub collateral: WireAmount,
    pub si: WireAmount,
    pub no: WireAmount,
    pub lp: WireAmount,
}

impl From<Swept> for AmountsResponse {
    fn from(swept: Swept) -> Self {
        Self {
            collateral: WireAmount(swept.collateral),
            si: WireAmount(swept.si),
            no: WireAmount(swept.no),
            lp: WireAmount(swept.shares),
        }
    }
}

impl From<Balances> for AmountsResponse {
    fn from(balances: Balances) -> Self {
        Self {
            collateral: WireAmount(balances.collateral),
            si: WireAmount(balances.si),
            no: WireAmount(balances.no),
            lp: WireAmount(balances.lp),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketResponse {
    pub id: Uuid,
    pub name: String,
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub router_account: String,
    pub vault_account: String,
    pub si_symbol: String,
    pub no_symbol: String,
    pub reserves: ReservesResponse,
    pub lp_supply: WireAmount,
    /// Implied probability of SI in [0, 1]
    pub probability_si: Option<WireAmount>,
    pub collateral_reserve: WireAmount,
    pub si_supply: WireAmount,
    pub no_supply: WireAmount,
    pub scale: Option<WireAmount>,
}

impl From<MarketView> for MarketResponse {
    fn from(view: MarketView) -> Self {
        Self {
            id: view.id,
            name: view.name,
            lifecycle: view.lifecycle,
            created_at: view.created_at,
            router_account: view.router_account,
            vault_account: view.vault_account,
            si_symbol: view.si_symbol,
            no_symbol: view.no_symbol,
            reserves: view.reserves.into(),
            lp_supply: WireAmount(view.lp_supply),
            probability_si: view.implied_probability.map(WireAmount),
            collateral_reserve: WireAmount(view.collateral_reserve),
            si_supply: WireAmount(view.si_supply),
            no_supply: WireAmount(view.no_supply),
            scale: view.scale.map(WireAmount),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InitializeResponse {
    pub collateral_in: WireAmount,
    pub risk_percent: u8,
    pub withheld_si: WireAmount,
    pub lp_minted: WireAmount,
    pub reserves: ReservesResponse,
}

impl From<InitializeReceipt> for InitializeResponse {
    fn from(receipt: InitializeReceipt) -> Self {
        Self {
            collateral_in: WireAmount(receipt.collateral_in),
            risk_percent: receipt.risk_percent,
            withheld_si: WireAmount(receipt.withheld_si),
            lp_minted: WireAmount(receipt.lp_minted),
            reserves: receipt.reserves.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeResponse {
    pub side: Side,
    pub amount_in: WireAmount,
    pub amount_out: WireAmount,
    pub swap_in: WireAmount,
    pub swap_out: WireAmount,
    pub refunded: AmountsResponse,
    pub reserves: ReservesResponse,
}

impl From<TradeReceipt> for TradeResponse {
    fn from(receipt: TradeReceipt) -> Self {
        Self {
            side: receipt.side,
            amount_in: WireAmount(receipt.amount_in),
            amount_out: WireAmount(receipt.amount_out),
            swap_in: WireAmount(receipt.swap_in),
            swap_out: WireAmount(receipt.swap_out),
            refunded: receipt.refunded.into(),
            reserves: receipt.reserves.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LiquidityResponse {
    pub collateral_in: WireAmount,
    pub deposited_si: WireAmount,
    pub deposited_no: WireAmount,
    pub lp_minted: WireAmount,
    pub refunded: AmountsResponse,
    pub reserves: ReservesResponse,
}

impl From<LiquidityReceipt> for LiquidityResponse {
    fn from(receipt: LiquidityReceipt) -> Self {
        Self {
            collateral_in: WireAmount(receipt.collateral_in),
            deposited_si: WireAmount(receipt.deposited_si),
            deposited_no: WireAmount(receipt.deposited_no),
            lp_minted: WireAmount(receipt.lp_minted),
            refunded: receipt.refunded.into(),
            reserves: receipt.reserves.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WithdrawResponse {
    pub lp_burned: WireAmount,
    pub withdrawn_si: WireAmount,
    pub withdrawn_no: WireAmount,
    pub burned_pair: WireAmount,
    pub delivered: AmountsResponse,
    pub reserves: ReservesResponse,
}

impl From<WithdrawReceipt> for WithdrawResponse {
    fn from(receipt: WithdrawReceipt) -> Self {
        Self {
            lp_burned: WireAmount(receipt.lp_burned),
            withdrawn_si: WireAmount(receipt.withdrawn_si),
            withdrawn_no: WireAmount(receipt.withdrawn_no),
            burned_pair: WireAmount(receipt.burned_pair),
            delivered: receipt.delivered.into(),
            reserves: receipt.reserves.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuoteResponse {
    pub side: Side,
    pub amount_in: WireAmount,
    pub amount_out: WireAmount,
    pub swap_in: WireAmount,
    pub swap_out: WireAmount,
}

impl From<Quote> for QuoteResponse {
    fn from(quote: Quote) -> Self {
        Self {
            side: quote.side,
            amount_in: WireAmount(quote.amount_in),
            amount_out: WireAmount(quote.amount_out),
            swap_in: WireAmount(quote.swap_in),
            swap_out: WireAmount(quote.swap_out),
        }
    }
}
