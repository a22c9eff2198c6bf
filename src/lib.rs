/// Collateral-backed binary-outcome market
/// Exports the engine (vault, pool, router, book) and the HTTP layer

pub mod fixed_point;
pub mod error;
pub mod token;
pub mod outcome;
pub mod vault;
pub mod market;
pub mod router;
pub mod book;
pub mod config;
pub mod app_state;
pub mod models;
pub mod handlers;
pub mod routes;

// Re-export the engine surface
pub use error::{ErrorKind, MarketError};
pub use fixed_point::{format_wad, to_wad, units, U256, WAD};
pub use token::{TokenLedger, Transactional};
pub use outcome::{OutcomeTokens, Side};
pub use vault::CollateralVault;
pub use market::{MarketBackend, OutcomePairMarket, Reserves, LOCKED_LIQUIDITY_HOLDER, MINIMUM_LIQUIDITY};
pub use router::{
    InitializeReceipt, LiquidityReceipt, MarketRouter, Quote, Session, Swept, TradeReceipt, WithdrawReceipt,
};
pub use book::{Asset, Balances, BookSnapshot, Lifecycle, MarketBook, MarketId, MarketInstance, MarketView};

// Re-export the server surface
pub use app_state::{AppState, SharedState};
pub use config::ServerConfig;
pub use routes::build_router;
