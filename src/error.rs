// ============================================================================
// Errors - single taxonomy for vault, market, router and book
// ============================================================================

use serde::Serialize;

/// Classification callers can branch on without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Zero or malformed amount, risk or scale out of range
    Validation,
    /// Operation not allowed in the current lifecycle stage
    State,
    /// Pool cannot satisfy the request
    Liquidity,
    /// Balance or allowance check failed on an asset pull
    Transfer,
    /// Fixed-point overflow or division by a zero reserve
    Arithmetic,
    /// Unknown market identifier
    NotFound,
}

/// Every failure the engine can surface. One operation, one error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MarketError {
    // ----- validation -----
    ZeroAmount,
    InvalidAmount(String),
    InvalidScale(u128),
    InvalidRisk(u8),

    // ----- state -----
    AlreadyResolved,
    NotResolved,
    AlreadyInitialized,

    // ----- liquidity -----
    InsufficientReserve,
    InsufficientLp { have: u128, need: u128 },
    InvalidRatio,
    InsufficientOutput,
    InsufficientLiquidityMinted,

    // ----- transfer -----
    InsufficientBalance { asset: String, have: u128, need: u128 },
    InsufficientAllowance { asset: String, have: u128, need: u128 },

    // ----- arithmetic -----
    Overflow,
    DivisionByZero,

    // ----- lookup -----
    MarketNotFound(String),
}

impl MarketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MarketError::ZeroAmount
            | MarketError::InvalidAmount(_)
            | MarketError::InvalidScale(_)
            | MarketError::InvalidRisk(_) => ErrorKind::Validation,
            MarketError::AlreadyResolved
            | MarketError::NotResolved
            | MarketError::AlreadyInitialized => ErrorKind::State,
            MarketError::InsufficientReserve
            | MarketError::InsufficientLp { .. }
            | MarketError::InvalidRatio
            | MarketError::InsufficientOutput
            | MarketError::InsufficientLiquidityMinted => ErrorKind::Liquidity,
            MarketError::InsufficientBalance { .. }
            | MarketError::InsufficientAllowance { .. } => ErrorKind::Transfer,
            MarketError::Overflow | MarketError::DivisionByZero => ErrorKind::Arithmetic,
            MarketError::MarketNotFound(_) => ErrorKind::NotFound,
        }
    }
}

impl std::fmt::Display for MarketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketError::ZeroAmount => write!(f, "Amount must be greater than zero"),
            MarketError::InvalidAmount(msg) => write!(f, "Invalid amount: {}", msg),
            MarketError::InvalidScale(scale) => {
                write!(f, "Invalid scale {}: must be within [0, 1e18]", scale)
            }
            MarketError::InvalidRisk(risk) => {
                write!(f, "Invalid risk {}%: must be within [0, 100)", risk)
            }
            MarketError::AlreadyResolved => write!(f, "Vault already resolved"),
            MarketError::NotResolved => write!(f, "Vault not resolved yet"),
            MarketError::AlreadyInitialized => write!(f, "Market already initialized"),
            MarketError::InsufficientReserve => write!(f, "Insufficient reserve in pool"),
            MarketError::InsufficientLp { have, need } => {
                write!(f, "Insufficient liquidity shares: have {}, need {}", have, need)
            }
            MarketError::InvalidRatio => write!(f, "Deposit does not match the reserve ratio"),
            MarketError::InsufficientOutput => write!(f, "Trade produces no output"),
            MarketError::InsufficientLiquidityMinted => {
                write!(f, "Deposit too small to mint liquidity shares")
            }
            MarketError::InsufficientBalance { asset, have, need } => {
                write!(f, "Insufficient {} balance: have {}, need {}", asset, have, need)
            }
            MarketError::InsufficientAllowance { asset, have, need } => {
                write!(f, "Insufficient {} allowance: have {}, need {}", asset, have, need)
            }
            MarketError::Overflow => write!(f, "Fixed-point overflow"),
            MarketError::DivisionByZero => write!(f, "Division by zero reserve"),
            MarketError::MarketNotFound(id) => write!(f, "Market not found: {}", id),
        }
    }
}

impl std::error::Error for MarketError {}
