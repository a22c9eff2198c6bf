// ============================================================================
// Market Module - outcome-pair exchange
// ============================================================================
//
//   - pricing: closed-form constant-product solvers (swap, sell split, zap)
//   - cpmm:    the native constant-product SI/NO pool with liquidity shares
//
// The router only ever talks to a market through `MarketBackend`, so any
// exchange pool offering {swap, add_liquidity, remove_liquidity,
// get_reserves} over the same SI/NO ledgers can replace the native pool.
//
// ============================================================================

pub mod cpmm;
pub mod pricing;

pub use cpmm::*;

use serde::{Deserialize, Serialize};

use crate::error::MarketError;
use crate::outcome::{OutcomeTokens, Side};
use crate::token::{TokenLedger, Transactional};

/// SI / NO reserves of a pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserves {
    pub si: u128,
    pub no: u128,
}

impl Reserves {
    pub fn get(&self, side: Side) -> u128 {
        match side {
            Side::Si => self.si,
            Side::No => self.no,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.si == 0 || self.no == 0
    }
}

/// Capability set the router needs from an exchange pool.
///
/// Every method moves tokens on the caller's behalf: the trader or provider
/// named in the call is the account whose SI/NO or shares change hands.
pub trait MarketBackend: Transactional {
    fn get_reserves(&self) -> Reserves;

    /// Sell `amount_in` of `side_in` for the opposite side. Returns the output.
    fn swap(
        &mut self,
        tokens: &mut OutcomeTokens,
        trader: &str,
        amount_in: u128,
        side_in: Side,
    ) -> Result<u128, MarketError>;

    /// Deposit an SI/NO pair. Returns the liquidity shares minted to `provider`.
    fn add_liquidity(
        &mut self,
        tokens: &mut OutcomeTokens,
        provider: &str,
        amount_si: u128,
        amount_no: u128,
    ) -> Result<u128, MarketError>;

    /// Burn `lp_amount` shares of `provider`. Returns the (SI, NO) paid out.
    fn remove_liquidity(
        &mut self,
        tokens: &mut OutcomeTokens,
        provider: &str,
        lp_amount: u128,
    ) -> Result<(u128, u128), MarketError>;

    /// Liquidity-share token of this pool.
    fn shares(&self) -> &TokenLedger;

    fn shares_mut(&mut self) -> &mut TokenLedger;

    fn lp_supply(&self) -> u128 {
        self.shares().total_supply()
    }

    /// Check that the pool's bookkeeping agrees with the token ledgers.
    fn check_invariants(&self, tokens: &OutcomeTokens) -> Result<(), String>;
}
