// ============================================================================
// Vault Resolution Redemption
// ============================================================================
//
// After resolution each claim token redeems on its own:
//   SI -> floor(amount * scale / 1e18)
//   NO -> floor(amount * (1e18 - scale) / 1e18)
//
// Flooring keeps the sum of every possible claim at or below the collateral
// reserve, whatever the distribution of holders.
//
// ============================================================================

use super::CollateralVault;
use crate::error::MarketError;
use crate::fixed_point::{mul_div_floor, WAD};
use crate::outcome::{OutcomeTokens, Side};
use crate::token::TokenLedger;

impl CollateralVault {
    /// Collateral a claim of `amount` on `side` would pay right now.
    pub fn claim_payout(&self, amount: u128, side: Side) -> Result<u128, MarketError> {
        let rate = self.redemption_rate(side)?;
        mul_div_floor(amount, rate, WAD)
    }

    /// Burn `amount` of the caller's `side` token and pay its settled value.
    pub fn claim(
        &mut self,
        collateral: &mut TokenLedger,
        tokens: &mut OutcomeTokens,
        caller: &str,
        amount: u128,
        side: Side,
    ) -> Result<u128, MarketError> {
        if !self.resolved {
            return Err(MarketError::NotResolved);
        }
        if amount == 0 {
            return Err(MarketError::ZeroAmount);
        }
        let payout = self.claim_payout(amount, side)?;
        if payout > self.collateral_reserve {
            return Err(MarketError::InsufficientReserve);
        }

        tokens.ledger_mut(side).burn(caller, amount)?;
        collateral.transfer(&self.account, caller, payout)?;
        self.collateral_reserve -= payout;

        tracing::debug!(caller, amount, %side, payout, "vault claim");
        Ok(payout)
    }
}

// ============================================================================
// TESTS
// ============================================================================
