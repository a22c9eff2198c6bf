// ============================================================================
// Vault Minting & Paired Burning
// ============================================================================
//
//   mint(c) : pull c collateral from caller, credit c SI + c NO
//   burn(c) : take c SI + c NO from caller, pay c collateral   (pre-resolution)
//
// The collateral pull goes through `transfer_from`, so the caller must have
// approved the vault account first.
//
// ============================================================================

use super::CollateralVault;
use crate::error::MarketError;
use crate::outcome::{OutcomeTokens, Side};
use crate::token::TokenLedger;

impl CollateralVault {
    /// Lock `amount` collateral and credit the caller with an equal SI/NO pair.
    pub fn mint(
        &mut self,
        collateral: &mut TokenLedger,
        tokens: &mut OutcomeTokens,
        caller: &str,
        amount: u128,
    ) -> Result<(), MarketError> {
        if amount == 0 {
            return Err(MarketError::ZeroAmount);
        }
        let reserve = self
            .collateral_reserve
            .checked_add(amount)
            .ok_or(MarketError::Overflow)?;

        collateral.transfer_from(&self.account, caller, &self.account, amount)?;
        tokens.si.mint(caller, amount)?;
        tokens.no.mint(caller, amount)?;
        self.collateral_reserve = reserve;

        tracing::debug!(caller, amount, reserve, "vault mint");
        Ok(())
    }

    /// Burn an equal SI/NO pair from the caller and return the collateral.
    pub fn burn(
        &mut self,
        collateral: &mut TokenLedger,
        tokens: &mut OutcomeTokens,
        caller: &str,
        amount: u128,
    ) -> Result<(), MarketError> {
        if self.resolved {
            return Err(MarketError::AlreadyResolved);
        }
        if amount == 0 {
            return Err(MarketError::ZeroAmount);
        }
        for side in [Side::Si, Side::No] {
            let ledger = tokens.ledger(side);
            let have = ledger.balance_of(caller);
            if have < amount {
                return Err(MarketError::InsufficientBalance {
                    asset: ledger.symbol().to_string(),
                    have,
                    need: amount,
                });
            }
        }

        tokens.si.burn(caller, amount)?;
        tokens.no.burn(caller, amount)?;
        collateral.transfer(&self.account, caller, amount)?;
        self.collateral_reserve -= amount;

        tracing::debug!(caller, amount, reserve = self.collateral_reserve, "vault burn");
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
