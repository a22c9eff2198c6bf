// ============================================================================
// Collateral Vault
// ============================================================================
//
// Custody of the collateral backing one market and the 1:1 relationship
// between collateral and SI/NO pairs.
//
//   mint  : c collateral in        -> c SI + c NO out
//   burn  : c SI + c NO in         -> c collateral out     (pre-resolution)
//   claim : a SI (or NO) in        -> floor(a * rate) out  (post-resolution)
//
// Resolution fixes `scale` once and for all. SI redeems at `scale`, NO at
// `1 - scale`, both floored so the aggregate payout can never exceed the
// collateral held.
//
// ============================================================================

pub mod mint;
pub mod redeem;

use serde::{Deserialize, Serialize};

use crate::error::MarketError;
use crate::fixed_point::{mul_div_floor, WAD};
use crate::outcome::{OutcomeTokens, Side};
use crate::token::{TokenLedger, Transactional};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct VaultCheckpoint {
    collateral_reserve: u128,
    resolved: bool,
    scale: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateralVault {
    /// Account holding the vault's collateral on the collateral ledger
    account: String,
    collateral_reserve: u128,
    resolved: bool,
    /// Settlement ratio for SI, 1e18 = 1.0. Meaningless until resolved.
    scale: u128,
    #[serde(skip)]
    saved: Option<VaultCheckpoint>,
}

impl CollateralVault {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            collateral_reserve: 0,
            resolved: false,
            scale: 0,
            saved: None,
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn collateral_reserve(&self) -> u128 {
        self.collateral_reserve
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// `Some(scale)` once resolved.
    pub fn scale(&self) -> Option<u128> {
        self.resolved.then_some(self.scale)
    }

    /// Resolve the market with a settlement ratio in [0, 1e18].
    ///
    /// Callable exactly once. Authorization of the caller is the
    /// responsibility of whoever holds the vault.
    pub fn resolve(&mut self, scale: u128) -> Result<(), MarketError> {
        if self.resolved {
            return Err(MarketError::AlreadyResolved);
        }
        if scale > WAD {
            return Err(MarketError::InvalidScale(scale));
        }
        self.resolved = true;
        self.scale = scale;
        Ok(())
    }

    /// Collateral paid per claim token of `side`, 1e18 = 1.0.
    pub fn redemption_rate(&self, side: Side) -> Result<u128, MarketError> {
        if !self.resolved {
            return Err(MarketError::NotResolved);
        }
        Ok(match side {
            Side::Si => self.scale,
            Side::No => WAD - self.scale,
        })
    }

    /// Verify the custody invariants against the ledgers.
    ///
    /// Pre-resolution: reserve == supply(SI) == supply(NO) == collateral held.
    /// Post-resolution: redeeming every outstanding token fits in the reserve.
    pub fn check_invariants(
        &self,
        collateral: &TokenLedger,
        tokens: &OutcomeTokens,
    ) -> Result<(), String> {
        let held = collateral.balance_of(&self.account);
        if held != self.collateral_reserve {
            return Err(format!(
                "vault holds {} collateral but tracks a reserve of {}",
                held, self.collateral_reserve
            ));
        }
        let si_supply = tokens.si.total_supply();
        let no_supply = tokens.no.total_supply();
        if !self.resolved {
            if si_supply != no_supply || si_supply != self.collateral_reserve {
                return Err(format!(
                    "unbalanced vault: reserve {}, SI supply {}, NO supply {}",
                    self.collateral_reserve, si_supply, no_supply
                ));
            }
            return Ok(());
        }
        let owed_si = mul_div_floor(si_supply, self.scale, WAD).map_err(|e| e.to_string())?;
        let owed_no = mul_div_floor(no_supply, WAD - self.scale, WAD).map_err(|e| e.to_string())?;
        if owed_si + owed_no > self.collateral_reserve {
            return Err(format!(
                "outstanding claims {} exceed reserve {}",
                owed_si + owed_no,
                self.collateral_reserve
            ));
        }
        Ok(())
    }
}

impl Transactional for CollateralVault {
    fn begin(&mut self) {
        self.saved = Some(VaultCheckpoint {
            collateral_reserve: self.collateral_reserve,
            resolved: self.resolved,
            scale: self.scale,
        });
    }

    fn commit(&mut self) {
        self.saved = None;
    }

    fn rollback(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.collateral_reserve = saved.collateral_reserve;
            self.resolved = saved.resolved;
            self.scale = saved.scale;
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_once() {
        let mut vault = CollateralVault::new("vault");
        assert_eq!(vault.scale(), None);

        vault.resolve(WAD / 2).unwrap();
        assert!(vault.is_resolved());
        assert_eq!(vault.scale(), Some(WAD / 2));

        assert_eq!(vault.resolve(0), Err(MarketError::AlreadyResolved));
        assert_eq!(vault.scale(), Some(WAD / 2));
    }

    #[test]
    fn test_resolve_rejects_scale_above_one() {
        let mut vault = CollateralVault::new("vault");
        assert_eq!(vault.resolve(WAD + 1), Err(MarketError::InvalidScale(WAD + 1)));
        assert!(!vault.is_resolved());
        vault.resolve(WAD).unwrap();
    }

    #[test]
    fn test_redemption_rates_are_complementary() {
        let mut vault = CollateralVault::new("vault");
        assert_eq!(vault.redemption_rate(Side::Si), Err(MarketError::NotResolved));
        vault.resolve(800_000_000_000_000_000).unwrap();
        assert_eq!(vault.redemption_rate(Side::Si).unwrap(), 800_000_000_000_000_000);
        assert_eq!(vault.redemption_rate(Side::No).unwrap(), 200_000_000_000_000_000);
    }

    #[test]
    fn test_rollback_unresolves() {
        let mut vault = CollateralVault::new("vault");
        vault.begin();
        vault.resolve(WAD).unwrap();
        vault.rollback();
        assert!(!vault.is_resolved());
    }
}
