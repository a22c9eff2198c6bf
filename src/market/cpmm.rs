// ============================================================================
// Outcome Pair Market - native constant-product pool
// ============================================================================
//
// Holds SI/NO reserves in its own account on the outcome ledgers and issues
// liquidity shares.
//
//   first deposit : shares = floor(sqrt(si * no)) - MINIMUM_LIQUIDITY
//                   (MINIMUM_LIQUIDITY is minted to a dead holder forever)
//   later deposit : pair must match the reserve ratio,
//                   shares = supply * min(si / R_si, no / R_no)
//   withdrawal    : pro-rata share of both reserves
//   swap          : fee-free x * y = k, rounding in favor of the pool
//
// ============================================================================

use serde::{Deserialize, Serialize};

use super::pricing::{ratio_matches, swap_output};
use super::{MarketBackend, Reserves};
use crate::error::MarketError;
use crate::fixed_point::{mul_div_floor, sqrt_floor, to_u128, U256};
use crate::outcome::{OutcomeTokens, Side};
use crate::token::{TokenLedger, Transactional};

/// Shares locked on the first deposit; guards against share-price inflation
/// by the first depositor.
pub const MINIMUM_LIQUIDITY: u128 = 1_000;

/// Holder of the permanently locked minimum liquidity
pub const LOCKED_LIQUIDITY_HOLDER: &str = "locked-liquidity";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomePairMarket {
    /// Account holding the reserves on the SI/NO ledgers
    account: String,
    reserves: Reserves,
    shares: TokenLedger,
    #[serde(skip)]
    saved: Option<Reserves>,
}

impl OutcomePairMarket {
    pub fn new(account: impl Into<String>, share_symbol: &str) -> Self {
        Self {
            account: account.into(),
            reserves: Reserves::default(),
            shares: TokenLedger::new(share_symbol),
            saved: None,
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    fn require_balance(tokens: &OutcomeTokens, side: Side, holder: &str, need: u128) -> Result<(), MarketError> {
        let ledger = tokens.ledger(side);
        let have = ledger.balance_of(holder);
        if have < need {
            return Err(MarketError::InsufficientBalance {
                asset: ledger.symbol().to_string(),
                have,
                need,
            });
        }
        Ok(())
    }

    fn shares_for_deposit(&self, amount_si: u128, amount_no: u128) -> Result<u128, MarketError> {
        let supply = self.shares.total_supply();
        if supply == 0 {
            let liquidity = to_u128(sqrt_floor(U256::from(amount_si) * U256::from(amount_no)))?;
            if liquidity <= MINIMUM_LIQUIDITY {
                return Err(MarketError::InsufficientLiquidityMinted);
            }
            return Ok(liquidity - MINIMUM_LIQUIDITY);
        }
        if !ratio_matches(amount_si, amount_no, self.reserves) {
            return Err(MarketError::InvalidRatio);
        }
        let by_si = mul_div_floor(amount_si, supply, self.reserves.si)?;
        let by_no = mul_div_floor(amount_no, supply, self.reserves.no)?;
        let minted = by_si.min(by_no);
        if minted == 0 {
            return Err(MarketError::InsufficientLiquidityMinted);
        }
        Ok(minted)
    }
}

impl MarketBackend for OutcomePairMarket {
    fn get_reserves(&self) -> Reserves {
        self.reserves
    }

    fn swap(
        &mut self,
        tokens: &mut OutcomeTokens,
        trader: &str,
        amount_in: u128,
        side_in: Side,
    ) -> Result<u128, MarketError> {
        let side_out = side_in.opposite();
        let reserve_in = self.reserves.get(side_in);
        let reserve_out = self.reserves.get(side_out);

        let amount_out = swap_output(reserve_in, reserve_out, amount_in)?;
        if amount_out == 0 {
            return Err(MarketError::InsufficientOutput);
        }
        let new_in = reserve_in.checked_add(amount_in).ok_or(MarketError::Overflow)?;
        let new_out = reserve_out - amount_out;

        tokens.ledger_mut(side_in).transfer(trader, &self.account, amount_in)?;
        tokens.ledger_mut(side_out).transfer(&self.account, trader, amount_out)?;

        debug_assert!(
            U256::from(new_in) * U256::from(new_out) >= U256::from(reserve_in) * U256::from(reserve_out)
        );
        match side_in {
            Side::Si => self.reserves = Reserves { si: new_in, no: new_out },
            Side::No => self.reserves = Reserves { si: new_out, no: new_in },
        }

        tracing::debug!(trader, %side_in, amount_in, amount_out, "pool swap");
        Ok(amount_out)
    }

    fn add_liquidity(
        &mut self,
        tokens: &mut OutcomeTokens,
        provider: &str,
        amount_si: u128,
        amount_no: u128,
    ) -> Result<u128, MarketError> {
        if amount_si == 0 || amount_no == 0 {
            return Err(MarketError::ZeroAmount);
        }
        let seeding = self.shares.total_supply() == 0;
        let minted = self.shares_for_deposit(amount_si, amount_no)?;
        let new_reserves = Reserves {
            si: self.reserves.si.checked_add(amount_si).ok_or(MarketError::Overflow)?,
            no: self.reserves.no.checked_add(amount_no).ok_or(MarketError::Overflow)?,
        };
        Self::require_balance(tokens, Side::Si, provider, amount_si)?;
        Self::require_balance(tokens, Side::No, provider, amount_no)?;

        tokens.si.transfer(provider, &self.account, amount_si)?;
        tokens.no.transfer(provider, &self.account, amount_no)?;
        if seeding {
            self.shares.mint(LOCKED_LIQUIDITY_HOLDER, MINIMUM_LIQUIDITY)?;
        }
        self.shares.mint(provider, minted)?;
        self.reserves = new_reserves;

        tracing::debug!(provider, amount_si, amount_no, minted, "pool add liquidity");
        Ok(minted)
    }

    fn remove_liquidity(
        &mut self,
        tokens: &mut OutcomeTokens,
        provider: &str,
        lp_amount: u128,
    ) -> Result<(u128, u128), MarketError> {
        if lp_amount == 0 {
            return Err(MarketError::ZeroAmount);
        }
        let have = self.shares.balance_of(provider);
        if have < lp_amount {
            return Err(MarketError::InsufficientLp { have, need: lp_amount });
        }
        let supply = self.shares.total_supply();
        let out_si = mul_div_floor(self.reserves.si, lp_amount, supply)?;
        let out_no = mul_div_floor(self.reserves.no, lp_amount, supply)?;

        self.shares.burn(provider, lp_amount)?;
        tokens.si.transfer(&self.account, provider, out_si)?;
        tokens.no.transfer(&self.account, provider, out_no)?;
        self.reserves = Reserves {
            si: self.reserves.si - out_si,
            no: self.reserves.no - out_no,
        };

        tracing::debug!(provider, lp_amount, out_si, out_no, "pool remove liquidity");
        Ok((out_si, out_no))
    }

    fn shares(&self) -> &TokenLedger {
        &self.shares
    }

    fn shares_mut(&mut self) -> &mut TokenLedger {
        &mut self.shares
    }

    fn check_invariants(&self, tokens: &OutcomeTokens) -> Result<(), String> {
        for side in [Side::Si, Side::No] {
            let held = tokens.balance_of(side, &self.account);
            if held != self.reserves.get(side) {
                return Err(format!(
                    "pool holds {} {} but tracks a reserve of {}",
                    held,
                    side,
                    self.reserves.get(side)
                ));
            }
        }
        if self.shares.sum_of_balances() != self.shares.total_supply() {
            return Err("liquidity share balances do not add up to supply".to_string());
        }
        if self.shares.total_supply() > 0 && self.reserves.is_empty() {
            return Err("shares outstanding against an empty pool".to_string());
        }
        Ok(())
    }
}

impl Transactional for OutcomePairMarket {
    fn begin(&mut self) {
        self.saved = Some(self.reserves);
        self.shares.begin();
    }

    fn commit(&mut self) {
        self.saved = None;
        self.shares.commit();
    }

    fn rollback(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.reserves = saved;
        }
        self.shares.rollback();
    }
}

// ============================================================================
// TESTS
// ============================================================================
