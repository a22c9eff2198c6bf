// ============================================================================
// Router Session - scoped transaction over one market
// ============================================================================
//
// A session borrows the collateral ledger and one market instance for the
// length of a single operation:
//
//   open    -> checkpoint every component
//   ...     -> pull / mint / swap / deposit / burn on the router's account
//   sweep   -> forward every residual router balance to the caller
//   commit  -> make it permanent
//
// Dropping a session that was not committed (early `?` return, panic) rolls
// every component back to the checkpoint, so a failed call leaves no trace.
//
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::book::MarketInstance;
use crate::error::MarketError;
use crate::market::{MarketBackend, Reserves};
use crate::outcome::Side;
use crate::token::{TokenLedger, Transactional};

/// What a sweep forwarded to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swept {
    pub collateral: u128,
    pub si: u128,
    pub no: u128,
    pub shares: u128,
}

pub struct Session<'a, M: MarketBackend> {
    collateral: &'a mut TokenLedger,
    instance: &'a mut MarketInstance<M>,
    committed: bool,
}

impl<'a, M: MarketBackend> Session<'a, M> {
    pub fn open(collateral: &'a mut TokenLedger, instance: &'a mut MarketInstance<M>) -> Self {
        collateral.begin();
        instance.begin();
        Self {
            collateral,
            instance,
            committed: false,
        }
    }

    pub fn commit(mut self) {
        self.collateral.commit();
        self.instance.commit();
        self.committed = true;
    }

    pub fn instance(&self) -> &MarketInstance<M> {
        self.instance
    }

    pub fn instance_mut(&mut self) -> &mut MarketInstance<M> {
        self.instance
    }

    /// Both borrowed components, for operations the caller performs directly.
    pub fn parts(&mut self) -> (&mut TokenLedger, &mut MarketInstance<M>) {
        (&mut *self.collateral, &mut *self.instance)
    }

    pub fn reserves(&self) -> Reserves {
        self.instance.market.get_reserves()
    }

    /// Router balance of one side.
    pub fn holding(&self, side: Side) -> u128 {
        self.instance.tokens.balance_of(side, &self.instance.router)
    }

    // ========================================================================
    // PULLS (caller -> router, against the caller's allowance)
    // ========================================================================

    pub fn pull_collateral(&mut self, caller: &str, amount: u128) -> Result<(), MarketError> {
        let router = &self.instance.router;
        self.collateral.transfer_from(router, caller, router, amount)
    }

    pub fn pull_token(&mut self, side: Side, caller: &str, amount: u128) -> Result<(), MarketError> {
        let instance = &mut *self.instance;
        let router = &instance.router;
        instance.tokens.ledger_mut(side).transfer_from(router, caller, router, amount)
    }

    pub fn pull_shares(&mut self, caller: &str, amount: u128) -> Result<(), MarketError> {
        let instance = &mut *self.instance;
        let router = &instance.router;
        instance.market.shares_mut().transfer_from(router, caller, router, amount)
    }

    // ========================================================================
    // COMPONENT CALLS (router as the acting account)
    // ========================================================================

    /// Turn `amount` router collateral into an SI/NO pair.
    pub fn mint_pair(&mut self, amount: u128) -> Result<(), MarketError> {
        let instance = &mut *self.instance;
        self.collateral.approve(&instance.router, instance.vault.account(), amount);
        instance
            .vault
            .mint(self.collateral, &mut instance.tokens, &instance.router, amount)
    }

    /// Turn an SI/NO pair held by the router back into collateral.
    pub fn burn_pair(&mut self, amount: u128) -> Result<(), MarketError> {
        let instance = &mut *self.instance;
        instance
            .vault
            .burn(self.collateral, &mut instance.tokens, &instance.router, amount)
    }

    pub fn swap(&mut self, amount_in: u128, side_in: Side) -> Result<u128, MarketError> {
        let instance = &mut *self.instance;
        instance
            .market
            .swap(&mut instance.tokens, &instance.router, amount_in, side_in)
    }

    pub fn add_liquidity(&mut self, amount_si: u128, amount_no: u128) -> Result<u128, MarketError> {
        let instance = &mut *self.instance;
        instance
            .market
            .add_liquidity(&mut instance.tokens, &instance.router, amount_si, amount_no)
    }

    pub fn remove_liquidity(&mut self, lp_amount: u128) -> Result<(u128, u128), MarketError> {
        let instance = &mut *self.instance;
        instance
            .market
            .remove_liquidity(&mut instance.tokens, &instance.router, lp_amount)
    }

    // ========================================================================
    // SWEEP
    // ========================================================================

    /// Forward every router balance touched by the session to `caller`.
    pub fn sweep(&mut self, caller: &str) -> Result<Swept, MarketError> {
        let instance = &mut *self.instance;
        let router = instance.router.as_str();

        let collateral = self.collateral.balance_of(router);
        self.collateral.transfer(router, caller, collateral)?;

        let si = instance.tokens.si.balance_of(router);
        instance.tokens.si.transfer(router, caller, si)?;
        let no = instance.tokens.no.balance_of(router);
        instance.tokens.no.transfer(router, caller, no)?;

        let shares = instance.market.shares().balance_of(router);
        instance.market.shares_mut().transfer(router, caller, shares)?;

        // a mint approval the vault did not fully consume must not outlive the call
        self.collateral.approve(router, instance.vault.account(), 0);

        debug_assert_eq!(self.collateral.balance_of(router), 0);
        debug_assert_eq!(instance.tokens.si.balance_of(router), 0);
        debug_assert_eq!(instance.tokens.no.balance_of(router), 0);
        debug_assert_eq!(instance.market.shares().balance_of(router), 0);

        Ok(Swept { collateral, si, no, shares })
    }
}

impl<M: MarketBackend> Drop for Session<'_, M> {
    fn drop(&mut self) {
        if !self.committed {
            self.collateral.rollback();
            self.instance.rollback();
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
