// ============================================================================
// Market Book - per-process side table of market instances
// ============================================================================
//
// Components never point at each other. A market instance bundles the vault,
// the SI/NO ledgers and the pool under an opaque id; the book maps ids to
// instances and owns the one collateral ledger they all share.
//
// Locking:
//   - one mutex per market: every operation on a market is serialized
//   - every mutating operation also holds the shared collateral ledger for
//     its whole session, so writes are serialized across markets too; market
//     views and quotes only take the market lock
//   - lock order is always market -> collateral
//   - a poisoned lock is taken over: sessions roll back on unwind, so the
//     state behind it is the last committed one
//
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::MarketError;
use crate::market::pricing::implied_probability;
use crate::market::{MarketBackend, OutcomePairMarket, Reserves};
use crate::outcome::{OutcomeTokens, Side};
use crate::router::{
    InitializeReceipt, LiquidityReceipt, MarketRouter, Quote, Session, TradeReceipt, WithdrawReceipt,
};
use crate::token::{TokenLedger, Transactional};
use crate::vault::CollateralVault;

pub type MarketId = Uuid;

// ============================================================================
// MARKET INSTANCE
// ============================================================================

/// Derived lifecycle of a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Components exist, pool not seeded yet
    Created,
    /// Pool seeded, trading and liquidity open
    Active,
    /// Scale fixed, no claim redeemed yet
    Resolved,
    /// Claims are being paid out of the vault
    Draining,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketInstance<M = OutcomePairMarket> {
    pub id: MarketId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Set by the first seeding of the pool; makes `initialize` one-shot
    pub initialized: bool,
    /// Account the router acts from for this market
    pub router: String,
    pub vault: CollateralVault,
    pub tokens: OutcomeTokens,
    pub market: M,
    #[serde(skip)]
    saved_initialized: Option<bool>,
}

impl MarketInstance<OutcomePairMarket> {
    pub fn new(name: &str, si_symbol: &str, no_symbol: &str) -> Self {
        let id = Uuid::new_v4();
        let pool = OutcomePairMarket::new(format!("pool:{}", id), &format!("{}{}-LP", si_symbol, no_symbol));
        Self::with_backend(id, name, si_symbol, no_symbol, pool)
    }
}

impl<M: MarketBackend> MarketInstance<M> {
    pub fn with_backend(id: MarketId, name: &str, si_symbol: &str, no_symbol: &str, market: M) -> Self {
        Self {
            id,
            name: name.to_string(),
            created_at: Utc::now(),
            initialized: false,
            router: format!("router:{}", id),
            vault: CollateralVault::new(format!("vault:{}", id)),
            tokens: OutcomeTokens::new(si_symbol, no_symbol),
            market,
            saved_initialized: None,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        if self.vault.is_resolved() {
            let reserve = self.vault.collateral_reserve();
            let untouched =
                self.tokens.si.total_supply() == reserve && self.tokens.no.total_supply() == reserve;
            if untouched {
                Lifecycle::Resolved
            } else {
                Lifecycle::Draining
            }
        } else if self.initialized {
            Lifecycle::Active
        } else {
            Lifecycle::Created
        }
    }

    /// Check every custody and pool invariant of this market.
    pub fn check_invariants(&self, collateral: &TokenLedger) -> Result<(), String> {
        self.vault.check_invariants(collateral, &self.tokens)?;
        self.market.check_invariants(&self.tokens)?;
        for side in [Side::Si, Side::No] {
            let ledger = self.tokens.ledger(side);
            if ledger.sum_of_balances() != ledger.total_supply() {
                return Err(format!("{} balances do not add up to supply", ledger.symbol()));
            }
            if ledger.balance_of(&self.router) != 0 {
                return Err(format!("router holds residual {}", ledger.symbol()));
            }
        }
        if collateral.balance_of(&self.router) != 0 || self.market.shares().balance_of(&self.router) != 0 {
            return Err("router holds residual collateral or shares".to_string());
        }
        Ok(())
    }
}

impl<M: MarketBackend> Transactional for MarketInstance<M> {
    fn begin(&mut self) {
        self.saved_initialized = Some(self.initialized);
        self.vault.begin();
        self.tokens.begin();
        self.market.begin();
    }

    fn commit(&mut self) {
        self.saved_initialized = None;
        self.vault.commit();
        self.tokens.commit();
        self.market.commit();
    }

    fn rollback(&mut self) {
        if let Some(initialized) = self.saved_initialized.take() {
            self.initialized = initialized;
        }
        self.vault.rollback();
        self.tokens.rollback();
        self.market.rollback();
    }
}

// ============================================================================
// VIEWS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketView {
    pub id: MarketId,
    pub name: String,
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub router_account: String,
    pub vault_account: String,
    pub si_symbol: String,
    pub no_symbol: String,
    pub reserves: Reserves,
    pub lp_supply: u128,
    /// Implied probability of SI, 1e18 = 100%
    pub implied_probability: Option<u128>,
    pub collateral_reserve: u128,
    pub si_supply: u128,
    pub no_supply: u128,
    pub scale: Option<u128>,
}

impl MarketView {
    fn of<M: MarketBackend>(instance: &MarketInstance<M>) -> Self {
        let reserves = instance.market.get_reserves();
        Self {
            id: instance.id,
            name: instance.name.clone(),
            lifecycle: instance.lifecycle(),
            created_at: instance.created_at,
            router_account: instance.router.clone(),
            vault_account: instance.vault.account().to_string(),
            si_symbol: instance.tokens.si.symbol().to_string(),
            no_symbol: instance.tokens.no.symbol().to_string(),
            reserves,
            lp_supply: instance.market.lp_supply(),
            implied_probability: implied_probability(reserves),
            collateral_reserve: instance.vault.collateral_reserve(),
            si_supply: instance.tokens.si.total_supply(),
            no_supply: instance.tokens.no.total_supply(),
            scale: instance.vault.scale(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    pub collateral: u128,
    pub si: u128,
    pub no: u128,
    pub lp: u128,
}

/// Assets an owner can grant an allowance on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Asset {
    Collateral,
    Si,
    No,
    Lp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub saved_at: DateTime<Utc>,
    pub collateral: TokenLedger,
    pub markets: Vec<MarketInstance>,
}

// ============================================================================
// MARKET BOOK
// ============================================================================

pub struct MarketBook {
    collateral: Mutex<TokenLedger>,
    markets: RwLock<HashMap<MarketId, Arc<Mutex<MarketInstance>>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MarketBook {
    pub fn new(collateral_symbol: &str) -> Self {
        Self {
            collateral: Mutex::new(TokenLedger::new(collateral_symbol)),
            markets: RwLock::new(HashMap::new()),
        }
    }

    pub fn create_market(&self, name: &str, si_symbol: &str, no_symbol: &str) -> MarketView {
        let instance = MarketInstance::new(name, si_symbol, no_symbol);
        let view = MarketView::of(&instance);
        self.markets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(instance.id, Arc::new(Mutex::new(instance)));
        info!(market = %view.id, name, "market created");
        view
    }

    fn market(&self, id: MarketId) -> Result<Arc<Mutex<MarketInstance>>, MarketError> {
        self.markets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or_else(|| MarketError::MarketNotFound(id.to_string()))
    }

    /// Run `op` with the market and the collateral ledger locked, logging the
    /// outcome. The collateral lock is held until `op` returns.
    fn execute<R>(
        &self,
        id: MarketId,
        action: &str,
        caller: &str,
        op: impl FnOnce(&mut TokenLedger, &mut MarketInstance) -> Result<R, MarketError>,
    ) -> Result<R, MarketError> {
        let market = self.market(id)?;
        let mut instance = lock(&market);
        let mut collateral = lock(&self.collateral);
        match op(&mut *collateral, &mut *instance) {
            Ok(result) => {
                info!(market = %id, action, caller, "committed");
                Ok(result)
            }
            Err(e) => {
                warn!(market = %id, action, caller, error = %e, "rejected");
                Err(e)
            }
        }
    }

    pub fn market_view(&self, id: MarketId) -> Result<MarketView, MarketError> {
        let market = self.market(id)?;
        let instance = lock(&market);
        Ok(MarketView::of(&*instance))
    }

    pub fn list_markets(&self) -> Vec<MarketView> {
        let markets: Vec<_> = self
            .markets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        let mut views: Vec<MarketView> = markets.iter().map(|m| MarketView::of(&*lock(m))).collect();
        views.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        views
    }

    // ========================================================================
    // ACCOUNTS
    // ========================================================================

    /// Issue collateral to `account`. Stands in for the external collateral
    /// issuer. Returns the new balance.
    pub fn fund(&self, account: &str, amount: u128) -> Result<u128, MarketError> {
        if amount == 0 {
            return Err(MarketError::ZeroAmount);
        }
        let mut collateral = lock(&self.collateral);
        collateral.mint(account, amount)?;
        info!(account, amount, "collateral issued");
        Ok(collateral.balance_of(account))
    }

    pub fn approve(
        &self,
        market: Option<MarketId>,
        asset: Asset,
        owner: &str,
        spender: &str,
        amount: u128,
    ) -> Result<(), MarketError> {
        if asset == Asset::Collateral {
            lock(&self.collateral).approve(owner, spender, amount);
            info!(owner, spender, amount, "collateral approval");
            return Ok(());
        }
        let id = market.ok_or_else(|| MarketError::MarketNotFound("missing market id".to_string()))?;
        let market = self.market(id)?;
        let mut instance = lock(&market);
        match asset {
            Asset::Si => instance.tokens.si.approve(owner, spender, amount),
            Asset::No => instance.tokens.no.approve(owner, spender, amount),
            Asset::Lp => instance.market.shares_mut().approve(owner, spender, amount),
            Asset::Collateral => {}
        }
        info!(market = %id, owner, spender, amount, ?asset, "token approval");
        Ok(())
    }

    pub fn balances(&self, id: MarketId, account: &str) -> Result<Balances, MarketError> {
        let market = self.market(id)?;
        let instance = lock(&market);
        let collateral = lock(&self.collateral);
        Ok(Balances {
            collateral: collateral.balance_of(account),
            si: instance.tokens.si.balance_of(account),
            no: instance.tokens.no.balance_of(account),
            lp: instance.market.shares().balance_of(account),
        })
    }

    pub fn collateral_balance(&self, account: &str) -> u128 {
        lock(&self.collateral).balance_of(account)
    }

    // ========================================================================
    // VAULT
    // ========================================================================

    /// Lock collateral for an SI/NO pair. The caller must have approved the
    /// market's vault account on the collateral ledger.
    pub fn mint(&self, id: MarketId, caller: &str, amount: u128) -> Result<(), MarketError> {
        self.execute(id, "mint", caller, |collateral, instance| {
            let mut session = Session::open(collateral, instance);
            let (collateral, instance) = session.parts();
            instance.vault.mint(collateral, &mut instance.tokens, caller, amount)?;
            session.commit();
            Ok(())
        })
    }

    pub fn burn(&self, id: MarketId, caller: &str, amount: u128) -> Result<(), MarketError> {
        self.execute(id, "burn", caller, |collateral, instance| {
            let mut session = Session::open(collateral, instance);
            let (collateral, instance) = session.parts();
            instance.vault.burn(collateral, &mut instance.tokens, caller, amount)?;
            session.commit();
            Ok(())
        })
    }

    /// Fix the settlement scale. Authorization is the caller's business.
    pub fn resolve(&self, id: MarketId, scale: u128) -> Result<(), MarketError> {
        self.execute(id, "resolve", "resolver", |_, instance| instance.vault.resolve(scale))
    }

    pub fn claim(&self, id: MarketId, caller: &str, amount: u128, side: Side) -> Result<u128, MarketError> {
        self.execute(id, "claim", caller, |collateral, instance| {
            let mut session = Session::open(collateral, instance);
            let (collateral, instance) = session.parts();
            let payout = instance
                .vault
                .claim(collateral, &mut instance.tokens, caller, amount, side)?;
            session.commit();
            Ok(payout)
        })
    }

    // ========================================================================
    // ROUTER
    // ========================================================================

    pub fn initialize(
        &self,
        id: MarketId,
        caller: &str,
        amount: u128,
        risk_percent: u8,
    ) -> Result<InitializeReceipt, MarketError> {
        self.execute(id, "initialize", caller, |collateral, instance| {
            MarketRouter::initialize(collateral, instance, caller, amount, risk_percent)
        })
    }

    pub fn buy(&self, id: MarketId, caller: &str, amount: u128, side: Side) -> Result<TradeReceipt, MarketError> {
        self.execute(id, "buy", caller, |collateral, instance| {
            MarketRouter::buy_side(collateral, instance, caller, amount, side)
        })
    }

    pub fn sell(&self, id: MarketId, caller: &str, amount: u128, side: Side) -> Result<TradeReceipt, MarketError> {
        self.execute(id, "sell", caller, |collateral, instance| {
            MarketRouter::sell_side(collateral, instance, caller, amount, side)
        })
    }

    pub fn add_liquidity(&self, id: MarketId, caller: &str, amount: u128) -> Result<LiquidityReceipt, MarketError> {
        self.execute(id, "add_liquidity", caller, |collateral, instance| {
            MarketRouter::add_liquidity(collateral, instance, caller, amount)
        })
    }

    pub fn add_liquidity_zap(
        &self,
        id: MarketId,
        caller: &str,
        amount: u128,
    ) -> Result<LiquidityReceipt, MarketError> {
        self.execute(id, "add_liquidity_zap", caller, |collateral, instance| {
            MarketRouter::add_liquidity_zap(collateral, instance, caller, amount)
        })
    }

    pub fn remove_liquidity(
        &self,
        id: MarketId,
        caller: &str,
        lp_amount: u128,
    ) -> Result<WithdrawReceipt, MarketError> {
        self.execute(id, "remove_liquidity", caller, |collateral, instance| {
            MarketRouter::remove_liquidity(collateral, instance, caller, lp_amount)
        })
    }

    pub fn remove_liquidity_zap(
        &self,
        id: MarketId,
        caller: &str,
        lp_amount: u128,
    ) -> Result<WithdrawReceipt, MarketError> {
        self.execute(id, "remove_liquidity_zap", caller, |collateral, instance| {
            MarketRouter::remove_liquidity_zap(collateral, instance, caller, lp_amount)
        })
    }

    pub fn quote_buy(&self, id: MarketId, amount: u128, side: Side) -> Result<Quote, MarketError> {
        let market = self.market(id)?;
        let reserves = lock(&market).market.get_reserves();
        MarketRouter::quote_buy(reserves, amount, side)
    }

    pub fn quote_sell(&self, id: MarketId, amount: u128, side: Side) -> Result<Quote, MarketError> {
        let market = self.market(id)?;
        let reserves = lock(&market).market.get_reserves();
        MarketRouter::quote_sell(reserves, amount, side)
    }

    pub fn check_invariants(&self, id: MarketId) -> Result<(), String> {
        let market = self.market(id).map_err(|e| e.to_string())?;
        let instance = lock(&market);
        let collateral = lock(&self.collateral);
        instance.check_invariants(&collateral)
    }

    // ========================================================================
    // SNAPSHOTS
    // ========================================================================

    /// Consistent copy of every market and the collateral ledger.
    pub fn snapshot(&self) -> BookSnapshot {
        let mut markets: Vec<(MarketId, Arc<Mutex<MarketInstance>>)> = self
            .markets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, market)| (*id, market.clone()))
            .collect();
        markets.sort_by_key(|(id, _)| *id);

        // every market lock first (in id order), then collateral
        let guards: Vec<_> = markets.iter().map(|(_, market)| lock(market)).collect();
        let collateral = lock(&self.collateral).clone();
        BookSnapshot {
            saved_at: Utc::now(),
            collateral,
            markets: guards.iter().map(|guard| (**guard).clone()).collect(),
        }
    }

    pub fn restore(snapshot: BookSnapshot) -> Self {
        let markets = snapshot
            .markets
            .into_iter()
            .map(|instance| (instance.id, Arc::new(Mutex::new(instance))))
            .collect();
        Self {
            collateral: Mutex::new(snapshot.collateral),
            markets: RwLock::new(markets),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
