// ============================================================================
// Outcomes - SI / NO claim tokens
// ============================================================================
//
// Core invariant (pre-resolution):
//   1 SI + 1 NO = 1 collateral (always redeemable through the vault)
//
// SI pays `scale` per token at resolution, NO pays `1 - scale`.
//
// ============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::token::{TokenLedger, Transactional};

/// One side of the binary outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Si,
    No,
}

impl Side {
    pub fn opposite(&self) -> Self {
        match self {
            Side::Si => Side::No,
            Side::No => Side::Si,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Si => write!(f, "SI"),
            Side::No => write!(f, "NO"),
        }
    }
}

/// The pair of claim-token ledgers belonging to one market.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutcomeTokens {
    pub si: TokenLedger,
    pub no: TokenLedger,
}

impl OutcomeTokens {
    pub fn new(si_symbol: &str, no_symbol: &str) -> Self {
        Self {
            si: TokenLedger::new(si_symbol),
            no: TokenLedger::new(no_symbol),
        }
    }

    pub fn ledger(&self, side: Side) -> &TokenLedger {
        match side {
            Side::Si => &self.si,
            Side::No => &self.no,
        }
    }

    pub fn ledger_mut(&mut self, side: Side) -> &mut TokenLedger {
        match side {
            Side::Si => &mut self.si,
            Side::No => &mut self.no,
        }
    }

    pub fn balance_of(&self, side: Side, account: &str) -> u128 {
        self.ledger(side).balance_of(account)
    }
}

impl Transactional for OutcomeTokens {
    fn begin(&mut self) {
        self.si.begin();
        self.no.begin();
    }

    fn commit(&mut self) {
        self.si.commit();
        self.no.commit();
    }

    fn rollback(&mut self) {
        self.si.rollback();
        self.no.rollback();
    }
}
