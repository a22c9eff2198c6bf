// ============================================================================
// Token Ledger - in-memory fungible asset
// ============================================================================
//
// Stand-in for the external fungible-token standard. The engine only relies
// on balance_of / transfer / transfer_from / approve, plus issuer-side mint
// and burn for the claim tokens and liquidity shares.
//
// Every mutation validates first and writes second, so a failed call leaves
// the ledger untouched. On top of that a ledger can be put in journaling mode
// (begin) so that a multi-step operation spanning several ledgers can be
// undone as a unit (rollback) or made permanent (commit).
//
// ============================================================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::MarketError;

/// Checkpointing contract shared by every stateful component.
///
/// `begin` opens a checkpoint, `rollback` restores the state captured at
/// `begin`, `commit` discards it. Checkpoints do not nest.
pub trait Transactional {
    fn begin(&mut self);
    fn commit(&mut self);
    fn rollback(&mut self);
}

/// Previous value of a single cell, recorded before it is overwritten.
#[derive(Debug, Clone)]
enum Undo {
    Balance(String, u128),
    Allowance(String, String, u128),
    Supply(u128),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenLedger {
    symbol: String,
    balances: HashMap<String, u128>,
    /// owner -> spender -> remaining allowance
    allowances: HashMap<String, HashMap<String, u128>>,
    total_supply: u128,
    #[serde(skip)]
    journal: Option<Vec<Undo>>,
}

impl TokenLedger {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn balance_of(&self, account: &str) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn allowance(&self, owner: &str, spender: &str) -> u128 {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of every holder's balance. Equals `total_supply` at all times.
    pub fn sum_of_balances(&self) -> u128 {
        self.balances.values().sum()
    }

    // ========================================================================
    // CAPABILITY SET
    // ========================================================================

    pub fn approve(&mut self, owner: &str, spender: &str, amount: u128) {
        self.set_allowance(owner, spender, amount);
    }

    pub fn transfer(&mut self, from: &str, to: &str, amount: u128) -> Result<(), MarketError> {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(MarketError::InsufficientBalance {
                asset: self.symbol.clone(),
                have: from_balance,
                need: amount,
            });
        }
        if from == to || amount == 0 {
            return Ok(());
        }
        let to_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(MarketError::Overflow)?;
        self.set_balance(from, from_balance - amount);
        self.set_balance(to, to_balance);
        Ok(())
    }

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming allowance.
    pub fn transfer_from(
        &mut self,
        spender: &str,
        from: &str,
        to: &str,
        amount: u128,
    ) -> Result<(), MarketError> {
        let allowed = self.allowance(from, spender);
        if allowed < amount {
            return Err(MarketError::InsufficientAllowance {
                asset: self.symbol.clone(),
                have: allowed,
                need: amount,
            });
        }
        self.transfer(from, to, amount)?;
        self.set_allowance(from, spender, allowed - amount);
        Ok(())
    }

    // ========================================================================
    // ISSUER SIDE
    // ========================================================================

    pub fn mint(&mut self, to: &str, amount: u128) -> Result<(), MarketError> {
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(MarketError::Overflow)?;
        let balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(MarketError::Overflow)?;
        self.set_supply(supply);
        self.set_balance(to, balance);
        Ok(())
    }

    pub fn burn(&mut self, from: &str, amount: u128) -> Result<(), MarketError> {
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(MarketError::InsufficientBalance {
                asset: self.symbol.clone(),
                have: balance,
                need: amount,
            });
        }
        self.set_balance(from, balance - amount);
        self.set_supply(self.total_supply - amount);
        Ok(())
    }

    // ========================================================================
    // JOURNALED WRITES
    // ========================================================================

    fn set_balance(&mut self, account: &str, value: u128) {
        let previous = self.balance_of(account);
        if let Some(journal) = self.journal.as_mut() {
            journal.push(Undo::Balance(account.to_string(), previous));
        }
        self.write_balance(account, value);
    }

    fn set_allowance(&mut self, owner: &str, spender: &str, value: u128) {
        if let Some(journal) = self.journal.as_mut() {
            let previous = self
                .allowances
                .get(owner)
                .and_then(|spenders| spenders.get(spender))
                .copied()
                .unwrap_or(0);
            journal.push(Undo::Allowance(owner.to_string(), spender.to_string(), previous));
        }
        self.write_allowance(owner, spender, value);
    }

    fn set_supply(&mut self, value: u128) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(Undo::Supply(self.total_supply));
        }
        self.total_supply = value;
    }

    fn write_balance(&mut self, account: &str, value: u128) {
        if value == 0 {
            self.balances.remove(account);
        } else {
            self.balances.insert(account.to_string(), value);
        }
    }

    fn write_allowance(&mut self, owner: &str, spender: &str, value: u128) {
        if value == 0 {
            if let Some(spenders) = self.allowances.get_mut(owner) {
                spenders.remove(spender);
                if spenders.is_empty() {
                    self.allowances.remove(owner);
                }
            }
        } else {
            self.allowances
                .entry(owner.to_string())
                .or_default()
                .insert(spender.to_string(), value);
        }
    }
}

impl Transactional for TokenLedger {
    fn begin(&mut self) {
        self.journal = Some(Vec::new());
    }

    fn commit(&mut self) {
        self.journal = None;
    }

    fn rollback(&mut self) {
        let Some(journal) = self.journal.take() else {
            return;
        };
        for undo in journal.into_iter().rev() {
            match undo {
                Undo::Balance(account, value) => self.write_balance(&account, value),
                Undo::Allowance(owner, spender, value) => {
                    self.write_allowance(&owner, &spender, value)
                }
                Undo::Supply(value) => self.total_supply = value,
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn funded() -> TokenLedger {
        let mut ledger = TokenLedger::new("USDC");
        ledger.mint("alice", 100).unwrap();
        ledger
    }

    #[test]
    fn test_transfer_moves_balance() {
        let mut ledger = funded();
        ledger.transfer("alice", "bob", 40).unwrap();
        assert_eq!(ledger.balance_of("alice"), 60);
        assert_eq!(ledger.balance_of("bob"), 40);
        assert_eq!(ledger.total_supply(), 100);
        assert_eq!(ledger.sum_of_balances(), 100);
    }

    #[test]
    fn test_transfer_insufficient_balance_changes_nothing() {
        let mut ledger = funded();
        let err = ledger.transfer("alice", "bob", 101).unwrap_err();
        assert_eq!(
            err,
            MarketError::InsufficientBalance { asset: "USDC".into(), have: 100, need: 101 }
        );
        assert_eq!(ledger.balance_of("alice"), 100);
        assert_eq!(ledger.balance_of("bob"), 0);
    }

    #[test]
    fn test_transfer_from_consumes_allowance() {
        let mut ledger = funded();
        ledger.approve("alice", "router", 50);

        ledger.transfer_from("router", "alice", "router", 30).unwrap();
        assert_eq!(ledger.allowance("alice", "router"), 20);
        assert_eq!(ledger.balance_of("router"), 30);

        let err = ledger.transfer_from("router", "alice", "router", 21).unwrap_err();
        assert!(matches!(err, MarketError::InsufficientAllowance { have: 20, need: 21, .. }));
    }

    #[test]
    fn test_transfer_from_checks_balance_before_allowance_is_spent() {
        let mut ledger = funded();
        ledger.approve("alice", "router", 500);
        assert!(ledger.transfer_from("router", "alice", "router", 200).is_err());
        assert_eq!(ledger.allowance("alice", "router"), 500);
    }

    #[test]
    fn test_burn() {
        let mut ledger = funded();
        ledger.burn("alice", 25).unwrap();
        assert_eq!(ledger.total_supply(), 75);
        assert!(ledger.burn("alice", 76).is_err());
    }

    #[test]
    fn test_rollback_restores_every_cell() {
        let mut ledger = funded();
        ledger.approve("alice", "router", 10);

        ledger.begin();
        ledger.transfer_from("router", "alice", "bob", 10).unwrap();
        ledger.mint("carol", 5).unwrap();
        ledger.burn("alice", 90).unwrap();
        ledger.rollback();

        assert_eq!(ledger.balance_of("alice"), 100);
        assert_eq!(ledger.balance_of("bob"), 0);
        assert_eq!(ledger.balance_of("carol"), 0);
        assert_eq!(ledger.allowance("alice", "router"), 10);
        assert_eq!(ledger.total_supply(), 100);
        assert_eq!(ledger.sum_of_balances(), 100);
    }

    #[test]
    fn test_commit_keeps_changes() {
        let mut ledger = funded();
        ledger.begin();
        ledger.transfer("alice", "bob", 1).unwrap();
        ledger.commit();
        ledger.rollback();
        assert_eq!(ledger.balance_of("bob"), 1);
    }
}
