//! Per-asset accounting of funds committed to open escrows.
//!
//! The entry for the native asset additionally accumulates the reserve
//! deposit of every open escrow, whatever asset the escrow itself holds.

use std::collections::BTreeMap;

#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::asset::AssetId;
use crate::error::LedgerError;
use crate::storage::Footprint;

/// Key prefix of a deposit entry box.
pub const DEPOSIT_KEY_PREFIX: u8 = b'd';

/// Storage key of the deposit entry for `asset`.
pub fn deposit_key(asset: AssetId) -> [u8; 9] {
    let mut key = [0u8; 9];
    key[0] = DEPOSIT_KEY_PREFIX;
    key[1..].copy_from_slice(&asset.0.to_be_bytes());
    key
}

/// Length of one stored deposit entry (key plus `u64` value).
pub const DEPOSIT_ENTRY_LEN: u64 = (9 + std::mem::size_of::<u64>()) as u64;

/// Mapping from asset to the amount encumbered by open escrows.
///
/// Entries are created once on admission and never removed.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepositLedger {
    entries: BTreeMap<AssetId, u64>,
}

impl DepositLedger {
    /// Creates the entry for `asset` at zero.
    pub fn initialize(&mut self, asset: AssetId) -> Result<(), LedgerError> {
        if self.entries.contains_key(&asset) {
            return Err(LedgerError::DuplicateEntry(asset));
        }
        self.entries.insert(asset, 0);
        debug!(%asset, "deposit entry initialized");
        Ok(())
    }

    pub fn credit(&mut self, asset: AssetId, amount: u64) -> Result<(), LedgerError> {
        let balance = self.get(asset)?;
        let updated = credited(asset, balance, amount)?;
        self.entries.insert(asset, updated);
        Ok(())
    }

    pub fn debit(&mut self, asset: AssetId, amount: u64) -> Result<(), LedgerError> {
        let balance = self.get(asset)?;
        let updated = debited(asset, balance, amount)?;
        self.entries.insert(asset, updated);
        Ok(())
    }

    /// Balance held by the contract for `asset` that no open escrow or
    /// required reserve accounts for: `actual_balance - reserve_floor - ledger[asset]`.
    pub fn excess(
        &self,
        asset: AssetId,
        actual_balance: u64,
        reserve_floor: u64,
    ) -> Result<u64, LedgerError> {
        let encumbered = self.get(asset)?;
        actual_balance
            .checked_sub(reserve_floor)
            .and_then(|free| free.checked_sub(encumbered))
            .ok_or(LedgerError::Underflow {
                asset,
                balance: actual_balance,
                amount: reserve_floor.saturating_add(encumbered),
            })
    }

    /// Current encumbered amount of `asset`.
    pub fn get(&self, asset: AssetId) -> Result<u64, LedgerError> {
        self.entries
            .get(&asset)
            .copied()
            .ok_or(LedgerError::MissingEntry(asset))
    }

    pub fn contains(&self, asset: AssetId) -> bool {
        self.entries.contains_key(&asset)
    }

    /// Iterates over `(asset, encumbered)` pairs in asset order.
    pub fn iter(&self) -> impl Iterator<Item = (AssetId, u64)> + '_ {
        self.entries.iter().map(|(asset, amount)| (*asset, *amount))
    }

    /// Storage occupied by the deposit entries.
    pub fn footprint(&self) -> Footprint {
        let boxes = self.entries.len() as u64;
        Footprint {
            boxes,
            bytes: boxes * DEPOSIT_ENTRY_LEN,
        }
    }

    /// Starts staging a set of credits and debits against the current state.
    pub fn batch(&self) -> LedgerBatch<'_> {
        LedgerBatch {
            ledger: self,
            pending: BTreeMap::new(),
        }
    }

    /// Commits a staged update. Cannot fail: every value was checked while staging.
    pub fn apply(&mut self, update: LedgerUpdate) {
        for (asset, amount) in update.pending {
            debug!(%asset, amount, "deposit entry updated");
            self.entries.insert(asset, amount);
        }
    }
}

/// Credits and debits staged against a [`DepositLedger`] without mutating it.
#[derive(Debug)]
pub struct LedgerBatch<'a> {
    ledger: &'a DepositLedger,
    pending: BTreeMap<AssetId, u64>,
}

impl LedgerBatch<'_> {
    pub fn credit(&mut self, asset: AssetId, amount: u64) -> Result<&mut Self, LedgerError> {
        let balance = self.current(asset)?;
        let updated = credited(asset, balance, amount)?;
        self.pending.insert(asset, updated);
        Ok(self)
    }

    pub fn debit(&mut self, asset: AssetId, amount: u64) -> Result<&mut Self, LedgerError> {
        let balance = self.current(asset)?;
        let updated = debited(asset, balance, amount)?;
        self.pending.insert(asset, updated);
        Ok(self)
    }

    /// Finishes staging, releasing the borrow of the ledger.
    pub fn finish(self) -> LedgerUpdate {
        LedgerUpdate {
            pending: self.pending,
        }
    }

    fn current(&self, asset: AssetId) -> Result<u64, LedgerError> {
        match self.pending.get(&asset) {
            Some(amount) => Ok(*amount),
            None => self.ledger.get(asset),
        }
    }
}

/// Checked ledger values ready to be committed with [`DepositLedger::apply`].
#[derive(Debug, Default)]
#[must_use = "a staged ledger update does nothing until applied"]
pub struct LedgerUpdate {
    pending: BTreeMap<AssetId, u64>,
}

fn credited(asset: AssetId, balance: u64, amount: u64) -> Result<u64, LedgerError> {
    balance.checked_add(amount).ok_or(LedgerError::Overflow {
        asset,
        balance,
        amount,
    })
}

fn debited(asset: AssetId, balance: u64, amount: u64) -> Result<u64, LedgerError> {
    balance.checked_sub(amount).ok_or(LedgerError::Underflow {
        asset,
        balance,
        amount,
    })
}
