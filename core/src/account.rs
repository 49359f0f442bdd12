//! The escrow contract's own account on the settlement network.

use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::asset::{AssetId, Payout};
use crate::{EscrowError, Result};

/// Balances and token holdings of the contract account.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractAccount {
    balances: BTreeMap<AssetId, u64>,
    holdings: BTreeSet<AssetId>,
}

impl ContractAccount {
    /// Balance of `asset`; zero when nothing was ever received.
    pub fn balance(&self, asset: AssetId) -> u64 {
        self.balances.get(&asset).copied().unwrap_or_default()
    }

    /// Whether the account can hold `asset`. The native coin always can.
    pub fn holds(&self, asset: AssetId) -> bool {
        asset.is_native() || self.holdings.contains(&asset)
    }

    /// Number of opted-in tokens.
    pub fn holding_count(&self) -> usize {
        self.holdings.len()
    }

    /// Zero-amount self-transfer registering the account as a holder of `asset`.
    pub fn opt_in(&mut self, asset: AssetId) {
        if !asset.is_native() {
            self.holdings.insert(asset);
        }
    }

    /// Receives value that arrived outside any staged settlement.
    pub fn receive(&mut self, asset: AssetId, amount: u64) -> Result<()> {
        let update = self.stage(&[(asset, amount)], &[])?;
        self.apply(update);
        Ok(())
    }

    /// Checks `inbound` credits followed by `outbound` payouts against the
    /// current balances without applying them.
    pub fn stage(
        &self,
        inbound: &[(AssetId, u64)],
        outbound: &[Payout],
    ) -> Result<AccountUpdate> {
        let mut staged: BTreeMap<AssetId, u64> = BTreeMap::new();
        for (asset, amount) in inbound {
            let balance = staged
                .get(asset)
                .copied()
                .unwrap_or_else(|| self.balance(*asset));
            let updated = balance
                .checked_add(*amount)
                .ok_or(EscrowError::Overflow("contract balance"))?;
            staged.insert(*asset, updated);
        }
        for payout in outbound {
            let balance = staged
                .get(&payout.asset)
                .copied()
                .unwrap_or_else(|| self.balance(payout.asset));
            let updated = balance
                .checked_sub(payout.amount)
                .ok_or(EscrowError::InsufficientBalance {
                    asset: payout.asset,
                    balance,
                    amount: payout.amount,
                })?;
            staged.insert(payout.asset, updated);
        }
        Ok(AccountUpdate { balances: staged })
    }

    pub fn apply(&mut self, update: AccountUpdate) {
        self.balances.extend(update.balances);
    }

    /// Iterates over non-zero `(asset, balance)` pairs.
    pub fn balances(&self) -> impl Iterator<Item = (AssetId, u64)> + '_ {
        self.balances
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|(asset, amount)| (*asset, *amount))
    }
}

/// Checked balances ready to be committed with [`ContractAccount::apply`].
#[derive(Debug, Default)]
#[must_use = "a staged balance update does nothing until applied"]
pub struct AccountUpdate {
    balances: BTreeMap<AssetId, u64>,
}
