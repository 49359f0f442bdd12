//! Storage footprint and the minimum-balance reserve it requires.

#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::asset::AssetId;
use crate::ledger::DEPOSIT_ENTRY_LEN;
use crate::{EscrowError, Result};

/// Number of boxes and total key+value bytes held by the contract.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Footprint {
    pub boxes: u64,
    pub bytes: u64,
}

impl Footprint {
    /// Footprint of a single box.
    pub fn single(key_len: usize, value_len: usize) -> Self {
        Self {
            boxes: 1,
            bytes: (key_len + value_len) as u64,
        }
    }

    pub fn checked_add(self, other: Self) -> Result<Self> {
        Ok(Self {
            boxes: self
                .boxes
                .checked_add(other.boxes)
                .ok_or(EscrowError::Overflow("storage footprint"))?,
            bytes: self
                .bytes
                .checked_add(other.bytes)
                .ok_or(EscrowError::Overflow("storage footprint"))?,
        })
    }

    pub fn checked_sub(self, other: Self) -> Result<Self> {
        Ok(Self {
            boxes: self
                .boxes
                .checked_sub(other.boxes)
                .ok_or(EscrowError::Overflow("storage footprint"))?,
            bytes: self
                .bytes
                .checked_sub(other.bytes)
                .ok_or(EscrowError::Overflow("storage footprint"))?,
        })
    }
}

/// Minimum-balance parameters of the settlement network.
///
/// Defaults are the Algorand consensus values.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageCosts {
    /// Base reserve of any account.
    pub account_min_balance: u64,
    /// Reserve per opted-in token.
    pub asset_min_balance: u64,
    /// Flat reserve per box.
    pub box_flat_min_balance: u64,
    /// Reserve per byte of box key and value.
    pub box_byte_min_balance: u64,
}

impl Default for StorageCosts {
    fn default() -> Self {
        Self {
            account_min_balance: 100_000,
            asset_min_balance: 100_000,
            box_flat_min_balance: 2_500,
            box_byte_min_balance: 400,
        }
    }
}

impl StorageCosts {
    /// Reserve required to keep `footprint` in storage.
    pub fn storage_reserve(&self, footprint: Footprint) -> Result<u64> {
        let flat = self
            .box_flat_min_balance
            .checked_mul(footprint.boxes)
            .ok_or(EscrowError::Overflow("box reserve"))?;
        let per_byte = self
            .box_byte_min_balance
            .checked_mul(footprint.bytes)
            .ok_or(EscrowError::Overflow("box reserve"))?;
        flat.checked_add(per_byte)
            .ok_or(EscrowError::Overflow("box reserve"))
    }

    /// Minimum balance of an account holding `holdings` tokens and `footprint` boxes.
    pub fn min_balance(&self, holdings: usize, footprint: Footprint) -> Result<u64> {
        let assets = self
            .asset_min_balance
            .checked_mul(holdings as u64)
            .ok_or(EscrowError::Overflow("minimum balance"))?;
        let storage = self.storage_reserve(footprint)?;
        self.account_min_balance
            .checked_add(assets)
            .and_then(|sum| sum.checked_add(storage))
            .ok_or(EscrowError::Overflow("minimum balance"))
    }

    /// Exact deposit required by `admit_asset` for `asset`: the reserve of a
    /// new deposit entry plus the holding reserve (the account base reserve
    /// when bootstrapping the native asset).
    pub fn admission_fee(&self, asset: AssetId) -> Result<u64> {
        let entry = self.storage_reserve(Footprint {
            boxes: 1,
            bytes: DEPOSIT_ENTRY_LEN,
        })?;
        let holding = if asset.is_native() {
            self.account_min_balance
        } else {
            self.asset_min_balance
        };
        holding
            .checked_add(entry)
            .ok_or(EscrowError::Overflow("admission fee"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_admission_fee() {
        let costs = StorageCosts::default();
        assert_eq!(costs.admission_fee(AssetId::NATIVE), Ok(109_300));
        assert_eq!(costs.admission_fee(AssetId(1234)), Ok(109_300));
    }

    #[test]
    fn min_balance_accumulates() {
        let costs = StorageCosts::default();
        assert_eq!(costs.min_balance(0, Footprint::default()), Ok(100_000));

        let footprint = Footprint::single(33, 424)
            .checked_add(Footprint::single(9, 8))
            .unwrap();
        assert_eq!(
            costs.min_balance(1, footprint),
            Ok(100_000 + 100_000 + 185_300 + 9_300)
        );
    }

    #[test]
    fn overflow_is_an_error() {
        let costs = StorageCosts {
            box_byte_min_balance: u64::MAX,
            ..StorageCosts::default()
        };
        assert!(costs.storage_reserve(Footprint::single(1, 1)).is_err());
        assert!(Footprint::default()
            .checked_sub(Footprint::single(1, 0))
            .is_err());
    }
}
