//! Keyed store of open escrow records.

use std::collections::BTreeMap;

#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::escrow::{record_key, EscrowRecord};
use crate::hash::SecretHash;
use crate::storage::Footprint;
use crate::{EscrowError, Result};

/// One record per open escrow, keyed by secret hash.
///
/// Presence of a key is the only source of truth for "this escrow is open".
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EscrowStore {
    records: BTreeMap<SecretHash, EscrowRecord>,
    footprint: Footprint,
}

impl EscrowStore {
    pub fn exists(&self, hash: &SecretHash) -> bool {
        self.records.contains_key(hash)
    }

    /// Inserts `record` under its secret hash.
    ///
    /// # Errors
    ///
    /// [`EscrowError::DuplicateEscrow`] if the key is taken.
    pub fn put(&mut self, record: EscrowRecord) -> Result<()> {
        let hash = record.secret_hash;
        if self.exists(&hash) {
            return Err(EscrowError::DuplicateEscrow(hash));
        }
        let footprint = self.footprint.checked_add(Self::record_footprint(&record)?)?;
        self.records.insert(hash, record);
        self.footprint = footprint;
        Ok(())
    }

    /// Overwrites the open record stored under `record.secret_hash`,
    /// returning the previous one.
    ///
    /// # Errors
    ///
    /// [`EscrowError::NotFound`] if no such escrow is open.
    pub fn replace(&mut self, record: EscrowRecord) -> Result<EscrowRecord> {
        let hash = record.secret_hash;
        let previous = self.get(&hash)?;
        let footprint = self
            .footprint
            .checked_sub(Self::record_footprint(previous)?)?
            .checked_add(Self::record_footprint(&record)?)?;
        let previous = self
            .records
            .insert(hash, record)
            .ok_or(EscrowError::NotFound(hash))?;
        self.footprint = footprint;
        Ok(previous)
    }

    pub fn get(&self, hash: &SecretHash) -> Result<&EscrowRecord> {
        self.records.get(hash).ok_or(EscrowError::NotFound(*hash))
    }

    /// Removes and returns the record for `hash`.
    pub fn delete(&mut self, hash: &SecretHash) -> Result<EscrowRecord> {
        let record = self.get(hash)?;
        let footprint = self.footprint.checked_sub(Self::record_footprint(record)?)?;
        let record = self
            .records
            .remove(hash)
            .ok_or(EscrowError::NotFound(*hash))?;
        self.footprint = footprint;
        Ok(record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Storage occupied by the records.
    pub fn footprint(&self) -> Footprint {
        self.footprint
    }

    /// Storage one record box occupies: prefixed key plus encoded record.
    pub fn record_footprint(record: &EscrowRecord) -> Result<Footprint> {
        let key_len = record_key(&record.secret_hash).len();
        Ok(Footprint::single(key_len, record.encoded_len()?))
    }

    pub fn iter(&self) -> impl Iterator<Item = &EscrowRecord> {
        self.records.values()
    }
}
