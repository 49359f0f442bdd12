//! Participation key registration for the contract account.
//!
//! Lets the creator bring the contract's native balance online for consensus
//! rewards. Rewards accrue as excess; escrowed funds are never touched.

use bincode::error::EncodeError;
use bincode::Encode;
use ed25519_dalek::VerifyingKey;
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512_256};

use crate::error::KeyRegistrationError;

/// An online key registration issued on behalf of the contract account.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Encode)]
pub struct KeyRegistration {
    /// Ed25519 participation (vote) key.
    #[cfg_attr(feature = "json", serde(with = "hex::serde"))]
    pub vote_key: [u8; 32],
    /// VRF selection key.
    #[cfg_attr(feature = "json", serde(with = "hex::serde"))]
    pub selection_key: [u8; 32],
    #[cfg_attr(feature = "json", serde(with = "hex::serde"))]
    pub state_proof_key: [u8; 64],
    /// First round the keys are valid for.
    pub vote_first: u64,
    /// Last round the keys are valid for.
    pub vote_last: u64,
    pub vote_key_dilution: u64,
    /// Network fee, paid by the contract account.
    pub fee: u64,
}

impl KeyRegistration {
    pub fn validate(&self) -> Result<(), KeyRegistrationError> {
        VerifyingKey::from_bytes(&self.vote_key)
            .map_err(|_| KeyRegistrationError::InvalidVoteKey)?;
        if self.vote_first > self.vote_last {
            return Err(KeyRegistrationError::InvalidVoteRange {
                first: self.vote_first,
                last: self.vote_last,
            });
        }
        if self.vote_key_dilution == 0 {
            return Err(KeyRegistrationError::ZeroDilution);
        }
        Ok(())
    }

    /// Identifier of the registration transaction:
    /// `SHA-512/256("TX" || encoded registration)`.
    pub fn txn_id(&self) -> Result<[u8; 32], EncodeError> {
        let encoded = bincode::encode_to_vec(self, bincode::config::standard())?;
        let mut hasher = Sha512_256::new();
        hasher.update(b"TX");
        hasher.update(&encoded);
        Ok(hasher.finalize().into())
    }
}

/// Result of a submitted key registration.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRegistrationReceipt {
    #[cfg_attr(feature = "json", serde(with = "hex::serde"))]
    pub txn_id: [u8; 32],
    /// Fee paid from the contract's excess native balance.
    pub fee: u64,
}
