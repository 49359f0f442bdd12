//! Keccak-256 secret hashing and hashlock verification.

use bincode::{Decode, Encode};
#[cfg(feature = "json")]
use serde_with::{DeserializeFromStr, SerializeDisplay};
use sha3::{Digest, Keccak256};
use subtle::ConstantTimeEq;

use crate::EscrowError;

/// Keccak-256 digest of an escrow secret.
///
/// The digest gates release of the escrowed funds and doubles as the key of
/// the escrow record. The all-zero digest is reserved and never accepted by
/// `create`.
///
/// # Example
///
/// ```
/// use htlc_escrow_core::hash::make_hash;
///
/// let hash = make_hash(b"my-secret-preimage");
/// assert!(hash.verify(b"my-secret-preimage").is_ok());
/// assert!(hash.verify(b"another-preimage").is_err());
/// ```
#[cfg_attr(feature = "json", derive(SerializeDisplay, DeserializeFromStr))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode)]
pub struct SecretHash(pub [u8; 32]);

impl SecretHash {
    /// The reserved all-zero digest.
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Verifies that `keccak256(secret) == self` using constant-time comparison.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Mismatch`] if the computed hash does not match.
    pub fn verify(&self, secret: &[u8]) -> Result<(), Error> {
        let computed = make_hash(secret);
        computed
            .0
            .as_slice()
            .ct_eq(self.0.as_slice())
            .unwrap_u8()
            .eq(&1)
            .then_some(())
            .ok_or(Error::Mismatch)
    }
}

/// Computes the digest a depositor must supply to `create` for `secret`.
///
/// Pure and deterministic; clients use it to derive the secret hash and the
/// contract uses it to check claimed secrets.
pub fn make_hash(secret: &[u8]) -> SecretHash {
    SecretHash(Keccak256::digest(secret).into())
}

/// Errors from hashlock verification.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The provided secret did not hash to the expected value.
    #[error("keccak256(secret) != hash")]
    Mismatch,
}

impl From<Error> for EscrowError {
    fn from(_: Error) -> Self {
        EscrowError::SecretMismatch
    }
}

impl From<[u8; 32]> for SecretHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Display for SecretHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::str::FromStr for SecretHash {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}
