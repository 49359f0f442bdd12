//! Identities of the parties and of the escrow contract itself.

use bincode::{Decode, Encode};
#[cfg(feature = "json")]
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::error::IdentityError;

/// A 32-byte account identity (public key or contract address).
#[cfg_attr(feature = "json", derive(SerializeDisplay, DeserializeFromStr))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode)]
pub struct Identity(pub [u8; 32]);

impl Identity {
    /// The all-zero identity. Never a valid explicit escrow recipient.
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Base58 rendering of the identity.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl From<[u8; 32]> for Identity {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::str::FromStr for Identity {
    type Err = IdentityError;

    /// Parses an identity from:
    /// - `0x`-prefixed hex,
    /// - bare 64-character hex,
    /// - base58.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(IdentityError::EmptyIdentity);
        }

        let bytes = if let Some(hex_str) = s.strip_prefix("0x") {
            hex::decode(hex_str)?
        } else if s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            hex::decode(s)?
        } else {
            bs58::decode(s).into_vec()?
        };

        let len = bytes.len();
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| IdentityError::InvalidLength(len))?;
        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use core::str::FromStr as _;

    use super::*;

    #[test]
    fn parse_hex() {
        let id = Identity::from_str(
            "0x0101010101010101010101010101010101010101010101010101010101010101",
        )
        .unwrap();
        assert_eq!(id, Identity([1u8; 32]));

        let bare = Identity::from_str(&hex::encode([7u8; 32])).unwrap();
        assert_eq!(bare, Identity([7u8; 32]));
        assert_eq!(Identity::from_str(&bare.to_string()).unwrap(), bare);
    }

    #[test]
    fn parse_base58() {
        let id = Identity([42u8; 32]);
        let parsed = Identity::from_str(&id.to_base58()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn reject_malformed() {
        assert_eq!(Identity::from_str("  "), Err(IdentityError::EmptyIdentity));
        assert_eq!(
            Identity::from_str("0xdeadbeef"),
            Err(IdentityError::InvalidLength(4))
        );
        assert!(matches!(
            Identity::from_str("0xnothex"),
            Err(IdentityError::Hex(_))
        ));
        assert!(matches!(
            Identity::from_str("not-base58-0OIl"),
            Err(IdentityError::Base58(_))
        ));
    }
}
