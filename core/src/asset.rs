//! Assets, inbound transfers and outbound payouts.

use bincode::{Decode, Encode};
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// Identifier of an escrowable asset. `0` is the native coin.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(transparent))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode)]
pub struct AssetId(pub u64);

impl AssetId {
    /// The native coin of the settlement network.
    pub const NATIVE: Self = Self(0);

    pub fn is_native(&self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for AssetId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AssetId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// The kind of an inbound transaction grouped with a contract call.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// Native coin payment.
    Payment,
    /// Fungible token transfer.
    TokenTransfer,
    /// Participation key registration. Carries no value.
    KeyRegistration,
    /// Application call. Carries no value.
    ApplicationCall,
}

impl AsRef<str> for TransferKind {
    fn as_ref(&self) -> &str {
        match self {
            Self::Payment => "payment",
            Self::TokenTransfer => "token_transfer",
            Self::KeyRegistration => "key_registration",
            Self::ApplicationCall => "application_call",
        }
    }
}

/// An inbound funding instruction submitted alongside a contract call.
///
/// The settlement network guarantees the transfer executes atomically with
/// the call; the contract only decides whether to accept it.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub kind: TransferKind,
    pub sender: Identity,
    pub receiver: Identity,
    pub amount: u64,
    /// Token being moved. Only meaningful for [`TransferKind::TokenTransfer`].
    #[cfg_attr(feature = "json", serde(default))]
    pub token_id: Option<AssetId>,
}

impl Transfer {
    /// A native coin payment.
    pub fn payment(sender: Identity, receiver: Identity, amount: u64) -> Self {
        Self {
            kind: TransferKind::Payment,
            sender,
            receiver,
            amount,
            token_id: None,
        }
    }

    /// A token transfer of `amount` units of `token`.
    pub fn token(sender: Identity, receiver: Identity, token: AssetId, amount: u64) -> Self {
        Self {
            kind: TransferKind::TokenTransfer,
            sender,
            receiver,
            amount,
            token_id: Some(token),
        }
    }
}

/// An outbound transfer issued by the contract.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payout {
    pub to: Identity,
    pub asset: AssetId,
    pub amount: u64,
}

impl Payout {
    pub fn native(to: Identity, amount: u64) -> Self {
        Self {
            to,
            asset: AssetId::NATIVE,
            amount,
        }
    }

    pub fn token(to: Identity, asset: AssetId, amount: u64) -> Self {
        Self { to, asset, amount }
    }
}

impl std::fmt::Display for Payout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.asset.is_native() {
            write!(f, "pay {} native to {}", self.amount, self.to)
        } else {
            write!(
                f,
                "pay {} of asset {} to {}",
                self.amount, self.asset, self.to
            )
        }
    }
}
