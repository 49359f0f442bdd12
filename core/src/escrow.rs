//! Escrow records and their fixed-width binary encoding.

use bincode::de::{BorrowDecoder, Decoder};
use bincode::enc::Encoder;
use bincode::error::{DecodeError, EncodeError};
use bincode::{BorrowDecode, Decode, Encode};
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "json")]
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::asset::AssetId;
use crate::hash::SecretHash;
use crate::identity::Identity;
use crate::{EscrowError, Result};

/// Key prefix of an escrow record box.
pub const RECORD_KEY_PREFIX: u8 = b'e';

/// Storage key of the record for `hash`.
pub fn record_key(hash: &SecretHash) -> [u8; 33] {
    let mut key = [0u8; 33];
    key[0] = RECORD_KEY_PREFIX;
    key[1..].copy_from_slice(hash.as_bytes());
    key
}

/// Size of the free-form memo carried by every record.
pub const MEMO_LEN: usize = 256;

/// Free-form bytes attached to an escrow, zero-padded to [`MEMO_LEN`].
#[cfg_attr(feature = "json", derive(SerializeDisplay, DeserializeFromStr))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct Memo(pub [u8; MEMO_LEN]);

impl Memo {
    pub const EMPTY: Self = Self([0u8; MEMO_LEN]);

    /// Zero-pads `bytes` to a full memo.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MEMO_LEN {
            return Err(EscrowError::MemoTooLong(bytes.len()));
        }
        let mut memo = [0u8; MEMO_LEN];
        memo[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(memo))
    }

    pub fn as_bytes(&self) -> &[u8; MEMO_LEN] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl Default for Memo {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl std::fmt::Display for Memo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::str::FromStr for Memo {
    type Err = hex::FromHexError;

    /// Parses `0x`-prefixed or bare hex of at most [`MEMO_LEN`] bytes.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))?;
        if bytes.len() > MEMO_LEN {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut memo = [0u8; MEMO_LEN];
        memo[..bytes.len()].copy_from_slice(&bytes);
        Ok(Self(memo))
    }
}

/// Big-endian, fixed-width integers: every record encodes to the same length.
fn record_config() -> impl bincode::config::Config {
    bincode::config::standard()
        .with_big_endian()
        .with_fixed_int_encoding()
}

/// One open escrow, keyed by its secret hash.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowRecord {
    /// Ledger time of creation.
    pub created_time: u64,
    /// `created_time + rescue_delay`. From this moment on only `cancel` applies.
    pub rescue_time: u64,
    pub asset_id: AssetId,
    /// Principal locked. Always positive.
    pub amount: u64,
    /// Native reserve funded by the depositor, refunded on settlement.
    pub reserve_amount: u64,
    /// Funder of the escrow and target of refunds.
    pub depositor: Identity,
    /// If set, the only identity that may receive the principal.
    pub recipient: Option<Identity>,
    /// If set, may change `recipient` while the escrow is open.
    pub destination_setter: Option<Identity>,
    pub secret_hash: SecretHash,
    pub memo: Memo,
}

impl EscrowRecord {
    /// Binary encoding of the record as kept in storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::encode_to_vec(self, record_config())
            .map_err(|e| EscrowError::Codec(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (record, read) = bincode::decode_from_slice(bytes, record_config())
            .map_err(|e| EscrowError::Codec(e.to_string()))?;
        if read != bytes.len() {
            return Err(EscrowError::Codec(format!(
                "{} trailing bytes after record",
                bytes.len() - read
            )));
        }
        Ok(record)
    }

    /// Length of [`Self::to_bytes`].
    pub fn encoded_len(&self) -> Result<usize> {
        self.to_bytes().map(|bytes| bytes.len())
    }

    /// Party the principal goes to when the escrow is claimed by `caller`.
    pub fn payout_target(&self, caller: Identity) -> Identity {
        self.recipient.unwrap_or(caller)
    }
}

impl Encode for EscrowRecord {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> std::result::Result<(), EncodeError> {
        self.created_time.encode(encoder)?;
        self.rescue_time.encode(encoder)?;
        self.asset_id.encode(encoder)?;
        self.amount.encode(encoder)?;
        self.reserve_amount.encode(encoder)?;
        self.depositor.encode(encoder)?;
        // unset recipient occupies the same 32 bytes as the zero identity
        self.recipient.unwrap_or(Identity::ZERO).encode(encoder)?;
        self.destination_setter
            .unwrap_or(Identity::ZERO)
            .encode(encoder)?;
        self.secret_hash.encode(encoder)?;
        self.memo.encode(encoder)
    }
}

impl<Context> Decode<Context> for EscrowRecord {
    fn decode<D: Decoder<Context = Context>>(
        decoder: &mut D,
    ) -> std::result::Result<Self, DecodeError> {
        let created_time = u64::decode(decoder)?;
        let rescue_time = u64::decode(decoder)?;
        let asset_id = AssetId::decode(decoder)?;
        let amount = u64::decode(decoder)?;
        let reserve_amount = u64::decode(decoder)?;
        let depositor = Identity::decode(decoder)?;
        let recipient = Identity::decode(decoder)?;
        let destination_setter = Identity::decode(decoder)?;
        let secret_hash = SecretHash::decode(decoder)?;
        let memo = Memo::decode(decoder)?;
        Ok(Self {
            created_time,
            rescue_time,
            asset_id,
            amount,
            reserve_amount,
            depositor,
            recipient: (!recipient.is_zero()).then_some(recipient),
            destination_setter: (!destination_setter.is_zero()).then_some(destination_setter),
            secret_hash,
            memo,
        })
    }
}

impl<'de, Context> BorrowDecode<'de, Context> for EscrowRecord {
    fn borrow_decode<D: BorrowDecoder<'de, Context = Context>>(
        decoder: &mut D,
    ) -> std::result::Result<Self, DecodeError> {
        Self::decode(decoder)
    }
}
