use thiserror::Error;

use crate::asset::AssetId;
use crate::hash::SecretHash;

/// Escrow-related errors.
///
/// Every variant aborts the call that produced it with no state change.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EscrowError {
    /// An open escrow already uses this secret hash.
    #[error("escrow with secret hash {0} already exists")]
    DuplicateEscrow(SecretHash),

    /// The all-zero digest is reserved.
    #[error("secret hash cannot be empty")]
    InvalidSecretHash,

    /// An inbound transfer was not addressed to the escrow contract.
    #[error("receiver must be the escrow contract")]
    InvalidReceiver,

    /// Explicit recipient set to the zero identity.
    #[error("recipient cannot be the zero identity")]
    InvalidRecipient,

    /// Explicit destination setter set to the zero identity.
    #[error("destination setter cannot be the zero identity")]
    InvalidDestinationSetter,

    #[error("memo is {0} bytes, at most 256 fit")]
    MemoTooLong(usize),

    /// A native deposit was sent by someone other than the caller.
    #[error("sender of the deposit must be the caller")]
    SenderMismatch,

    #[error("deposit must be a positive amount")]
    NonPositiveAmount,

    #[error("unsupported transfer kind: {0}")]
    UnsupportedTransferKind(String),

    /// The reserve deposit does not match the reserve the record consumes.
    #[error("reserve increment must equal the reserve deposit (expected {expected}, got {actual})")]
    ReserveMismatch { expected: u64, actual: u64 },

    #[error("asset {0} is already admitted")]
    DuplicateAdmission(AssetId),

    #[error("asset {0} has not been admitted")]
    AssetNotAdmitted(AssetId),

    #[error("admission fee for asset {asset} must be {expected}, got {actual}")]
    AdmissionFeeMismatch {
        asset: AssetId,
        expected: u64,
        actual: u64,
    },

    #[error("escrow {0} does not exist")]
    NotFound(SecretHash),

    #[error("the secret does not match the secret hash")]
    SecretMismatch,

    /// Only the deploying identity may perform the operation.
    #[error("only the creator of the contract may {0}")]
    Unauthorized(&'static str),

    /// Only the escrow's destination setter may change its recipient.
    #[error("caller is not the destination setter of escrow {0}")]
    NotDestinationSetter(SecretHash),

    #[error("escrow can be redeemed with the secret only before {rescue_time}")]
    Expired { rescue_time: u64 },

    #[error("escrow cannot be cancelled before {rescue_time}")]
    NotYetExpired { rescue_time: u64 },

    #[error("requested {requested} exceeds withdrawable excess {available}")]
    ExcessExceeded { requested: u64, available: u64 },

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("contract balance of asset {asset} is {balance}, cannot pay {amount}")]
    InsufficientBalance {
        asset: AssetId,
        balance: u64,
        amount: u64,
    },

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("key registration error: {0}")]
    KeyRegistration(#[from] KeyRegistrationError),

    #[error("encoding error: {0}")]
    Codec(String),
}

/// Coarse classification of [`EscrowError`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or inconsistent request.
    Validation,
    /// No open escrow for the secret hash.
    NotFound,
    /// Wrong secret or caller lacks the required role.
    Authorization,
    /// Operation attempted on the wrong side of the rescue time.
    Timing,
    /// Overflow or underflow. Always fatal.
    Arithmetic,
}

impl EscrowError {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateEscrow(_)
            | Self::InvalidSecretHash
            | Self::InvalidReceiver
            | Self::InvalidRecipient
            | Self::InvalidDestinationSetter
            | Self::MemoTooLong(_)
            | Self::SenderMismatch
            | Self::NonPositiveAmount
            | Self::UnsupportedTransferKind(_)
            | Self::ReserveMismatch { .. }
            | Self::DuplicateAdmission(_)
            | Self::AssetNotAdmitted(_)
            | Self::AdmissionFeeMismatch { .. }
            | Self::ExcessExceeded { .. }
            | Self::Identity(_)
            | Self::KeyRegistration(_)
            | Self::Codec(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::SecretMismatch | Self::Unauthorized(_) | Self::NotDestinationSetter(_) => {
                ErrorKind::Authorization
            }
            Self::Expired { .. } | Self::NotYetExpired { .. } => ErrorKind::Timing,
            Self::Overflow(_) | Self::InsufficientBalance { .. } => ErrorKind::Arithmetic,
            Self::Ledger(e) => e.kind(),
        }
    }
}

/// Errors raised by the deposit ledger.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
    #[error("deposit entry for asset {0} already exists")]
    DuplicateEntry(AssetId),

    #[error("no deposit entry for asset {0}")]
    MissingEntry(AssetId),

    #[error("deposits of asset {asset} would overflow ({balance} + {amount})")]
    Overflow {
        asset: AssetId,
        balance: u64,
        amount: u64,
    },

    #[error("deposits of asset {asset} would underflow ({balance} - {amount})")]
    Underflow {
        asset: AssetId,
        balance: u64,
        amount: u64,
    },
}

impl LedgerError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateEntry(_) | Self::MissingEntry(_) => ErrorKind::Validation,
            Self::Overflow { .. } | Self::Underflow { .. } => ErrorKind::Arithmetic,
        }
    }
}

/// Errors that might occur while parsing into an [`Identity`](crate::identity::Identity).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IdentityError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("invalid base58: {0}")]
    Base58(#[from] bs58::decode::Error),

    #[error("cannot parse identity from empty string")]
    EmptyIdentity,

    #[error("identity must be 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// Errors from validating a participation key registration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum KeyRegistrationError {
    #[error("vote key is not a valid ed25519 public key")]
    InvalidVoteKey,

    #[error("vote_first ({first}) must not exceed vote_last ({last})")]
    InvalidVoteRange { first: u64, last: u64 },

    #[error("vote key dilution must be non-zero")]
    ZeroDilution,
}
