/// Balances and token holdings of the contract account
pub mod account;
/// Asset identifiers, inbound transfers and outbound payouts
pub mod asset;
/// Sources of ledger time
pub mod clock;
pub mod config;
/// The escrow state machine
pub mod contract;
pub mod error;
/// Escrow records and their binary layout
pub mod escrow;
/// Keccak-256 secret hashing
pub mod hash;
/// Identities of depositors, recipients and callers
pub mod identity;
/// JSON persistence of configuration and state
#[cfg(feature = "json")]
pub mod interface;
pub mod keyreg;
/// Per-asset ledger of encumbered funds
pub mod ledger;
/// Storage footprint and minimum-balance costs
pub mod storage;
pub mod store;

pub use asset::{AssetId, Payout, Transfer, TransferKind};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EscrowConfig;
pub use contract::{ContractState, CreateEscrow, EscrowContract};
pub use error::{ErrorKind, EscrowError};
pub use escrow::{EscrowRecord, Memo, MEMO_LEN};
pub use hash::{make_hash, SecretHash};
pub use identity::Identity;
pub use keyreg::{KeyRegistration, KeyRegistrationReceipt};
pub use storage::StorageCosts;

pub type Result<T> = std::result::Result<T, EscrowError>;
