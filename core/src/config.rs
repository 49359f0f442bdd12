//! Deployment configuration of an escrow contract.

#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::identity::Identity;
use crate::storage::StorageCosts;

/// Parameters fixed when the contract is deployed.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowConfig {
    /// Address of the contract account. Every inbound transfer must target it.
    pub app_address: Identity,
    /// Deploying identity; the only one allowed to withdraw excess funds or
    /// register participation keys.
    pub creator: Identity,
    /// Minimum-balance parameters of the settlement network.
    #[cfg_attr(feature = "json", serde(default))]
    pub costs: StorageCosts,
}

impl EscrowConfig {
    pub fn new(app_address: Identity, creator: Identity) -> Self {
        Self {
            app_address,
            creator,
            costs: StorageCosts::default(),
        }
    }
}
