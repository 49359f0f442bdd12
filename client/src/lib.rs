use std::path::{Path, PathBuf};

use error::{ClientError, Result};
use htlc_escrow_core::interface::{load_escrow_data, save_escrow_data};
use htlc_escrow_core::{
    Clock, ContractState, EscrowConfig, EscrowContract, ManualClock, SystemClock,
};
use tracing::debug;

pub mod error;

/// A locally persisted escrow contract.
///
/// The configuration and the contract state live in two JSON files. Every
/// command opens a session at a fixed ledger time, runs one operation and
/// saves the resulting state.
pub struct EscrowSession {
    state_path: PathBuf,
    contract: EscrowContract<ManualClock>,
}

impl EscrowSession {
    /// Writes a fresh configuration and an empty contract state.
    pub fn init(
        config_path: &Path,
        state_path: &Path,
        config: &EscrowConfig,
        force: bool,
    ) -> anyhow::Result<()> {
        if state_path.exists() && !force {
            return Err(ClientError::StateExists(state_path.to_path_buf()).into());
        }
        save_escrow_data(config_path, config)?;
        save_escrow_data(state_path, &ContractState::default())
    }

    /// Loads the contract with its ledger time fixed at `now`.
    pub fn open(config_path: &Path, state_path: &Path, now: u64) -> anyhow::Result<Self> {
        let config: EscrowConfig = load_escrow_data(config_path)?;
        let state: ContractState = load_escrow_data(state_path)?;
        debug!(escrows = state.escrows.len(), now, "contract state loaded");

        Ok(Self {
            state_path: state_path.to_path_buf(),
            contract: EscrowContract::with_state(config, state, ManualClock::new(now)),
        })
    }

    pub fn contract(&self) -> &EscrowContract<ManualClock> {
        &self.contract
    }

    pub fn contract_mut(&mut self) -> &mut EscrowContract<ManualClock> {
        &mut self.contract
    }

    /// Persists the current contract state.
    pub fn save(&self) -> anyhow::Result<()> {
        save_escrow_data(&self.state_path, self.contract.state())
    }
}

/// Ledger time for this invocation: the override if given, else wall-clock seconds.
pub fn ledger_time(now: Option<u64>) -> u64 {
    now.unwrap_or_else(|| SystemClock.now())
}

/// Parses a secret given on the command line. `0x`-prefixed input is hex,
/// anything else is taken as raw UTF-8 bytes.
pub fn parse_secret(input: &str) -> Result<Vec<u8>> {
    let secret = match input.strip_prefix("0x") {
        Some(hex_str) => hex::decode(hex_str)?,
        None => input.as_bytes().to_vec(),
    };
    if secret.is_empty() {
        return Err(ClientError::EmptySecret);
    }
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use htlc_escrow_core::{AssetId, Identity, Transfer};

    use super::*;

    #[test]
    fn secrets_from_hex_or_text() {
        assert_eq!(parse_secret("0x0102ff").unwrap(), vec![1, 2, 255]);
        assert_eq!(parse_secret("hunter2").unwrap(), b"hunter2".to_vec());
        assert!(matches!(parse_secret("0xzz"), Err(ClientError::SecretHex(_))));
        assert!(matches!(parse_secret(""), Err(ClientError::EmptySecret)));
        assert!(matches!(parse_secret("0x"), Err(ClientError::EmptySecret)));
    }

    #[test]
    fn session_persists_state() {
        let dir = std::env::temp_dir().join(format!("htlc-client-{}", std::process::id()));
        let config_path = dir.join("config.json");
        let state_path = dir.join("state.json");
        let app = Identity([0xAA; 32]);
        let creator = Identity([0xC0; 32]);

        EscrowSession::init(&config_path, &state_path, &EscrowConfig::new(app, creator), false)
            .unwrap();
        assert!(
            EscrowSession::init(&config_path, &state_path, &EscrowConfig::new(app, creator), false)
                .is_err()
        );

        let mut session = EscrowSession::open(&config_path, &state_path, 100).unwrap();
        session
            .contract_mut()
            .admit_asset(creator, &Transfer::payment(creator, app, 109_300), AssetId::NATIVE)
            .unwrap();
        session.save().unwrap();

        let session = EscrowSession::open(&config_path, &state_path, 200).unwrap();
        assert_eq!(session.contract().latest_timestamp(), 200);
        assert!(session.contract().state().deposits.contains(AssetId::NATIVE));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
