//! JSON (de)serialization of escrow configuration and contract state.

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Reads a JSON-encoded file from the given `path` and deserializes into type `T`.
///
/// # Errors
///
/// Returns an `anyhow::Error` if the file cannot be opened, read, or parsed.
///
/// # Examples
///
/// ```ignore
/// # use htlc_escrow_core::interface::load_escrow_data;
/// # use htlc_escrow_core::EscrowConfig;
///
/// let config: EscrowConfig = load_escrow_data("./escrow_config.json").unwrap();
/// ```
pub fn load_escrow_data<P, T>(path: P) -> anyhow::Result<T>
where
    P: AsRef<Path>,
    T: DeserializeOwned,
{
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            anyhow::bail!(
                "File {:?} not found. You can create one with `htlc-cli init`.",
                path
            );
        }
        Err(e) => return Err(e).context(format!("opening file {:?}", path)),
    };
    serde_json::from_reader(file).with_context(|| format!("parsing JSON from {:?}", path))
}

/// Writes `data` (serializable) as pretty-printed JSON to the given `path`,
/// creating parent directories as needed.
///
/// # Errors
///
/// Returns an `anyhow::Error` if the file cannot be created or data cannot be serialized.
pub fn save_escrow_data<P, T>(path: P, data: &T) -> anyhow::Result<()>
where
    P: AsRef<Path>,
    T: Serialize,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {:?}", parent))?;
    }
    let file = File::create(path).with_context(|| format!("creating file {:?}", path))?;
    serde_json::to_writer_pretty(file, data)
        .with_context(|| format!("serializing to JSON to {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::storage::StorageCosts;
    use crate::EscrowConfig;

    fn scratch_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("htlc-escrow-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn config_save_and_load() {
        let path = scratch_path("config.json");
        let config = EscrowConfig::new(Identity([1u8; 32]), Identity([2u8; 32]));
        save_escrow_data(&path, &config).unwrap();
        let loaded: EscrowConfig = load_escrow_data(&path).unwrap();
        assert_eq!(loaded, config);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn config_costs_default_when_omitted() {
        let json = format!(
            r#"{{"app_address":"{}","creator":"{}"}}"#,
            Identity([1u8; 32]),
            Identity([2u8; 32])
        );
        let config: EscrowConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.costs, StorageCosts::default());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_escrow_data::<_, EscrowConfig>(scratch_path("absent.json")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
