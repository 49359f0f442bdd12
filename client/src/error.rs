use htlc_escrow_core::EscrowError;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("Escrow error: {0}")]
    Escrow(#[from] EscrowError),
    #[error("Invalid hex secret: {0}")]
    SecretHex(#[from] hex::FromHexError),
    #[error("Empty secret")]
    EmptySecret,
    #[error("State file {0:?} already exists; pass --force to overwrite")]
    StateExists(std::path::PathBuf),
}
