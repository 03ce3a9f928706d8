use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrongboxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("keyring error: {0}")]
    Keyring(#[from] serde_yaml::Error),

    #[error("age error: {0}")]
    Age(String),

    #[error("cryptography error: {0}")]
    Crypto(String),

    #[error("key not found")]
    KeyNotFound,

    #[error("failed to find key or recipient for file {}", .0.display())]
    BindingNotFound(PathBuf),

    #[error("malformed encrypted blob: {0}")]
    MalformedBlob(String),

    #[error("malformed key id: {0}")]
    MalformedKeyId(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("invalid compressed payload: {0}")]
    DecompressFailed(String),

    #[error("invalid key format")]
    InvalidKeyFormat,

    #[error("unable to decrypt {0} file(s)")]
    PartialFailure(usize),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, StrongboxError>;
