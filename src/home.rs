//! Home directory resolution for the keyring and identity files.

use std::env;
use std::path::PathBuf;

use crate::error::{Result, StrongboxError};

/// Locate the directory holding the keyring and identity files.
///
/// The first non-empty of `$STRONGBOX_HOME`, `$HOME` and the operating
/// system's notion of the user's home directory wins.
pub fn derive_home() -> Result<PathBuf> {
    if let Ok(home) = env::var("STRONGBOX_HOME") {
        if !home.is_empty() {
            return Ok(PathBuf::from(home));
        }
    }
    if let Ok(home) = env::var("HOME") {
        if !home.is_empty() {
            return Ok(PathBuf::from(home));
        }
    }
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(StrongboxError::Other(
        "could not determine home directory; set $STRONGBOX_HOME or $HOME".into(),
    ))
}
