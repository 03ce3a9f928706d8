//! # Keyring Store
//!
//! Persistent storage for deterministic-scheme keys.
//!
//! The keyring is a YAML file (mode 0600) holding an ordered list of
//! entries under a top-level `keyentries` field:
//!
//! ```yaml
//! keyentries:
//! - description: team00
//!   key-id: <base-64 of sha256(key)>
//!   key: <base-64 of the 32-byte key>
//! ```
//!
//! Entries are addressable by key-id. Uniqueness is not enforced on load or
//! insert; lookup returns the first match. Keys are never written to logs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::{Result, StrongboxError};
use crate::siv::{KeyId, SivKey};

pub const KEYRING_FILENAME: &str = ".strongbox_keyring";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyEntry {
    pub description: String,
    #[serde(rename = "key-id")]
    pub key_id: String,
    pub key: String,
}

#[derive(Serialize, Deserialize, Default)]
struct KeyRingFile {
    keyentries: Vec<KeyEntry>,
}

/// A keyring backed by a single YAML file.
#[derive(Debug)]
pub struct KeyRing {
    file_name: PathBuf,
    entries: Vec<KeyEntry>,
}

impl KeyRing {
    /// An empty keyring that will be persisted to `file_name` on save.
    pub fn new(file_name: impl Into<PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
            entries: Vec::new(),
        }
    }

    /// Read and parse the keyring file.
    ///
    /// A missing file surfaces as `Io` with `ErrorKind::NotFound` so callers
    /// can treat first use specially.
    pub fn load(file_name: impl Into<PathBuf>) -> Result<Self> {
        let file_name = file_name.into();
        let text = fs::read_to_string(&file_name)?;
        let parsed: KeyRingFile = serde_yaml::from_str(&text)?;
        Ok(Self {
            file_name,
            entries: parsed.keyentries,
        })
    }

    /// Serialise the keyring back to its file, mode 0600.
    pub fn save(&self) -> Result<()> {
        let text = serde_yaml::to_string(&KeyRingFile {
            keyentries: self.entries.clone(),
        })?;
        fs::write(&self.file_name, text)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.file_name)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.file_name, perms)?;
        }

        Ok(())
    }

    /// Append an entry. Does not de-duplicate.
    pub fn add_key(&mut self, description: &str, key_id: &KeyId, key: &SivKey) {
        self.entries.push(KeyEntry {
            description: description.to_string(),
            key_id: key_id.to_base64(),
            key: key.to_base64(),
        });
    }

    /// Look up a key by its id; first match wins.
    pub fn key(&self, key_id: &KeyId) -> Result<SivKey> {
        let wanted = key_id.to_base64();
        for entry in &self.entries {
            if entry.key_id == wanted {
                return SivKey::from_base64(&entry.key);
            }
        }
        Err(StrongboxError::KeyNotFound)
    }

    pub fn entries(&self) -> &[KeyEntry] {
        &self.entries
    }

    pub fn file_name(&self) -> &Path {
        &self.file_name
    }
}

/// Generate a new key and persist it to the keyring under `description`.
pub fn gen_key(description: &str, ctx: &Context) -> Result<()> {
    let mut keyring = match KeyRing::load(ctx.keyring_path()) {
        Ok(keyring) => keyring,
        Err(StrongboxError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            KeyRing::new(ctx.keyring_path())
        }
        Err(err) => return Err(err),
    };

    let key = SivKey::generate();
    keyring.add_key(description, &key.key_id(), &key);
    keyring.save()
}
