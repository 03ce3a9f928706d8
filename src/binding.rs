//! # Binding Resolution
//!
//! A file is bound to cryptographic material by filesystem layout: walking
//! up from the file's directory, the first directory carrying either a
//! `.strongbox_recipient` file (age recipients) or a `.strongbox-keyid`
//! file (a keyring key) decides how the file is protected. A recipient file
//! always wins over a key-id file in the same directory, and the walk goes
//! strictly upward, so a recipient file closer to the file shadows any
//! key-id file above it.

use std::fs;
use std::path::{Path, PathBuf};

use crate::age::{self as age_crypt, x25519, RECIPIENT_FILENAME};
use crate::context::Context;
use crate::error::{Result, StrongboxError};
use crate::siv::{KeyId, SivKey};

pub const KEY_ID_FILENAME: &str = ".strongbox-keyid";

/// The mutually-exclusive outcome of binding resolution.
pub enum Binding {
    Recipients(Vec<x25519::Recipient>),
    Key(SivKey),
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Binding::Recipients(recipients) => f
                .debug_tuple("Recipients")
                .field(&recipients.len())
                .finish(),
            Binding::Key(key) => f.debug_tuple("Key").field(key).finish(),
        }
    }
}

/// Walk ancestor directories of `filename` and resolve its binding.
pub fn resolve(filename: &Path, ctx: &Context) -> Result<Binding> {
    let mut dir = dirname(filename);
    loop {
        if dir.is_dir() {
            let recipient_file = dir.join(RECIPIENT_FILENAME);
            if recipient_file.is_file() {
                let recipients = age_crypt::parse_recipients_file(&recipient_file)?;
                return Ok(Binding::Recipients(recipients));
            }

            let key_id_file = dir.join(KEY_ID_FILENAME);
            if key_id_file.is_file() {
                let key_id = read_key_id(&key_id_file)?;
                return Ok(Binding::Key(ctx.keyring()?.key(&key_id)?));
            }
        }

        if dir == Path::new(".") {
            break;
        }
        let parent = dirname(&dir);
        if parent == dir {
            // filesystem root
            break;
        }
        dir = parent;
    }

    Err(StrongboxError::BindingNotFound(filename.to_path_buf()))
}

/// Locate the recipient file governing `filename`, if any.
pub fn find_recipient_file(filename: &Path) -> Option<PathBuf> {
    let mut dir = dirname(filename);
    loop {
        if dir.is_dir() {
            let recipient_file = dir.join(RECIPIENT_FILENAME);
            if recipient_file.is_file() {
                return Some(recipient_file);
            }
        }

        if dir == Path::new(".") {
            return None;
        }
        let parent = dirname(&dir);
        if parent == dir {
            return None;
        }
        dir = parent;
    }
}

/// Read and validate a key-id file: base-64, trimmed, exactly 32 bytes.
pub fn read_key_id(path: &Path) -> Result<KeyId> {
    let text = fs::read_to_string(path)?;
    KeyId::from_base64(text.trim())
}

/// Like `Path::parent`, but mirrors the `.`-rooted walk of relative paths:
/// the parent of a bare filename is `.`, and the root is its own parent.
fn dirname(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        Some(_) => PathBuf::from("."),
        None => path.to_path_buf(),
    }
}
