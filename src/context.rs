//! Per-invocation state shared by the filter and decryption entry points.

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use crate::age;
use crate::binding::{self, Binding};
use crate::error::{Result, StrongboxError};
use crate::home;
use crate::keyring::{KeyRing, KEYRING_FILENAME};
use crate::siv::SivKey;

/// Test seam: replaces the binding walk + keyring lookup wholesale.
pub type KeyLoader = Box<dyn Fn(&Path) -> Result<SivKey>>;

/// Paths to the keyring and identity files plus a lazily loaded keyring.
///
/// Every git filter invocation is its own short-lived process, so the
/// keyring is read at most once per process and cached for its lifetime.
pub struct Context {
    keyring_path: PathBuf,
    identity_path: PathBuf,
    keyring: OnceCell<KeyRing>,
    key_loader: Option<KeyLoader>,
}

impl Context {
    pub fn new(keyring_path: impl Into<PathBuf>, identity_path: impl Into<PathBuf>) -> Self {
        Self {
            keyring_path: keyring_path.into(),
            identity_path: identity_path.into(),
            keyring: OnceCell::new(),
            key_loader: None,
        }
    }

    /// Build a context from optional CLI overrides, deriving defaults under
    /// the strongbox home directory.
    pub fn from_overrides(
        keyring_path: Option<PathBuf>,
        identity_path: Option<PathBuf>,
    ) -> Result<Self> {
        let home = home::derive_home()?;
        Ok(Self::new(
            keyring_path.unwrap_or_else(|| home.join(KEYRING_FILENAME)),
            identity_path.unwrap_or_else(|| home.join(age::IDENTITY_FILENAME)),
        ))
    }

    /// Replace key resolution with a fixed loader. Used by tests to bind a
    /// known key without a keyring on disk.
    pub fn with_key_loader(mut self, loader: KeyLoader) -> Self {
        self.key_loader = Some(loader);
        self
    }

    pub fn keyring_path(&self) -> &Path {
        &self.keyring_path
    }

    pub fn identity_path(&self) -> &Path {
        &self.identity_path
    }

    /// The keyring, loaded on first use and cached for the process lifetime.
    pub fn keyring(&self) -> Result<&KeyRing> {
        if let Some(keyring) = self.keyring.get() {
            return Ok(keyring);
        }
        let keyring = KeyRing::load(&self.keyring_path)?;
        Ok(self.keyring.get_or_init(|| keyring))
    }

    /// Resolve the binding for a working-tree path.
    pub fn bind(&self, filename: &Path) -> Result<Binding> {
        if let Some(loader) = &self.key_loader {
            return Ok(Binding::Key(loader(filename)?));
        }
        binding::resolve(filename, self)
    }

    /// Resolve the binding and require a deterministic-scheme key.
    pub fn siv_key_for(&self, filename: &Path) -> Result<SivKey> {
        match self.bind(filename)? {
            Binding::Key(key) => Ok(key),
            Binding::Recipients(_) => Err(StrongboxError::KeyNotFound),
        }
    }
}
