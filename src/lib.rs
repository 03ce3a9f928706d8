//! # strongbox
//!
//! Transparent file encryption in git.
//!
//! Strongbox hooks into git's clean/smudge filter mechanism so that chosen
//! files are stored encrypted in the repository history while the working
//! copy stays plaintext. Staging, committing, checking out, diffing,
//! branching, merging and rebasing all keep working; encryption is either
//! deterministic or idempotent enough not to produce spurious changes.
//!
//! ## Quick Start
//!
//! ```bash
//! # wire the filter, diff and merge drivers into your global git config
//! strongbox git-config
//!
//! # generate a key and bind a directory to it
//! strongbox gen-key my-project
//! # put base64(sha256(key)) into the repo:
//! #   .strongbox-keyid
//! # and select files in .gitattributes:
//! #   secrets/* filter=strongbox diff=strongbox merge=strongbox
//! ```
//!
//! Files under the binding are now encrypted on `git add` and decrypted on
//! checkout.
//!
//! ## Two Schemes
//!
//! - **Deterministic (legacy)**: AES-SIV over gzip-compressed plaintext,
//!   base-64 armored behind a `# STRONGBOX ENCRYPTED RESOURCE ;` marker
//!   line. Keys live in the keyring (`~/.strongbox_keyring`); a directory
//!   opts in with a `.strongbox-keyid` file naming the key by
//!   sha256(key). Identical plaintext encrypts to identical bytes.
//! - **age (preferred)**: armored [age](https://age-encryption.org)
//!   ciphertext under X25519 recipients. A directory opts in with a
//!   `.strongbox_recipient` file listing recipients; identities live in
//!   `~/.strongbox_identity`. age output is randomised, so the clean
//!   filter re-emits the committed ciphertext whenever plaintext and
//!   recipients are unchanged.
//!
//! A recipient file always takes precedence over a key-id file when both
//! are in scope for a path.
//!
//! ## How It Works
//!
//! **Staging (clean):**
//! ```text
//! plaintext → git add → clean filter → encrypt → stored blob
//! ```
//!
//! **Checkout (smudge):**
//! ```text
//! stored blob → smudge filter → decrypt → working copy plaintext
//! ```
//!
//! A checkout without the right key leaves the stored ciphertext in the
//! working copy and succeeds: collaborators with access to only part of a
//! repository can still work in it.
//!
//! ## Module Overview
//!
//! - [`siv`] — the deterministic codec and key/key-id types
//! - [`age`] — the age codec, identity and recipient handling
//! - [`keyring`] — the persistent key store
//! - [`binding`] — mapping working-tree paths to keys or recipients
//! - [`filters`] — the clean/smudge/diff adapters git invokes
//! - [`merge`] — the three-way merge driver
//! - [`bulk`] — recursive offline decryption of a tree
//! - [`home`] — locating the keyring and identity files
//! - [`context`] — per-invocation state threaded through the adapters
//! - [`git`] — host-VCS plumbing
//! - [`error`] — error types and the crate-wide `Result`
//!
//! ## Security Notes
//!
//! Strongbox protects repository history, not the working tree: files are
//! plaintext on disk by design. The keyring is mode 0600 and keys are
//! never logged, but anyone with filesystem access to it can decrypt.
//! There is no forward secrecy and no per-commit key derivation.

pub mod age;
pub mod binding;
pub mod bulk;
pub mod context;
pub mod error;
pub mod filters;
pub mod git;
pub mod home;
pub mod keyring;
pub mod merge;
pub mod siv;

pub use context::Context;
pub use error::{Result, StrongboxError};
pub use keyring::KeyRing;
pub use siv::{KeyId, SivKey};
