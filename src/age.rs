//! # Randomised Codec and Identity Store
//!
//! The preferred strongbox format: armored age (X25519) ciphertext.
//!
//! age encryption is randomised, which clashes with git's expectation that
//! the clean filter is stable: re-encrypting an unchanged file on every
//! stage would show up as a spurious diff. The encrypt path therefore
//! re-emits the committed ciphertext whenever the plaintext and the
//! governing recipient file are both unchanged relative to `HEAD`.
//!
//! Identities live in an append-only text file, one three-line record per
//! identity:
//!
//! ```text
//! # description: ci deploys
//! # public key: age1...
//! AGE-SECRET-KEY-1...
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::path::Path;

use age::armor::{ArmoredReader, ArmoredWriter, Format};
use age::secrecy::ExposeSecret;
use age::{Decryptor, Encryptor, Identity, IdentityFile, Recipient};
pub use age::x25519;
use log::warn;

use crate::binding;
use crate::context::Context;
use crate::error::{Result, StrongboxError};
use crate::git;

pub const IDENTITY_FILENAME: &str = ".strongbox_identity";
pub const RECIPIENT_FILENAME: &str = ".strongbox_recipient";

/// First bytes of an armored age ciphertext.
pub const ARMOR_HEADER: &[u8] = b"-----BEGIN AGE ENCRYPTED FILE-----";

/// Check whether data is an armored age ciphertext.
pub fn is_armored(data: &[u8]) -> bool {
    data.starts_with(ARMOR_HEADER)
}

/// Generate a fresh X25519 identity: print the recipient for the operator
/// and append the identity record to the identity file.
pub fn generate_identity(description: &str, identity_path: &Path) -> Result<()> {
    let identity = x25519::Identity::generate();
    let recipient = identity.to_public();

    println!("public key: {recipient}");

    let mut options = OpenOptions::new();
    options.append(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    let mut file = options.open(identity_path)?;
    // records are newline-terminated, so appending starts on a fresh line
    write!(
        file,
        "# description: {description}\n# public key: {recipient}\n{}\n",
        identity.to_string().expose_secret()
    )?;
    file.flush()?;
    Ok(())
}

/// Parse a recipient file: one recipient per non-empty trimmed line.
pub fn parse_recipients_file(path: &Path) -> Result<Vec<x25519::Recipient>> {
    let text = fs::read_to_string(path)?;
    let mut recipients = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let recipient = line.parse::<x25519::Recipient>().map_err(|err| {
            StrongboxError::Age(format!("invalid recipient in {}: {err}", path.display()))
        })?;
        recipients.push(recipient);
    }
    Ok(recipients)
}

/// Parse the identities in the identity file, in file order.
pub fn load_identities(path: &Path) -> Result<Vec<Box<dyn Identity>>> {
    let file = File::open(path)?;
    let identity_file = IdentityFile::from_buffer(BufReader::new(file))?;
    identity_file
        .into_identities()
        .map_err(|err| StrongboxError::Age(err.to_string()))
}

/// Encrypt plaintext for the given recipients, reusing the committed
/// ciphertext when nothing has actually changed.
pub fn encrypt<W: Write>(
    output: &mut W,
    recipients: &[x25519::Recipient],
    plaintext: &[u8],
    filename: &Path,
    ctx: &Context,
) -> Result<()> {
    if plaintext_unchanged(plaintext, filename, ctx) && !recipient_changed(filename) {
        let committed = git::file_at_head(filename)?;
        output.write_all(&committed)?;
        return Ok(());
    }

    encrypt_fresh(output, recipients, plaintext)
}

/// Write a fresh armored ciphertext for the recipients.
pub fn encrypt_fresh<W: Write>(
    output: &mut W,
    recipients: &[x25519::Recipient],
    plaintext: &[u8],
) -> Result<()> {
    let armor = ArmoredWriter::wrap_output(&mut *output, Format::AsciiArmor)?;
    let encryptor = Encryptor::with_recipients(recipients.iter().map(|r| r as &dyn Recipient))
        .map_err(|err| StrongboxError::Age(err.to_string()))?;
    let mut writer = encryptor
        .wrap_output(armor)
        .map_err(|err| StrongboxError::Age(err.to_string()))?;
    writer.write_all(plaintext)?;
    let armor = writer.finish()?;
    armor.finish()?;
    Ok(())
}

/// Decrypt an armored ciphertext with the identities on file, passing the
/// input through unchanged when that is not possible.
///
/// Passthrough covers a missing or unparsable identity file and ciphertexts
/// none of our identities can open: the blob likely belongs to another
/// collaborator and must still round-trip through this checkout.
pub fn decrypt<W: Write>(output: &mut W, input: &[u8], ctx: &Context) -> Result<()> {
    let identities = match load_identities(ctx.identity_path()) {
        Ok(identities) => identities,
        Err(_) => {
            output.write_all(input)?;
            return Ok(());
        }
    };

    match decrypt_with_identities(input, &identities) {
        Ok(plaintext) => output.write_all(&plaintext)?,
        Err(_) => output.write_all(input)?,
    }
    Ok(())
}

/// Strict decryption: any failure to open the ciphertext surfaces as
/// `AuthenticationFailed`.
pub fn decrypt_with_identities(
    input: &[u8],
    identities: &[Box<dyn Identity>],
) -> Result<Vec<u8>> {
    let decryptor = Decryptor::new(ArmoredReader::new(input))
        .map_err(|_| StrongboxError::AuthenticationFailed)?;
    let mut reader = decryptor
        .decrypt(identities.iter().map(|identity| identity.as_ref()))
        .map_err(|_| StrongboxError::AuthenticationFailed)?;

    let mut plaintext = Vec::new();
    reader.read_to_end(&mut plaintext)?;
    Ok(plaintext)
}

/// Does the committed version of `filename` decrypt to exactly `plaintext`?
fn plaintext_unchanged(plaintext: &[u8], filename: &Path, ctx: &Context) -> bool {
    // absent at HEAD means this is the first encryption of the path
    let Ok(committed) = git::file_at_head(filename) else {
        return false;
    };
    if !is_armored(&committed) {
        warn!(
            "expected age armor header in committed blob for {}",
            filename.display()
        );
        return false;
    }

    let mut previous = Vec::new();
    if decrypt(&mut previous, &committed, ctx).is_err() {
        return false;
    }
    previous == plaintext
}

/// Has the recipient file governing `filename` changed relative to `HEAD`?
fn recipient_changed(filename: &Path) -> bool {
    let Some(recipient_file) = binding::find_recipient_file(filename) else {
        return false;
    };
    // a recipient file that is not committed yet counts as changed
    let Ok(committed) = git::file_at_head(&recipient_file) else {
        return true;
    };
    match fs::read(&recipient_file) {
        Ok(current) => current != committed,
        Err(_) => true,
    }
}
