//! # Filter Adapters
//!
//! The byte-stream transforms git invokes through its filter and diff
//! driver configuration: `clean` on stage, `smudge` on checkout, `diff` as
//! a textconv helper.
//!
//! Error policy differs per direction. A clean failure is fatal: the filter
//! is configured as `required`, so git aborts the staging operation rather
//! than committing plaintext. A smudge failure after a recognised prefix is
//! demoted to passthrough, because a collaborator without the key must
//! still be able to check the repository out.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use log::warn;

use crate::age;
use crate::binding::Binding;
use crate::context::Context;
use crate::error::{Result, StrongboxError};
use crate::siv;

/// Clean filter: plaintext on `input`, stored blob on `output`.
pub fn clean<R: Read, W: Write>(
    input: &mut R,
    output: &mut W,
    filename: &Path,
    ctx: &Context,
) -> Result<()> {
    let mut data = Vec::new();
    input.read_to_end(&mut data)?;

    // never re-encrypt an already-encrypted blob
    if siv::is_encrypted(&data) || age::is_armored(&data) {
        output.write_all(&data)?;
        return Ok(());
    }

    match ctx.bind(filename)? {
        Binding::Recipients(recipients) => {
            age::encrypt(output, &recipients, &data, filename, ctx)
        }
        Binding::Key(key) => {
            let blob = key.encrypt(&data)?;
            output.write_all(&blob)?;
            Ok(())
        }
    }
}

/// Smudge filter: stored blob on `input`, working-copy content on `output`.
pub fn smudge<R: Read, W: Write>(
    input: &mut R,
    output: &mut W,
    filename: &Path,
    ctx: &Context,
) -> Result<()> {
    let mut data = Vec::new();
    input.read_to_end(&mut data)?;

    if age::is_armored(&data) {
        return age::decrypt(output, &data, ctx);
    }

    if !siv::is_encrypted(&data) {
        output.write_all(&data)?;
        return Ok(());
    }

    let key = match ctx.siv_key_for(filename) {
        Ok(key) => key,
        Err(err) => {
            // a plain lookup miss is the other-collaborator case
            if !matches!(err, StrongboxError::KeyNotFound) {
                warn!("{err}");
            }
            output.write_all(&data)?;
            return Ok(());
        }
    };

    match key.decrypt(&data) {
        Ok(plaintext) => output.write_all(&plaintext)?,
        Err(err) => {
            warn!("{err}");
            output.write_all(&data)?;
        }
    }
    Ok(())
}

/// Diff textconv helper: copy the named file to `output` verbatim.
///
/// The working copy is already plaintext because the smudge filter ran at
/// checkout; this only stops git from dumping the stored ciphertext.
pub fn diff<W: Write>(filename: &Path, output: &mut W) -> Result<()> {
    let mut file = File::open(filename)?;
    io::copy(&mut file, output)?;
    Ok(())
}
