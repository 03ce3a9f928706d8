//! # Bulk Decryption
//!
//! Offline, in-place decryption of every deterministic-scheme blob under a
//! directory. Used after cloning without filters configured, or to strip
//! encryption from an exported tree.
//!
//! Per-file problems (no binding, wrong key) are collected and reported in
//! aggregate after the walk; only I/O failures abort it. When an explicit
//! key is supplied it is used for every file, shadowing local bindings:
//! files protected by a different key simply fail and stay encrypted.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::warn;
use walkdir::{DirEntry, WalkDir};

use crate::context::Context;
use crate::error::{Result, StrongboxError};
use crate::siv::{self, SivKey};

/// Walk `target` depth-first and decrypt every encrypted-resource file in
/// place, preserving file modes.
pub fn decrypt_tree(target: &Path, key: Option<&SivKey>, ctx: &Context) -> Result<()> {
    let mut failures: Vec<String> = Vec::new();

    let walker = WalkDir::new(target)
        .into_iter()
        .filter_entry(|entry| !is_git_dir(entry));
    for entry in walker {
        let entry = entry.map_err(|err| StrongboxError::Io(err.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();

        let mut file = OpenOptions::new().read(true).write(true).open(path)?;

        // peek just enough to check for the marker before reading the file
        let mut head = Vec::with_capacity(siv::PREFIX.len());
        std::io::Read::by_ref(&mut file)
            .take(siv::PREFIX.len() as u64)
            .read_to_end(&mut head)?;
        if !head.starts_with(siv::PREFIX) {
            continue;
        }

        let file_key = match key {
            Some(key) => key.clone(),
            None => match ctx.siv_key_for(path) {
                Ok(key) => key,
                Err(err) => {
                    failures.push(format!(
                        "unable to find key file:{} err:{err}",
                        path.display()
                    ));
                    continue;
                }
            },
        };

        file.seek(SeekFrom::Start(0))?;
        let mut blob = Vec::new();
        file.read_to_end(&mut blob)?;

        let plaintext = match file_key.decrypt(&blob) {
            Ok(plaintext) => plaintext,
            Err(err) => {
                failures.push(format!(
                    "unable to decrypt file:{} err:{err}",
                    path.display()
                ));
                continue;
            }
        };

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&plaintext)?;
    }

    if !failures.is_empty() {
        for failure in &failures {
            warn!("{failure}");
        }
        return Err(StrongboxError::PartialFailure(failures.len()));
    }

    Ok(())
}

fn is_git_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name() == ".git"
}
