//! # Merge Driver
//!
//! git hands the merge driver three blobs (common ancestor, current side,
//! other side) that still carry their stored, encrypted form. The driver
//! smudges each into a temporary plaintext file, lets `git merge-file` do
//! the actual three-way merge, and writes the merged result to the
//! destination path. Conflict markers end up in plaintext; the clean filter
//! re-encrypts on the operator's next stage.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::context::Context;
use crate::error::Result;
use crate::filters;
use crate::git;

/// The eight positional arguments git passes to the driver
/// (`%O %A %B %L %P %S %X %Y`).
pub struct MergeRequest<'a> {
    pub ancestor: &'a Path,
    pub current: &'a Path,
    pub other: &'a Path,
    pub marker_size: &'a str,
    pub output: &'a Path,
    pub ancestor_label: &'a str,
    pub current_label: &'a str,
    pub other_label: &'a str,
}

/// Run the three-way merge. Returns whether the merge was conflict-free;
/// the driver's exit status reports conflicts back to git.
pub fn merge(request: &MergeRequest<'_>, ctx: &Context) -> Result<bool> {
    // temporaries are dropped (and deleted) on every exit path, unwinds
    // included. git hands over %O/%A/%B as flat .merge_file_* temp files in
    // the repository root, so bindings are resolved against %P, the real
    // working-tree path of the file being merged
    let ancestor = smudge_to_temp(request.ancestor, request.output, ctx)?;
    let current = smudge_to_temp(request.current, request.output, ctx)?;
    let other = smudge_to_temp(request.other, request.output, ctx)?;

    let (merged, conflict_free) = git::merge_file(
        current.path(),
        ancestor.path(),
        other.path(),
        request.marker_size,
        request.current_label,
        request.ancestor_label,
        request.other_label,
    )?;

    fs::write(request.output, &merged)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(request.output)?.permissions();
        perms.set_mode(0o644);
        fs::set_permissions(request.output, perms)?;
    }

    Ok(conflict_free)
}

fn smudge_to_temp(path: &Path, filename: &Path, ctx: &Context) -> Result<NamedTempFile> {
    let blob = fs::read(path)?;
    let mut temp = NamedTempFile::new()?;
    filters::smudge(&mut &blob[..], &mut temp, filename, ctx)?;
    temp.flush()?;
    Ok(temp)
}
