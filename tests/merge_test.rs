//! Merge-driver tests at the library level: blobs in, merged plaintext
//! out, with `git merge-file` doing the three-way work.

mod common;

use std::fs;
use std::path::Path;

use common::*;
use strongbox::merge::{merge, MergeRequest};
use strongbox::{Context, KeyRing, SivKey};

fn fixed_key() -> SivKey {
    SivKey::from_bytes(&[0x42; 32]).unwrap()
}

fn fixed_key_context(home: &Path) -> Context {
    Context::new(keyring_path(home), identity_path(home))
        .with_key_loader(Box::new(|_| Ok(fixed_key())))
}

fn write_blob(path: &Path, plaintext: &str) {
    write_file(path, fixed_key().encrypt(plaintext.as_bytes()).unwrap());
}

#[test]
fn test_conflicting_merge_writes_markers() {
    let home = test_home();
    let ctx = fixed_key_context(home.path());

    let ancestor = home.path().join("ancestor");
    let current = home.path().join("current");
    let other = home.path().join("other");
    let output = home.path().join("merged");
    write_blob(&ancestor, "line one\n");
    write_blob(&current, "line one current\n");
    write_blob(&other, "line one other\n");

    let request = MergeRequest {
        ancestor: &ancestor,
        current: &current,
        other: &other,
        marker_size: "7",
        output: &output,
        ancestor_label: "ancestor",
        current_label: "HEAD",
        other_label: "theirs",
    };
    let conflict_free = merge(&request, &ctx).unwrap();
    assert!(!conflict_free);

    let merged = fs::read_to_string(&output).unwrap();
    assert!(merged.contains("<<<<<<< HEAD"), "got:\n{merged}");
    assert!(merged.contains("line one current"));
    assert!(merged.contains("======="));
    assert!(merged.contains("line one other"));
    assert!(merged.contains(">>>>>>> theirs"));
    assert!(!merged.contains("STRONGBOX ENCRYPTED RESOURCE"));
}

#[test]
fn test_one_sided_change_merges_cleanly() {
    let home = test_home();
    let ctx = fixed_key_context(home.path());

    let ancestor = home.path().join("ancestor");
    let current = home.path().join("current");
    let other = home.path().join("other");
    let output = home.path().join("merged");
    write_blob(&ancestor, "alpha\nbeta\n");
    write_blob(&current, "alpha\nbeta\n");
    write_blob(&other, "alpha\nbeta\ngamma\n");

    let request = MergeRequest {
        ancestor: &ancestor,
        current: &current,
        other: &other,
        marker_size: "7",
        output: &output,
        ancestor_label: "ancestor",
        current_label: "HEAD",
        other_label: "theirs",
    };
    let conflict_free = merge(&request, &ctx).unwrap();
    assert!(conflict_free);

    assert_eq!(fs::read_to_string(&output).unwrap(), "alpha\nbeta\ngamma\n");
}

#[test]
fn test_custom_marker_size() {
    let home = test_home();
    let ctx = fixed_key_context(home.path());

    let ancestor = home.path().join("ancestor");
    let current = home.path().join("current");
    let other = home.path().join("other");
    let output = home.path().join("merged");
    write_blob(&ancestor, "base\n");
    write_blob(&current, "ours\n");
    write_blob(&other, "theirs\n");

    let request = MergeRequest {
        ancestor: &ancestor,
        current: &current,
        other: &other,
        marker_size: "11",
        output: &output,
        ancestor_label: "ancestor",
        current_label: "mine",
        other_label: "theirs",
    };
    assert!(!merge(&request, &ctx).unwrap());

    let merged = fs::read_to_string(&output).unwrap();
    assert!(merged.contains("<<<<<<<<<<< mine"), "got:\n{merged}");
}

#[test]
fn test_bindings_resolve_against_output_path() {
    let home = test_home();

    // a real keyring-backed context, no key loader: binding resolution has
    // to find secrets/.strongbox-keyid by walking up from the output path,
    // since the blob inputs sit in the root like git's .merge_file_* files
    let key = fixed_key();
    let mut keyring = KeyRing::new(keyring_path(home.path()));
    keyring.add_key("merge", &key.key_id(), &key);
    keyring.save().unwrap();
    let ctx = Context::new(keyring_path(home.path()), identity_path(home.path()));

    let root = home.path().join("repo");
    write_file(
        root.join("secrets/.strongbox-keyid"),
        key.key_id().to_base64(),
    );
    let ancestor = root.join(".merge_file_ancestor");
    let current = root.join(".merge_file_current");
    let other = root.join(".merge_file_other");
    let output = root.join("secrets/dir0/sec0");
    write_file(&output, "");
    write_blob(&ancestor, "base\n");
    write_blob(&current, "base\nours\n");
    write_blob(&other, "base\ntheirs\n");

    let request = MergeRequest {
        ancestor: &ancestor,
        current: &current,
        other: &other,
        marker_size: "7",
        output: &output,
        ancestor_label: "ancestor",
        current_label: "HEAD",
        other_label: "theirs",
    };
    let conflict_free = merge(&request, &ctx).unwrap();
    assert!(!conflict_free);

    let merged = fs::read_to_string(&output).unwrap();
    assert!(
        !merged.contains("STRONGBOX ENCRYPTED RESOURCE"),
        "inputs were not smudged:\n{merged}"
    );
    assert!(merged.contains("<<<<<<< HEAD"), "got:\n{merged}");
    assert!(merged.contains("ours"));
    assert!(merged.contains("theirs"));
}

#[test]
#[cfg(unix)]
fn test_output_file_mode() {
    use std::os::unix::fs::PermissionsExt;

    let home = test_home();
    let ctx = fixed_key_context(home.path());

    let ancestor = home.path().join("ancestor");
    let current = home.path().join("current");
    let other = home.path().join("other");
    let output = home.path().join("merged");
    write_blob(&ancestor, "same\n");
    write_blob(&current, "same\n");
    write_blob(&other, "same\n");

    let request = MergeRequest {
        ancestor: &ancestor,
        current: &current,
        other: &other,
        marker_size: "7",
        output: &output,
        ancestor_label: "ancestor",
        current_label: "HEAD",
        other_label: "theirs",
    };
    assert!(merge(&request, &ctx).unwrap());

    let mode = fs::metadata(&output).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o644);
}
