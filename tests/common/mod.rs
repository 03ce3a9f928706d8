use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, Output};

use assert_cmd::Command;
use tempfile::TempDir;

/// Absolute path to the strongbox test binary.
#[allow(dead_code)]
pub fn strongbox_bin() -> &'static str {
    env!("CARGO_BIN_EXE_strongbox")
}

/// Spawn the strongbox binary with its home pinned to `home`.
#[allow(dead_code)]
pub fn strongbox_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(strongbox_bin());
    cmd.env("STRONGBOX_HOME", home)
        .env("HOME", home)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("GIT_CONFIG_GLOBAL");
    cmd
}

/// Run git in `dir` with the same pinned home, panicking on failure.
#[allow(dead_code)]
pub fn git(dir: &Path, home: &Path, args: &[&str]) -> Output {
    let output = try_git(dir, home, args);
    assert!(
        output.status.success(),
        "git {args:?} failed:\n{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr),
    );
    output
}

/// Run git in `dir` with the same pinned home, returning the raw output.
#[allow(dead_code)]
pub fn try_git(dir: &Path, home: &Path, args: &[&str]) -> Output {
    StdCommand::new("git")
        .args(args)
        .current_dir(dir)
        .env("HOME", home)
        .env("STRONGBOX_HOME", home)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("GIT_CONFIG_GLOBAL")
        .output()
        .expect("failed to run git")
}

/// Point the global (per-test-home) git config at the test binary for the
/// clean, smudge, diff and merge drivers.
#[allow(dead_code)]
pub fn configure_git_drivers(home: &Path) {
    let bin = strongbox_bin();
    let entries = [
        ("init.defaultBranch", "main".to_string()),
        ("filter.strongbox.clean", format!(r#""{bin}" clean %f"#)),
        ("filter.strongbox.smudge", format!(r#""{bin}" smudge %f"#)),
        ("filter.strongbox.required", "true".to_string()),
        ("diff.strongbox.textconv", format!(r#""{bin}" diff"#)),
        ("merge.strongbox.name", "strongbox merge driver".to_string()),
        (
            "merge.strongbox.driver",
            format!(r#""{bin}" merge %O %A %B %L %P %S %X %Y"#),
        ),
    ];
    for (key, value) in entries {
        git(home, home, &["config", "--global", key, &value]);
    }
}

/// Create a git repository with local user configuration set.
#[allow(dead_code)]
pub fn create_git_repo(home: &Path) -> TempDir {
    let temp = TempDir::new().expect("failed to create temp dir");

    git(temp.path(), home, &["init"]);
    git(
        temp.path(),
        home,
        &["config", "user.email", "test@example.com"],
    );
    git(temp.path(), home, &["config", "user.name", "Test User"]);

    temp
}

/// Read the first key entry of the keyring under `home`.
#[allow(dead_code)]
pub fn first_key_entry(home: &Path) -> (strongbox::SivKey, String) {
    let keyring = strongbox::KeyRing::load(home.join(".strongbox_keyring"))
        .expect("failed to load keyring");
    let entry = keyring.entries().first().expect("keyring is empty").clone();
    let key = strongbox::SivKey::from_base64(&entry.key).expect("bad key in keyring");
    (key, entry.key_id)
}

/// Write `content` to `path`, creating parent directories as needed.
#[allow(dead_code)]
pub fn write_file(path: impl AsRef<Path>, content: impl AsRef<[u8]>) {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create parent dirs");
    }
    fs::write(path, content).expect("failed to write file");
}

/// A fresh strongbox home directory.
#[allow(dead_code)]
pub fn test_home() -> TempDir {
    TempDir::new().expect("failed to create home dir")
}

#[allow(dead_code)]
pub fn keyring_path(home: &Path) -> PathBuf {
    home.join(".strongbox_keyring")
}

#[allow(dead_code)]
pub fn identity_path(home: &Path) -> PathBuf {
    home.join(".strongbox_identity")
}
