use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use log::error;

use strongbox::context::Context;
use strongbox::error::{Result, StrongboxError};
use strongbox::merge::MergeRequest;
use strongbox::siv::SivKey;
use strongbox::{age, bulk, filters, git, keyring, merge};

#[derive(Parser)]
#[command(name = "strongbox")]
#[command(version)]
#[command(about = "Transparent file encryption in git", long_about = None)]
struct Cli {
    /// Keyring file path (default: $STRONGBOX_HOME/.strongbox_keyring)
    #[arg(long, global = true)]
    keyring: Option<PathBuf>,

    /// Identity file path (default: $STRONGBOX_HOME/.strongbox_identity)
    #[arg(long, global = true)]
    identity_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure git globally for strongbox use
    GitConfig,

    /// Generate a new key and add it to the keyring
    GenKey {
        /// Description stored with the key
        name: String,
    },

    /// Generate a new age identity and append it to the identity file
    GenIdentity {
        /// Description stored with the identity
        name: String,
    },

    /// Clean filter (called internally by git)
    Clean { path: PathBuf },

    /// Smudge filter (called internally by git)
    Smudge { path: PathBuf },

    /// Copy the file at PATH to stdout (diff textconv helper)
    Diff { path: PathBuf },

    /// Decrypt a single blob, or a whole tree with --recursive
    Decrypt {
        /// Recursively decrypt all encrypted files under the given path
        #[arg(long)]
        recursive: bool,

        /// Base-64 key to decrypt with
        #[arg(long)]
        key: Option<String>,

        /// File to decrypt (default: stdin), or tree root with --recursive
        /// (default: current directory)
        path: Option<PathBuf>,
    },

    /// Merge driver (called internally by git)
    Merge {
        ancestor: PathBuf,
        current: PathBuf,
        other: PathBuf,
        marker_size: String,
        output: PathBuf,
        ancestor_label: String,
        current_label: String,
        other_label: String,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "strongbox: {}", record.args()))
        .init();

    if let Err(err) = run() {
        error!("{err}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // modes with no use for the keyring or identity files
    match &cli.command {
        Commands::GitConfig => return git::configure_global(),
        Commands::Diff { path } => return filters::diff(path, &mut io::stdout().lock()),
        _ => {}
    }

    let explicit_keyring = cli.keyring.is_some();
    let ctx = Context::from_overrides(cli.keyring, cli.identity_file)?;
    if explicit_keyring {
        // fail fast on an unreadable keyring the operator pointed us at
        ctx.keyring().map_err(|err| {
            StrongboxError::Other(format!(
                "unable to load keyring file {}: {err}",
                ctx.keyring_path().display()
            ))
        })?;
    }

    match cli.command {
        Commands::GitConfig | Commands::Diff { .. } => unreachable!("handled above"),
        Commands::GenKey { name } => keyring::gen_key(&name, &ctx),
        Commands::GenIdentity { name } => age::generate_identity(&name, ctx.identity_path()),
        Commands::Clean { path } => {
            filters::clean(&mut io::stdin().lock(), &mut io::stdout().lock(), &path, &ctx)
        }
        Commands::Smudge { path } => {
            filters::smudge(&mut io::stdin().lock(), &mut io::stdout().lock(), &path, &ctx)
        }
        Commands::Decrypt {
            recursive,
            key,
            path,
        } => {
            if recursive {
                let key = key.as_deref().map(SivKey::from_base64).transpose()?;
                let target = match path {
                    Some(path) => path,
                    None => env::current_dir()?,
                };
                return bulk::decrypt_tree(&target, key.as_ref(), &ctx);
            }

            let key = key.ok_or_else(|| {
                StrongboxError::Other("must provide --key when using decrypt".into())
            })?;
            let key = SivKey::from_base64(&key)?;
            let blob = match path {
                Some(path) => fs::read(path)?,
                None => {
                    let mut blob = Vec::new();
                    io::stdin().lock().read_to_end(&mut blob)?;
                    blob
                }
            };
            let plaintext = key.decrypt(&blob)?;
            io::stdout().lock().write_all(&plaintext)?;
            Ok(())
        }
        Commands::Merge {
            ancestor,
            current,
            other,
            marker_size,
            output,
            ancestor_label,
            current_label,
            other_label,
        } => {
            let request = MergeRequest {
                ancestor: &ancestor,
                current: &current,
                other: &other,
                marker_size: &marker_size,
                output: &output,
                ancestor_label: &ancestor_label,
                current_label: &current_label,
                other_label: &other_label,
            };
            let conflict_free = merge::merge(&request, &ctx)?;
            if !conflict_free {
                // non-zero exit tells git the path needs conflict resolution
                process::exit(1);
            }
            Ok(())
        }
    }
}
