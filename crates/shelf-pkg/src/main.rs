//! `shelf-pkg` - The shelf repository maintainer tool.
//!
//! Drives the core library from the command line: publishing manifests from a
//! batch of operations, listing the expected metadata files, placing uploads,
//! and managing signing keys.

mod ops;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shelf_core::signer::{decode_public_key, encode_public_key, verify_detached};
use shelf_core::{Keyring, RepoConfig, Repository, default_keyring_dir};
use shelf_schema::SIGNATURE_SUFFIX;
use tracing_subscriber::EnvFilter;

use ops::OpsFile;

#[derive(Parser)]
#[command(name = "shelf-pkg")]
#[command(about = "shelf package repository maintainer", long_about = None)]
struct Cli {
    /// Repository configuration file
    #[arg(short, long, default_value = "shelf.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply an operations file and regenerate all manifests
    Publish {
        /// TOML file with `[[add]]` and `[[remove]]` tables
        #[arg(long)]
        ops: PathBuf,
    },
    /// List every manifest and signature file a publish should produce
    Files,
    /// Move an uploaded file into its storage location
    Load {
        /// Filename to store it under
        #[arg(short, long)]
        name: String,
        /// The uploaded temporary file
        temp_file: PathBuf,
    },
    /// Generate a new Ed25519 signing key in the keyring
    Keygen {
        /// Key id to store the key under
        #[arg(long)]
        id: String,
        /// Keyring directory (defaults to ~/.shelf/keys)
        #[arg(long)]
        keyring: Option<PathBuf>,
    },
    /// Verify a manifest against its detached signature
    Verify {
        /// Manifest file; the signature is read from `<manifest>.gpg`
        #[arg(short, long)]
        manifest: PathBuf,
        /// Base64 Ed25519 public key
        #[arg(long)]
        public_key: String,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so `files` output stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Publish { ops } => cli_publish(&cli.config, &ops),
        Commands::Files => cli_files(&cli.config),
        Commands::Load { name, temp_file } => cli_load(&cli.config, &name, &temp_file),
        Commands::Keygen { id, keyring } => cli_keygen(&id, keyring),
        Commands::Verify {
            manifest,
            public_key,
        } => cli_verify(&manifest, &public_key),
    }
}

fn load_config(path: &Path) -> Result<RepoConfig> {
    RepoConfig::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

fn cli_publish(config_path: &Path, ops_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let ops = OpsFile::load(ops_path)?;

    let mut repo = Repository::new(config);
    let applied = ops.apply(&mut repo)?;
    tracing::info!(
        "Applied operations from {}: {} added, {} removed, {} ignored",
        ops_path.display(),
        applied.added,
        applied.removed,
        applied.ignored
    );
    println!(
        "  {} added, {} removed, {} ignored",
        applied.added, applied.removed, applied.ignored
    );

    repo.write_metadata().context("Failed to write metadata")?;
    println!("  wrote {}", repo.config().metadata_dir().display());

    Ok(())
}

fn cli_files(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    for path in config.metadata_files() {
        println!("{}", path.display());
    }
    Ok(())
}

fn cli_load(config_path: &Path, name: &str, temp_file: &Path) -> Result<()> {
    let repo = Repository::new(load_config(config_path)?);
    tracing::debug!("Loading {} as {name}", temp_file.display());
    let dest = repo.load_file(name, temp_file)?;
    println!("  stored {}", dest.display());
    Ok(())
}

fn cli_keygen(key_id: &str, keyring: Option<PathBuf>) -> Result<()> {
    use ed25519_dalek::SigningKey;
    use rand::RngCore;

    let dir = keyring
        .or_else(default_keyring_dir)
        .context("Could not determine keyring directory. Pass --keyring or set SHELF_HOME.")?;

    println!("  generating ed25519 keypair");

    let mut secret_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut secret_bytes);
    let signing_key = SigningKey::from_bytes(&secret_bytes);

    let path = Keyring::new(dir).store(key_id, &signing_key)?;
    println!("  wrote {}", path.display());
    println!();
    println!("  public (give to clients):");
    println!("  {}", encode_public_key(&signing_key.verifying_key()));

    Ok(())
}

fn cli_verify(manifest: &Path, public_key: &str) -> Result<()> {
    let key = decode_public_key(public_key)?;
    let mut signature_path = manifest.as_os_str().to_owned();
    signature_path.push(SIGNATURE_SUFFIX);
    let signature_path = PathBuf::from(signature_path);

    let data =
        fs::read(manifest).with_context(|| format!("Failed to read {}", manifest.display()))?;
    let armored = fs::read_to_string(&signature_path)
        .with_context(|| format!("Failed to read {}", signature_path.display()))?;

    verify_detached(&key, &data, &armored)
        .with_context(|| format!("Signature check failed for {}", manifest.display()))?;
    println!("  verified {}", manifest.display());
    Ok(())
}
