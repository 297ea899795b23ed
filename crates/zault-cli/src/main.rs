//! Thin driver over `zault-core`: `init`, `add`, `get`, `list`, `verify`.
//! The vault path is resolved from `$ZAULT_VAULT_PATH`, falling back to
//! `$HOME/.zault`.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use zault_core::Vault;

#[derive(Parser)]
#[command(name = "zault", about = "Zero-knowledge, post-quantum encrypted storage vault")]
struct Cli {
    /// Override the vault directory (defaults to $ZAULT_VAULT_PATH or ~/.zault)
    #[arg(long, global = true)]
    vault: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the vault if it doesn't exist yet and print its identity.
    Init,
    /// Add a file to the vault; prints the resulting metadata hash.
    Add { path: PathBuf },
    /// Recover a file by metadata hash.
    Get {
        hash: String,
        #[arg(default_value = "out")]
        out: PathBuf,
    },
    /// List every file stored in the vault.
    List,
    /// Check a block's signature without decrypting it.
    Verify { hash: String },
}

fn resolve_vault_path(override_path: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(p) = override_path {
        return Ok(p);
    }
    if let Ok(p) = std::env::var("ZAULT_VAULT_PATH") {
        return Ok(PathBuf::from(p));
    }
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(home.join(".zault"))
}

fn parse_hash(hex_str: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(hex_str).context("hash must be hex-encoded")?;
    if bytes.len() != 32 {
        return Err(anyhow!("hash must be exactly 32 bytes (64 hex characters)"));
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes);
    Ok(hash)
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let vault_path = resolve_vault_path(cli.vault)?;

    match cli.command {
        Command::Init => {
            let vault = Vault::init(&vault_path)?;
            println!("vault ready at {}", vault_path.display());
            println!(
                "public identity: {}",
                hex::encode(vault.identity().public().to_bytes())
            );
        }
        Command::Add { path } => {
            let vault = Vault::init(&vault_path)?;
            let hash = vault.add_file(&path, now_unix())?;
            println!("{}", hex::encode(hash));
        }
        Command::Get { hash, out } => {
            let vault = Vault::init(&vault_path)?;
            let hash = parse_hash(&hash)?;
            vault.get_file(&hash, &out)?;
            println!("wrote {}", out.display());
        }
        Command::List => {
            let vault = Vault::init(&vault_path)?;
            for entry in vault.list()? {
                println!(
                    "{}  {:>10}  {}",
                    hex::encode(entry.hash),
                    humansize::format_size(entry.size, humansize::DECIMAL),
                    entry.filename,
                );
            }
        }
        Command::Verify { hash } => {
            let vault = Vault::init(&vault_path)?;
            let hash = parse_hash(&hash)?;
            vault.verify(&hash)?;
            println!("signature valid");
        }
    }
    Ok(())
}
