//! kht: keyed hash tree CLI
//!
//! Commands:
//!   derive --offset N [--count C]  - print block keys starting at offset N
//!   info                           - show tree shape (depth, block count)
//!   config show                    - display current configuration
//!   generate-root                  - print a fresh random root key

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

use kht_core::config::{HashAlgorithm, KhtConfig, LogFormat, TreeConfig};
use kht_crypto::{
    generate_root_key, BlockKey, HmacMd5, HmacSha256, HmacSha512, KeyedHash,
    KeyedHashTree, KhtResult, RootKey,
};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "kht",
    version,
    about = "Keyed hash tree block key derivation",
    long_about = "kht: derive per-block encryption keys from a single root key"
)]
struct Cli {
    /// Path to kht.toml configuration file
    #[arg(long, short = 'c', env = "KHT_CONFIG", default_value = "kht.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides [log] level
    #[arg(long, env = "KHT_LOG")]
    log: Option<String>,

    /// HMAC digest (md5, sha256, sha512); overrides [tree] hash
    #[arg(long)]
    hash: Option<HashAlgorithm>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Derive the keys of the blocks starting at an offset
    Derive {
        /// Root key, hex encoded
        #[arg(long, env = "KHT_ROOT_KEY", hide_env_values = true)]
        root_key_hex: String,
        /// Byte offset of the first block
        #[arg(long, short = 'o')]
        offset: u64,
        /// Number of consecutive blocks
        #[arg(long, short = 'n', default_value_t = 1)]
        count: u64,
        /// Print JSON instead of tab-separated lines
        #[arg(long)]
        json: bool,
    },

    /// Show the tree shape for the active configuration
    Info,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate a random 256-bit root key
    #[command(name = "generate-root")]
    GenerateRoot,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Debug, Serialize)]
struct KeyOutput {
    index: u64,
    offset: u64,
    key: String,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = KhtConfig::load(&cli.config)
        .with_context(|| format!("loading config: {}", cli.config.display()))?;
    if let Some(hash) = cli.hash {
        config.tree.hash = hash;
    }

    let level = cli.log.as_deref().unwrap_or(&config.log.level);
    init_logging(level, config.log.format);

    match cli.command {
        Commands::Derive {
            root_key_hex,
            offset,
            count,
            json,
        } => cmd_derive(&config.tree, &root_key_hex, offset, count, json),
        Commands::Info => cmd_info(&config.tree),
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &cli.config),
        Commands::GenerateRoot => {
            println!("{}", generate_root_key().to_hex());
            Ok(())
        }
    }
}

fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── `kht derive` ──────────────────────────────────────────────────────────────

fn cmd_derive(
    tree: &TreeConfig,
    root_key_hex: &str,
    offset: u64,
    count: u64,
    json: bool,
) -> Result<()> {
    let root = RootKey::from_hex(root_key_hex).context("decoding root key")?;

    let blocks = match tree.hash {
        HashAlgorithm::Md5 => derive_blocks(HmacMd5::new(), root, tree, offset, count),
        HashAlgorithm::Sha256 => derive_blocks(HmacSha256::new(), root, tree, offset, count),
        HashAlgorithm::Sha512 => derive_blocks(HmacSha512::new(), root, tree, offset, count),
    }
    .with_context(|| format!("deriving {count} block key(s) at offset {offset}"))?;

    tracing::info!(
        offset,
        blocks = blocks.len(),
        hash = %tree.hash,
        "derived block keys"
    );

    if json {
        let out: Vec<KeyOutput> = blocks.iter().map(to_output).collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("serializing keys to JSON")?
        );
    } else {
        for block in &blocks {
            println!("{}\t{}\t{}", block.index, block.offset, block.key.to_hex());
        }
    }
    Ok(())
}

/// Keys for `count` consecutive blocks, starting with the block containing
/// `offset` and stopping at the end of the address space.
fn derive_blocks<H: KeyedHash>(
    keyed_hash: H,
    root: RootKey,
    config: &TreeConfig,
    offset: u64,
    count: u64,
) -> KhtResult<Vec<BlockKey>> {
    let tree = KeyedHashTree::from_config(root, keyed_hash, config)?;
    let first = tree.block_index(offset)?;
    tree.derive_blocks(first, count)
}

fn to_output(block: &BlockKey) -> KeyOutput {
    KeyOutput {
        index: block.index,
        offset: block.offset,
        key: block.key.to_hex(),
    }
}

// ── `kht info` ────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
struct TreeInfo {
    depth: u64,
    block_count: u64,
    key_len: usize,
}

fn cmd_info(tree: &TreeConfig) -> Result<()> {
    let info = match tree.hash {
        HashAlgorithm::Md5 => tree_info(HmacMd5::new(), tree),
        HashAlgorithm::Sha256 => tree_info(HmacSha256::new(), tree),
        HashAlgorithm::Sha512 => tree_info(HmacSha512::new(), tree),
    }
    .context("invalid [tree] configuration")?;

    println!("block size:  {}", tree.block_size);
    println!("max size:    {}", tree.max_size);
    println!("factor:      {}", tree.factor);
    println!("hash:        hmac-{}", tree.hash);
    println!("key length:  {}", info.key_len);
    println!("depth:       {}", info.depth);
    println!("blocks:      {}", info.block_count);
    Ok(())
}

/// Shape of the configured tree. The root is a throwaway random key; no
/// derivation happens.
fn tree_info<H: KeyedHash>(keyed_hash: H, config: &TreeConfig) -> KhtResult<TreeInfo> {
    let tree = KeyedHashTree::from_config(generate_root_key(), keyed_hash, config)?;
    Ok(TreeInfo {
        depth: tree.depth(),
        block_count: tree.block_count(),
        key_len: tree.key_len(),
    })
}

// ── `kht config show` ─────────────────────────────────────────────────────────

fn cmd_config_show(config: &KhtConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!(
            "# Configuration: defaults (no file at {})",
            config_path.display()
        );
    }
    println!();
    let rendered = config.to_toml().context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}
