use anyhow::Context;
use clap::{Parser, Subcommand};
use shardcache::Pool;
use shardcache::config::CacheConfig;
use shardcache::storage::filesystem::FilesystemStorage;
use std::io;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Inspect and modify a shardcache directory.
///
/// The cache location and the number of shards are read from the configuration file
/// (`/etc/shardcache/config.toml` or the file named by `SHARDCACHE_CONFIG_FILE`) and
/// `SHARDCACHE_*` environment variables. All processes sharing a cache directory must use the
/// same number of shards.
#[derive(Parser)]
#[command(version)]
struct CliOpts {
    /// Path to the cache directory, overriding the configured one.
    #[arg(short, long, global = true)]
    cache: Option<PathBuf>,

    /// Configuration file to read instead of the default one.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value stored under a key.
    ///
    /// Exits with code 2 if the key is not in the cache.
    Get {
        /// Key to look up.
        key: String,
    },

    /// Store a value under a key, replacing any existing value.
    Set {
        /// Key to store the value under.
        key: String,

        /// Value to store.
        value: String,

        /// Time after which the value expires, e.g. `10min` or `7days`.
        #[arg(long)]
        ttl: Option<humantime::Duration>,
    },

    /// Delete keys from the cache.
    Delete {
        /// Keys to delete.
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Delete everything in the cache.
    Clear,
}

impl CliOpts {
    fn open_pool(&self) -> Result<Pool<FilesystemStorage>, anyhow::Error> {
        let mut config =
            CacheConfig::load(self.config.as_deref()).context("Could not load configuration")?;
        if let Some(cache) = &self.cache {
            config.path = cache.clone();
        }
        Pool::open(&config)
            .with_context(|| format!("Could not access cache: {}", config.path.display()))
    }
}

fn main() -> Result<ExitCode, anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli_opts = CliOpts::parse();
    let mut pool = cli_opts.open_pool()?;
    match cli_opts.command {
        Commands::Get { key } => {
            let item = pool
                .get_item(&key)
                .with_context(|| format!("Could not read key: {key}"))?;
            if !item.is_hit() {
                eprintln!("Key not found in cache.");
                return Ok(ExitCode::from(2));
            }
            let mut stdout = io::stdout().lock();
            stdout.write_all(item.get().unwrap_or_default())?;
            stdout.flush()?;
        }
        Commands::Set { key, value, ttl } => {
            let mut item = pool
                .get_item(&key)
                .with_context(|| format!("Could not read key: {key}"))?;
            item.set(value);
            let ttl = ttl
                .map(|ttl| chrono::TimeDelta::from_std(*ttl.as_ref()))
                .transpose()
                .context("TTL out of range")?;
            item.expires_after(ttl)
                .with_context(|| format!("Invalid TTL for key: {key}"))?;
            if !pool.save(&item) {
                anyhow::bail!("Could not store key: {key}");
            }
        }
        Commands::Delete { keys } => {
            if !pool.delete_items(&keys) {
                anyhow::bail!("Could not delete all keys");
            }
        }
        Commands::Clear => {
            if !pool.clear() {
                anyhow::bail!("Could not clear cache");
            }
            pool.store()
                .storage()
                .clean_leftover_tmp_files()
                .context("Could not remove leftover temporary files")?;
        }
    }
    Ok(ExitCode::SUCCESS)
}
