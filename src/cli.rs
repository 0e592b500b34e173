use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "vcache", version, about = "Inspect and maintain the video proxy cache")]
pub struct Cli {
    /// Additional configuration file (TOML, YAML or JSON).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Default log filter when `RUST_LOG` is not set.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the cache key of a resource URL.
    Key { url: String },
    /// Print the stored metadata of a resource.
    Info {
        /// Resource URL or cache key.
        resource: String,
    },
    /// List cache entries, least recently used first.
    Lru,
    /// Print the size of a path (defaults to the whole cache).
    Size { path: Option<PathBuf> },
    /// Evict least recently used entries until the cache fits its budget.
    Evict {
        /// Budget in bytes (defaults to the configured `max_cache_size`).
        #[arg(long)]
        max_size: Option<u64>,
    },
    /// Delete everything cached for a resource.
    Purge {
        /// Resource URL or cache key.
        resource: String,
    },
    /// Parse a raw proxied HTTP request read from stdin.
    Request,
    /// Check whether text looks like mis-decoded garbage.
    Garbled { text: String },
}
