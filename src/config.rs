use crate::cache::CacheOptions;
use crate::formats::interval_file::EXTENSION;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "trackcache")]
#[command(about = "Indexed genomic interval tracks with range-coverage caching")]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Serve interval files from a directory over HTTP
    Serve(ServeConfig),
    /// Build an indexed interval file from BED
    Index(IndexConfig),
}

#[derive(Debug, Clone, Args)]
pub struct ServeConfig {
    /// Host address to bind to
    #[arg(long, env = "TRACKCACHE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "TRACKCACHE_PORT", default_value = "8080")]
    pub port: u16,

    /// Directory containing interval files
    #[arg(long, env = "TRACKCACHE_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Enable CORS for all origins
    #[arg(long, env = "TRACKCACHE_CORS", default_value_t = true, action = clap::ArgAction::Set)]
    pub cors: bool,

    /// Cap on cached (reference, resolution) pairs per track; unbounded if unset
    #[arg(long, env = "TRACKCACHE_MAX_CACHED_KEYS")]
    pub max_cached_keys: Option<u64>,
}

impl ServeConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            max_keys: self.max_cached_keys,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct IndexConfig {
    /// BED file to index
    pub input: PathBuf,

    /// Output path; defaults to the input with its extension replaced
    pub output: Option<PathBuf>,
}

impl IndexConfig {
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.input.with_extension(EXTENSION))
    }
}
