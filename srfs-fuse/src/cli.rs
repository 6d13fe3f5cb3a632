use std::path::PathBuf;

use clap::Parser;
use srfs::config;

#[derive(Parser)]
pub struct Cli {
    /// Number of allocation groups
    #[arg(long, short, default_value_t = config::GROUP_NR)]
    pub groups: usize,

    /// Inodes per group
    #[arg(long, short, default_value_t = config::GROUP_INODE_NR)]
    pub inodes: usize,

    /// Data blocks per group
    #[arg(long, short, default_value_t = config::GROUP_DATA_BLOCK_NR)]
    pub blocks: usize,

    /// Bytes per data block
    #[arg(long, default_value_t = config::BLOCK_SIZE)]
    pub block_size: usize,

    /// Host directory to import
    #[arg(long, short)]
    pub source: Option<PathBuf>,
}
