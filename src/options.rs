use crate::config::Protocol;
use clap::Parser;
use std::path::PathBuf;

/// Folder searched for trace files when none is given on the command line.
pub const DEFAULT_DATA_FOLDER: &str = "data";

#[derive(Parser, Debug)]
#[command(author, version, about = "snooping cache-coherence simulator", long_about = None)]
pub struct Options {
    #[arg(help = "coherence protocol (MESI, DRAGON or MOESI)")]
    pub protocol: Protocol,

    #[arg(help = "trace base name, resolved as <base>_<core>.data")]
    pub input_file_base: String,

    #[arg(help = "total cache size in bytes")]
    pub cache_size: u32,

    #[arg(help = "cache associativity")]
    pub associativity: u32,

    #[arg(help = "block size in bytes")]
    pub block_size: u32,

    #[arg(help = "folder containing the trace files")]
    pub data_folder: Option<PathBuf>,

    #[arg(long = "stats-file", help = "write the report as JSON")]
    pub stats_file: Option<PathBuf>,
}

impl Options {
    #[must_use]
    pub fn data_folder(&self) -> PathBuf {
        self.data_folder
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FOLDER))
    }
}
