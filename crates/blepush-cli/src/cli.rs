//! Command-line interface definitions and parsing

use std::path::PathBuf;

use blepush_core::ImageFormat;
use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about = "Push an image to a BLE peripheral", long_about = None)]
pub struct Cli {
    /// Peripheral address, six colon-separated hex octets
    #[arg(required_unless_present = "print_config")]
    pub address: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Give up scanning after this many milliseconds
    #[arg(long, value_name = "MS")]
    pub scan_timeout_ms: Option<u64>,

    /// Give up connecting after this many milliseconds
    #[arg(long, value_name = "MS")]
    pub connect_timeout_ms: Option<u64>,

    /// Bytes per characteristic write
    #[arg(long, value_name = "BYTES")]
    pub chunk_size: Option<usize>,

    /// Exact image length in bytes
    #[arg(long, value_name = "BYTES")]
    pub payload_size: Option<usize>,

    /// Image file to send
    #[arg(short, long, value_name = "PATH")]
    pub image: Option<PathBuf>,

    /// Encoding of the image file
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Connect without scanning; the adapter must already know the peer
    #[arg(long)]
    pub no_scan: bool,

    /// Index of the Bluetooth adapter to use
    #[arg(long, value_name = "INDEX")]
    pub adapter: Option<usize>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Bytes stored verbatim
    Raw,
    /// ASCII hex dump
    Hex,
}

impl From<FormatArg> for ImageFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Raw => ImageFormat::Raw,
            FormatArg::Hex => ImageFormat::Hex,
        }
    }
}
