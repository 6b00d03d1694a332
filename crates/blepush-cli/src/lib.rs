//! blepush CLI library
//!
//! Argument parsing, layered configuration and the glue that runs one
//! session over the BLE transport.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;

pub use app::PushApp;
pub use cli::{Cli, FormatArg};
pub use config::{AppConfig, ConfigError, ImageConfig};
pub use error::{CliError, Result};
