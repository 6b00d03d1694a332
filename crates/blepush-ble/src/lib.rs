//! Bluetooth Low Energy transport for blepush
//!
//! This crate provides a BLE central that implements the `Transport` trait
//! from `blepush-core` on top of btleplug.
//!
//! ## Architecture
//!
//! - [`config`] - Transport configuration and settings
//! - [`error`] - Error types specific to BLE transport
//! - [`protocol`] - Conversions between btleplug and session types
//! - [`peer`] - Target peer state
//! - [`discovery`] - Adapter setup, scanning and adapter events
//! - [`connection`] - Connection, notification and write handling
//! - [`transport`] - Main transport implementation
//!
//! ## Usage
//!
//! ```rust,no_run
//! use blepush_ble::{BleTransport, BleTransportConfig};
//! use blepush_core::{TargetAddress, Transport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BleTransportConfig::new().with_write_with_response(false);
//! let mut transport = BleTransport::with_config(config);
//!
//! transport.init().await?;
//! let mut events = transport.take_events().expect("fresh transport");
//! transport.start_scan().await?;
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Platform Support
//!
//! Scanning and connecting work wherever btleplug does. On macOS the
//! adapter hides device addresses, so address-based discovery only works on
//! Linux and Windows.

mod config;
mod connection;
mod discovery;
mod error;
mod peer;
mod protocol;
mod transport;

// Public API exports
pub use config::BleTransportConfig;
pub use error::BleTransportError;
pub use peer::{BlePeer, ConnectionState};
pub use transport::BleTransport;

// Re-export Transport trait for convenience
pub use blepush_core::Transport;
