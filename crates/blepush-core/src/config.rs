//! Session configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConfigError;

// ----------------------------------------------------------------------------
// Service and Characteristic UUIDs
// ----------------------------------------------------------------------------

/// Serial-port-style data service exposed by the peripheral
pub const DEFAULT_SERVICE_UUID: Uuid = Uuid::from_u128(0x4880C12C_FDCB_4077_8920_A450D7F9B907);

/// Data characteristic inside [`DEFAULT_SERVICE_UUID`]
pub const DEFAULT_DATA_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0xFEC26EC4_6D71_4442_9F81_55BC21D658D6);

pub const DEFAULT_SCAN_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 25_000;
pub const DEFAULT_CHUNK_SIZE: usize = 244;
pub const DEFAULT_PAYLOAD_SIZE: usize = 4736;

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// How the session obtains a connectable peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Acquisition {
    /// Scan until the target address advertises
    #[default]
    Discover,
    /// Connect straight away; the adapter already knows the peer
    Known,
}

/// Service/characteristic pair every characteristic call is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GattTarget {
    pub service: Uuid,
    pub characteristic: Uuid,
}

impl Default for GattTarget {
    fn default() -> Self {
        Self {
            service: DEFAULT_SERVICE_UUID,
            characteristic: DEFAULT_DATA_CHARACTERISTIC_UUID,
        }
    }
}

/// Configuration for one transfer session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long to scan for the target before giving up
    pub scan_timeout_ms: u64,
    /// How long to wait for the connection to come up
    pub connect_timeout_ms: u64,
    /// Bytes per characteristic write
    pub chunk_size: usize,
    /// Exact payload length the image source must deliver
    pub payload_size: usize,
    pub service_uuid: Uuid,
    pub data_characteristic_uuid: Uuid,
    pub acquisition: Acquisition,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scan_timeout_ms: DEFAULT_SCAN_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            payload_size: DEFAULT_PAYLOAD_SIZE,
            service_uuid: DEFAULT_SERVICE_UUID,
            data_characteristic_uuid: DEFAULT_DATA_CHARACTERISTIC_UUID,
            acquisition: Acquisition::Discover,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set scan timeout
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn with_payload_size(mut self, size: usize) -> Self {
        self.payload_size = size;
        self
    }

    pub fn with_gatt_target(mut self, target: GattTarget) -> Self {
        self.service_uuid = target.service;
        self.data_characteristic_uuid = target.characteristic;
        self
    }

    pub fn with_acquisition(mut self, acquisition: Acquisition) -> Self {
        self.acquisition = acquisition;
        self
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn gatt_target(&self) -> GattTarget {
        GattTarget {
            service: self.service_uuid,
            characteristic: self.data_characteristic_uuid,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Validation(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.payload_size == 0 {
            return Err(ConfigError::Validation(
                "payload_size must be greater than 0".to_string(),
            ));
        }
        if self.scan_timeout_ms == 0 && self.acquisition == Acquisition::Discover {
            return Err(ConfigError::Validation(
                "scan_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "connect_timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.scan_timeout(), Duration::from_secs(30));
        assert_eq!(config.connect_timeout(), Duration::from_secs(25));
        assert_eq!(config.chunk_size, 244);
        assert_eq!(config.payload_size, 4736);
        assert_eq!(
            config.service_uuid.to_string(),
            "4880c12c-fdcb-4077-8920-a450d7f9b907"
        );
        assert_eq!(
            config.data_characteristic_uuid.to_string(),
            "fec26ec4-6d71-4442-9f81-55bc21d658d6"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        assert!(SessionConfig::new().with_chunk_size(0).validate().is_err());
        assert!(SessionConfig::new().with_payload_size(0).validate().is_err());
        assert!(SessionConfig::new()
            .with_connect_timeout(Duration::ZERO)
            .validate()
            .is_err());

        // A known peer never scans
        let known = SessionConfig::new()
            .with_acquisition(Acquisition::Known)
            .with_scan_timeout(Duration::ZERO);
        assert!(known.validate().is_ok());
    }
}
