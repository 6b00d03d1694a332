//! BLE transport configuration

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for the BLE transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BleTransportConfig {
    /// Index into the host's adapter list
    pub adapter_index: usize,
    /// Use acknowledged writes instead of write-without-response
    pub write_with_response: bool,
    /// Services a device must advertise to be reported; empty scans everything
    pub scan_service_filter: Vec<Uuid>,
}

impl Default for BleTransportConfig {
    fn default() -> Self {
        Self {
            adapter_index: 0,
            write_with_response: false,
            scan_service_filter: Vec::new(),
        }
    }
}

impl BleTransportConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the adapter to use
    pub fn with_adapter_index(mut self, index: usize) -> Self {
        self.adapter_index = index;
        self
    }

    /// Enable or disable acknowledged writes
    pub fn with_write_with_response(mut self, enabled: bool) -> Self {
        self.write_with_response = enabled;
        self
    }

    /// Only report devices advertising one of `services`
    pub fn with_scan_service_filter(mut self, services: Vec<Uuid>) -> Self {
        self.scan_service_filter = services;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blepush_core::config::DEFAULT_SERVICE_UUID;

    #[test]
    fn test_defaults_scan_unfiltered_without_response() {
        let config = BleTransportConfig::default();
        assert_eq!(config.adapter_index, 0);
        assert!(!config.write_with_response);
        assert!(config.scan_service_filter.is_empty());
    }

    #[test]
    fn test_builder() {
        let config = BleTransportConfig::new()
            .with_adapter_index(1)
            .with_write_with_response(true)
            .with_scan_service_filter(vec![DEFAULT_SERVICE_UUID]);
        assert_eq!(config.adapter_index, 1);
        assert!(config.write_with_response);
        assert_eq!(config.scan_service_filter, vec![DEFAULT_SERVICE_UUID]);
    }
}
