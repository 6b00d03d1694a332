//! Error types for BLE transport

use blepush_core::{TargetAddress, TransportError};
use thiserror::Error;
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors specific to the BLE transport
#[derive(Error, Debug)]
pub enum BleTransportError {
    #[error("Failed to create BLE manager: {0}")]
    ManagerFailed(String),

    #[error("BLE adapter {index} not available ({available} found)")]
    AdapterNotAvailable { index: usize, available: usize },

    #[error("BLE adapter not initialized")]
    NotInitialized,

    #[error("Failed to get BLE events: {0}")]
    EventStreamFailed(String),

    #[error("Failed to start BLE scan: {0}")]
    ScanFailed(String),

    #[error("Peer {address} not found")]
    PeerNotFound { address: TargetAddress },

    #[error("Characteristic {characteristic} not found in service {service}")]
    CharacteristicNotFound { service: Uuid, characteristic: Uuid },

    #[error("Failed to subscribe to notifications: {0}")]
    SubscriptionFailed(String),

    #[error("Failed to write to characteristic: {0}")]
    WriteFailed(String),

    #[error("BLE error: {0}")]
    Btleplug(#[from] btleplug::Error),
}

impl From<BleTransportError> for TransportError {
    fn from(err: BleTransportError) -> Self {
        match err {
            BleTransportError::ManagerFailed(reason) => TransportError::AdapterUnavailable(reason),
            e @ BleTransportError::AdapterNotAvailable { .. } => {
                TransportError::AdapterUnavailable(e.to_string())
            }
            BleTransportError::NotInitialized => TransportError::NotInitialized,
            BleTransportError::EventStreamFailed(reason) => {
                TransportError::AdapterUnavailable(reason)
            }
            BleTransportError::ScanFailed(reason) => TransportError::Scan(reason),
            BleTransportError::PeerNotFound { address } => TransportError::PeerNotFound { address },
            BleTransportError::CharacteristicNotFound {
                service,
                characteristic,
            } => TransportError::CharacteristicNotFound {
                service,
                characteristic,
            },
            BleTransportError::SubscriptionFailed(reason) => TransportError::Notify(reason),
            BleTransportError::WriteFailed(reason) => TransportError::Write(reason),
            BleTransportError::Btleplug(e) => TransportError::Other(e.to_string()),
        }
    }
}

pub type BleResult<T> = Result<T, BleTransportError>;
