//! Target peer state

use blepush_core::TargetAddress;
use btleplug::api::Peripheral as _;
use btleplug::platform::{Peripheral, PeripheralId};

// ----------------------------------------------------------------------------
// Peer State Management
// ----------------------------------------------------------------------------

/// Link state of the target peer as seen by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl ConnectionState {
    /// State after a connection attempt finished
    pub fn after_connect(connected: bool) -> Self {
        if connected {
            ConnectionState::Connected
        } else {
            ConnectionState::Failed
        }
    }

    /// Whether a disconnect request has anything to tear down
    pub fn needs_disconnect(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Connected
        )
    }
}

/// The peripheral a session talks to
#[derive(Debug, Clone)]
pub struct BlePeer {
    pub address: TargetAddress,
    pub peripheral: Peripheral,
    pub connection_state: ConnectionState,
}

impl BlePeer {
    pub fn new(address: TargetAddress, peripheral: Peripheral) -> Self {
        Self {
            address,
            peripheral,
            connection_state: ConnectionState::Disconnected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state == ConnectionState::Connected
    }

    /// Peripheral ID for matching adapter events
    pub fn peripheral_id(&self) -> PeripheralId {
        self.peripheral.id()
    }
}
