//! Connection management and characteristic access

use blepush_core::{CharProperties, GattTarget, TargetAddress, TransportEvent, TransportError};
use btleplug::api::{Characteristic, Peripheral as _};
use btleplug::platform::Peripheral;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::BleTransportConfig;
use crate::error::{BleResult, BleTransportError};
use crate::peer::ConnectionState;
use crate::protocol::{char_properties, find_characteristic, write_type};
use crate::transport::SharedPeer;

// ----------------------------------------------------------------------------
// Connection Management
// ----------------------------------------------------------------------------

/// Runs link operations against the target peripheral
///
/// Connecting and service discovery can block for a long time on some BLE
/// stacks, so both run on spawned tasks and report through the event channel.
pub struct BleConnection {
    config: BleTransportConfig,
    event_tx: mpsc::UnboundedSender<TransportEvent>,
}

impl BleConnection {
    pub fn new(
        config: BleTransportConfig,
        event_tx: mpsc::UnboundedSender<TransportEvent>,
    ) -> Self {
        Self { config, event_tx }
    }

    /// Start connecting to the peer; the outcome arrives as `ConnectionChanged`
    pub fn spawn_connect(&self, peer: SharedPeer) -> JoinHandle<()> {
        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            let Some((address, peripheral)) = peer
                .read()
                .await
                .as_ref()
                .map(|p| (p.address, p.peripheral.clone()))
            else {
                return;
            };

            let connected = match peripheral.connect().await {
                Ok(()) => {
                    info!("Connected to peer: {}", address);
                    true
                }
                Err(e) => {
                    error!("Failed to connect to peer {}: {}", address, e);
                    false
                }
            };
            if let Some(peer) = peer.write().await.as_mut() {
                peer.connection_state = ConnectionState::after_connect(connected);
            }
            let _ = event_tx.send(TransportEvent::ConnectionChanged { address, connected });
        })
    }

    /// Start service discovery; the outcome arrives as `ServicesResolved`
    pub fn spawn_resolve_services(
        &self,
        address: TargetAddress,
        peripheral: Peripheral,
    ) -> JoinHandle<()> {
        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = peripheral.discover_services().await.map_err(|e| {
                error!("Failed to discover services for peer {}: {}", address, e);
                TransportError::from(BleTransportError::from(e))
            });
            if result.is_ok() {
                debug!(
                    "Discovered {} characteristics on {}",
                    peripheral.characteristics().len(),
                    address
                );
            }
            let _ = event_tx.send(TransportEvent::ServicesResolved { address, result });
        })
    }

    /// Find the target characteristic on a peripheral with resolved services
    pub fn characteristic(
        &self,
        peripheral: &Peripheral,
        target: &GattTarget,
    ) -> BleResult<Characteristic> {
        find_characteristic(&peripheral.characteristics(), target).ok_or(
            BleTransportError::CharacteristicNotFound {
                service: target.service,
                characteristic: target.characteristic,
            },
        )
    }

    pub fn properties(
        &self,
        peripheral: &Peripheral,
        target: &GattTarget,
    ) -> BleResult<CharProperties> {
        let characteristic = self.characteristic(peripheral, target)?;
        Ok(char_properties(characteristic.properties))
    }

    pub async fn subscribe(&self, peripheral: &Peripheral, target: &GattTarget) -> BleResult<()> {
        let characteristic = self.characteristic(peripheral, target)?;
        peripheral
            .subscribe(&characteristic)
            .await
            .map_err(|e| BleTransportError::SubscriptionFailed(e.to_string()))?;
        info!("Subscribed to notifications on {}", target.characteristic);
        Ok(())
    }

    pub async fn unsubscribe(&self, peripheral: &Peripheral, target: &GattTarget) -> BleResult<()> {
        let characteristic = self.characteristic(peripheral, target)?;
        peripheral
            .unsubscribe(&characteristic)
            .await
            .map_err(|e| BleTransportError::SubscriptionFailed(e.to_string()))?;
        debug!("Unsubscribed from {}", target.characteristic);
        Ok(())
    }

    pub async fn write(
        &self,
        peripheral: &Peripheral,
        target: &GattTarget,
        data: &[u8],
    ) -> BleResult<()> {
        let characteristic = self.characteristic(peripheral, target)?;
        peripheral
            .write(
                &characteristic,
                data,
                write_type(self.config.write_with_response),
            )
            .await
            .map_err(|e| BleTransportError::WriteFailed(e.to_string()))?;
        debug!("Wrote {} bytes to {}", data.len(), target.characteristic);
        Ok(())
    }
}
