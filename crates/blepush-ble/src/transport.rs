//! BLE Transport Implementation

use std::sync::Arc;

use async_trait::async_trait;
use blepush_core::{
    CharProperties, GattTarget, TargetAddress, Transport, TransportError, TransportEvent,
    TransportEvents, TransportResult,
};
use btleplug::api::Peripheral as _;
use btleplug::platform::Peripheral;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::BleTransportConfig;
use crate::connection::BleConnection;
use crate::discovery::BleDiscovery;
use crate::error::BleTransportError;
use crate::peer::{BlePeer, ConnectionState};

/// Target peer shared with the spawned link tasks
pub(crate) type SharedPeer = Arc<RwLock<Option<BlePeer>>>;

// ----------------------------------------------------------------------------
// BLE Transport
// ----------------------------------------------------------------------------

/// btleplug-backed [`Transport`]
pub struct BleTransport {
    config: BleTransportConfig,
    discovery: BleDiscovery,
    connection: BleConnection,
    peer: SharedPeer,
    event_tx: mpsc::UnboundedSender<TransportEvent>,
    event_rx: Option<TransportEvents>,
    /// Pending connect or service discovery
    link_task: Option<JoinHandle<()>>,
}

impl Default for BleTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl BleTransport {
    pub fn new() -> Self {
        Self::with_config(BleTransportConfig::default())
    }

    pub fn with_config(config: BleTransportConfig) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            discovery: BleDiscovery::new(config.clone()),
            connection: BleConnection::new(config.clone(), event_tx.clone()),
            config,
            peer: Arc::new(RwLock::new(None)),
            event_tx,
            event_rx: Some(event_rx),
            link_task: None,
        }
    }

    pub fn config(&self) -> &BleTransportConfig {
        &self.config
    }

    /// Peripheral for `address`, if it is the tracked peer
    async fn peripheral(&self, address: &TargetAddress) -> TransportResult<Peripheral> {
        if !self.discovery.is_initialized() {
            return Err(TransportError::NotInitialized);
        }
        self.peer
            .read()
            .await
            .as_ref()
            .filter(|peer| peer.address == *address)
            .map(|peer| peer.peripheral.clone())
            .ok_or(TransportError::PeerNotFound { address: *address })
    }

    /// Peripheral for `address`, which must be connected
    async fn connected_peripheral(&self, address: &TargetAddress) -> TransportResult<Peripheral> {
        let connected = self
            .peer
            .read()
            .await
            .as_ref()
            .is_some_and(|peer| peer.address == *address && peer.is_connected());
        if !connected {
            return Err(TransportError::NotConnected { address: *address });
        }
        self.peripheral(address).await
    }

    fn abort_link_task(&mut self) {
        if let Some(task) = self.link_task.take() {
            task.abort();
        }
    }
}

#[async_trait]
impl Transport for BleTransport {
    async fn init(&mut self) -> TransportResult<()> {
        self.discovery.initialize_adapter().await?;
        self.discovery
            .start_event_pump(self.event_tx.clone(), Arc::clone(&self.peer))
            .await?;
        Ok(())
    }

    async fn deinit(&mut self) -> TransportResult<()> {
        self.abort_link_task();
        *self.peer.write().await = None;
        self.discovery.shutdown().await?;
        Ok(())
    }

    fn take_events(&mut self) -> Option<TransportEvents> {
        self.event_rx.take()
    }

    async fn start_scan(&mut self) -> TransportResult<()> {
        self.discovery.start_scanning().await?;
        Ok(())
    }

    async fn stop_scan(&mut self) -> TransportResult<()> {
        self.discovery.stop_scanning().await?;
        Ok(())
    }

    async fn connect(&mut self, address: &TargetAddress) -> TransportResult<()> {
        let peripheral = self.discovery.find_peripheral(address).await?;
        let mut peer = BlePeer::new(*address, peripheral);
        peer.connection_state = ConnectionState::Connecting;
        *self.peer.write().await = Some(peer);

        info!("Connecting to {}", address);
        self.abort_link_task();
        self.link_task = Some(self.connection.spawn_connect(Arc::clone(&self.peer)));
        Ok(())
    }

    async fn disconnect(&mut self, address: &TargetAddress) -> TransportResult<()> {
        self.abort_link_task();
        let peripheral = self.peripheral(address).await?;

        let mut guard = self.peer.write().await;
        let needs_disconnect = guard
            .as_ref()
            .is_some_and(|peer| peer.connection_state.needs_disconnect());
        if let Some(peer) = guard.as_mut() {
            peer.connection_state = ConnectionState::Disconnected;
        }
        drop(guard);

        if needs_disconnect {
            peripheral
                .disconnect()
                .await
                .map_err(BleTransportError::from)?;
            info!("Disconnected from peer: {}", address);
        }
        Ok(())
    }

    async fn resolve_services(&mut self, address: &TargetAddress) -> TransportResult<()> {
        let peripheral = self.connected_peripheral(address).await?;
        self.link_task = Some(self.connection.spawn_resolve_services(*address, peripheral));
        Ok(())
    }

    async fn characteristic_properties(
        &mut self,
        address: &TargetAddress,
        target: &GattTarget,
    ) -> TransportResult<CharProperties> {
        let peripheral = self.connected_peripheral(address).await?;
        Ok(self.connection.properties(&peripheral, target)?)
    }

    async fn enable_notify(
        &mut self,
        address: &TargetAddress,
        target: &GattTarget,
    ) -> TransportResult<()> {
        let peripheral = self.connected_peripheral(address).await?;
        self.connection.subscribe(&peripheral, target).await?;
        Ok(())
    }

    async fn disable_notify(
        &mut self,
        address: &TargetAddress,
        target: &GattTarget,
    ) -> TransportResult<()> {
        let peripheral = self.connected_peripheral(address).await?;
        if let Err(e) = self.connection.unsubscribe(&peripheral, target).await {
            warn!("Failed to disable notifications on {}: {}", address, e);
            return Err(e.into());
        }
        Ok(())
    }

    async fn write_characteristic(
        &mut self,
        address: &TargetAddress,
        target: &GattTarget,
        bytes: &[u8],
    ) -> TransportResult<()> {
        let peripheral = self.connected_peripheral(address).await?;
        self.connection.write(&peripheral, target, bytes).await?;
        Ok(())
    }
}
