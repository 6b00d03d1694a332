//! Adapter setup, scanning and adapter event handling

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use blepush_core::{TargetAddress, TransportEvent};
use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::BleTransportConfig;
use crate::error::{BleResult, BleTransportError};
use crate::peer::ConnectionState;
use crate::protocol::{address_text, target_address};
use crate::transport::SharedPeer;

type CentralEvents = Pin<Box<dyn Stream<Item = CentralEvent> + Send>>;

// ----------------------------------------------------------------------------
// Discovery Implementation
// ----------------------------------------------------------------------------

/// Owns the adapter and turns its events into transport events
pub struct BleDiscovery {
    config: BleTransportConfig,
    adapter: Option<Adapter>,
    scanning: Arc<AtomicBool>,
    event_pump: Option<JoinHandle<()>>,
}

impl BleDiscovery {
    pub fn new(config: BleTransportConfig) -> Self {
        Self {
            config,
            adapter: None,
            scanning: Arc::new(AtomicBool::new(false)),
            event_pump: None,
        }
    }

    /// Initialize the configured BLE adapter
    pub async fn initialize_adapter(&mut self) -> BleResult<()> {
        let manager = Manager::new()
            .await
            .map_err(|e| BleTransportError::ManagerFailed(e.to_string()))?;
        let adapters = manager.adapters().await?;

        let index = self.config.adapter_index;
        let adapter = adapters
            .get(index)
            .cloned()
            .ok_or(BleTransportError::AdapterNotAvailable {
                index,
                available: adapters.len(),
            })?;

        self.adapter = Some(adapter);
        info!("BLE adapter {} initialized", index);
        Ok(())
    }

    pub fn adapter(&self) -> BleResult<&Adapter> {
        self.adapter.as_ref().ok_or(BleTransportError::NotInitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.adapter.is_some()
    }

    /// Subscribe to adapter events and forward the relevant ones
    pub async fn start_event_pump(
        &mut self,
        event_tx: mpsc::UnboundedSender<TransportEvent>,
        peer: SharedPeer,
    ) -> BleResult<()> {
        let adapter = self.adapter()?.clone();
        let events = adapter
            .events()
            .await
            .map_err(|e| BleTransportError::EventStreamFailed(e.to_string()))?;

        let scanning = Arc::clone(&self.scanning);
        self.event_pump = Some(tokio::spawn(pump_events(
            adapter, events, event_tx, peer, scanning,
        )));
        Ok(())
    }

    pub async fn start_scanning(&self) -> BleResult<()> {
        let adapter = self.adapter()?;
        let scan_filter = ScanFilter {
            services: self.config.scan_service_filter.clone(),
        };
        adapter
            .start_scan(scan_filter)
            .await
            .map_err(|e| BleTransportError::ScanFailed(e.to_string()))?;

        self.scanning.store(true, Ordering::SeqCst);
        info!("Started BLE scanning");
        Ok(())
    }

    pub async fn stop_scanning(&self) -> BleResult<()> {
        if !self.scanning.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(adapter) = &self.adapter {
            adapter.stop_scan().await?;
            debug!("Stopped BLE scanning");
        }
        Ok(())
    }

    /// Look up the peripheral with `address` among those the adapter knows
    pub async fn find_peripheral(&self, address: &TargetAddress) -> BleResult<Peripheral> {
        let adapter = self.adapter()?;
        for peripheral in adapter.peripherals().await? {
            if address.matches(&address_text(&peripheral.address())) {
                return Ok(peripheral);
            }
        }
        Err(BleTransportError::PeerNotFound { address: *address })
    }

    /// Stop scanning and the event pump, then drop the adapter
    pub async fn shutdown(&mut self) -> BleResult<()> {
        let result = self.stop_scanning().await;
        if let Some(pump) = self.event_pump.take() {
            pump.abort();
        }
        if self.adapter.take().is_some() {
            info!("BLE adapter released");
        }
        result
    }
}

// ----------------------------------------------------------------------------
// Event Pump
// ----------------------------------------------------------------------------

async fn pump_events(
    adapter: Adapter,
    mut events: CentralEvents,
    event_tx: mpsc::UnboundedSender<TransportEvent>,
    peer: SharedPeer,
    scanning: Arc<AtomicBool>,
) {
    while let Some(event) = events.next().await {
        if let Some(event) = process_central_event(&adapter, event, &peer, &scanning).await {
            if event_tx.send(event).is_err() {
                break;
            }
        }
    }
    debug!("BLE event pump ended");
}

/// Translate one adapter event
///
/// Discoveries are reported only while scanning; disconnects only for the
/// peer being connected or already connected.
async fn process_central_event(
    adapter: &Adapter,
    event: CentralEvent,
    peer: &SharedPeer,
    scanning: &AtomicBool,
) -> Option<TransportEvent> {
    match event {
        CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
            if !scanning.load(Ordering::SeqCst) {
                return None;
            }
            let peripheral = adapter.peripheral(&id).await.ok()?;
            let address = target_address(&peripheral.address())?;
            debug!("Discovered {}", address);
            Some(TransportEvent::Discovered {
                address: address.to_string(),
            })
        }
        CentralEvent::DeviceDisconnected(id) => {
            let mut guard = peer.write().await;
            let peer = guard.as_mut()?;
            if peer.peripheral_id() != id || !peer.connection_state.needs_disconnect() {
                return None;
            }
            peer.connection_state = ConnectionState::Disconnected;
            info!("Peer {} disconnected", peer.address);
            Some(TransportEvent::ConnectionChanged {
                address: peer.address,
                connected: false,
            })
        }
        _ => None,
    }
}
