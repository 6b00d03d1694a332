//! Scripted transport for runner tests
//!
//! Plays back a fixed peripheral behaviour on tokio's clock and records every
//! call the runner makes, so tests can assert on the exact call sequence.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use blepush_core::{
    CharProperties, GattTarget, TargetAddress, Transport, TransportError, TransportEvent,
    TransportEvents, TransportResult,
};
use blepush_runtime::CancelHandle;
use tokio::sync::mpsc;

// ----------------------------------------------------------------------------
// Script
// ----------------------------------------------------------------------------

/// How the simulated peripheral behaves
#[derive(Debug, Clone)]
pub struct Script {
    pub init_fails: bool,
    /// Delay before the target advertises; `None` means it never does
    pub advertise_after: Option<Duration>,
    /// Other devices advertised before the target
    pub bystanders: Vec<String>,
    /// Delay before a connection attempt is answered; `None` means never
    pub connect_after: Option<Duration>,
    pub refuse_connection: bool,
    pub properties: CharProperties,
    /// Zero-based write index that is rejected
    pub fail_write: Option<usize>,
    /// Drop the link once this many writes were accepted
    pub drop_link_after_writes: Option<usize>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            init_fails: false,
            advertise_after: Some(Duration::from_millis(100)),
            bystanders: vec!["11:22:33:44:55:66".to_string()],
            connect_after: Some(Duration::from_millis(50)),
            refuse_connection: false,
            properties: CharProperties::WRITE | CharProperties::NOTIFY,
            fail_write: None,
            drop_link_after_writes: None,
        }
    }
}

/// A call the runner made on the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Init,
    Deinit,
    StartScan,
    StopScan,
    Connect,
    Disconnect,
    ResolveServices,
    Properties,
    EnableNotify,
    DisableNotify,
    Write(Vec<u8>),
}

// ----------------------------------------------------------------------------
// Scripted Transport
// ----------------------------------------------------------------------------

pub struct ScriptedTransport {
    target: TargetAddress,
    script: Script,
    calls: Arc<Mutex<Vec<Call>>>,
    event_tx: mpsc::UnboundedSender<TransportEvent>,
    event_rx: Option<TransportEvents>,
    writes: usize,
    cancel_after_writes: Option<(usize, CancelHandle)>,
}

impl ScriptedTransport {
    pub fn new(target: TargetAddress, script: Script) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            target,
            script,
            calls: Arc::new(Mutex::new(Vec::new())),
            event_tx,
            event_rx: Some(event_rx),
            writes: 0,
            cancel_after_writes: None,
        }
    }

    /// Raise `handle` from inside the `count`-th accepted write
    pub fn with_cancel_after_writes(mut self, count: usize, handle: CancelHandle) -> Self {
        self.cancel_after_writes = Some((count, handle));
        self
    }

    /// Shared view of the call log
    pub fn call_log(&self) -> Arc<Mutex<Vec<Call>>> {
        Arc::clone(&self.calls)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

pub fn writes(calls: &[Call]) -> Vec<&[u8]> {
    calls
        .iter()
        .filter_map(|call| match call {
            Call::Write(bytes) => Some(bytes.as_slice()),
            _ => None,
        })
        .collect()
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn init(&mut self) -> TransportResult<()> {
        self.record(Call::Init);
        if self.script.init_fails {
            return Err(TransportError::AdapterUnavailable("no adapter".to_string()));
        }
        Ok(())
    }

    async fn deinit(&mut self) -> TransportResult<()> {
        self.record(Call::Deinit);
        Ok(())
    }

    fn take_events(&mut self) -> Option<TransportEvents> {
        self.event_rx.take()
    }

    async fn start_scan(&mut self) -> TransportResult<()> {
        self.record(Call::StartScan);
        if let Some(delay) = self.script.advertise_after {
            let tx = self.event_tx.clone();
            let mut seen = self.script.bystanders.clone();
            seen.push(self.target.to_string().to_lowercase());
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                for address in seen {
                    let _ = tx.send(TransportEvent::Discovered { address });
                }
            });
        }
        Ok(())
    }

    async fn stop_scan(&mut self) -> TransportResult<()> {
        self.record(Call::StopScan);
        Ok(())
    }

    async fn connect(&mut self, address: &TargetAddress) -> TransportResult<()> {
        self.record(Call::Connect);
        if let Some(delay) = self.script.connect_after {
            let tx = self.event_tx.clone();
            let address = *address;
            let connected = !self.script.refuse_connection;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = tx.send(TransportEvent::ConnectionChanged { address, connected });
            });
        }
        Ok(())
    }

    async fn disconnect(&mut self, _address: &TargetAddress) -> TransportResult<()> {
        self.record(Call::Disconnect);
        Ok(())
    }

    async fn resolve_services(&mut self, address: &TargetAddress) -> TransportResult<()> {
        self.record(Call::ResolveServices);
        let _ = self.event_tx.send(TransportEvent::ServicesResolved {
            address: *address,
            result: Ok(()),
        });
        Ok(())
    }

    async fn characteristic_properties(
        &mut self,
        _address: &TargetAddress,
        _target: &GattTarget,
    ) -> TransportResult<CharProperties> {
        self.record(Call::Properties);
        Ok(self.script.properties)
    }

    async fn enable_notify(
        &mut self,
        _address: &TargetAddress,
        _target: &GattTarget,
    ) -> TransportResult<()> {
        self.record(Call::EnableNotify);
        Ok(())
    }

    async fn disable_notify(
        &mut self,
        _address: &TargetAddress,
        _target: &GattTarget,
    ) -> TransportResult<()> {
        self.record(Call::DisableNotify);
        Ok(())
    }

    async fn write_characteristic(
        &mut self,
        address: &TargetAddress,
        _target: &GattTarget,
        bytes: &[u8],
    ) -> TransportResult<()> {
        self.record(Call::Write(bytes.to_vec()));
        if self.script.fail_write == Some(self.writes) {
            return Err(TransportError::Write("att error 0x0e".to_string()));
        }
        self.writes += 1;

        if let Some((count, handle)) = &self.cancel_after_writes {
            if self.writes == *count {
                handle.cancel();
            }
        }
        if self.script.drop_link_after_writes == Some(self.writes) {
            let _ = self.event_tx.send(TransportEvent::ConnectionChanged {
                address: *address,
                connected: false,
            });
        }
        Ok(())
    }
}
