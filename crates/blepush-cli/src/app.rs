//! Wires configuration, transport and runner into one push

use blepush_ble::BleTransport;
use blepush_core::TargetAddress;
use blepush_runtime::{cancel_pair, CancelHandle, SessionReport, SessionRunner};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::Result;

/// One image push to one peripheral
#[derive(Debug)]
pub struct PushApp {
    target: TargetAddress,
    config: AppConfig,
}

impl PushApp {
    /// Validate the address and configuration before any transport is touched
    pub fn new(address: &str, config: AppConfig) -> Result<Self> {
        let target = TargetAddress::parse(address)?;
        config.validate()?;
        Ok(Self { target, config })
    }

    pub fn target(&self) -> TargetAddress {
        self.target
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run the session over BLE until it completes, fails or is interrupted
    pub async fn run(self) -> Result<SessionReport> {
        let image = self.config.image_source()?;
        let transport = BleTransport::with_config(self.config.ble.clone());
        let (cancel, signal) = cancel_pair();
        let runner = SessionRunner::new(
            self.target,
            self.config.session.clone(),
            transport,
            image,
            signal,
        )?;

        let ctrl_c = spawn_ctrl_c_listener(cancel);
        let report = runner.run().await;
        ctrl_c.abort();

        Ok(report)
    }
}

/// Cancel the session on the first Ctrl-C
pub fn spawn_ctrl_c_listener(cancel: CancelHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, stopping");
                cancel.cancel();
            }
            Err(e) => warn!("Unable to listen for Ctrl-C: {}", e),
        }
    })
}
