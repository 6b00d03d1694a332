//! Transport abstraction
//!
//! A [`Transport`] is the radio/link capability the session drives. Calls
//! that can take an unbounded amount of time on real hardware (`connect`,
//! `resolve_services`) only initiate the operation; their outcome arrives
//! later on the event subscription so the session's timers stay live.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::address::TargetAddress;
use crate::config::GattTarget;
use crate::error::TransportError;

pub type TransportResult<T> = Result<T, TransportError>;

// ----------------------------------------------------------------------------
// Characteristic Properties
// ----------------------------------------------------------------------------

/// GATT characteristic property bits (Core Spec Vol 3, Part G, 3.3.1.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct CharProperties(u8);

impl CharProperties {
    pub const BROADCAST: Self = Self(0x01);
    pub const READ: Self = Self(0x02);
    pub const WRITE_WITHOUT_RESPONSE: Self = Self(0x04);
    pub const WRITE: Self = Self(0x08);
    pub const NOTIFY: Self = Self(0x10);
    pub const INDICATE: Self = Self(0x20);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn supports_notify(&self) -> bool {
        self.contains(Self::NOTIFY)
    }
}

impl std::ops::BitOr for CharProperties {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

// ----------------------------------------------------------------------------
// Transport Events
// ----------------------------------------------------------------------------

/// Asynchronous notifications from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// An advertising device was seen; `address` is in textual form
    Discovered { address: String },
    /// Outcome of a connection attempt, or a link-state change of the peer
    ConnectionChanged {
        address: TargetAddress,
        connected: bool,
    },
    /// Outcome of service resolution on the connected peer
    ServicesResolved {
        address: TargetAddress,
        result: Result<(), TransportError>,
    },
}

pub type TransportEvents = mpsc::UnboundedReceiver<TransportEvent>;

// ----------------------------------------------------------------------------
// Transport Trait
// ----------------------------------------------------------------------------

/// Radio/link operations consumed by the session runtime
#[async_trait]
pub trait Transport: Send {
    /// Acquire the underlying adapter
    async fn init(&mut self) -> TransportResult<()>;

    /// Release the adapter; a no-op when nothing is held
    async fn deinit(&mut self) -> TransportResult<()>;

    /// Hand out the event subscription; returns `None` once taken
    fn take_events(&mut self) -> Option<TransportEvents>;

    async fn start_scan(&mut self) -> TransportResult<()>;

    async fn stop_scan(&mut self) -> TransportResult<()>;

    /// Begin connecting; the result arrives as [`TransportEvent::ConnectionChanged`]
    async fn connect(&mut self, address: &TargetAddress) -> TransportResult<()>;

    async fn disconnect(&mut self, address: &TargetAddress) -> TransportResult<()>;

    /// Begin service discovery; the result arrives as [`TransportEvent::ServicesResolved`]
    async fn resolve_services(&mut self, address: &TargetAddress) -> TransportResult<()>;

    async fn characteristic_properties(
        &mut self,
        address: &TargetAddress,
        target: &GattTarget,
    ) -> TransportResult<CharProperties>;

    async fn enable_notify(
        &mut self,
        address: &TargetAddress,
        target: &GattTarget,
    ) -> TransportResult<()>;

    async fn disable_notify(
        &mut self,
        address: &TargetAddress,
        target: &GattTarget,
    ) -> TransportResult<()>;

    async fn write_characteristic(
        &mut self,
        address: &TargetAddress,
        target: &GattTarget,
        bytes: &[u8],
    ) -> TransportResult<()>;
}
