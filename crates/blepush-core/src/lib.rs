//! Core session logic for pushing an image to a BLE peripheral
//!
//! This crate contains no I/O. It models one transfer session as a state
//! machine that consumes [`SessionEvent`]s and answers with [`Action`]s for a
//! runtime to carry out against a [`Transport`].
//!
//! ## Modules
//!
//! - [`address`] - target address parsing and matching
//! - [`chunker`] - bounds-safe payload chunking
//! - [`config`] - session configuration and GATT identifiers
//! - [`controller`] - event dispatch and state handlers
//! - [`error`] - error taxonomy
//! - [`image`] - payload buffer and image sources
//! - [`session`] - session state and teardown
//! - [`timer`] - timer bookkeeping
//! - [`transport`] - transport capability trait and events
//!
//! ## Usage
//!
//! ```rust
//! use blepush_core::{Action, Session, SessionConfig, SessionEvent, SessionState, TargetAddress};
//!
//! let target = TargetAddress::parse("AA:BB:CC:DD:EE:FF")?;
//! let session = Session::new(target, SessionConfig::default())?;
//!
//! let transition = session.transition(SessionEvent::Start);
//! assert_eq!(transition.session.state(), SessionState::Scanning);
//! assert_eq!(transition.actions[0], Action::InitTransport);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod address;
pub mod chunker;
pub mod config;
pub mod controller;
pub mod error;
pub mod image;
pub mod session;
pub mod timer;
pub mod transport;

pub use address::{AddressMatcher, TargetAddress};
pub use chunker::{Chunk, Chunker};
pub use config::{Acquisition, GattTarget, SessionConfig};
pub use controller::{dispatch, Action, AuditEntry, SessionEvent, StateTransition};
pub use error::{ConfigError, ErrorKind, ImageError, SessionError, TransportError};
pub use image::{FileImageSource, ImageFormat, ImageSource, MemoryImageSource, Payload};
pub use session::{LinkResources, Outcome, Session, SessionState};
pub use timer::{TimerPurpose, TimerSet};
pub use transport::{CharProperties, Transport, TransportEvent, TransportEvents, TransportResult};
