//! Session state
//!
//! A [`Session`] is the live state of one attempt to discover, connect to and
//! transfer a payload to a single peripheral. It records every resource the
//! controller has asked the runtime to acquire so that a single teardown
//! procedure can release exactly those resources, once.

use std::fmt;

use crate::address::{AddressMatcher, TargetAddress};
use crate::chunker::{Chunk, Chunker};
use crate::config::SessionConfig;
use crate::controller::Action;
use crate::error::{ConfigError, SessionError};
use crate::image::Payload;
use crate::timer::{TimerPurpose, TimerSet};

// ----------------------------------------------------------------------------
// Session State
// ----------------------------------------------------------------------------

/// Phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Scanning,
    Connecting,
    Negotiating,
    Transmitting,
    Completed,
    Aborted,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Aborted)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Scanning => "Scanning",
            SessionState::Connecting => "Connecting",
            SessionState::Negotiating => "Negotiating",
            SessionState::Transmitting => "Transmitting",
            SessionState::Completed => "Completed",
            SessionState::Aborted => "Aborted",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Terminal result of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Aborted(SessionError),
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed)
    }

    pub fn error(&self) -> Option<&SessionError> {
        match self {
            Outcome::Completed => None,
            Outcome::Aborted(err) => Some(err),
        }
    }

    pub fn into_result(self) -> Result<(), SessionError> {
        match self {
            Outcome::Completed => Ok(()),
            Outcome::Aborted(err) => Err(err),
        }
    }
}

/// Link resources requested from the transport and not yet released
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkResources {
    pub transport: bool,
    pub scanning: bool,
    pub connecting: bool,
    pub connected: bool,
    /// Notify requested, result not yet seen
    pub notify_pending: bool,
    pub notifying: bool,
}

// ----------------------------------------------------------------------------
// Session
// ----------------------------------------------------------------------------

/// Live state of one transfer attempt
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) state: SessionState,
    pub(crate) matcher: AddressMatcher,
    pub(crate) config: SessionConfig,
    pub(crate) timers: TimerSet,
    pub(crate) link: LinkResources,
    pub(crate) payload: Option<Payload>,
    pub(crate) chunker: Option<Chunker>,
    /// Chunk whose write has been issued and not yet completed
    pub(crate) in_flight: Option<Chunk>,
    pub(crate) chunks_written: usize,
    pub(crate) bytes_written: usize,
    pub(crate) outcome: Option<Outcome>,
}

impl Session {
    /// Create an idle session; the configuration is validated here
    pub fn new(target: TargetAddress, config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: SessionState::Idle,
            matcher: AddressMatcher::new(target),
            config,
            timers: TimerSet::new(),
            link: LinkResources::default(),
            payload: None,
            chunker: None,
            in_flight: None,
            chunks_written: 0,
            bytes_written: 0,
            outcome: None,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn target(&self) -> TargetAddress {
        self.matcher.target()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }

    pub fn link(&self) -> LinkResources {
        self.link
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Chunks whose write completed successfully
    pub fn chunks_written(&self) -> usize {
        self.chunks_written
    }

    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// Chunk count of the loaded payload, zero before it is loaded
    pub fn total_chunks(&self) -> usize {
        self.chunker.map(|c| c.chunk_count()).unwrap_or(0)
    }

    /// Release every resource still held, in a fixed order
    ///
    /// Each resource is released at most once over the session's lifetime;
    /// calling this again yields no actions.
    pub fn teardown(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        let address = self.target();

        for purpose in TimerPurpose::ALL {
            if self.timers.disarm(purpose) {
                actions.push(Action::DisarmTimer { purpose });
            }
        }
        if std::mem::take(&mut self.link.scanning) {
            actions.push(Action::StopScan);
        }
        self.link.notify_pending = false;
        if std::mem::take(&mut self.link.notifying) && self.link.connected {
            actions.push(Action::DisableNotify {
                address,
                target: self.config.gatt_target(),
            });
        }
        let connecting = std::mem::take(&mut self.link.connecting);
        if std::mem::take(&mut self.link.connected) || connecting {
            actions.push(Action::Disconnect { address });
        }
        if std::mem::take(&mut self.link.transport) {
            actions.push(Action::ReleaseTransport);
        }
        self.in_flight = None;

        actions
    }

    /// Move to `Aborted` with `error` and tear down
    pub(crate) fn abort(&mut self, error: SessionError) -> Vec<Action> {
        tracing::error!(
            "Session with {} aborted in {}: {}",
            self.target(),
            self.state,
            error
        );
        self.state = SessionState::Aborted;
        self.outcome = Some(Outcome::Aborted(error));
        self.teardown()
    }

    /// Move to `Completed` and tear down
    pub(crate) fn complete(&mut self) -> Vec<Action> {
        tracing::info!(
            "Transferred {} bytes in {} chunks to {}",
            self.bytes_written,
            self.chunks_written,
            self.target()
        );
        self.state = SessionState::Completed;
        self.outcome = Some(Outcome::Completed);
        self.teardown()
    }
}
