//! Session controller
//!
//! Sequences discovery → connection → capability negotiation → transfer →
//! teardown. The controller never performs I/O: every event is dispatched to
//! the handler for the current state, which returns the next session value
//! and the actions the runtime must carry out. Results of those actions come
//! back as further events.

use crate::address::TargetAddress;
use crate::chunker::{Chunk, Chunker};
use crate::config::{Acquisition, GattTarget};
use crate::error::SessionError;
use crate::image::Payload;
use crate::session::{Session, SessionState};
use crate::timer::TimerPurpose;
use crate::transport::{CharProperties, TransportEvent};

// ----------------------------------------------------------------------------
// Events and Actions
// ----------------------------------------------------------------------------

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Begin the session
    Start,
    /// External cancellation (interrupt); handled ahead of everything else
    Cancel,
    /// The transport could not be acquired
    InitFailed { reason: String },
    /// Scanning could not be started
    ScanFailed { reason: String },
    Discovered { address: String },
    ConnectionChanged {
        address: TargetAddress,
        connected: bool,
    },
    ServicesResolved { result: Result<(), String> },
    PropertiesRead { result: Result<CharProperties, String> },
    NotifyEnabled { result: Result<(), String> },
    ImageLoaded { result: Result<Payload, String> },
    ChunkWritten {
        index: usize,
        result: Result<(), String>,
    },
    TimerExpired(TimerPurpose),
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Start => "Start",
            SessionEvent::Cancel => "Cancel",
            SessionEvent::InitFailed { .. } => "InitFailed",
            SessionEvent::ScanFailed { .. } => "ScanFailed",
            SessionEvent::Discovered { .. } => "Discovered",
            SessionEvent::ConnectionChanged { .. } => "ConnectionChanged",
            SessionEvent::ServicesResolved { .. } => "ServicesResolved",
            SessionEvent::PropertiesRead { .. } => "PropertiesRead",
            SessionEvent::NotifyEnabled { .. } => "NotifyEnabled",
            SessionEvent::ImageLoaded { .. } => "ImageLoaded",
            SessionEvent::ChunkWritten { .. } => "ChunkWritten",
            SessionEvent::TimerExpired(_) => "TimerExpired",
        }
    }
}

impl From<TransportEvent> for SessionEvent {
    fn from(event: TransportEvent) -> Self {
        match event {
            TransportEvent::Discovered { address } => SessionEvent::Discovered { address },
            TransportEvent::ConnectionChanged { address, connected } => {
                SessionEvent::ConnectionChanged { address, connected }
            }
            TransportEvent::ServicesResolved { result, .. } => SessionEvent::ServicesResolved {
                result: result.map_err(|e| e.to_string()),
            },
        }
    }
}

/// Instructions for the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    InitTransport,
    StartScan,
    StopScan,
    ArmTimer {
        purpose: TimerPurpose,
        duration: std::time::Duration,
    },
    DisarmTimer {
        purpose: TimerPurpose,
    },
    Connect {
        address: TargetAddress,
    },
    Disconnect {
        address: TargetAddress,
    },
    ResolveServices {
        address: TargetAddress,
    },
    QueryProperties {
        address: TargetAddress,
        target: GattTarget,
    },
    EnableNotify {
        address: TargetAddress,
        target: GattTarget,
    },
    DisableNotify {
        address: TargetAddress,
        target: GattTarget,
    },
    LoadImage,
    WriteChunk {
        address: TargetAddress,
        target: GattTarget,
        chunk: Chunk,
    },
    ReleaseTransport,
}

impl Action {
    /// Failures of these actions are logged and never fed back
    pub fn is_best_effort(&self) -> bool {
        matches!(
            self,
            Action::StopScan
                | Action::DisarmTimer { .. }
                | Action::Disconnect { .. }
                | Action::DisableNotify { .. }
                | Action::ReleaseTransport
        )
    }
}

// ----------------------------------------------------------------------------
// Transition Results
// ----------------------------------------------------------------------------

/// Result of dispatching one event
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub session: Session,
    pub actions: Vec<Action>,
    pub audit_entry: AuditEntry,
}

/// Audit trail entry for a dispatched event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub from_state: SessionState,
    pub to_state: SessionState,
    pub event: String,
    pub actions_count: usize,
}

impl AuditEntry {
    /// Whether the event was ignored
    pub fn is_noop(&self) -> bool {
        self.from_state == self.to_state && self.actions_count == 0
    }
}

// ----------------------------------------------------------------------------
// Dispatch
// ----------------------------------------------------------------------------

type Handler = fn(Session, SessionEvent) -> (Session, Vec<Action>);

fn handler_for(state: SessionState) -> Handler {
    match state {
        SessionState::Idle => on_idle,
        SessionState::Scanning => on_scanning,
        SessionState::Connecting => on_connecting,
        SessionState::Negotiating => on_negotiating,
        SessionState::Transmitting => on_transmitting,
        SessionState::Completed | SessionState::Aborted => on_terminal,
    }
}

/// Process one event against `session`
pub fn dispatch(session: Session, event: SessionEvent) -> StateTransition {
    let from_state = session.state();
    let event_name = event.name().to_string();

    let (session, actions) = match event {
        SessionEvent::Cancel => on_cancel(session),
        other => handler_for(from_state)(session, other),
    };

    let audit_entry = AuditEntry {
        from_state,
        to_state: session.state(),
        event: event_name,
        actions_count: actions.len(),
    };
    tracing::debug!(
        "{} --{}--> {} ({} actions)",
        audit_entry.from_state,
        audit_entry.event,
        audit_entry.to_state,
        audit_entry.actions_count
    );

    StateTransition {
        session,
        actions,
        audit_entry,
    }
}

impl Session {
    /// Consume the session and process `event`
    pub fn transition(self, event: SessionEvent) -> StateTransition {
        dispatch(self, event)
    }

    /// Arm the connect timer and start connecting
    fn begin_connect(&mut self, actions: &mut Vec<Action>) {
        self.state = SessionState::Connecting;
        let duration = self.config.connect_timeout();
        if self.timers.arm(TimerPurpose::Connect, duration) {
            actions.push(Action::ArmTimer {
                purpose: TimerPurpose::Connect,
                duration,
            });
        }
        self.link.connecting = true;
        actions.push(Action::Connect {
            address: self.target(),
        });
    }

    /// Issue the next write, or finish when every chunk is out
    fn write_next(&mut self, actions: &mut Vec<Action>) {
        let next = self.chunker.and_then(|c| c.chunk(self.chunks_written));
        match next {
            Some(chunk) => {
                self.in_flight = Some(chunk);
                actions.push(Action::WriteChunk {
                    address: self.target(),
                    target: self.config.gatt_target(),
                    chunk,
                });
            }
            None => actions.extend(self.complete()),
        }
    }

    fn lost_link(&mut self) -> Vec<Action> {
        let state = self.state;
        self.link.connecting = false;
        self.link.connected = false;
        self.link.notify_pending = false;
        self.link.notifying = false;
        self.abort(SessionError::UnexpectedDisconnect {
            address: self.target(),
            state,
        })
    }

    fn service_failure(&mut self, reason: String) -> Vec<Action> {
        self.abort(SessionError::ServiceResolution {
            address: self.target(),
            state: self.state,
            reason,
        })
    }

    fn transport_unavailable(&mut self, reason: String) -> Vec<Action> {
        self.abort(SessionError::TransportUnavailable {
            address: self.target(),
            state: self.state,
            reason,
        })
    }

    fn image_failure(&mut self, reason: String) -> Vec<Action> {
        self.abort(SessionError::ImageLoad {
            address: self.target(),
            state: self.state,
            reason,
        })
    }
}

// ----------------------------------------------------------------------------
// State Handlers
// ----------------------------------------------------------------------------

fn on_cancel(mut session: Session) -> (Session, Vec<Action>) {
    if session.is_terminal() {
        return (session, Vec::new());
    }
    let error = SessionError::Cancelled {
        address: session.target(),
        state: session.state,
    };
    let actions = session.abort(error);
    (session, actions)
}

fn on_idle(mut session: Session, event: SessionEvent) -> (Session, Vec<Action>) {
    let mut actions = Vec::new();
    if event != SessionEvent::Start {
        return (session, actions);
    }

    session.link.transport = true;
    actions.push(Action::InitTransport);

    match session.config.acquisition {
        Acquisition::Discover => {
            session.state = SessionState::Scanning;
            session.link.scanning = true;
            actions.push(Action::StartScan);
            let duration = session.config.scan_timeout();
            if session.timers.arm(TimerPurpose::Scan, duration) {
                actions.push(Action::ArmTimer {
                    purpose: TimerPurpose::Scan,
                    duration,
                });
            }
            tracing::info!("Scanning for {}", session.target());
        }
        Acquisition::Known => {
            session.begin_connect(&mut actions);
            tracing::info!("Connecting to known peer {}", session.target());
        }
    }

    (session, actions)
}

fn on_scanning(mut session: Session, event: SessionEvent) -> (Session, Vec<Action>) {
    let mut actions = Vec::new();
    match event {
        SessionEvent::Discovered { address } if session.matcher.matches(&address) => {
            tracing::info!("Discovered {}", session.target());
            if session.timers.disarm(TimerPurpose::Scan) {
                actions.push(Action::DisarmTimer {
                    purpose: TimerPurpose::Scan,
                });
            }
            if std::mem::take(&mut session.link.scanning) {
                actions.push(Action::StopScan);
            }
            session.begin_connect(&mut actions);
        }
        SessionEvent::TimerExpired(TimerPurpose::Scan)
            if session.timers.disarm(TimerPurpose::Scan) =>
        {
            actions.push(Action::DisarmTimer {
                purpose: TimerPurpose::Scan,
            });
            let error = SessionError::DiscoveryTimeout {
                address: session.target(),
                timeout_ms: session.config.scan_timeout_ms,
            };
            actions.extend(session.abort(error));
        }
        SessionEvent::InitFailed { reason } => {
            session.link.transport = false;
            session.link.scanning = false;
            actions = session.transport_unavailable(reason);
        }
        SessionEvent::ScanFailed { reason } => {
            session.link.scanning = false;
            actions = session.transport_unavailable(reason);
        }
        _ => {}
    }
    (session, actions)
}

fn on_connecting(mut session: Session, event: SessionEvent) -> (Session, Vec<Action>) {
    let mut actions = Vec::new();
    match event {
        SessionEvent::ConnectionChanged {
            address,
            connected: false,
        } if address == session.target() => {
            actions = session.lost_link();
        }
        SessionEvent::ConnectionChanged {
            address,
            connected: true,
        } if address == session.target() => {
            tracing::info!("Connected to {}", address);
            session.link.connecting = false;
            session.link.connected = true;
            if session.timers.disarm(TimerPurpose::Connect) {
                actions.push(Action::DisarmTimer {
                    purpose: TimerPurpose::Connect,
                });
            }
            session.state = SessionState::Negotiating;
            actions.push(Action::ResolveServices { address });
        }
        SessionEvent::TimerExpired(TimerPurpose::Connect)
            if session.timers.disarm(TimerPurpose::Connect) =>
        {
            actions.push(Action::DisarmTimer {
                purpose: TimerPurpose::Connect,
            });
            let error = SessionError::ConnectionTimeout {
                address: session.target(),
                timeout_ms: session.config.connect_timeout_ms,
            };
            actions.extend(session.abort(error));
        }
        SessionEvent::InitFailed { reason } => {
            session.link.transport = false;
            session.link.connecting = false;
            actions = session.transport_unavailable(reason);
        }
        _ => {}
    }
    (session, actions)
}

fn on_negotiating(mut session: Session, event: SessionEvent) -> (Session, Vec<Action>) {
    let mut actions = Vec::new();
    let address = session.target();
    let target = session.config.gatt_target();
    match event {
        SessionEvent::ServicesResolved { result: Ok(()) } => {
            actions.push(Action::QueryProperties { address, target });
        }
        SessionEvent::ServicesResolved { result: Err(reason) } => {
            actions = session.service_failure(reason);
        }
        SessionEvent::PropertiesRead {
            result: Ok(properties),
        } => {
            if properties.supports_notify() {
                session.link.notify_pending = true;
                actions.push(Action::EnableNotify { address, target });
            } else {
                let reason = format!(
                    "characteristic {} does not support notify (properties {:#04x})",
                    target.characteristic,
                    properties.bits()
                );
                actions = session.service_failure(reason);
            }
        }
        SessionEvent::PropertiesRead { result: Err(reason) } => {
            actions = session.service_failure(reason);
        }
        SessionEvent::NotifyEnabled { result } if session.link.notify_pending => {
            session.link.notify_pending = false;
            match result {
                Ok(()) => {
                    tracing::info!("Notifications enabled on {}", target.characteristic);
                    session.link.notifying = true;
                    session.state = SessionState::Transmitting;
                    actions.push(Action::LoadImage);
                }
                Err(reason) => actions = session.service_failure(reason),
            }
        }
        SessionEvent::ConnectionChanged {
            address: peer,
            connected: false,
        } if peer == address => {
            actions = session.lost_link();
        }
        _ => {}
    }
    (session, actions)
}

fn on_transmitting(mut session: Session, event: SessionEvent) -> (Session, Vec<Action>) {
    let mut actions = Vec::new();
    match event {
        SessionEvent::ImageLoaded { result } if session.payload.is_none() => {
            let payload = match result {
                Ok(payload) => payload,
                Err(reason) => {
                    actions = session.image_failure(reason);
                    return (session, actions);
                }
            };
            if payload.len() != session.config.payload_size {
                let reason = format!(
                    "image is {} bytes, expected {}",
                    payload.len(),
                    session.config.payload_size
                );
                actions = session.image_failure(reason);
                return (session, actions);
            }
            let Some(chunker) = Chunker::new(payload.len(), session.config.chunk_size) else {
                let reason = "chunk size must be greater than 0".to_string();
                actions = session.image_failure(reason);
                return (session, actions);
            };
            tracing::info!(
                "Sending {} bytes as {} chunks of up to {} bytes",
                payload.len(),
                chunker.chunk_count(),
                chunker.chunk_size()
            );
            session.payload = Some(payload);
            session.chunker = Some(chunker);
            session.write_next(&mut actions);
        }
        SessionEvent::ChunkWritten { index, result }
            if session.in_flight.map(|c| c.index) == Some(index) =>
        {
            let Some(chunk) = session.in_flight.take() else {
                return (session, actions);
            };
            match result {
                Ok(()) => {
                    session.chunks_written += 1;
                    session.bytes_written += chunk.len;
                    tracing::debug!(
                        "Chunk {} written ({} of {} bytes)",
                        chunk.index,
                        session.bytes_written,
                        session.config.payload_size
                    );
                    session.write_next(&mut actions);
                }
                Err(reason) => {
                    let error = SessionError::Write {
                        address: session.target(),
                        index: chunk.index,
                        offset: chunk.offset,
                        reason,
                    };
                    actions = session.abort(error);
                }
            }
        }
        SessionEvent::ConnectionChanged {
            address,
            connected: false,
        } if address == session.target() => {
            actions = session.lost_link();
        }
        _ => {}
    }
    (session, actions)
}

fn on_terminal(session: Session, _event: SessionEvent) -> (Session, Vec<Action>) {
    (session, Vec::new())
}
