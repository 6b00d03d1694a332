//! Session Runner
//!
//! Owns a [`Session`] and carries out the actions it emits against a
//! [`Transport`], feeding every result back as an event. The loop waits on
//! three sources: external cancellation, the transport's event subscription
//! and the armed timers. Cancellation is always checked first.

use std::collections::VecDeque;
use std::time::Duration;

use blepush_core::{
    Action, AuditEntry, ConfigError, ImageSource, Outcome, Session, SessionConfig,
    SessionEvent, SessionState, TargetAddress, Transport, TransportEvent, TransportEvents,
};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cancel::CancelSignal;
use crate::timers::TimerService;

// ----------------------------------------------------------------------------
// Session Report
// ----------------------------------------------------------------------------

/// Summary of a finished session
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub target: TargetAddress,
    pub outcome: Outcome,
    pub final_state: SessionState,
    /// Writes the transport accepted
    pub chunks_written: usize,
    pub bytes_written: usize,
    /// Chunk count of the loaded payload, zero if it was never loaded
    pub total_chunks: usize,
    pub elapsed: Duration,
    pub audit_trail: Vec<AuditEntry>,
}

impl SessionReport {
    pub fn is_completed(&self) -> bool {
        self.outcome.is_completed()
    }

    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        self.outcome.error().map(|e| e.exit_code()).unwrap_or(0)
    }
}

// ----------------------------------------------------------------------------
// Action Execution
// ----------------------------------------------------------------------------

/// What executing one action produced
enum Step {
    Done,
    /// Result to feed back; the rest of the batch still runs
    Reply(SessionEvent),
    /// Failure to feed back; remaining non-best-effort actions are skipped
    Interrupt(SessionEvent),
}

/// Everything the runner needs besides the session itself
struct Executor<T, S> {
    transport: T,
    image: S,
    cancel: CancelSignal,
    timers: TimerService,
    events: Option<TransportEvents>,
    chunks_written: usize,
    bytes_written: usize,
}

impl<T: Transport, S: ImageSource> Executor<T, S> {
    /// Carry out `action`; chunk bytes are sliced from the session's payload
    async fn execute(&mut self, action: Action, session: &Session) -> Step {
        debug!("Executing {:?}", action);
        match action {
            Action::InitTransport => {
                if let Err(e) = self.transport.init().await {
                    return Step::Interrupt(SessionEvent::InitFailed {
                        reason: e.to_string(),
                    });
                }
                match self.transport.take_events() {
                    Some(events) => {
                        self.events = Some(events);
                        Step::Done
                    }
                    None => Step::Interrupt(SessionEvent::InitFailed {
                        reason: "transport event subscription already taken".to_string(),
                    }),
                }
            }
            Action::StartScan => match self.transport.start_scan().await {
                Ok(()) => Step::Done,
                Err(e) => Step::Interrupt(SessionEvent::ScanFailed {
                    reason: e.to_string(),
                }),
            },
            Action::StopScan => {
                if let Err(e) = self.transport.stop_scan().await {
                    warn!("Failed to stop scan: {}", e);
                }
                Step::Done
            }
            Action::ArmTimer { purpose, duration } => {
                self.timers.arm(purpose, duration);
                Step::Done
            }
            Action::DisarmTimer { purpose } => {
                self.timers.disarm(purpose);
                Step::Done
            }
            Action::Connect { address } => match self.transport.connect(&address).await {
                Ok(()) => Step::Done,
                Err(e) => {
                    warn!("Connect to {} failed: {}", address, e);
                    Step::Interrupt(SessionEvent::ConnectionChanged {
                        address,
                        connected: false,
                    })
                }
            },
            Action::Disconnect { address } => {
                if let Err(e) = self.transport.disconnect(&address).await {
                    warn!("Failed to disconnect {}: {}", address, e);
                }
                Step::Done
            }
            Action::ResolveServices { address } => {
                match self.transport.resolve_services(&address).await {
                    Ok(()) => Step::Done,
                    Err(e) => Step::Interrupt(SessionEvent::ServicesResolved {
                        result: Err(e.to_string()),
                    }),
                }
            }
            Action::QueryProperties { address, target } => {
                let result = self
                    .transport
                    .characteristic_properties(&address, &target)
                    .await
                    .map_err(|e| e.to_string());
                Step::Reply(SessionEvent::PropertiesRead { result })
            }
            Action::EnableNotify { address, target } => {
                let result = self
                    .transport
                    .enable_notify(&address, &target)
                    .await
                    .map_err(|e| e.to_string());
                Step::Reply(SessionEvent::NotifyEnabled { result })
            }
            Action::DisableNotify { address, target } => {
                if let Err(e) = self.transport.disable_notify(&address, &target).await {
                    warn!("Failed to disable notifications on {}: {}", address, e);
                }
                Step::Done
            }
            Action::LoadImage => {
                let result = self.image.read().await.map_err(|e| e.to_string());
                Step::Reply(SessionEvent::ImageLoaded { result })
            }
            Action::WriteChunk {
                address,
                target,
                chunk,
            } => {
                let Some(payload) = session.payload() else {
                    return Step::Reply(SessionEvent::ChunkWritten {
                        index: chunk.index,
                        result: Err("no payload loaded".to_string()),
                    });
                };
                let bytes = chunk.slice(payload.as_bytes());
                let result = self
                    .transport
                    .write_characteristic(&address, &target, bytes)
                    .await
                    .map_err(|e| e.to_string());
                if result.is_ok() {
                    self.chunks_written += 1;
                    self.bytes_written += bytes.len();
                }
                Step::Reply(SessionEvent::ChunkWritten {
                    index: chunk.index,
                    result,
                })
            }
            Action::ReleaseTransport => {
                if let Err(e) = self.transport.deinit().await {
                    warn!("Failed to release transport: {}", e);
                }
                self.events = None;
                Step::Done
            }
        }
    }

    /// A transport event that can be taken without waiting
    fn ready_event(&mut self) -> Option<SessionEvent> {
        let events = self.events.as_mut()?;
        events.try_recv().ok().map(SessionEvent::from)
    }

    /// Wait for the next event from any source
    async fn next_event(&mut self, target: TargetAddress) -> SessionEvent {
        let received = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return SessionEvent::Cancel,
            event = recv_transport(&mut self.events) => event,
            purpose = self.timers.expired() => return SessionEvent::TimerExpired(purpose),
        };
        match received {
            Some(event) => SessionEvent::from(event),
            None => {
                // Treat a dead subscription as a lost link
                warn!("Transport event stream closed");
                self.events = None;
                SessionEvent::ConnectionChanged {
                    address: target,
                    connected: false,
                }
            }
        }
    }
}

/// Receive from the subscription, pending forever when there is none
async fn recv_transport(events: &mut Option<TransportEvents>) -> Option<TransportEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

// ----------------------------------------------------------------------------
// Session Runner
// ----------------------------------------------------------------------------

/// Drives one session to a terminal state
pub struct SessionRunner<T, S> {
    session: Session,
    executor: Executor<T, S>,
}

impl<T: Transport, S: ImageSource> SessionRunner<T, S> {
    pub fn new(
        target: TargetAddress,
        config: SessionConfig,
        transport: T,
        image: S,
        cancel: CancelSignal,
    ) -> Result<Self, ConfigError> {
        let session = Session::new(target, config)?;
        Ok(Self {
            session,
            executor: Executor {
                transport,
                image,
                cancel,
                timers: TimerService::new(),
                events: None,
                chunks_written: 0,
                bytes_written: 0,
            },
        })
    }

    /// Run until the session completes or aborts
    pub async fn run(self) -> SessionReport {
        let Self {
            mut session,
            executor: mut exec,
        } = self;
        let target = session.target();
        let started = Instant::now();
        let mut audit_trail = Vec::new();
        let mut queue = VecDeque::from([SessionEvent::Start]);

        info!("Session with {} starting", target);

        while !session.is_terminal() {
            // Transport events already delivered go ahead of queued replies,
            // so a link drop is seen between two chunk writes
            let mut event = match exec.ready_event() {
                Some(event) => event,
                None => match queue.pop_front() {
                    Some(event) => event,
                    None => exec.next_event(target).await,
                },
            };
            if exec.cancel.is_cancelled() {
                queue.clear();
                event = SessionEvent::Cancel;
            }

            let transition = session.transition(event);
            session = transition.session;
            audit_trail.push(transition.audit_entry);

            let mut interrupted = false;
            for action in transition.actions {
                if !action.is_best_effort() {
                    if !interrupted && exec.cancel.is_cancelled() {
                        queue.clear();
                        queue.push_back(SessionEvent::Cancel);
                        interrupted = true;
                    }
                    if interrupted {
                        debug!("Skipping {:?}", action);
                        continue;
                    }
                }
                match exec.execute(action, &session).await {
                    Step::Done => {}
                    Step::Reply(event) => queue.push_back(event),
                    Step::Interrupt(event) => {
                        queue.push_back(event);
                        interrupted = true;
                    }
                }
            }
        }

        let outcome = session
            .outcome()
            .cloned()
            .unwrap_or(Outcome::Completed);
        let report = SessionReport {
            target,
            outcome,
            final_state: session.state(),
            chunks_written: exec.chunks_written,
            bytes_written: exec.bytes_written,
            total_chunks: session.total_chunks(),
            elapsed: started.elapsed(),
            audit_trail,
        };
        match report.outcome.error() {
            None => info!(
                "Session with {} completed: {} bytes in {} chunks ({:?})",
                target, report.bytes_written, report.chunks_written, report.elapsed
            ),
            Some(e) => error!(
                "Session with {} aborted after {}/{} chunks: {}",
                target, report.chunks_written, report.total_chunks, e
            ),
        }
        report
    }
}
