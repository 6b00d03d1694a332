//! Error types for blepush sessions

use thiserror::Error;

use crate::address::TargetAddress;
use crate::session::SessionState;

// ----------------------------------------------------------------------------
// Session Errors
// ----------------------------------------------------------------------------

/// Coarse classification of a [`SessionError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Argument,
    TransportUnavailable,
    DiscoveryTimeout,
    ConnectionTimeout,
    UnexpectedDisconnect,
    ServiceResolution,
    ImageLoad,
    Write,
    Cancelled,
}

impl ErrorKind {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Argument => 2,
            ErrorKind::TransportUnavailable => 3,
            ErrorKind::DiscoveryTimeout => 4,
            ErrorKind::ConnectionTimeout => 5,
            ErrorKind::UnexpectedDisconnect => 6,
            ErrorKind::ServiceResolution => 7,
            ErrorKind::ImageLoad => 8,
            ErrorKind::Write => 9,
            ErrorKind::Cancelled => 130,
        }
    }
}

/// Terminal failures of a session
///
/// Every variant other than `Argument` ends the session in `Aborted` after a
/// full teardown.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Invalid target address {input:?}: {reason}")]
    Argument { input: String, reason: String },

    #[error("Transport unavailable for {address} while {state}: {reason}")]
    TransportUnavailable {
        address: TargetAddress,
        state: SessionState,
        reason: String,
    },

    #[error("{address} not discovered within {timeout_ms} ms")]
    DiscoveryTimeout {
        address: TargetAddress,
        timeout_ms: u64,
    },

    #[error("Connection to {address} timed out after {timeout_ms} ms")]
    ConnectionTimeout {
        address: TargetAddress,
        timeout_ms: u64,
    },

    #[error("{address} disconnected unexpectedly while {state}")]
    UnexpectedDisconnect {
        address: TargetAddress,
        state: SessionState,
    },

    #[error("Service resolution on {address} failed while {state}: {reason}")]
    ServiceResolution {
        address: TargetAddress,
        state: SessionState,
        reason: String,
    },

    #[error("Image load for {address} failed while {state}: {reason}")]
    ImageLoad {
        address: TargetAddress,
        state: SessionState,
        reason: String,
    },

    #[error("Write of chunk {index} (offset {offset}) to {address} failed: {reason}")]
    Write {
        address: TargetAddress,
        index: usize,
        offset: usize,
        reason: String,
    },

    #[error("Session with {address} cancelled while {state}")]
    Cancelled {
        address: TargetAddress,
        state: SessionState,
    },
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Argument { .. } => ErrorKind::Argument,
            SessionError::TransportUnavailable { .. } => ErrorKind::TransportUnavailable,
            SessionError::DiscoveryTimeout { .. } => ErrorKind::DiscoveryTimeout,
            SessionError::ConnectionTimeout { .. } => ErrorKind::ConnectionTimeout,
            SessionError::UnexpectedDisconnect { .. } => ErrorKind::UnexpectedDisconnect,
            SessionError::ServiceResolution { .. } => ErrorKind::ServiceResolution,
            SessionError::ImageLoad { .. } => ErrorKind::ImageLoad,
            SessionError::Write { .. } => ErrorKind::Write,
            SessionError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Process exit code reported by the CLI
    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }

    /// Peer the session was addressed to; `None` for argument errors
    pub fn address(&self) -> Option<TargetAddress> {
        match self {
            SessionError::Argument { .. } => None,
            SessionError::TransportUnavailable { address, .. }
            | SessionError::DiscoveryTimeout { address, .. }
            | SessionError::ConnectionTimeout { address, .. }
            | SessionError::UnexpectedDisconnect { address, .. }
            | SessionError::ServiceResolution { address, .. }
            | SessionError::ImageLoad { address, .. }
            | SessionError::Write { address, .. }
            | SessionError::Cancelled { address, .. } => Some(*address),
        }
    }

    /// State the session was in when it failed; `None` for argument errors
    pub fn state(&self) -> Option<SessionState> {
        match self {
            SessionError::Argument { .. } => None,
            SessionError::DiscoveryTimeout { .. } => Some(SessionState::Scanning),
            SessionError::ConnectionTimeout { .. } => Some(SessionState::Connecting),
            SessionError::Write { .. } => Some(SessionState::Transmitting),
            SessionError::TransportUnavailable { state, .. }
            | SessionError::UnexpectedDisconnect { state, .. }
            | SessionError::ServiceResolution { state, .. }
            | SessionError::ImageLoad { state, .. }
            | SessionError::Cancelled { state, .. } => Some(*state),
        }
    }
}

// ----------------------------------------------------------------------------
// Collaborator Errors
// ----------------------------------------------------------------------------

/// Failures reported by a [`Transport`](crate::transport::Transport)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("BLE adapter not available: {0}")]
    AdapterUnavailable(String),

    #[error("Transport not initialized")]
    NotInitialized,

    #[error("Scan failed: {0}")]
    Scan(String),

    #[error("Peer {address} not known to the adapter")]
    PeerNotFound { address: TargetAddress },

    #[error("Peer {address} not connected")]
    NotConnected { address: TargetAddress },

    #[error("Characteristic {characteristic} not found in service {service}")]
    CharacteristicNotFound {
        service: uuid::Uuid,
        characteristic: uuid::Uuid,
    },

    #[error("Notification setup failed: {0}")]
    Notify(String),

    #[error("Write failed: {0}")]
    Write(String),

    #[error("Transport error: {0}")]
    Other(String),
}

/// Failures while obtaining the payload
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to read image {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid hex image data: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Image is {actual} bytes, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Invalid session configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Configuration validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_in_message() {
        let address = TargetAddress::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        let err = SessionError::Cancelled {
            address,
            state: SessionState::Transmitting,
        };
        let message = err.to_string();
        assert!(message.contains("AA:BB:CC:DD:EE:FF"));
        assert!(message.contains("Transmitting"));
        assert_eq!(err.exit_code(), 130);
    }

    #[test]
    fn test_exit_codes_are_nonzero() {
        let address = TargetAddress::new([0; 6]);
        let errors = [
            SessionError::Argument {
                input: String::new(),
                reason: String::new(),
            },
            SessionError::TransportUnavailable {
                address,
                state: SessionState::Scanning,
                reason: String::new(),
            },
            SessionError::DiscoveryTimeout {
                address,
                timeout_ms: 1,
            },
            SessionError::ImageLoad {
                address,
                state: SessionState::Transmitting,
                reason: String::new(),
            },
        ];
        for err in errors {
            assert_ne!(err.exit_code(), 0);
        }
    }

    #[test]
    fn test_every_session_failure_reports_address_and_state() {
        let address = TargetAddress::new([0x00, 0x0B, 0x57, 0x0B, 0xDE, 0x21]);
        let errors = [
            SessionError::TransportUnavailable {
                address,
                state: SessionState::Connecting,
                reason: "no adapter".to_string(),
            },
            SessionError::ServiceResolution {
                address,
                state: SessionState::Negotiating,
                reason: "no notify".to_string(),
            },
            SessionError::ImageLoad {
                address,
                state: SessionState::Transmitting,
                reason: "short image".to_string(),
            },
            SessionError::DiscoveryTimeout {
                address,
                timeout_ms: 30_000,
            },
        ];
        for err in errors {
            assert_eq!(err.address(), Some(address));
            let state = err.state().unwrap();
            assert!(err.to_string().contains("00:0B:57:0B:DE:21"));
            if err.kind() != ErrorKind::DiscoveryTimeout {
                assert!(err.to_string().contains(state.name()));
            }
        }

        let argument = SessionError::Argument {
            input: "nope".to_string(),
            reason: "bad".to_string(),
        };
        assert_eq!(argument.address(), None);
        assert_eq!(argument.state(), None);
    }
}
