//! Error types for the accounting worker

use radius_proto::PacketError;
use thiserror::Error;

/// Failures talking to a RADIUS accounting server
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),
    #[error("No response after {attempts} attempts across {servers} servers")]
    Timeout { attempts: u32, servers: usize },
    #[error("No accounting servers configured")]
    NoServers,
}

/// Failures on the foreground/worker command channel
#[derive(Error, Debug)]
pub enum IpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Command channel closed")]
    Closed,
    #[error("Frame too large: {0} bytes")]
    FrameTooLarge(usize),
    #[error("Invalid UTF-8 in string field")]
    InvalidUtf8,
    #[error("Unexpected response code: {0}")]
    UnexpectedResponse(i32),
}

/// Failures delivering a session event to the external hook script
#[derive(Error, Debug)]
pub enum HookError {
    #[error("Named pipe {path}: {source}")]
    Pipe {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to run {script}: {source}")]
    Spawn {
        script: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{script} exited with {status}")]
    ExitStatus { script: String, status: String },
}

/// Top-level accounting error
#[derive(Error, Debug)]
pub enum AcctError {
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("No response from accounting server")]
    NoResponse,
    #[error("Unexpected response code {0}")]
    UnexpectedResponse(u8),
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Duplicate session: {0}")]
    DuplicateSession(String),
    #[error("Hook failure: {0}")]
    Hook(#[from] HookError),
    #[error("Command channel error: {0}")]
    Ipc(#[from] IpcError),
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl AcctError {
    /// Failures of the accounting server exchange, the ones that
    /// non-fatal accounting is allowed to mask
    pub fn is_accounting_failure(&self) -> bool {
        matches!(
            self,
            AcctError::Packet(_)
                | AcctError::Transport(_)
                | AcctError::NoResponse
                | AcctError::UnexpectedResponse(_)
        )
    }
}
