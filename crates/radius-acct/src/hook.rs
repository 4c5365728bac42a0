//! Session events handed to an external script through a named pipe
//!
//! The buffer layout, all integers big-endian:
//!
//! ```text
//! +--------+-------+-------------+--------+--------+-------+-----
//! | action | rekey | total len   |  tag   |  len   | bytes | ...
//! +--------+-------+-------------+--------+--------+-------+-----
//!     4        4         4           4        4       len
//! ```
//!
//! `total len` covers the header. Empty fields are left out and tag 106 repeats
//! once per framed route.

use crate::error::HookError;
use crate::session::AcctSession;
use async_trait::async_trait;
use std::ffi::CString;
use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, error};

pub const TAG_USERNAME: u32 = 101;
pub const TAG_COMMON_NAME: u32 = 102;
pub const TAG_FRAMED_IP: u32 = 103;
pub const TAG_CALLING_STATION_ID: u32 = 104;
pub const TAG_UNTRUSTED_PORT: u32 = 105;
pub const TAG_FRAMED_ROUTE: u32 = 106;
pub const TAG_VSA: u32 = 107;

const HEADER_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum HookAction {
    Authentication = 0,
    Connect = 1,
    Disconnect = 2,
}

fn push_field(buffer: &mut Vec<u8>, tag: u32, value: &[u8]) {
    if value.is_empty() {
        return;
    }
    buffer.extend_from_slice(&tag.to_be_bytes());
    buffer.extend_from_slice(&(value.len() as u32).to_be_bytes());
    buffer.extend_from_slice(value);
}

/// Serialize a session event for the hook script
pub fn encode_hook_buffer(action: HookAction, rekey: bool, session: &AcctSession) -> Vec<u8> {
    let mut buffer = vec![0u8; HEADER_LEN];
    push_field(&mut buffer, TAG_USERNAME, session.username.as_bytes());
    push_field(&mut buffer, TAG_COMMON_NAME, session.common_name.as_bytes());
    push_field(&mut buffer, TAG_FRAMED_IP, session.framed_ip.as_bytes());
    push_field(&mut buffer, TAG_CALLING_STATION_ID, session.calling_station_id.as_bytes());
    push_field(&mut buffer, TAG_UNTRUSTED_PORT, session.untrusted_port.as_bytes());
    for route in session.framed_routes() {
        push_field(&mut buffer, TAG_FRAMED_ROUTE, route.as_bytes());
    }
    push_field(&mut buffer, TAG_VSA, &session.vsa_buf);

    let total = buffer.len() as u32;
    buffer[0..4].copy_from_slice(&(action as u32).to_be_bytes());
    buffer[4..8].copy_from_slice(&u32::from(rekey).to_be_bytes());
    buffer[8..12].copy_from_slice(&total.to_be_bytes());
    buffer
}

/// Runs whatever must happen outside the worker on connect and disconnect
#[async_trait]
pub trait SessionHook: Send + Sync {
    async fn deliver(&self, action: HookAction, session: &AcctSession) -> Result<(), HookError>;
}

/// No script configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHook;

#[async_trait]
impl SessionHook for NoHook {
    async fn deliver(&self, _action: HookAction, _session: &AcctSession) -> Result<(), HookError> {
        Ok(())
    }
}

/// Writes the event buffer into a named pipe, then runs `<script> <pipe>`
///
/// The worker waits for the script; a slow script stalls the command loop.
#[derive(Debug, Clone)]
pub struct VsaScriptHook {
    script: String,
    pipe: PathBuf,
}

impl VsaScriptHook {
    pub fn new(script: impl Into<String>, pipe: impl Into<PathBuf>) -> Self {
        VsaScriptHook {
            script: script.into(),
            pipe: pipe.into(),
        }
    }

    fn pipe_error(&self, source: std::io::Error) -> HookError {
        HookError::Pipe {
            path: self.pipe.display().to_string(),
            source,
        }
    }
}

/// Create a FIFO at `path`; an existing one is reused
fn make_fifo(path: &Path) -> std::io::Result<()> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    // SAFETY: c_path is a valid NUL-terminated string for the whole call
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) };
    if rc == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::EEXIST) {
        Ok(())
    } else {
        Err(err)
    }
}

#[async_trait]
impl SessionHook for VsaScriptHook {
    async fn deliver(&self, action: HookAction, session: &AcctSession) -> Result<(), HookError> {
        let buffer = encode_hook_buffer(action, false, session);

        make_fifo(&self.pipe).map_err(|e| self.pipe_error(e))?;
        // read-write so opening does not wait for a reader; the data stays
        // buffered in the pipe until the script drains it
        let mut pipe = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.pipe)
            .map_err(|e| self.pipe_error(e))?;
        pipe.write_all(&buffer).map_err(|e| self.pipe_error(e))?;

        let status = Command::new(&self.script)
            .arg(&self.pipe)
            .status()
            .await
            .map_err(|source| HookError::Spawn {
                script: self.script.clone(),
                source,
            })?;
        drop(pipe);

        if !status.success() {
            error!(
                key = %session.key,
                username = %session.username,
                common_name = %session.common_name,
                script = %self.script,
                status = %status,
                "Hook script failed"
            );
            return Err(HookError::ExitStatus {
                script: self.script.clone(),
                status: status.to_string(),
            });
        }

        debug!(key = %session.key, action = ?action, bytes = buffer.len(), "Hook delivered");
        Ok(())
    }
}
