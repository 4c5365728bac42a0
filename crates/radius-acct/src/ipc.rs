//! Command channel between the foreground process and the accounting worker
//!
//! Integers travel as 4-byte big-endian `i32`; strings and blobs as a 4-byte
//! big-endian length followed by the bytes. Each command is one code followed
//! by its fields; each answer is a single response code.

use crate::error::IpcError;
use crate::session::AcctSession;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::timeout;

/// Largest string or blob accepted on the channel
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Foreground to worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CommandCode {
    /// Authentication only; the accounting worker never accepts it
    Verify = 0,
    Exit = 1,
    AddUser = 2,
    DelUser = 3,
}

impl CommandCode {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(CommandCode::Verify),
            1 => Some(CommandCode::Exit),
            2 => Some(CommandCode::AddUser),
            3 => Some(CommandCode::DelUser),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Worker to foreground
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ResponseCode {
    InitSucceeded = 10,
    InitFailed = 11,
    Succeeded = 12,
    Failed = 13,
}

impl ResponseCode {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            10 => Some(ResponseCode::InitSucceeded),
            11 => Some(ResponseCode::InitFailed),
            12 => Some(ResponseCode::Succeeded),
            13 => Some(ResponseCode::Failed),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

fn read_error(e: io::Error) -> IpcError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        IpcError::Closed
    } else {
        IpcError::Io(e)
    }
}

/// Framed reader/writer over any byte stream
pub struct CommandChannel<S> {
    stream: BufReader<S>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> CommandChannel<S> {
    pub fn new(stream: S) -> Self {
        CommandChannel {
            stream: BufReader::new(stream),
        }
    }

    /// Wait up to `wait` for incoming data without consuming any
    ///
    /// `Ok(false)` means the wait ran out; a closed peer is an error.
    pub async fn wait_readable(&mut self, wait: Duration) -> Result<bool, IpcError> {
        match timeout(wait, self.stream.fill_buf()).await {
            Err(_) => Ok(false),
            Ok(Ok([])) => Err(IpcError::Closed),
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) => Err(IpcError::Io(e)),
        }
    }

    pub async fn read_i32(&mut self) -> Result<i32, IpcError> {
        self.stream.read_i32().await.map_err(read_error)
    }

    pub async fn write_i32(&mut self, value: i32) -> Result<(), IpcError> {
        self.stream.write_i32(value).await?;
        Ok(())
    }

    pub async fn read_bytes(&mut self) -> Result<Vec<u8>, IpcError> {
        let len = self.stream.read_u32().await.map_err(read_error)? as usize;
        if len > MAX_FRAME_LEN {
            return Err(IpcError::FrameTooLarge(len));
        }
        let mut buf = vec![0u8; len];
        self.stream.read_exact(&mut buf).await.map_err(read_error)?;
        Ok(buf)
    }

    pub async fn write_bytes(&mut self, value: &[u8]) -> Result<(), IpcError> {
        if value.len() > MAX_FRAME_LEN {
            return Err(IpcError::FrameTooLarge(value.len()));
        }
        self.stream.write_u32(value.len() as u32).await?;
        self.stream.write_all(value).await?;
        Ok(())
    }

    pub async fn read_string(&mut self) -> Result<String, IpcError> {
        String::from_utf8(self.read_bytes().await?).map_err(|_| IpcError::InvalidUtf8)
    }

    pub async fn write_string(&mut self, value: &str) -> Result<(), IpcError> {
        self.write_bytes(value.as_bytes()).await
    }

    pub async fn flush(&mut self) -> Result<(), IpcError> {
        self.stream.flush().await?;
        Ok(())
    }

    pub async fn send_command(&mut self, command: CommandCode) -> Result<(), IpcError> {
        self.write_i32(command.as_i32()).await
    }

    pub async fn send_response(&mut self, response: ResponseCode) -> Result<(), IpcError> {
        self.write_i32(response.as_i32()).await?;
        self.flush().await
    }

    pub async fn read_response(&mut self) -> Result<ResponseCode, IpcError> {
        let code = self.read_i32().await?;
        ResponseCode::from_i32(code).ok_or(IpcError::UnexpectedResponse(code))
    }

    /// Read the fields that follow an ADD_USER code
    pub async fn read_session(&mut self) -> Result<AcctSession, IpcError> {
        let username = self.read_string().await?;
        let session_id = self.read_string().await?;
        let nas_port = self.read_i32().await? as u32;
        let calling_station_id = self.read_string().await?;
        let framed_ip = self.read_string().await?;
        let common_name = self.read_string().await?;
        let interim_interval = self.read_i32().await?.max(0) as u64;
        let framed_routes = self.read_string().await?;
        let key = self.read_string().await?;
        let status_file_key = self.read_string().await?;
        let untrusted_port = self.read_string().await?;
        let vsa_buf = self.read_bytes().await?;

        Ok(AcctSession {
            username,
            session_id,
            nas_port,
            calling_station_id,
            framed_ip,
            common_name,
            untrusted_port,
            framed_routes,
            key,
            status_file_key,
            vsa_buf,
            interim_interval,
            ..Default::default()
        })
    }

    /// Write the ADD_USER fields of `session`, in the order [`read_session`]
    /// expects them
    ///
    /// [`read_session`]: CommandChannel::read_session
    pub async fn write_session(&mut self, session: &AcctSession) -> Result<(), IpcError> {
        let interval = i32::try_from(session.interim_interval).unwrap_or(i32::MAX);
        self.write_string(&session.username).await?;
        self.write_string(&session.session_id).await?;
        self.write_i32(session.nas_port as i32).await?;
        self.write_string(&session.calling_station_id).await?;
        self.write_string(&session.framed_ip).await?;
        self.write_string(&session.common_name).await?;
        self.write_i32(interval).await?;
        self.write_string(&session.framed_routes).await?;
        self.write_string(&session.key).await?;
        self.write_string(&session.status_file_key).await?;
        self.write_string(&session.untrusted_port).await?;
        self.write_bytes(&session.vsa_buf).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[test]
    fn test_codes() {
        for code in [0, 1, 2, 3] {
            assert_eq!(CommandCode::from_i32(code).unwrap().as_i32(), code);
        }
        assert_eq!(CommandCode::from_i32(4), None);
        assert_eq!(ResponseCode::from_i32(12), Some(ResponseCode::Succeeded));
        assert_eq!(ResponseCode::from_i32(14), None);
    }

    #[tokio::test]
    async fn test_session_fields_cross_the_channel() {
        let (a, b) = duplex(4096);
        let mut writer = CommandChannel::new(a);
        let mut reader = CommandChannel::new(b);

        let session = AcctSession {
            username: "alice".to_string(),
            session_id: "5F3A9C01".to_string(),
            nas_port: 1194,
            calling_station_id: "198.51.100.7".to_string(),
            framed_ip: "10.8.0.6".to_string(),
            common_name: "alice-laptop".to_string(),
            interim_interval: 60,
            framed_routes: "10.1.0.0/16 10.8.0.1".to_string(),
            key: "alice-laptop,198.51.100.7:51234".to_string(),
            status_file_key: "alice-laptop,198.51.100.7:51234".to_string(),
            untrusted_port: "51234".to_string(),
            vsa_buf: vec![0, 0, 0, 9, 1, 3, 0xff],
            ..Default::default()
        };
        writer.send_command(CommandCode::AddUser).await.unwrap();
        writer.write_session(&session).await.unwrap();
        writer.flush().await.unwrap();

        assert!(reader.wait_readable(Duration::from_millis(100)).await.unwrap());
        assert_eq!(reader.read_i32().await.unwrap(), 2);
        assert_eq!(reader.read_session().await.unwrap(), session);
    }

    #[tokio::test]
    async fn test_wire_layout() {
        let (a, mut b) = duplex(64);
        let mut writer = CommandChannel::new(a);
        writer.write_string("ab").await.unwrap();
        writer.send_response(ResponseCode::Failed).await.unwrap();

        let mut raw = [0u8; 10];
        b.read_exact(&mut raw).await.unwrap();
        assert_eq!(raw, [0, 0, 0, 2, b'a', b'b', 0, 0, 0, 13]);
    }

    #[tokio::test]
    async fn test_wait_readable_timeout_and_close() {
        let (a, b) = duplex(64);
        let mut reader = CommandChannel::new(b);
        assert!(!reader.wait_readable(Duration::from_millis(20)).await.unwrap());

        drop(a);
        assert!(matches!(
            reader.wait_readable(Duration::from_millis(20)).await,
            Err(IpcError::Closed)
        ));
        assert!(matches!(reader.read_i32().await, Err(IpcError::Closed)));
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let (a, mut b) = duplex(64);
        let mut reader = CommandChannel::new(a);
        b.write_u32((MAX_FRAME_LEN + 1) as u32).await.unwrap();
        assert!(matches!(reader.read_bytes().await, Err(IpcError::FrameTooLarge(_))));
    }

    #[tokio::test]
    async fn test_invalid_utf8() {
        let (a, mut b) = duplex(64);
        let mut reader = CommandChannel::new(a);
        b.write_all(&[0, 0, 0, 2, 0xc3, 0x28]).await.unwrap();
        assert!(matches!(reader.read_string().await, Err(IpcError::InvalidUtf8)));
    }

    #[tokio::test]
    async fn test_unknown_response() {
        let (a, mut b) = duplex(64);
        let mut reader = CommandChannel::new(a);
        b.write_i32(99).await.unwrap();
        assert!(matches!(
            reader.read_response().await,
            Err(IpcError::UnexpectedResponse(99))
        ));
    }
}
