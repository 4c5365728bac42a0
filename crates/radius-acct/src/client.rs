//! Foreground side of the command channel

use crate::config::{Config, ConfigError};
use crate::error::{AcctError, IpcError};
use crate::ipc::{CommandChannel, CommandCode, ResponseCode, MAX_FRAME_LEN};
use crate::process::AccountingProcess;
use crate::session::AcctSession;
use tokio::io::{duplex, AsyncRead, AsyncWrite, DuplexStream};
use tokio::task::JoinHandle;
use tracing::debug;

/// Issues session lifecycle commands to an accounting worker
pub struct AccountingClient<S> {
    channel: CommandChannel<S>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> AccountingClient<S> {
    pub fn new(stream: S) -> Self {
        AccountingClient {
            channel: CommandChannel::new(stream),
        }
    }

    /// Wait for the worker's start handshake
    pub async fn wait_ready(&mut self) -> Result<(), AcctError> {
        match self.channel.read_response().await? {
            ResponseCode::InitSucceeded => Ok(()),
            other => Err(AcctError::Protocol(format!(
                "Accounting worker did not start: {:?}",
                other
            ))),
        }
    }

    /// Register a session; `Ok(false)` when the worker answered FAILED
    pub async fn add_user(&mut self, session: &AcctSession) -> Result<bool, IpcError> {
        self.channel.send_command(CommandCode::AddUser).await?;
        self.channel.write_session(session).await?;
        self.channel.flush().await?;
        self.outcome().await
    }

    /// End a session by key; `Ok(false)` when the worker answered FAILED
    pub async fn del_user(&mut self, key: &str) -> Result<bool, IpcError> {
        self.channel.send_command(CommandCode::DelUser).await?;
        self.channel.write_string(key).await?;
        self.channel.flush().await?;
        self.outcome().await
    }

    /// Ask the worker to stop all sessions and exit
    pub async fn exit(&mut self) -> Result<(), IpcError> {
        self.channel.send_command(CommandCode::Exit).await?;
        self.channel.flush().await
    }

    async fn outcome(&mut self) -> Result<bool, IpcError> {
        match self.channel.read_response().await? {
            ResponseCode::Succeeded => Ok(true),
            ResponseCode::Failed => Ok(false),
            other => Err(IpcError::UnexpectedResponse(other.as_i32())),
        }
    }
}

/// Run the worker as a task in this process, connected through an in-memory
/// stream carrying the same command protocol
pub fn spawn_worker(
    config: &Config,
) -> Result<(AccountingClient<DuplexStream>, JoinHandle<Result<(), AcctError>>), ConfigError> {
    let (foreground, background) = duplex(2 * MAX_FRAME_LEN);
    let mut process = AccountingProcess::from_config(background, config)?;
    let worker = tokio::spawn(async move { process.run().await });
    debug!("Accounting worker task spawned");
    Ok((AccountingClient::new(foreground), worker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use radius_proto::auth::calculate_response_authenticator;
    use radius_proto::{Code, Packet};
    use tokio::net::UdpSocket;

    #[tokio::test]
    async fn test_wait_ready_rejects_init_failed() {
        let (ours, theirs) = duplex(64);
        let mut worker = CommandChannel::new(theirs);
        worker.send_response(ResponseCode::InitFailed).await.unwrap();

        let mut client = AccountingClient::new(ours);
        assert!(matches!(client.wait_ready().await, Err(AcctError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_outcome_rejects_init_codes() {
        let (ours, theirs) = duplex(1024);
        let mut worker = CommandChannel::new(theirs);
        worker.send_response(ResponseCode::InitSucceeded).await.unwrap();

        let mut client = AccountingClient::new(ours);
        let result = client.del_user("k").await;
        assert!(matches!(result, Err(IpcError::UnexpectedResponse(10))));
    }

    #[tokio::test]
    async fn test_spawned_worker_round_trip() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let address = server.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 4096];
            loop {
                let (len, peer) = server.recv_from(&mut buf).await.unwrap();
                let req = Packet::decode(&buf[..len]).unwrap();
                let mut resp = Packet::new(Code::AccountingResponse, req.identifier, [0u8; 16]);
                resp.authenticator =
                    calculate_response_authenticator(&resp, &req.authenticator, b"testing123").unwrap();
                server.send_to(&resp.encode().unwrap(), peer).await.unwrap();
            }
        });

        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            status_file: dir.path().join("status.log").display().to_string(),
            system_routes: false,
            servers: vec![ServerConfig {
                address: address.to_string(),
                secret: "testing123".to_string(),
                retries: 0,
                wait: 2,
            }],
            ..Config::default()
        };

        let (mut client, worker) = spawn_worker(&config).unwrap();
        client.wait_ready().await.unwrap();

        let session = AcctSession {
            username: "alice".to_string(),
            session_id: "sid-1".to_string(),
            framed_ip: "10.8.0.6".to_string(),
            key: "k1".to_string(),
            status_file_key: "alice,198.51.100.7:1".to_string(),
            ..Default::default()
        };
        assert!(client.add_user(&session).await.unwrap());
        assert!(!client.add_user(&session).await.unwrap());
        assert!(client.del_user("k1").await.unwrap());
        assert!(!client.del_user("k1").await.unwrap());

        client.exit().await.unwrap();
        assert!(worker.await.unwrap().is_ok());
    }
}
