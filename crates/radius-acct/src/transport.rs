//! Delivery of Accounting-Requests to the configured servers

use crate::config::{ConfigError, ServerConfig};
use crate::error::TransportError;
use async_trait::async_trait;
use radius_proto::auth::{
    calculate_accounting_request_authenticator, verify_response_authenticator,
};
use radius_proto::Packet;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Sends one accounting request and returns the matching response
#[async_trait]
pub trait AccountingTransport: Send + Sync {
    /// `request` is unsealed: its authenticator is filled in per server
    async fn exchange(&self, request: &Packet) -> Result<Packet, TransportError>;
}

#[derive(Debug, Clone)]
struct AccountingServer {
    address: SocketAddr,
    /// Local address the per-request socket binds to
    bind: SocketAddr,
    secret: Vec<u8>,
    retries: u32,
    wait: Duration,
}

/// UDP transport with per-server retransmission and ordered failover
#[derive(Debug, Clone)]
pub struct UdpTransport {
    servers: Vec<AccountingServer>,
}

impl UdpTransport {
    pub fn new(servers: &[ServerConfig]) -> Result<Self, ConfigError> {
        let servers = servers
            .iter()
            .map(|server| {
                let address = server.socket_addr()?;
                let bind = if address.is_ipv4() {
                    SocketAddr::from(([0, 0, 0, 0], 0))
                } else {
                    SocketAddr::from(([0u16; 8], 0))
                };
                Ok(AccountingServer {
                    address,
                    bind,
                    secret: server.secret.as_bytes().to_vec(),
                    retries: server.retries,
                    wait: server.wait_duration(),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(UdpTransport { servers })
    }
}

#[async_trait]
impl AccountingTransport for UdpTransport {
    async fn exchange(&self, request: &Packet) -> Result<Packet, TransportError> {
        if self.servers.is_empty() {
            return Err(TransportError::NoServers);
        }

        let mut attempts = 0;
        for server in &self.servers {
            let mut sealed = request.clone();
            sealed.authenticator = calculate_accounting_request_authenticator(&sealed, &server.secret)?;
            let data = sealed.encode()?;

            let socket = match UdpSocket::bind(server.bind).await {
                Ok(socket) => socket,
                Err(e) => {
                    warn!(
                        server = %server.address,
                        bind = %server.bind,
                        error = %e,
                        "Cannot open socket for accounting server, failing over"
                    );
                    continue;
                }
            };

            for attempt in 0..=server.retries {
                attempts += 1;
                if let Err(e) = socket.send_to(&data, server.address).await {
                    // still listen, a reply to an earlier attempt may arrive
                    warn!(server = %server.address, error = %e, "Failed to send accounting request");
                }

                match timeout(server.wait, receive_response(&socket, server, &sealed)).await {
                    Ok(Ok(response)) => {
                        debug!(
                            server = %server.address,
                            identifier = response.identifier,
                            attempt = attempt,
                            "Accounting response received"
                        );
                        return Ok(response);
                    }
                    Ok(Err(e)) => {
                        warn!(server = %server.address, error = %e, "Receive from accounting server failed");
                    }
                    Err(_) => {
                        debug!(
                            server = %server.address,
                            identifier = sealed.identifier,
                            attempt = attempt,
                            "Accounting request timed out"
                        );
                    }
                }
            }

            info!(server = %server.address, "Accounting server not responding, failing over");
        }

        Err(TransportError::Timeout {
            attempts,
            servers: self.servers.len(),
        })
    }
}

/// Wait for the response to `request`, discarding stray datagrams
async fn receive_response(
    socket: &UdpSocket,
    server: &AccountingServer,
    request: &Packet,
) -> Result<Packet, TransportError> {
    let mut buf = [0u8; Packet::MAX_PACKET_SIZE];
    loop {
        let (len, source) = socket.recv_from(&mut buf).await?;
        if source != server.address {
            debug!(source = %source, "Ignoring datagram from unknown source");
            continue;
        }

        let response = match Packet::decode(&buf[..len]) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(server = %server.address, error = %e, "Malformed accounting response");
                continue;
            }
        };

        if response.identifier != request.identifier {
            debug!(
                expected = request.identifier,
                actual = response.identifier,
                "Ignoring response with stale identifier"
            );
            continue;
        }

        if !verify_response_authenticator(&response, &request.authenticator, &server.secret) {
            warn!(server = %server.address, "Invalid response authenticator");
            continue;
        }

        return Ok(response);
    }
}
