//! RADIUS Accounting Worker
//!
//! Accounting for a tunneling server, built on top of the `radius-proto`
//! codec. A foreground process hands session lifecycle events to a single
//! worker over a command channel; the worker owns every live session, sends
//! Start, Interim-Update and Stop records, and refreshes byte counters from the
//! tunnel server's status file.
//!
//! # Features
//!
//! - Async I/O with Tokio
//! - Retransmission and failover across accounting servers
//! - Drift-free interim updates with RFC 2869 Gigawords counters
//! - Non-fatal accounting mode for unreliable accounting servers
//! - Framed-Route and hook-script side effects on connect and disconnect
//! - JSON configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use radius_acct::{spawn_worker, AcctSession, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("radius-acct.json")?;
//!     let (mut client, worker) = spawn_worker(&config)?;
//!     client.wait_ready().await?;
//!
//!     let session = AcctSession {
//!         username: "alice".to_string(),
//!         session_id: "5F3A9C01".to_string(),
//!         framed_ip: "10.8.0.6".to_string(),
//!         key: "alice,198.51.100.7:51234".to_string(),
//!         status_file_key: "alice,198.51.100.7:51234".to_string(),
//!         interim_interval: 300,
//!         ..Default::default()
//!     };
//!     client.add_user(&session).await?;
//!     client.del_user(&session.key).await?;
//!
//!     client.exit().await?;
//!     worker.await??;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod hook;
pub mod ipc;
pub mod process;
pub mod record;
pub mod routes;
pub mod scheduler;
pub mod session;
pub mod status;
pub mod transport;

pub use client::{spawn_worker, AccountingClient};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ConfigError, NasConfig, ServerConfig};
pub use error::{AcctError, HookError, IpcError, TransportError};
pub use hook::{encode_hook_buffer, HookAction, NoHook, SessionHook, VsaScriptHook};
pub use ipc::{CommandChannel, CommandCode, ResponseCode};
pub use process::AccountingProcess;
pub use record::{build_record, send_record, RecordKind};
pub use routes::{FramedRoute, NoRoutes, RouteTable, SystemRoutes};
pub use scheduler::{AcctScheduler, Partition};
pub use session::AcctSession;
pub use status::{StatusFile, StatusSource};
pub use transport::{AccountingTransport, UdpTransport};
