//! The accounting worker: one command loop owning the session registry
//!
//! The loop waits at most [`POLL_INTERVAL`] for a command, handles it to
//! completion, then runs the scheduler tick. Nothing else touches the
//! registry. Any command channel failure, an unknown command code, or (with
//! non-fatal accounting off) a Stop record that cannot be delivered ends the
//! loop; every remaining session is then stopped before the worker returns.

use crate::clock::{Clock, SystemClock};
use crate::config::{Config, ConfigError};
use crate::error::AcctError;
use crate::hook::{HookAction, NoHook, SessionHook, VsaScriptHook};
use crate::ipc::{CommandChannel, CommandCode, ResponseCode};
use crate::record::{send_record, RecordKind};
use crate::routes::{NoRoutes, RouteTable, SystemRoutes};
use crate::scheduler::AcctScheduler;
use crate::session::AcctSession;
use crate::status::StatusFile;
use crate::transport::UdpTransport;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, warn};

/// Shorter than the one-second granularity of session timestamps so a new
/// session is picked up within the same second
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

enum Flow {
    Continue,
    Shutdown,
}

pub struct AccountingProcess<S> {
    channel: CommandChannel<S>,
    scheduler: AcctScheduler,
    routes: Arc<dyn RouteTable>,
    hook: Arc<dyn SessionHook>,
    clock: Arc<dyn Clock>,
    non_fatal: bool,
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> AccountingProcess<S> {
    pub fn new(
        stream: S,
        scheduler: AcctScheduler,
        routes: Arc<dyn RouteTable>,
        hook: Arc<dyn SessionHook>,
        clock: Arc<dyn Clock>,
        non_fatal: bool,
    ) -> Self {
        AccountingProcess {
            channel: CommandChannel::new(stream),
            scheduler,
            routes,
            hook,
            clock,
            non_fatal,
        }
    }

    /// Wire up the production collaborators described by `config`
    pub fn from_config(stream: S, config: &Config) -> Result<Self, ConfigError> {
        let transport = Arc::new(UdpTransport::new(&config.servers)?);
        let status = Arc::new(StatusFile::new(&config.status_file));
        let scheduler = AcctScheduler::new(config.nas.clone(), transport, status);

        let routes: Arc<dyn RouteTable> = if config.system_routes {
            Arc::new(SystemRoutes::default())
        } else {
            Arc::new(NoRoutes)
        };
        let hook: Arc<dyn SessionHook> = match config.vsa_script {
            Some(ref script) => Arc::new(VsaScriptHook::new(script, &config.vsa_named_pipe)),
            None => Arc::new(NoHook),
        };

        Ok(Self::new(
            stream,
            scheduler,
            routes,
            hook,
            Arc::new(SystemClock),
            config.non_fatal_accounting,
        ))
    }

    pub fn scheduler(&self) -> &AcctScheduler {
        &self.scheduler
    }

    /// Announce readiness, serve commands until told to stop, then stop every
    /// remaining session
    pub async fn run(&mut self) -> Result<(), AcctError> {
        let result = match self.channel.send_response(ResponseCode::InitSucceeded).await {
            Ok(()) => {
                info!(non_fatal = self.non_fatal, "Accounting worker started");
                self.serve().await
            }
            Err(e) => {
                error!(error = %e, "Cannot signal worker start");
                Err(e.into())
            }
        };

        self.scheduler.del_all_users(self.clock.now()).await;
        match result {
            Ok(()) => info!("Accounting worker stopped"),
            Err(ref e) => error!(error = %e, "Accounting worker stopped on error"),
        }
        result
    }

    async fn serve(&mut self) -> Result<(), AcctError> {
        loop {
            if self.channel.wait_readable(POLL_INTERVAL).await? {
                if let Flow::Shutdown = self.handle_command().await? {
                    return Ok(());
                }
            }
            self.scheduler.do_accounting(self.clock.now()).await;
        }
    }

    async fn handle_command(&mut self) -> Result<Flow, AcctError> {
        let code = self.channel.read_i32().await?;
        match CommandCode::from_i32(code) {
            Some(CommandCode::AddUser) => self.handle_add_user().await,
            Some(CommandCode::DelUser) => self.handle_del_user().await,
            Some(CommandCode::Exit) => {
                debug!("Exit requested");
                Ok(Flow::Shutdown)
            }
            Some(CommandCode::Verify) | None => {
                error!(code = code, "Unknown command on accounting channel");
                Err(AcctError::Protocol(format!("Unknown command code {}", code)))
            }
        }
    }

    fn response_for(&self, outcome: &Result<(), AcctError>) -> ResponseCode {
        match outcome {
            Ok(()) => ResponseCode::Succeeded,
            Err(e) if self.non_fatal && (e.is_accounting_failure() || matches!(e, AcctError::NotFound(_))) => {
                ResponseCode::Succeeded
            }
            Err(_) => ResponseCode::Failed,
        }
    }

    async fn handle_add_user(&mut self) -> Result<Flow, AcctError> {
        let mut session = self.channel.read_session().await?;
        let now = self.clock.now();
        session.start_at(now);

        let outcome = self.add_user(session, now).await;
        let response = self.response_for(&outcome);
        self.channel.send_response(response).await?;
        Ok(Flow::Continue)
    }

    async fn add_user(&mut self, session: AcctSession, now: u64) -> Result<(), AcctError> {
        if self.scheduler.find_user(&session.key).is_some() {
            warn!(key = %session.key, username = %session.username, "Session already registered");
            return Err(AcctError::DuplicateSession(session.key));
        }

        let started = send_record(
            RecordKind::Start,
            &session,
            self.scheduler.nas(),
            self.scheduler.transport(),
            now,
        )
        .await;
        if let Err(e) = started {
            error!(
                key = %session.key,
                username = %session.username,
                common_name = %session.common_name,
                error = %e,
                "Start record failed"
            );
            if !self.non_fatal {
                return Err(e);
            }
        }

        self.routes.add_routes(&session).await;
        if let Err(e) = self.hook.deliver(HookAction::Connect, &session).await {
            error!(
                key = %session.key,
                username = %session.username,
                common_name = %session.common_name,
                error = %e,
                "Connect hook failed"
            );
            self.routes.del_routes(&session).await;
            return Err(e.into());
        }

        info!(
            key = %session.key,
            username = %session.username,
            common_name = %session.common_name,
            interval = session.interim_interval,
            "Session started"
        );
        self.scheduler.add_user(session)
    }

    async fn handle_del_user(&mut self) -> Result<Flow, AcctError> {
        let key = self.channel.read_string().await?;
        let now = self.clock.now();

        let outcome = self.del_user(&key, now).await;
        let response = self.response_for(&outcome);
        self.channel.send_response(response).await?;

        match outcome {
            Err(e) if e.is_accounting_failure() && !self.non_fatal => {
                error!(key = %key, error = %e, "Stop record failed, shutting down");
                Err(e)
            }
            _ => Ok(Flow::Continue),
        }
    }

    async fn del_user(&mut self, key: &str, now: u64) -> Result<(), AcctError> {
        let Some(session) = self.scheduler.find_user(key).cloned() else {
            warn!(key = %key, "Delete for unknown session");
            return Err(AcctError::NotFound(key.to_string()));
        };

        self.routes.del_routes(&session).await;
        if let Err(e) = self.hook.deliver(HookAction::Disconnect, &session).await {
            error!(
                key = %session.key,
                username = %session.username,
                common_name = %session.common_name,
                error = %e,
                "Disconnect hook failed"
            );
            return Err(e.into());
        }

        self.scheduler.del_user(key, now).await
    }
}
