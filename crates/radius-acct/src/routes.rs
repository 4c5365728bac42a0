//! Framed-Route handling for connected clients

use crate::session::AcctSession;
use async_trait::async_trait;
use ipnetwork::Ipv4Network;
use std::net::Ipv4Addr;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error, warn};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouteError {
    #[error("Missing gateway in route: {0}")]
    MissingGateway(String),
    #[error("Invalid network: {0}")]
    Network(String),
    #[error("Invalid gateway: {0}")]
    Gateway(String),
    #[error("Invalid metric: {0}")]
    Metric(String),
}

/// One `"<net>/<cidr> <gateway>[/<x>] [<metric>]"` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedRoute {
    pub network: Ipv4Network,
    pub gateway: Ipv4Addr,
    pub metric: Option<u32>,
}

impl FramedRoute {
    pub fn parse(spec: &str) -> Result<Self, RouteError> {
        let mut fields = spec.split_whitespace();
        let network = fields
            .next()
            .ok_or_else(|| RouteError::Network(spec.to_string()))?;
        let gateway = fields
            .next()
            .ok_or_else(|| RouteError::MissingGateway(spec.to_string()))?;

        let network: Ipv4Network = network
            .parse()
            .map_err(|_| RouteError::Network(network.to_string()))?;
        // a trailing "/bits" on the gateway is ignored
        let gateway = gateway.split('/').next().unwrap_or(gateway);
        let gateway: Ipv4Addr = gateway
            .parse()
            .map_err(|_| RouteError::Gateway(gateway.to_string()))?;
        let metric = fields
            .next()
            .map(|m| m.parse::<u32>().map_err(|_| RouteError::Metric(m.to_string())))
            .transpose()?;

        Ok(FramedRoute {
            network,
            gateway,
            metric,
        })
    }

    /// Arguments for `route add` or `route del`
    pub fn command_args(&self, action: RouteAction) -> Vec<String> {
        let mut args = vec![
            action.as_str().to_string(),
            "-net".to_string(),
            format!("{}/{}", self.network.network(), self.network.prefix()),
            "gw".to_string(),
            self.gateway.to_string(),
        ];
        if let Some(metric) = self.metric {
            args.push("metric".to_string());
            args.push(metric.to_string());
        }
        args
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAction {
    Add,
    Delete,
}

impl RouteAction {
    fn as_str(self) -> &'static str {
        match self {
            RouteAction::Add => "add",
            RouteAction::Delete => "del",
        }
    }
}

/// Applies and withdraws a session's framed routes; failures are logged only
#[async_trait]
pub trait RouteTable: Send + Sync {
    async fn add_routes(&self, session: &AcctSession);
    async fn del_routes(&self, session: &AcctSession);
}

/// Drives the system routing table through `route(8)`
#[derive(Debug, Clone)]
pub struct SystemRoutes {
    program: String,
}

impl Default for SystemRoutes {
    fn default() -> Self {
        SystemRoutes {
            program: "route".to_string(),
        }
    }
}

impl SystemRoutes {
    pub fn with_program(program: impl Into<String>) -> Self {
        SystemRoutes {
            program: program.into(),
        }
    }

    async fn apply(&self, session: &AcctSession, action: RouteAction) {
        for spec in session.framed_routes() {
            let route = match FramedRoute::parse(spec) {
                Ok(route) => route,
                Err(e) => {
                    warn!(key = %session.key, route = %spec, error = %e, "Skipping framed route");
                    continue;
                }
            };

            let args = route.command_args(action);
            match Command::new(&self.program).args(&args).status().await {
                Ok(status) if status.success() => {
                    debug!(key = %session.key, args = ?args, "Route updated");
                }
                Ok(status) => {
                    error!(
                        key = %session.key,
                        common_name = %session.common_name,
                        args = ?args,
                        status = %status,
                        "Route command failed"
                    );
                }
                Err(e) => {
                    error!(key = %session.key, program = %self.program, error = %e, "Cannot run route command");
                }
            }
        }
    }
}

#[async_trait]
impl RouteTable for SystemRoutes {
    async fn add_routes(&self, session: &AcctSession) {
        self.apply(session, RouteAction::Add).await;
    }

    async fn del_routes(&self, session: &AcctSession) {
        self.apply(session, RouteAction::Delete).await;
    }
}

/// Leaves the routing table alone
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRoutes;

#[async_trait]
impl RouteTable for NoRoutes {
    async fn add_routes(&self, _session: &AcctSession) {}

    async fn del_routes(&self, _session: &AcctSession) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_route() {
        let route = FramedRoute::parse("192.168.10.0/24 10.8.0.1 5").unwrap();
        assert_eq!(route.network, "192.168.10.0/24".parse::<Ipv4Network>().unwrap());
        assert_eq!(route.gateway, Ipv4Addr::new(10, 8, 0, 1));
        assert_eq!(route.metric, Some(5));
    }

    #[test]
    fn test_parse_route_gateway_suffix() {
        let route = FramedRoute::parse("10.0.0.0/8  10.8.0.1/32").unwrap();
        assert_eq!(route.gateway, Ipv4Addr::new(10, 8, 0, 1));
        assert_eq!(route.metric, None);
    }

    #[test]
    fn test_parse_route_errors() {
        assert!(matches!(FramedRoute::parse(""), Err(RouteError::Network(_))));
        assert!(matches!(
            FramedRoute::parse("10.0.0.0/8"),
            Err(RouteError::MissingGateway(_))
        ));
        assert!(matches!(
            FramedRoute::parse("10.0.0.0/33 10.8.0.1"),
            Err(RouteError::Network(_))
        ));
        assert!(matches!(
            FramedRoute::parse("10.0.0.0/8 gateway"),
            Err(RouteError::Gateway(_))
        ));
        assert!(matches!(
            FramedRoute::parse("10.0.0.0/8 10.8.0.1 high"),
            Err(RouteError::Metric(_))
        ));
    }

    #[test]
    fn test_command_args() {
        let route = FramedRoute::parse("10.1.2.3/16 10.8.0.1 7").unwrap();
        assert_eq!(
            route.command_args(RouteAction::Add),
            vec!["add", "-net", "10.1.0.0/16", "gw", "10.8.0.1", "metric", "7"]
        );
        let route = FramedRoute::parse("172.16.0.0/12 10.8.0.1").unwrap();
        assert_eq!(
            route.command_args(RouteAction::Delete),
            vec!["del", "-net", "172.16.0.0/12", "gw", "10.8.0.1"]
        );
    }

    #[tokio::test]
    async fn test_system_routes_tolerates_failures() {
        let session = AcctSession {
            key: "k".to_string(),
            framed_routes: "10.0.0.0/8 10.8.0.1;bogus".to_string(),
            ..Default::default()
        };
        // `false` exits non-zero; a missing program fails to spawn
        SystemRoutes::with_program("false").add_routes(&session).await;
        SystemRoutes::with_program("/nonexistent/route").del_routes(&session).await;
    }
}
