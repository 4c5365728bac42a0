use radius_proto::{Attribute, AttributeType};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Accounting server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// `host:port` of the accounting server (port 1813 if omitted)
    pub address: String,
    /// Shared secret for this server
    pub secret: String,
    /// Retransmissions after the first attempt before failing over
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Seconds to wait for a response per attempt
    #[serde(default = "default_wait")]
    pub wait: u64,
}

fn default_retries() -> u32 {
    2
}

fn default_wait() -> u64 {
    5
}

const DEFAULT_ACCT_PORT: u16 = 1813;

impl ServerConfig {
    /// Resolve the server address, defaulting to the accounting port
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if let Ok(addr) = self.address.parse::<SocketAddr>() {
            return Ok(addr);
        }
        if let Ok(ip) = self.address.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, DEFAULT_ACCT_PORT));
        }
        // host name, with or without a port
        let with_port = if self.address.contains(':') {
            self.address.clone()
        } else {
            format!("{}:{}", self.address, DEFAULT_ACCT_PORT)
        };
        with_port
            .to_socket_addrs()
            .map_err(|_| ConfigError::Invalid(format!("Invalid server address: {}", self.address)))?
            .next()
            .ok_or_else(|| ConfigError::Invalid(format!("Server address did not resolve: {}", self.address)))
    }

    pub fn wait_duration(&self) -> Duration {
        Duration::from_secs(self.wait)
    }
}

/// Optional NAS attributes added to every accounting record
///
/// Values are textual and shaped by the attribute codec, so
/// `nas_port_type = "5"` becomes a 4-octet integer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NasConfig {
    #[serde(default)]
    pub nas_identifier: Option<String>,
    #[serde(default)]
    pub nas_ip_address: Option<String>,
    #[serde(default)]
    pub nas_port_type: Option<String>,
    #[serde(default)]
    pub service_type: Option<String>,
    #[serde(default)]
    pub framed_protocol: Option<String>,
}

impl NasConfig {
    /// NAS attributes placed before Acct-Session-Id, in record order
    pub fn leading_attributes(&self) -> Vec<(AttributeType, &str)> {
        [
            (AttributeType::NasIdentifier, &self.nas_identifier),
            (AttributeType::NasIpAddress, &self.nas_ip_address),
            (AttributeType::NasPortType, &self.nas_port_type),
            (AttributeType::ServiceType, &self.service_type),
        ]
        .into_iter()
        .filter_map(|(attr_type, value)| value.as_deref().map(|v| (attr_type, v)))
        .collect()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (attr_type, value) in self
            .leading_attributes()
            .into_iter()
            .chain(self.framed_protocol.as_deref().map(|v| (AttributeType::FramedProtocol, v)))
        {
            Attribute::encode_value(attr_type as u8, value.as_bytes()).map_err(|e| {
                ConfigError::Invalid(format!("Invalid NAS attribute {:?}: {}", attr_type, e))
            })?;
        }
        Ok(())
    }
}

/// Accounting worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level: "trace", "debug", "info", "warn", "error" (default: "info")
    #[serde(default)]
    pub log_level: Option<String>,

    /// Answer SUCCEEDED even when the accounting server does not respond
    #[serde(default)]
    pub non_fatal_accounting: bool,

    /// Tunnel server status file holding per-client byte counters
    #[serde(default = "default_status_file")]
    pub status_file: String,

    /// Script run with the named pipe path on connect and disconnect
    #[serde(default)]
    pub vsa_script: Option<String>,

    /// Named pipe the hook buffer is written to
    #[serde(default = "default_vsa_named_pipe")]
    pub vsa_named_pipe: String,

    /// Apply Framed-Route entries to the system routing table
    #[serde(default = "default_system_routes")]
    pub system_routes: bool,

    #[serde(default)]
    pub nas: NasConfig,

    /// Accounting servers in failover order
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

fn default_status_file() -> String {
    "/var/run/openvpn/status.log".to_string()
}

fn default_vsa_named_pipe() -> String {
    "/var/run/radius-acct/vsa.fifo".to_string()
}

fn default_system_routes() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: None,
            non_fatal_accounting: false,
            status_file: default_status_file(),
            vsa_script: None,
            vsa_named_pipe: default_vsa_named_pipe(),
            system_routes: default_system_routes(),
            nas: NasConfig::default(),
            servers: vec![],
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servers.is_empty() {
            return Err(ConfigError::Invalid(
                "At least one accounting server is required".to_string(),
            ));
        }

        for server in &self.servers {
            if server.secret.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Server {} has empty secret",
                    server.address
                )));
            }
            if server.wait == 0 {
                return Err(ConfigError::Invalid(format!(
                    "Server {} has zero wait",
                    server.address
                )));
            }
            server.socket_addr()?;
        }

        if let Some(ref ip) = self.nas.nas_ip_address {
            ip.parse::<Ipv4Addr>()
                .map_err(|_| ConfigError::Invalid(format!("Invalid NAS IP address: {}", ip)))?;
        }
        self.nas.validate()?;

        if self.status_file.is_empty() {
            return Err(ConfigError::Invalid("Status file path cannot be empty".to_string()));
        }

        if self.vsa_script.is_some() && self.vsa_named_pipe.is_empty() {
            return Err(ConfigError::Invalid(
                "vsa_named_pipe is required when vsa_script is set".to_string(),
            ));
        }

        Ok(())
    }

    /// Create an example configuration file
    pub fn example() -> Self {
        Config {
            log_level: Some("info".to_string()),
            non_fatal_accounting: false,
            status_file: default_status_file(),
            vsa_script: Some("/etc/openvpn/radius-vsa.sh".to_string()),
            vsa_named_pipe: default_vsa_named_pipe(),
            system_routes: true,
            nas: NasConfig {
                nas_identifier: Some("openvpn".to_string()),
                nas_ip_address: Some("127.0.0.1".to_string()),
                nas_port_type: Some("5".to_string()),
                service_type: Some("5".to_string()),
                framed_protocol: Some("1".to_string()),
            },
            servers: vec![
                ServerConfig {
                    address: "127.0.0.1:1813".to_string(),
                    secret: "testing123".to_string(),
                    retries: default_retries(),
                    wait: default_wait(),
                },
                ServerConfig {
                    address: "192.168.1.10:1813".to_string(),
                    secret: "backup_secret".to_string(),
                    retries: 1,
                    wait: 3,
                },
            ],
        }
    }
}
