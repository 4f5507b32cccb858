use std::collections::HashSet;
use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use trust_dns_resolver::{
    TokioAsyncResolver,
    config::{NameServerConfig, NameServerConfigGroup, Protocol, ResolverConfig, ResolverOpts},
    error::ResolveError,
};

use super::cli::Args;
use super::model::{FileConfig, split_list};

pub const DEFAULT_HOSTS: &str = "google.com,facebook.com,github.com";
pub const DEFAULT_TIMEOUT: &str = "5s";
pub const DEFAULT_LISTEN_ADDRESS: &str = ":9449";
pub const DEFAULT_TELEMETRY_PATH: &str = "/metrics";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path:?}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid timeout {value:?}")]
    InvalidTimeout {
        value: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("timeout must be greater than zero")]
    ZeroTimeout,

    #[error("no hosts configured")]
    EmptyHostList,

    #[error("host #{0} in the host list is empty")]
    EmptyHost(usize),

    #[error("host {0:?} is listed more than once")]
    DuplicateHost(String),

    #[error("invalid listen address {value:?}")]
    InvalidListenAddress {
        value: String,
        #[source]
        source: AddrParseError,
    },

    #[error("telemetry path {0:?} must start with '/' and must not be '/'")]
    InvalidTelemetryPath(String),

    #[error("invalid DNS server {value:?}")]
    InvalidDnsServer {
        value: String,
        #[source]
        source: AddrParseError,
    },

    #[error("failed to load the system resolver configuration")]
    SystemResolver(#[source] ResolveError),

    #[error("failed to build the HTTP client")]
    HttpClient(#[source] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub hosts: Vec<String>,
    pub timeout: Duration,
    pub listen_address: SocketAddr,
    pub telemetry_path: String,
    /// Empty means the system resolver configuration is used.
    pub dns_servers: Vec<IpAddr>,
}

/// Load the application configuration from the command line, the environment
/// and the optional YAML file named by `--config-file` / `CONFIG_FILE`.
pub fn load_config(args: Args) -> Result<AppConfig, ConfigError> {
    let file = match &args.config_file {
        Some(path) => read_config_file(path)?,
        None => FileConfig::default(),
    };

    let config = AppConfig::resolve(args, file)?;
    log::info!("Probing {} hosts: {:?}", config.hosts.len(), config.hosts);
    log::info!("Using timeout: {:?}", config.timeout);
    if config.dns_servers.is_empty() {
        log::info!("Using system DNS resolver");
    } else {
        log::info!("Using DNS servers: {:?}", config.dns_servers);
    }
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&config_str).map_err(|source| ConfigError::ParseFile {
        path: path.to_path_buf(),
        source,
    })
}

impl AppConfig {
    /// Merge command line values over file values over defaults, then validate.
    pub fn resolve(args: Args, file: FileConfig) -> Result<Self, ConfigError> {
        let hosts = match (args.hosts, file.hosts) {
            (Some(cli), _) => split_list(&cli),
            (None, Some(list)) => list.into_raw_entries(),
            (None, None) => split_list(DEFAULT_HOSTS),
        };
        let timeout = args
            .timeout
            .or(file.timeout)
            .unwrap_or_else(|| DEFAULT_TIMEOUT.to_string());
        let listen_address = args
            .listen_address
            .or(file.listen_address)
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDRESS.to_string());
        let telemetry_path = args
            .telemetry_path
            .or(file.telemetry_path)
            .unwrap_or_else(|| DEFAULT_TELEMETRY_PATH.to_string());
        let dns_servers = match (args.dns_servers, file.dns_servers) {
            (Some(cli), _) => split_list(&cli),
            (None, Some(list)) => list.into_raw_entries(),
            (None, None) => Vec::new(),
        };

        Ok(Self {
            hosts: parse_hosts(hosts)?,
            timeout: parse_timeout(&timeout)?,
            listen_address: parse_listen_address(&listen_address)?,
            telemetry_path: parse_telemetry_path(telemetry_path)?,
            dns_servers: parse_dns_servers(&dns_servers)?,
        })
    }
}

pub fn parse_hosts(entries: Vec<String>) -> Result<Vec<String>, ConfigError> {
    if entries.is_empty() || (entries.len() == 1 && entries[0].trim().is_empty()) {
        return Err(ConfigError::EmptyHostList);
    }

    let mut seen = HashSet::new();
    let mut hosts = Vec::with_capacity(entries.len());
    for (i, entry) in entries.into_iter().enumerate() {
        let host = entry.trim().to_string();
        if host.is_empty() {
            return Err(ConfigError::EmptyHost(i + 1));
        }
        if !seen.insert(host.clone()) {
            return Err(ConfigError::DuplicateHost(host));
        }
        hosts.push(host);
    }
    Ok(hosts)
}

pub fn parse_timeout(value: &str) -> Result<Duration, ConfigError> {
    let timeout =
        humantime::parse_duration(value.trim()).map_err(|source| ConfigError::InvalidTimeout {
            value: value.to_string(),
            source,
        })?;
    if timeout.is_zero() {
        return Err(ConfigError::ZeroTimeout);
    }
    Ok(timeout)
}

/// Parse `host:port`. A bare `:port` listens on all interfaces.
pub fn parse_listen_address(value: &str) -> Result<SocketAddr, ConfigError> {
    let value = value.trim();
    let full = match value.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => value.to_string(),
    };
    full.parse()
        .map_err(|source| ConfigError::InvalidListenAddress {
            value: value.to_string(),
            source,
        })
}

pub fn parse_telemetry_path(value: String) -> Result<String, ConfigError> {
    let value = value.trim().to_string();
    if !value.starts_with('/') || value == "/" {
        return Err(ConfigError::InvalidTelemetryPath(value));
    }
    Ok(value)
}

pub fn parse_dns_servers(entries: &[String]) -> Result<Vec<IpAddr>, ConfigError> {
    entries
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|source| ConfigError::InvalidDnsServer {
                value: s.to_string(),
                source,
            })
        })
        .collect()
}

/// Setup the HTTP client shared by every HTTP probe.
/// Per-request timeouts are set by the probe itself.
pub fn setup_client() -> Result<Client, ConfigError> {
    Client::builder()
        .user_agent(concat!("connectivity-exporter/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(ConfigError::HttpClient)
}

/// Setup a DNS resolver using the provided DNS servers.
/// With no servers the system configuration (`/etc/resolv.conf`) is used.
/// Otherwise the servers are queried over TCP with 2 attempts, a per-query
/// timeout of `timeout` and a cache size of 1024.
pub fn setup_resolver(
    dns_servers: &[IpAddr],
    timeout: Duration,
) -> Result<TokioAsyncResolver, ConfigError> {
    if dns_servers.is_empty() {
        return TokioAsyncResolver::tokio_from_system_conf().map_err(ConfigError::SystemResolver);
    }

    let name_servers: Vec<SocketAddr> = dns_servers.iter().map(|ip| (*ip, 53).into()).collect();
    Ok(tcp_resolver(&name_servers, timeout))
}

/// A resolver querying `name_servers` over TCP.
pub fn tcp_resolver(name_servers: &[SocketAddr], timeout: Duration) -> TokioAsyncResolver {
    let mut opts = ResolverOpts::default();
    opts.attempts = 2;
    opts.timeout = timeout;
    opts.cache_size = 1024;

    let mut group = NameServerConfigGroup::new();

    for addr in name_servers {
        group.push(NameServerConfig {
            socket_addr: *addr,
            protocol: Protocol::Tcp,
            tls_dns_name: None,
            trust_negative_responses: false,
            bind_addr: None,
        });
    }

    let resolver_config = ResolverConfig::from_parts(None, vec![], group);
    TokioAsyncResolver::tokio(resolver_config, opts)
}
