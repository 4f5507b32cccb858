use std::path::PathBuf;

use clap::Parser;

/// Probes DNS resolution and HTTP reachability of a list of hosts on every
/// Prometheus scrape.
///
/// Every option can also be given through the environment or a YAML config
/// file. Command line values take precedence over the file.
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Comma separated list of hosts to check [default: google.com,facebook.com,github.com]
    #[arg(long, env = "HOSTS", alias = "http.hosts")]
    pub hosts: Option<String>,

    /// Timeout for a single check, e.g. `5s` or `500ms` [default: 5s]
    #[arg(long, env = "TIMEOUT", alias = "http.timeout")]
    pub timeout: Option<String>,

    /// Address to listen on for the web interface and telemetry [default: :9449]
    #[arg(long, env = "LISTEN_ADDRESS", alias = "web.listen-address")]
    pub listen_address: Option<String>,

    /// Path under which to expose metrics [default: /metrics]
    #[arg(long, env = "TELEMETRY_PATH", alias = "web.telemetry-path")]
    pub telemetry_path: Option<String>,

    /// Comma separated name server IPs, queried over TCP. Uses the system resolver when unset
    #[arg(long, env = "DNS_SERVERS")]
    pub dns_servers: Option<String>,

    /// YAML file with the same options
    #[arg(long, env = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,
}
