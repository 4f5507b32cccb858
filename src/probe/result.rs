use std::fmt;
use std::time::Duration;

/// A configured probe target: a domain name or IP, optionally with a scheme.
pub type Host = String;

/// The kind of network check a `ProbeSet` performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeVariant {
    Dns,
    Http,
}

impl ProbeVariant {
    /// Metric subsystem name for this variant, e.g. `dns` in
    /// `connectivity_dns_request_successful`.
    pub fn subsystem(&self) -> &'static str {
        match self {
            ProbeVariant::Dns => "dns",
            ProbeVariant::Http => "http",
        }
    }
}

impl fmt::Display for ProbeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.subsystem())
    }
}

/// Outcome of probing one host once.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub host: Host,
    pub success: bool,
    pub latency: Duration,
}

impl ProbeResult {
    pub fn failed(host: Host, latency: Duration) -> Self {
        Self {
            host,
            success: false,
            latency,
        }
    }

    /// 1.0 on success and 0.0 otherwise.
    pub fn success_value(&self) -> f64 {
        match self.success {
            true => 1.0,
            false => 0.0,
        }
    }

    /// Elapsed time in nanoseconds.
    pub fn latency_ns(&self) -> f64 {
        self.latency.as_nanos() as f64
    }
}
