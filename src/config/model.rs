use serde::Deserialize;

/// Contents of the optional YAML config file. Every key is optional and
/// overridden by the matching command line option.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    /// Hosts to check, either a YAML list or a comma separated string.
    pub hosts: Option<HostList>,

    /// Timeout for a single check, e.g. `5s`.
    pub timeout: Option<String>,

    /// Address to listen on, e.g. `:9449` or `127.0.0.1:9449`.
    pub listen_address: Option<String>,

    /// Path under which metrics are exposed.
    pub telemetry_path: Option<String>,

    /// Name server IPs used for the DNS check.
    pub dns_servers: Option<HostList>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HostList {
    List(Vec<String>),
    Joined(String),
}

impl HostList {
    pub fn into_raw_entries(self) -> Vec<String> {
        match self {
            HostList::List(list) => list,
            HostList::Joined(joined) => split_list(&joined),
        }
    }
}

pub fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(|s| s.trim().to_string()).collect()
}
