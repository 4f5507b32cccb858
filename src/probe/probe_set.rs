use std::time::{Duration, Instant};

use super::prelude::*;

/// A fixed list of hosts checked with one probe variant.
#[derive(Debug, Clone)]
pub struct ProbeSet {
    variant: ProbeVariant,
    hosts: Vec<Host>,
    timeout: Option<Duration>,
}

impl ProbeSet {
    pub fn new(variant: ProbeVariant, hosts: Vec<Host>, timeout: Option<Duration>) -> Self {
        Self {
            variant,
            hosts,
            timeout,
        }
    }

    pub fn variant(&self) -> ProbeVariant {
        self.variant
    }

    /// Probe every host concurrently and wait for all of them.
    ///
    /// Exactly one result is returned per configured host. The order of the
    /// results is unspecified.
    pub async fn run(&self, prober: &Prober) -> Vec<ProbeResult> {
        let started = Instant::now();
        let mut handles = Vec::with_capacity(self.hosts.len());

        for host in &self.hosts {
            let prober = prober.clone();
            let host = host.clone();
            let variant = self.variant;
            let timeout = self.timeout;

            let handle =
                tokio::spawn(async move { prober.probe(&host, variant, timeout).await });
            handles.push(handle);
        }

        let mut results = Vec::with_capacity(handles.len());
        for (host, handle) in self.hosts.iter().zip(handles) {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    log::error!("[{}] {host}: probe task failed: {e}", self.variant);
                    results.push(ProbeResult::failed(host.clone(), started.elapsed()));
                }
            }
        }
        results
    }
}
