use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::{Client, Response};
use trust_dns_resolver::TokioAsyncResolver;
use trust_dns_resolver::error::ResolveError;
use url::Url;

use super::report;
use super::result::{ProbeResult, ProbeVariant};

#[derive(Debug, thiserror::Error)]
enum ProbeError {
    #[error("failed to resolve {name}")]
    Resolve {
        name: String,
        #[source]
        source: ResolveError,
    },
    #[error("GET {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("no answer within {0:?}")]
    Timeout(Duration),
}

/// Turn a configured host into the URL the HTTP probe requests.
/// Hosts already carrying an `http://` or `https://` scheme are kept as-is,
/// anything else is probed over HTTPS.
pub fn normalize_url(host: &str) -> String {
    if has_scheme(host) {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

fn has_scheme(host: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        host.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

/// The name handed to the resolver. `https://example.com:8443/health` and
/// `example.com:8443` both resolve `example.com`.
fn dns_name(host: &str) -> String {
    Url::parse(&normalize_url(host))
        .ok()
        .and_then(|url| {
            url.host_str()
                .map(|name| name.trim_start_matches('[').trim_end_matches(']').to_string())
        })
        .unwrap_or_else(|| host.to_string())
}

async fn timed<T>(fut: impl Future<Output = T>) -> (T, Duration) {
    let start = Instant::now();
    let output = fut.await;
    (output, start.elapsed())
}

/// Shared network clients used by every probe. Cloning is cheap and the
/// clones share the HTTP connection pool and the resolver cache.
#[derive(Clone)]
pub struct Prober {
    client: Client,
    resolver: TokioAsyncResolver,
}

impl Prober {
    pub fn new(client: Client, resolver: TokioAsyncResolver) -> Self {
        Self { client, resolver }
    }

    /// Probe `host` once. Failures are logged and reported as
    /// `success == false`; this never returns an error.
    pub async fn probe(
        &self,
        host: &str,
        variant: ProbeVariant,
        timeout: Option<Duration>,
    ) -> ProbeResult {
        let (outcome, latency) = match variant {
            ProbeVariant::Dns => timed(self.resolve(host, timeout)).await,
            ProbeVariant::Http => {
                let (response, latency) = timed(self.fetch(host, timeout)).await;
                match response {
                    Ok(response) => {
                        drain(host, response).await;
                        (Ok(()), latency)
                    }
                    Err(e) => (Err(e), latency),
                }
            }
        };

        let success = match outcome {
            Ok(()) => true,
            Err(e) => {
                log::error!("[{variant}] {host}: {}", report(&e));
                false
            }
        };

        ProbeResult {
            host: host.to_string(),
            success,
            latency,
        }
    }

    async fn resolve(&self, host: &str, timeout: Option<Duration>) -> Result<(), ProbeError> {
        let name = dns_name(host);
        let lookup = self.resolver.lookup_ip(name.as_str());
        let result = match timeout {
            Some(limit) => tokio::time::timeout(limit, lookup)
                .await
                .map_err(|_| ProbeError::Timeout(limit))?,
            None => lookup.await,
        };

        match result {
            Ok(_) => Ok(()),
            Err(source) => Err(ProbeError::Resolve { name, source }),
        }
    }

    async fn fetch(&self, host: &str, timeout: Option<Duration>) -> Result<Response, ProbeError> {
        let url = normalize_url(host);
        let mut request = self.client.get(&url);
        if let Some(limit) = timeout {
            request = request.timeout(limit);
        }

        request
            .send()
            .await
            .map_err(|source| ProbeError::Request { url, source })
    }
}

// Reads the body to the end so the connection goes back to the pool.
async fn drain(host: &str, response: Response) {
    let status = response.status();
    match response.bytes().await {
        Ok(body) => log::debug!("[http] {host}: {status}, {} bytes", body.len()),
        Err(e) => log::warn!("[http] {host}: failed to drain response body: {}", report(&e)),
    }
}
