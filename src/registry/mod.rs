use prometheus::core::Desc;

use crate::metrics::{ExpositionSink, MetricSchema, Sample, SinkError, VariantMetrics};
use crate::probe::prelude::*;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("more than one probe set registered for the {0} variant")]
    DuplicateVariant(ProbeVariant),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Owns the probe sets and turns each scrape into a fresh set of samples.
pub struct Registry {
    schema: MetricSchema,
    prober: Prober,
    probe_sets: Vec<ProbeSet>,
}

impl Registry {
    pub fn new(
        schema: MetricSchema,
        prober: Prober,
        probe_sets: Vec<ProbeSet>,
    ) -> Result<Self, RegistryError> {
        for (i, set) in probe_sets.iter().enumerate() {
            if probe_sets[..i].iter().any(|s| s.variant() == set.variant()) {
                return Err(RegistryError::DuplicateVariant(set.variant()));
            }
        }

        Ok(Self {
            schema,
            prober,
            probe_sets,
        })
    }

    /// Every metric family this registry exports, available before any scrape.
    pub fn describe(&self) -> Result<Vec<Desc>, RegistryError> {
        let variants: Vec<ProbeVariant> = self.probe_sets.iter().map(ProbeSet::variant).collect();
        Ok(self.schema.describe(&variants)?)
    }

    /// Run every probe set in registration order and collect the results.
    /// Unreachable hosts show up as failed samples, never as an error.
    pub async fn scrape(&self) -> Result<ExpositionSink, RegistryError> {
        let mut sink = ExpositionSink::new();

        for set in &self.probe_sets {
            let results = set.run(&self.prober).await;
            let successful = results.iter().filter(|r| r.success).count();
            log::debug!(
                "[{}] {successful}/{} hosts reachable",
                set.variant(),
                results.len()
            );

            record_results(&mut sink, self.schema.for_variant(set.variant()), &results)?;
        }

        Ok(sink)
    }
}

/// Write the success and latency samples of `results` into `sink`.
pub fn record_results(
    sink: &mut ExpositionSink,
    metrics: &VariantMetrics,
    results: &[ProbeResult],
) -> Result<(), SinkError> {
    for result in results {
        sink.record(Sample {
            desc: &metrics.success,
            host: &result.host,
            value: result.success_value(),
        })?;
        sink.record(Sample {
            desc: &metrics.latency,
            host: &result.host,
            value: result.latency_ns(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{HOST_LABEL, NAMESPACE};
    use crate::probe::probe::tests::{refused_host, spawn_http_server, test_prober};
    use prometheus::proto::MetricFamily;
    use std::collections::HashMap;
    use std::time::Duration;

    fn samples(families: &[MetricFamily], name: &str) -> HashMap<String, f64> {
        families
            .iter()
            .filter(|f| f.get_name() == name)
            .flat_map(|f| f.get_metric())
            .map(|m| {
                let host = m
                    .get_label()
                    .iter()
                    .find(|l| l.get_name() == HOST_LABEL)
                    .map(|l| l.get_value().to_string())
                    .unwrap_or_default();
                (host, m.get_gauge().get_value())
            })
            .collect()
    }

    #[tokio::test]
    async fn test_duplicate_variant_is_rejected() {
        let sets = vec![
            ProbeSet::new(ProbeVariant::Dns, vec!["a.example".to_string()], None),
            ProbeSet::new(ProbeVariant::Http, vec!["a.example".to_string()], None),
            ProbeSet::new(ProbeVariant::Dns, vec!["b.example".to_string()], None),
        ];
        let err = Registry::new(MetricSchema::new(NAMESPACE), test_prober(), sets);
        assert!(matches!(err, Err(RegistryError::DuplicateVariant(ProbeVariant::Dns))));
    }

    #[tokio::test]
    async fn test_describe_without_scrape() {
        let sets = vec![
            ProbeSet::new(ProbeVariant::Http, vec!["a.example".to_string()], None),
            ProbeSet::new(ProbeVariant::Dns, vec!["a.example".to_string()], None),
        ];
        let registry =
            Registry::new(MetricSchema::new(NAMESPACE), test_prober(), sets).expect("registry");
        let first: Vec<String> = registry
            .describe()
            .expect("describe")
            .into_iter()
            .map(|d| d.fq_name)
            .collect();
        let second: Vec<String> = registry
            .describe()
            .expect("describe")
            .into_iter()
            .map(|d| d.fq_name)
            .collect();
        assert_eq!(first.len(), 4);
        assert_eq!(first, second);
    }

    #[test]
    fn test_record_results_emits_pair_per_host() {
        let schema = MetricSchema::new(NAMESPACE);
        let results = vec![
            ProbeResult {
                host: "up.example".to_string(),
                success: true,
                latency: Duration::from_millis(12),
            },
            ProbeResult::failed("down.example".to_string(), Duration::from_millis(3)),
        ];

        let mut sink = ExpositionSink::new();
        record_results(&mut sink, schema.for_variant(ProbeVariant::Http), &results)
            .expect("record");
        let families = sink.gather();

        let success = samples(&families, "connectivity_http_request_successful");
        assert_eq!(success.len(), 2);
        assert_eq!(success["up.example"], 1.0);
        assert_eq!(success["down.example"], 0.0);

        let latency = samples(&families, "connectivity_http_request_time_ns");
        assert_eq!(latency.len(), 2);
        assert_eq!(latency["up.example"], 12_000_000.0);
        assert_eq!(latency["down.example"], 3_000_000.0);
    }

    #[tokio::test]
    async fn test_scrape_with_one_broken_host() {
        let mut hosts = vec![
            spawn_http_server("200 OK").await,
            spawn_http_server("404 Not Found").await,
        ];
        let broken = refused_host().await;
        hosts.push(broken.clone());

        let timeout = Some(Duration::from_secs(2));
        let sets = vec![ProbeSet::new(ProbeVariant::Http, hosts.clone(), timeout)];
        let registry =
            Registry::new(MetricSchema::new(NAMESPACE), test_prober(), sets).expect("registry");

        for _ in 0..2 {
            let families = registry.scrape().await.expect("scrape").gather();
            let success = samples(&families, "connectivity_http_request_successful");
            let latency = samples(&families, "connectivity_http_request_time_ns");

            assert_eq!(success.len(), hosts.len());
            assert_eq!(latency.len(), hosts.len());
            for host in &hosts {
                let expected = if host == &broken { 0.0 } else { 1.0 };
                assert_eq!(success[host], expected, "unexpected success for {host}");
                assert!(latency[host] >= 0.0);
            }
        }
    }

    #[tokio::test]
    async fn test_scrape_runs_every_probe_set() {
        let sets = vec![
            ProbeSet::new(
                ProbeVariant::Http,
                vec![spawn_http_server("200 OK").await],
                Some(Duration::from_secs(2)),
            ),
            ProbeSet::new(
                ProbeVariant::Dns,
                vec!["127.0.0.1".to_string(), "nonexistent.invalid".to_string()],
                Some(Duration::from_secs(2)),
            ),
        ];
        let registry =
            Registry::new(MetricSchema::new(NAMESPACE), test_prober(), sets).expect("registry");

        let families = registry.scrape().await.expect("scrape").gather();
        assert_eq!(families.len(), 4);

        let dns = samples(&families, "connectivity_dns_request_successful");
        assert_eq!(dns["127.0.0.1"], 1.0);
        assert_eq!(dns["nonexistent.invalid"], 0.0);
    }

    #[tokio::test]
    async fn test_concurrent_scrapes_are_independent() {
        let hosts = vec![spawn_http_server("200 OK").await, refused_host().await];
        let sets = vec![ProbeSet::new(
            ProbeVariant::Http,
            hosts,
            Some(Duration::from_secs(2)),
        )];
        let registry =
            Registry::new(MetricSchema::new(NAMESPACE), test_prober(), sets).expect("registry");

        let (a, b) = tokio::join!(registry.scrape(), registry.scrape());
        let a = a.expect("scrape").render().expect("render");
        let b = b.expect("scrape").render().expect("render");
        assert_eq!(a.matches("_request_successful{").count(), 2);
        assert_eq!(b.matches("_request_successful{").count(), 2);
    }
}
