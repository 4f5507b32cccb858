use std::collections::HashMap;

use prometheus::core::Desc;

use super::HOST_LABEL;
use super::sink::SinkError;
use crate::probe::result::ProbeVariant;

const SUCCESS_SUFFIX: &str = "request_successful";
const SUCCESS_HELP: &str = "Boolean Metric with 1 if the request was successful";
const LATENCY_SUFFIX: &str = "request_time_ns";
const LATENCY_HELP: &str = "Duration of the request";

/// Name, help text and variable labels of one gauge family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDesc {
    pub name: String,
    pub help: &'static str,
    pub labels: &'static [&'static str],
}

impl MetricDesc {
    fn new(namespace: &str, subsystem: &str, suffix: &str, help: &'static str) -> Self {
        Self {
            name: build_fq_name(namespace, subsystem, suffix),
            help,
            labels: &[HOST_LABEL],
        }
    }

    pub fn desc(&self) -> Result<Desc, SinkError> {
        Ok(Desc::new(
            self.name.clone(),
            self.help.to_string(),
            self.labels.iter().map(|l| l.to_string()).collect(),
            HashMap::new(),
        )?)
    }
}

/// The success/latency pair exported for one probe variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantMetrics {
    pub success: MetricDesc,
    pub latency: MetricDesc,
}

impl VariantMetrics {
    fn new(namespace: &str, variant: ProbeVariant) -> Self {
        Self {
            success: MetricDesc::new(namespace, variant.subsystem(), SUCCESS_SUFFIX, SUCCESS_HELP),
            latency: MetricDesc::new(namespace, variant.subsystem(), LATENCY_SUFFIX, LATENCY_HELP),
        }
    }
}

/// All metric families the exporter can emit, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSchema {
    dns: VariantMetrics,
    http: VariantMetrics,
}

impl MetricSchema {
    pub fn new(namespace: &str) -> Self {
        Self {
            dns: VariantMetrics::new(namespace, ProbeVariant::Dns),
            http: VariantMetrics::new(namespace, ProbeVariant::Http),
        }
    }

    pub fn for_variant(&self, variant: ProbeVariant) -> &VariantMetrics {
        match variant {
            ProbeVariant::Dns => &self.dns,
            ProbeVariant::Http => &self.http,
        }
    }

    /// Descriptors of the families exported for `variants`.
    pub fn describe(&self, variants: &[ProbeVariant]) -> Result<Vec<Desc>, SinkError> {
        let mut descs = Vec::with_capacity(variants.len() * 2);
        for variant in variants {
            let metrics = self.for_variant(*variant);
            descs.push(metrics.success.desc()?);
            descs.push(metrics.latency.desc()?);
        }
        Ok(descs)
    }
}

/// Joins the non-empty parts with `_`.
fn build_fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}
