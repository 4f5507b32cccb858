use std::collections::HashMap;

use prometheus::proto::MetricFamily;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

use super::schema::MetricDesc;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("encoded metrics are not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// One gauge value for one host.
#[derive(Debug, Clone, Copy)]
pub struct Sample<'a> {
    pub desc: &'a MetricDesc,
    pub host: &'a str,
    pub value: f64,
}

/// Collects the samples of a single scrape and renders them in the
/// Prometheus text format. A new sink is created for every scrape.
pub struct ExpositionSink {
    registry: Registry,
    families: HashMap<String, GaugeVec>,
}

impl ExpositionSink {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            families: HashMap::new(),
        }
    }

    pub fn record(&mut self, sample: Sample<'_>) -> Result<(), SinkError> {
        if !self.families.contains_key(&sample.desc.name) {
            let gauges = GaugeVec::new(
                Opts::new(sample.desc.name.clone(), sample.desc.help),
                sample.desc.labels,
            )?;
            self.registry.register(Box::new(gauges.clone()))?;
            self.families.insert(sample.desc.name.clone(), gauges);
        }

        let gauges = &self.families[&sample.desc.name];
        gauges.get_metric_with_label_values(&[sample.host])?.set(sample.value);
        Ok(())
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }

    pub fn render(&self) -> Result<String, SinkError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl Default for ExpositionSink {
    fn default() -> Self {
        Self::new()
    }
}
