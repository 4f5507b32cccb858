//! Metric schema and the exposition sink samples are written into.
//!
//! Every probe variant exports two gauges labelled by `host`:
//! - `<namespace>_<variant>_request_successful` - 1 if the request succeeded, 0 otherwise
//! - `<namespace>_<variant>_request_time_ns` - time spent on the request in nanoseconds

pub mod schema;
pub mod sink;

pub use schema::{MetricDesc, MetricSchema, VariantMetrics};
pub use sink::{ExpositionSink, Sample, SinkError};

pub const NAMESPACE: &str = "connectivity";
pub const HOST_LABEL: &str = "host";
