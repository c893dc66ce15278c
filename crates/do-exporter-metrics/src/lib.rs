pub mod collectors;
pub mod handlers;
pub mod registry;
pub mod router;
pub mod types;

pub use collectors::account::AccountCollector;
pub use registry::{Collector, GaugeMetric, MetricsRegistry};
pub use router::{ExporterState, exporter_router};
pub use types::{CollectedMetric, GaugeOpts, MetricDescriptor, MetricType, MetricValue};
