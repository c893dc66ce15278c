use std::{
    collections::HashSet,
    sync::{
        Arc, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use do_exporter_common::error::{ExporterError, Result};

use crate::types::{CollectedMetric, GaugeOpts, MetricDescriptor, MetricType, MetricValue};

/// The describe/collect capability pair the registry drives.
///
/// `describe` is called once, at registration, and must not depend on any
/// upstream state. `collect` is called on every scrape.
#[async_trait]
pub trait Collector: Send + Sync {
    fn describe(&self) -> Vec<MetricDescriptor>;
    async fn collect(&self) -> Vec<CollectedMetric>;
}

#[derive(Default)]
struct RegistryInner {
    collectors: Vec<Arc<dyn Collector>>,
    names: HashSet<String>,
}

pub struct MetricsRegistry {
    inner: RwLock<RegistryInner>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    pub fn register_collector(&self, collector: Arc<dyn Collector>) -> Result<()> {
        let descriptors = collector.describe();
        let mut inner = self.inner.write().map_err(|_| {
            ExporterError::InternalError("failed to acquire metrics registry lock".to_string())
        })?;

        let mut incoming = HashSet::new();
        for descriptor in &descriptors {
            if inner.names.contains(&descriptor.name) || !incoming.insert(descriptor.name.clone()) {
                return Err(ExporterError::InvalidArgument(format!(
                    "metric already registered: {}",
                    descriptor.name
                )));
            }
        }

        inner.names.extend(incoming);
        inner.collectors.push(collector);
        Ok(())
    }

    pub fn describe_all(&self) -> Vec<MetricDescriptor> {
        self.collectors()
            .iter()
            .flat_map(|collector| collector.describe())
            .collect()
    }

    /// Runs every collector in registration order. The registry lock is
    /// released before any collector is awaited.
    pub async fn collect_all(&self) -> Vec<CollectedMetric> {
        let mut collected = Vec::new();
        for collector in self.collectors() {
            collected.extend(collector.collect().await);
        }
        collected
    }

    pub async fn render_prometheus(&self) -> String {
        let metrics = self.collect_all().await;
        let mut output = String::new();

        for metric in metrics {
            output.push_str("# HELP ");
            output.push_str(&metric.descriptor.name);
            output.push(' ');
            output.push_str(&escape_help(&metric.descriptor.help));
            output.push('\n');

            output.push_str("# TYPE ");
            output.push_str(&metric.descriptor.name);
            output.push(' ');
            output.push_str(metric.descriptor.metric_type.as_prometheus_type());
            output.push('\n');

            output.push_str(&render_sample_line(
                &metric.descriptor.name,
                metric.value.as_f64(),
            ));
        }

        output
    }

    fn collectors(&self) -> Vec<Arc<dyn Collector>> {
        match self.inner.read() {
            Ok(guard) => guard.collectors.clone(),
            Err(_) => Vec::new(),
        }
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A single unlabelled floating point value.
pub struct GaugeMetric {
    descriptor: MetricDescriptor,
    bits: AtomicU64,
}

impl GaugeMetric {
    pub fn new(opts: GaugeOpts) -> Self {
        Self {
            descriptor: MetricDescriptor {
                name: opts.fq_name(),
                help: opts.help,
                metric_type: MetricType::Gauge,
            },
            bits: AtomicU64::new(0.0_f64.to_bits()),
        }
    }

    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn descriptor(&self) -> &MetricDescriptor {
        &self.descriptor
    }

    pub fn sample(&self) -> CollectedMetric {
        CollectedMetric {
            descriptor: self.descriptor.clone(),
            value: MetricValue::Gauge(self.get()),
        }
    }
}

fn render_sample_line(name: &str, value: f64) -> String {
    let mut rendered = String::new();
    rendered.push_str(name);
    rendered.push(' ');
    rendered.push_str(&format_metric_value(value));
    rendered.push('\n');
    rendered
}

fn format_metric_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

fn escape_help(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\n', "\\n")
}
