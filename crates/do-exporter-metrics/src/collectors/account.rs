use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use do_exporter_client::{AccountSnapshot, AccountSource, DEFAULT_TIMEOUT};
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::{
    registry::{Collector, GaugeMetric},
    types::{CollectedMetric, GaugeOpts, MetricDescriptor},
};

pub const NAMESPACE: &str = "digital_ocean";
pub const SUBSYSTEM: &str = "account";

/// Republishes the DigitalOcean account resource as four gauges.
///
/// Each scrape resets every gauge, fetches a fresh snapshot and maps it onto
/// the gauges. A failed fetch leaves all four at zero, and the zeros are still
/// emitted so the exposition never carries a value from an earlier cycle.
pub struct AccountCollector {
    source: Arc<dyn AccountSource>,
    timeout: Duration,
    // Held for the whole reset/fetch/emit cycle so overlapping scrapes never interleave.
    cycle: Mutex<()>,
    active: GaugeMetric,
    droplet_limit: GaugeMetric,
    email_verified: GaugeMetric,
    floating_ip_limit: GaugeMetric,
}

impl AccountCollector {
    pub fn new(source: Arc<dyn AccountSource>) -> Self {
        Self::with_timeout(source, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(source: Arc<dyn AccountSource>, timeout: Duration) -> Self {
        Self {
            source,
            timeout,
            cycle: Mutex::new(()),
            active: account_gauge("active", "if 1 account is active"),
            droplet_limit: account_gauge(
                "droplet_limit",
                "total number of droplets you can create",
            ),
            email_verified: account_gauge("email_verified", "if 1 email was verified"),
            floating_ip_limit: account_gauge(
                "floating_ip_limit",
                "total number of floating IPs that you can have",
            ),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn gauges(&self) -> [&GaugeMetric; 4] {
        [
            &self.active,
            &self.droplet_limit,
            &self.email_verified,
            &self.floating_ip_limit,
        ]
    }

    fn reset(&self) {
        for gauge in self.gauges() {
            gauge.set(0.0);
        }
    }

    fn apply(&self, snapshot: &AccountSnapshot) {
        self.active.set(flag_value(snapshot.is_active()));
        self.droplet_limit.set(snapshot.droplet_limit as f64);
        self.email_verified.set(flag_value(snapshot.email_verified));
        self.floating_ip_limit.set(snapshot.floating_ip_limit as f64);
    }
}

#[async_trait]
impl Collector for AccountCollector {
    fn describe(&self) -> Vec<MetricDescriptor> {
        self.gauges()
            .into_iter()
            .map(|gauge| gauge.descriptor().clone())
            .collect()
    }

    async fn collect(&self) -> Vec<CollectedMetric> {
        let _cycle = self.cycle.lock().await;

        self.reset();

        match self.source.fetch_account(self.timeout).await {
            Ok(snapshot) => {
                debug!(
                    status = %snapshot.status,
                    uuid = snapshot.uuid.as_deref().unwrap_or_default(),
                    "collected account snapshot"
                );
                self.apply(&snapshot);
            }
            Err(err) => {
                error!(error = %err, kind = err.kind(), "can't get a valid account response");
            }
        }

        self.gauges()
            .into_iter()
            .map(GaugeMetric::sample)
            .collect()
    }
}

fn account_gauge(name: &str, help: &str) -> GaugeMetric {
    GaugeMetric::new(GaugeOpts::new(NAMESPACE, SUBSYSTEM, name, help))
}

fn flag_value(flag: bool) -> f64 {
    if flag { 1.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            Arc, Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use async_trait::async_trait;
    use do_exporter_client::{AccountSnapshot, AccountSource};
    use do_exporter_common::error::{ExporterError, Result};

    use super::AccountCollector;
    use crate::registry::Collector;

    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<AccountSnapshot>>>,
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<AccountSnapshot>>) -> Arc<Self> {
            Self::with_delay(responses, Duration::ZERO)
        }

        fn with_delay(responses: Vec<Result<AccountSnapshot>>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                delay,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl AccountSource for ScriptedSource {
        async fn fetch_account(&self, _timeout: Duration) -> Result<AccountSnapshot> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.responses
                .lock()
                .expect("responses lock")
                .pop_front()
                .unwrap_or_else(|| Err(ExporterError::Upstream("script exhausted".to_string())))
        }
    }

    fn snapshot(status: &str, droplets: u64, verified: bool, floating_ips: u64) -> AccountSnapshot {
        AccountSnapshot {
            status: status.to_string(),
            droplet_limit: droplets,
            email_verified: verified,
            floating_ip_limit: floating_ips,
            volume_limit: None,
            uuid: None,
            email: None,
            status_message: None,
        }
    }

    async fn collect_values(collector: &AccountCollector) -> Vec<(String, f64)> {
        collector
            .collect()
            .await
            .into_iter()
            .map(|metric| (metric.descriptor.name, metric.value.as_f64()))
            .collect()
    }

    fn expected(values: [f64; 4]) -> Vec<(String, f64)> {
        [
            "digital_ocean_account_active",
            "digital_ocean_account_droplet_limit",
            "digital_ocean_account_email_verified",
            "digital_ocean_account_floating_ip_limit",
        ]
        .into_iter()
        .zip(values)
        .map(|(name, value)| (name.to_string(), value))
        .collect()
    }

    #[test]
    fn describe_lists_four_gauges_with_help() {
        let collector = AccountCollector::new(ScriptedSource::new(Vec::new()));
        let descriptors = collector.describe();

        let names: Vec<_> = descriptors.iter().map(|desc| desc.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "digital_ocean_account_active",
                "digital_ocean_account_droplet_limit",
                "digital_ocean_account_email_verified",
                "digital_ocean_account_floating_ip_limit",
            ]
        );
        assert_eq!(descriptors[0].help, "if 1 account is active");
        assert_eq!(descriptors[1].help, "total number of droplets you can create");
        assert_eq!(descriptors[2].help, "if 1 email was verified");
        assert_eq!(
            descriptors[3].help,
            "total number of floating IPs that you can have"
        );
        assert_eq!(collector.timeout(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn active_account_maps_every_field() {
        let source = ScriptedSource::new(vec![Ok(snapshot("active", 25, true, 3))]);
        let collector = AccountCollector::new(source);

        assert_eq!(collect_values(&collector).await, expected([1.0, 25.0, 1.0, 3.0]));
    }

    #[tokio::test]
    async fn locked_account_maps_to_zeros() {
        let source = ScriptedSource::new(vec![Ok(snapshot("locked", 0, false, 0))]);
        let collector = AccountCollector::new(source);

        assert_eq!(collect_values(&collector).await, expected([0.0; 4]));
    }

    #[tokio::test]
    async fn flags_are_encoded_as_one_or_zero() {
        let cases = [
            ("active", true, 1.0, 1.0),
            ("active", false, 1.0, 0.0),
            ("warning", true, 0.0, 1.0),
            ("locked", false, 0.0, 0.0),
        ];

        for (status, verified, active, email_verified) in cases {
            let source = ScriptedSource::new(vec![Ok(snapshot(status, 10, verified, 1))]);
            let collector = AccountCollector::new(source);
            let values = collect_values(&collector).await;
            assert_eq!(values[0].1, active, "status {status}");
            assert_eq!(values[2].1, email_verified, "email_verified {verified}");
        }
    }

    #[tokio::test]
    async fn limits_are_reproduced_exactly() {
        let large = 9_007_199_254_740_992_u64;
        let source = ScriptedSource::new(vec![Ok(snapshot("active", large, true, 1_000_000))]);
        let collector = AccountCollector::new(source);

        let values = collect_values(&collector).await;
        assert_eq!(values[1].1 as u64, large);
        assert_eq!(values[3].1, 1_000_000.0);
    }

    #[tokio::test]
    async fn identical_snapshots_yield_identical_values() {
        let source = ScriptedSource::new(vec![
            Ok(snapshot("active", 25, true, 3)),
            Ok(snapshot("active", 25, true, 3)),
        ]);
        let collector = AccountCollector::new(source);

        let first = collect_values(&collector).await;
        let second = collect_values(&collector).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn upstream_error_resets_previous_values() {
        let source = ScriptedSource::new(vec![
            Ok(snapshot("active", 25, true, 3)),
            Err(ExporterError::Upstream("502 Bad Gateway".to_string())),
            Err(ExporterError::Timeout(Duration::from_secs(3))),
        ]);
        let collector = AccountCollector::new(source);

        assert_eq!(collect_values(&collector).await, expected([1.0, 25.0, 1.0, 3.0]));
        assert_eq!(collect_values(&collector).await, expected([0.0; 4]));
        assert_eq!(collect_values(&collector).await, expected([0.0; 4]));
        assert!(collector.gauges().iter().all(|gauge| gauge.get() == 0.0));
    }

    #[tokio::test]
    async fn overlapping_scrapes_are_serialized() {
        let source = ScriptedSource::with_delay(
            vec![
                Ok(snapshot("active", 25, true, 3)),
                Ok(snapshot("locked", 5, false, 1)),
            ],
            Duration::from_millis(50),
        );
        let collector = Arc::new(AccountCollector::new(source.clone()));

        let (first, second) = tokio::join!(
            collect_values(collector.as_ref()),
            collect_values(collector.as_ref())
        );

        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
        let mut results = vec![first, second];
        results.sort_by(|left, right| left[1].1.total_cmp(&right[1].1));
        assert_eq!(results[0], expected([0.0, 5.0, 0.0, 1.0]));
        assert_eq!(results[1], expected([1.0, 25.0, 1.0, 3.0]));
    }
}
