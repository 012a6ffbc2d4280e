//! Cluster cost reconciliation and date-range aggregation
//!
//! `EmrCostCalculator` joins a cluster's instance groups with their instances:
//! each group resolves an effective hourly price, each instance resolves a
//! billed lifetime, and costs accumulate per group role plus a `TOTAL` key.
//! Accumulation is unrounded; values are rounded to 3 decimals only at
//! finalization so rounding error never compounds.

use crate::emr::ClusterApi;
use crate::error::{EmrCostError, Result};
use crate::instance::{Ec2Instance, TIMELINE_FORMAT};
use crate::lister::ClusterLister;
use crate::pricing::{InstanceGroup, PriceTable};
use crate::retry::{ExponentialBackoffPolicy, RetryPolicy};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Synthetic cost-map key holding the cluster-wide sum.
pub const TOTAL_KEY: &str = "TOTAL";

/// Finalized cost map for one cluster, keyed by group role plus [`TOTAL_KEY`].
#[derive(Debug, Clone, Serialize)]
pub struct CostReport {
    pub costs: BTreeMap<String, f64>,
    /// True when any counted instance was still running and its termination
    /// time was substituted with "now". Such costs are estimates and grow on
    /// repeated queries.
    pub provisional: bool,
    #[serde(skip)]
    raw_total: f64,
}

impl CostReport {
    fn finalize(sums: BTreeMap<String, f64>, provisional: bool) -> Self {
        let raw_total = sums.get(TOTAL_KEY).copied().unwrap_or(0.0);
        let costs = sums.into_iter().map(|(k, v)| (k, round3(v))).collect();
        Self {
            costs,
            provisional,
            raw_total,
        }
    }

    /// Rounded cluster-wide total.
    pub fn total(&self) -> f64 {
        self.costs.get(TOTAL_KEY).copied().unwrap_or(0.0)
    }

    /// Cluster-wide total before rounding, used when summing across clusters.
    pub fn raw_total(&self) -> f64 {
        self.raw_total
    }
}

/// Cost engine over an abstract cluster listing service.
pub struct EmrCostCalculator<'a> {
    api: &'a dyn ClusterApi,
    prices: &'a PriceTable,
    retry: ExponentialBackoffPolicy,
}

impl<'a> EmrCostCalculator<'a> {
    pub fn new(api: &'a dyn ClusterApi, prices: &'a PriceTable) -> Self {
        Self {
            api,
            prices,
            retry: ExponentialBackoffPolicy::for_emr_api(),
        }
    }

    /// Replace the backoff policy, e.g. with short delays under test.
    pub fn with_retry_policy(mut self, retry: ExponentialBackoffPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Cost map for a single cluster.
    ///
    /// Remote calls are retried under the backoff policy when throttled. A
    /// single instance with a malformed or incomplete timeline is skipped
    /// with a warning; pricing and configuration defects abort the cluster.
    pub async fn get_cluster_cost(&self, cluster_id: &str) -> Result<CostReport> {
        let groups = self
            .retry
            .execute_with_retry(|| async { self.api.list_instance_groups(cluster_id).await })
            .await?;

        let mut sums: BTreeMap<String, f64> = BTreeMap::new();
        let mut provisional = false;
        for descriptor in &groups {
            let group = InstanceGroup::from_descriptor(descriptor, self.prices)?;
            let instances = self
                .retry
                .execute_with_retry(|| async {
                    self.api.list_instances(cluster_id, &group.group_id).await
                })
                .await?;

            for record in &instances {
                let Some(creation_ts) = record.creation_ts.as_deref() else {
                    warn!(
                        "Skipping instance {} in cluster {}: timeline has no creation time",
                        record.instance_id.as_deref().unwrap_or("<unknown>"),
                        cluster_id
                    );
                    continue;
                };
                // Still-running instances get "now" as a provisional
                // termination; the report is flagged accordingly.
                let still_running = record.termination_ts.is_none();
                let provisional_end;
                let termination_ts = match record.termination_ts.as_deref() {
                    Some(ts) => ts,
                    None => {
                        provisional_end = Utc::now().format(TIMELINE_FORMAT).to_string();
                        &provisional_end
                    }
                };
                let instance = match Ec2Instance::new(creation_ts, termination_ts, group.hourly_price)
                {
                    Ok(instance) => instance,
                    Err(err @ EmrCostError::Parse { .. }) => {
                        warn!(
                            "Skipping instance {} in cluster {}: {}",
                            record.instance_id.as_deref().unwrap_or("<unknown>"),
                            cluster_id,
                            err
                        );
                        continue;
                    }
                    Err(err) => return Err(err),
                };
                provisional |= still_running;
                *sums.entry(group.role.as_str().to_string()).or_insert(0.0) += instance.cost;
                *sums.entry(TOTAL_KEY.to_string()).or_insert(0.0) += instance.cost;
            }
        }

        Ok(CostReport::finalize(sums, provisional))
    }

    /// Grand total across every cluster created inside the date window.
    ///
    /// A non-retryable failure for any cluster aborts the whole aggregation;
    /// no partial grand total is reported.
    pub async fn get_total_cost_by_dates(
        &self,
        created_after: NaiveDate,
        created_before: NaiveDate,
    ) -> Result<f64> {
        let mut lister = ClusterLister::new(self.api, created_after, created_before);
        let mut grand_total = 0.0;
        let mut clusters = 0u64;
        while let Some(cluster_id) = lister.next().await? {
            let report = self.get_cluster_cost(&cluster_id).await?;
            grand_total += report.raw_total();
            clusters += 1;
        }
        info!("Aggregated cost over {} clusters", clusters);
        Ok(round3(grand_total))
    }
}

/// Round a monetary value to 3 decimal places.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round3_rounds_to_three_decimals() {
        assert_eq!(round3(1.11149), 1.111);
        assert_eq!(round3(1.1115), 1.112);
        assert_eq!(round3(0.0), 0.0);
        assert_eq!(round3(2.9999), 3.0);
    }

    #[test]
    fn finalize_rounds_values_but_keeps_the_raw_total() {
        let sums = BTreeMap::from([
            ("MASTER".to_string(), 1.1111),
            ("CORE".to_string(), 2.2222),
            (TOTAL_KEY.to_string(), 3.3333),
        ]);
        let report = CostReport::finalize(sums, false);
        assert_eq!(report.costs["MASTER"], 1.111);
        assert_eq!(report.costs["CORE"], 2.222);
        assert_eq!(report.total(), 3.333);
        assert!((report.raw_total() - 3.3333).abs() < 1e-12);
        // Rounding each value independently may drift from the rounded total
        // by a few thousandths; this is a documented rounding-order artifact.
        let role_sum: f64 = report.costs["MASTER"] + report.costs["CORE"];
        assert!((role_sum - report.total()).abs() < 0.005);
    }

    #[test]
    fn empty_report_totals_zero() {
        let report = CostReport::finalize(BTreeMap::new(), false);
        assert_eq!(report.total(), 0.0);
        assert!(!report.provisional);
    }
}
