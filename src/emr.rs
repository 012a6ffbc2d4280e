//! EMR listing API seam
//!
//! `ClusterApi` is the boundary between the cost engine and the remote EMR
//! service: everything the engine consumes arrives through the three listing
//! operations below, carrying plain wire descriptors. `EmrClient` adapts the
//! AWS SDK to that trait; tests substitute their own implementations.

use crate::error::{EmrCostError, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_emr::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_emr::primitives::{DateTime as SdkDateTime, DateTimeFormat};
use aws_sdk_emr::Client;
use chrono::{NaiveDate, NaiveTime};

/// One page of the cluster listing, with the cursor for the next page if any.
#[derive(Debug, Clone, Default)]
pub struct ClusterPage {
    pub cluster_ids: Vec<String>,
    pub marker: Option<String>,
}

/// Wire descriptor of an instance group, before price normalization.
#[derive(Debug, Clone)]
pub struct InstanceGroupData {
    pub group_id: String,
    pub instance_type: String,
    /// `MASTER`, `CORE` or `TASK`.
    pub group_role: String,
    /// `ON_DEMAND` or `SPOT`.
    pub market: String,
    pub bid_price: Option<String>,
}

/// Wire descriptor of one instance's timeline.
///
/// A missing termination timestamp means the instance is still running; a
/// missing creation timestamp means the record is malformed.
#[derive(Debug, Clone, Default)]
pub struct InstanceData {
    pub instance_id: Option<String>,
    pub creation_ts: Option<String>,
    pub termination_ts: Option<String>,
}

/// Operations the cost engine consumes from the remote listing service.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// One page of cluster ids created inside the date window. Pass the
    /// marker from the previous page to continue; a `None` marker in the
    /// returned page means the listing is complete.
    async fn list_clusters(
        &self,
        created_after: NaiveDate,
        created_before: NaiveDate,
        marker: Option<String>,
    ) -> Result<ClusterPage>;

    async fn list_instance_groups(&self, cluster_id: &str) -> Result<Vec<InstanceGroupData>>;

    async fn list_instances(
        &self,
        cluster_id: &str,
        group_id: &str,
    ) -> Result<Vec<InstanceData>>;
}

/// `ClusterApi` backed by the AWS EMR SDK.
pub struct EmrClient {
    inner: Client,
}

impl EmrClient {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            inner: Client::new(config),
        }
    }
}

#[async_trait]
impl ClusterApi for EmrClient {
    async fn list_clusters(
        &self,
        created_after: NaiveDate,
        created_before: NaiveDate,
        marker: Option<String>,
    ) -> Result<ClusterPage> {
        let response = self
            .inner
            .list_clusters()
            .created_after(date_to_sdk_time(created_after))
            .created_before(date_to_sdk_time(created_before))
            .set_marker(marker)
            .send()
            .await
            .map_err(|e| classify_sdk_error("ListClusters", e))?;

        let cluster_ids = response
            .clusters()
            .iter()
            .filter_map(|c| c.id().map(str::to_string))
            .collect();
        Ok(ClusterPage {
            cluster_ids,
            marker: response.marker().map(str::to_string),
        })
    }

    async fn list_instance_groups(&self, cluster_id: &str) -> Result<Vec<InstanceGroupData>> {
        let mut groups = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let response = self
                .inner
                .list_instance_groups()
                .cluster_id(cluster_id)
                .set_marker(marker)
                .send()
                .await
                .map_err(|e| classify_sdk_error("ListInstanceGroups", e))?;

            for group in response.instance_groups() {
                let Some(group_id) = group.id() else {
                    continue;
                };
                groups.push(InstanceGroupData {
                    group_id: group_id.to_string(),
                    instance_type: group.instance_type().unwrap_or_default().to_string(),
                    group_role: group
                        .instance_group_type()
                        .map(|t| t.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    market: group
                        .market()
                        .map(|m| m.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    bid_price: group.bid_price().map(str::to_string),
                });
            }
            marker = response.marker().map(str::to_string);
            if marker.is_none() {
                return Ok(groups);
            }
        }
    }

    async fn list_instances(
        &self,
        cluster_id: &str,
        group_id: &str,
    ) -> Result<Vec<InstanceData>> {
        let mut instances = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let response = self
                .inner
                .list_instances()
                .cluster_id(cluster_id)
                .instance_group_id(group_id)
                .set_marker(marker)
                .send()
                .await
                .map_err(|e| classify_sdk_error("ListInstances", e))?;

            for instance in response.instances() {
                let timeline = instance.status().and_then(|s| s.timeline());
                instances.push(InstanceData {
                    instance_id: instance.id().map(str::to_string),
                    creation_ts: timeline
                        .and_then(|t| t.creation_date_time())
                        .and_then(format_sdk_time),
                    termination_ts: timeline
                        .and_then(|t| t.end_date_time())
                        .and_then(format_sdk_time),
                });
            }
            marker = response.marker().map(str::to_string);
            if marker.is_none() {
                return Ok(instances);
            }
        }
    }
}

fn date_to_sdk_time(date: NaiveDate) -> SdkDateTime {
    SdkDateTime::from_secs(date.and_time(NaiveTime::MIN).and_utc().timestamp())
}

fn format_sdk_time(dt: &SdkDateTime) -> Option<String> {
    dt.fmt(DateTimeFormat::DateTime).ok()
}

/// Error codes the EMR API uses to signal a per-account rate quota rejection.
const THROTTLING_CODES: &[&str] = &[
    "ThrottlingException",
    "Throttling",
    "TooManyRequestsException",
    "RequestLimitExceeded",
];

/// Map an SDK error to the engine's typed error kinds. Throttling carries a
/// distinguished retryable tag; connect/timeout failures become `Connection`;
/// everything else is a plain `Api` error.
fn classify_sdk_error<E, R>(operation: &str, err: SdkError<E, R>) -> EmrCostError
where
    E: ProvideErrorMetadata,
{
    match &err {
        SdkError::TimeoutError(_) => {
            EmrCostError::Connection(format!("{operation} request timed out"))
        }
        SdkError::DispatchFailure(failure) => {
            let detail = failure
                .as_connector_error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "request dispatch failed".to_string());
            EmrCostError::Connection(format!("{operation}: {detail}"))
        }
        _ => {
            let (code, message) = match err.as_service_error() {
                Some(service_err) => (
                    service_err.code().unwrap_or("unknown"),
                    service_err.message().unwrap_or("no error message"),
                ),
                None => ("unknown", "unhandled SDK error"),
            };
            if THROTTLING_CODES.contains(&code) {
                EmrCostError::Throttling(format!("{operation}: {message}"))
            } else {
                EmrCostError::Api {
                    operation: operation.to_string(),
                    message: format!("{code}: {message}"),
                }
            }
        }
    }
}
