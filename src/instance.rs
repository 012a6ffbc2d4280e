//! Per-instance lifetime and cost computation
//!
//! EMR bills every started hour in full, so lifetimes round up to the next
//! whole hour and never truncate.

use crate::error::{EmrCostError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};

/// Wire format of the timestamps in EMR instance timelines.
pub const TIMELINE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Parse a timeline timestamp (e.g. `2020-01-01T00:00:00.000000Z`) as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, TIMELINE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| EmrCostError::Parse {
            what: "timeline timestamp",
            value: value.to_string(),
        })
}

/// A single EC2 instance with its billed lifetime and cost resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ec2Instance {
    /// Billed hours, ceiled to the next whole hour.
    pub lifetime_hours: i64,
    /// `lifetime_hours * hourly_price` of the owning group.
    pub cost: f64,
}

impl Ec2Instance {
    /// Build an instance from its timeline timestamps and the effective
    /// hourly price of its group.
    ///
    /// Fails with `Parse` if either timestamp does not match
    /// [`TIMELINE_FORMAT`] or if the instance terminated before it was created.
    pub fn new(creation_ts: &str, termination_ts: &str, hourly_price: f64) -> Result<Self> {
        let created = parse_timestamp(creation_ts)?;
        let terminated = parse_timestamp(termination_ts)?;
        let elapsed_secs = terminated.signed_duration_since(created).num_seconds();
        if elapsed_secs < 0 {
            return Err(EmrCostError::Parse {
                what: "instance timeline",
                value: format!("termination {termination_ts} precedes creation {creation_ts}"),
            });
        }
        let lifetime_hours = billed_hours(elapsed_secs);
        Ok(Self {
            lifetime_hours,
            cost: lifetime_hours as f64 * hourly_price,
        })
    }
}

/// Ceiling division of seconds into billed hours. An instance that existed at
/// all is billed for at least one hour.
fn billed_hours(elapsed_secs: i64) -> i64 {
    ((elapsed_secs + 3599) / 3600).max(1)
}
