//! Price table and instance-group price resolution
//!
//! Spot groups are billed at their bid price; on-demand groups look up the
//! configured hourly rate for their instance type. The effective price is
//! resolved exactly once, when the group descriptor is normalized.

use crate::emr::InstanceGroupData;
use crate::error::{EmrCostError, Result};
use std::collections::HashMap;

/// Mapping from instance type (e.g. `m4.xlarge`) to hourly on-demand price.
///
/// Built once at startup from the config and passed by reference; a missing
/// entry for an on-demand type is a hard configuration error, never a silent
/// zero.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    rates: HashMap<String, f64>,
}

impl PriceTable {
    pub fn new(rates: HashMap<String, f64>) -> Self {
        Self { rates }
    }

    pub fn hourly_rate(&self, instance_type: &str) -> Result<f64> {
        self.rates
            .get(instance_type)
            .copied()
            .ok_or_else(|| EmrCostError::MissingPrice(instance_type.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Role of an instance group within the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GroupRole {
    Master,
    Core,
    Task,
}

impl GroupRole {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "MASTER" => Ok(GroupRole::Master),
            "CORE" => Ok(GroupRole::Core),
            "TASK" => Ok(GroupRole::Task),
            other => Err(EmrCostError::Parse {
                what: "instance group role",
                value: other.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupRole::Master => "MASTER",
            GroupRole::Core => "CORE",
            GroupRole::Task => "TASK",
        }
    }
}

/// Purchasing market of an instance group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Market {
    OnDemand,
    Spot,
}

impl Market {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "ON_DEMAND" => Ok(Market::OnDemand),
            "SPOT" => Ok(Market::Spot),
            other => Err(EmrCostError::Parse {
                what: "instance group market",
                value: other.to_string(),
            }),
        }
    }
}

/// A normalized instance group with its effective hourly price resolved.
/// Immutable after construction.
#[derive(Debug, Clone)]
pub struct InstanceGroup {
    pub group_id: String,
    pub instance_type: String,
    pub role: GroupRole,
    pub market: Market,
    pub hourly_price: f64,
}

impl InstanceGroup {
    /// Normalize a wire descriptor against the price table.
    ///
    /// Spot groups fail with `InvalidPrice` if the bid price is missing or is
    /// not a non-negative decimal; on-demand groups fail with `MissingPrice`
    /// if the instance type has no table entry.
    pub fn from_descriptor(desc: &InstanceGroupData, prices: &PriceTable) -> Result<Self> {
        let market = Market::parse(&desc.market)?;
        let role = GroupRole::parse(&desc.group_role)?;
        let hourly_price = match market {
            Market::Spot => parse_bid_price(&desc.group_id, desc.bid_price.as_deref())?,
            Market::OnDemand => prices.hourly_rate(&desc.instance_type)?,
        };
        Ok(Self {
            group_id: desc.group_id.clone(),
            instance_type: desc.instance_type.clone(),
            role,
            market,
            hourly_price,
        })
    }
}

fn parse_bid_price(group_id: &str, bid_price: Option<&str>) -> Result<f64> {
    let raw = bid_price.ok_or_else(|| EmrCostError::InvalidPrice {
        group_id: group_id.to_string(),
        value: "<missing>".to_string(),
    })?;
    let price: f64 = raw.parse().map_err(|_| EmrCostError::InvalidPrice {
        group_id: group_id.to_string(),
        value: raw.to_string(),
    })?;
    if !price.is_finite() || price < 0.0 {
        return Err(EmrCostError::InvalidPrice {
            group_id: group_id.to_string(),
            value: raw.to_string(),
        });
    }
    Ok(price)
}
