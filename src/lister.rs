//! Lazy pagination over the cluster listing
//!
//! Follows the opaque marker cursor one page at a time, yielding cluster ids
//! exactly in the order the service returns them. No ordering or dedup is
//! assumed beyond the service's pagination contract. A lister is driven by
//! exactly one consumer and is restartable only by constructing a new one.

use crate::emr::ClusterApi;
use crate::error::Result;
use chrono::NaiveDate;
use std::collections::VecDeque;

pub struct ClusterLister<'a> {
    api: &'a dyn ClusterApi,
    created_after: NaiveDate,
    created_before: NaiveDate,
    buffered: VecDeque<String>,
    marker: Option<String>,
    exhausted: bool,
}

impl<'a> ClusterLister<'a> {
    pub fn new(api: &'a dyn ClusterApi, created_after: NaiveDate, created_before: NaiveDate) -> Self {
        Self {
            api,
            created_after,
            created_before,
            buffered: VecDeque::new(),
            marker: None,
            exhausted: false,
        }
    }

    /// Next cluster id, fetching the next page on demand. `Ok(None)` once the
    /// service stops returning a marker and the buffer drains.
    pub async fn next(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(id) = self.buffered.pop_front() {
                return Ok(Some(id));
            }
            if self.exhausted {
                return Ok(None);
            }
            let page = self
                .api
                .list_clusters(self.created_after, self.created_before, self.marker.take())
                .await?;
            self.marker = page.marker;
            self.exhausted = self.marker.is_none();
            self.buffered.extend(page.cluster_ids);
        }
    }
}
