//! Actual Cost
//!
//! Historical cost over a half-open date range. Unlike projected cost the
//! plugins are tried in order and the first success wins, there is no
//! local-spec fallback, and tag filters are applied before the fan-out so
//! filtered-out resources never cost a plugin call.

use super::Engine;
use crate::error::{CostError, Result};
use crate::schemas::{CostResult, GroupBy, ResourceDescriptor};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Parameters of one actual-cost query
#[derive(Debug, Clone)]
pub struct ActualCostRequest {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,

    /// A resource is included iff every pair here matches its tag map.
    pub tags: BTreeMap<String, String>,

    pub group_by: GroupBy,
}

impl ActualCostRequest {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from,
            to,
            tags: BTreeMap::new(),
            group_by: GroupBy::None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.to < self.from {
            return Err(CostError::InvalidDateRange {
                start: self.from.to_rfc3339(),
                end: self.to.to_rfc3339(),
            });
        }
        Ok(())
    }

    fn matches(&self, resource: &ResourceDescriptor) -> bool {
        if self.tags.is_empty() {
            return true;
        }
        let tags = resource.tags();
        self.tags
            .iter()
            .all(|(key, value)| tags.get(key) == Some(value))
    }
}

impl Engine {
    /// Actual cost for every resource passing the tag filter. Resources
    /// for which every plugin fails or has no data are omitted from the
    /// output.
    pub async fn actual_costs(
        &self,
        resources: &[ResourceDescriptor],
        request: &ActualCostRequest,
    ) -> Result<Vec<CostResult>> {
        request.validate()?;
        for resource in resources {
            resource.validate()?;
        }

        let selected: Vec<&ResourceDescriptor> = resources
            .iter()
            .filter(|resource| request.matches(resource))
            .collect();
        debug!(
            total = resources.len(),
            selected = selected.len(),
            "tag filter applied before fan-out"
        );

        let cancel = self.cancellation_token();
        let deadline = tokio::time::Instant::now() + self.config().call_budget;
        let mut gathered = Vec::with_capacity(selected.len());
        let mut stream = stream::iter(selected)
            .map(|resource| self.actual_one(resource, request))
            .buffered(self.config().fan_out.max(1));

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(completed = gathered.len(), "actual fan-out canceled");
                    break;
                }
                _ = tokio::time::sleep_until(deadline) => {
                    warn!(completed = gathered.len(), "call budget exhausted");
                    break;
                }
                next = stream.next() => match next {
                    Some(Some(result)) => gathered.push(result),
                    Some(None) => {}
                    None => break,
                },
            }
        }

        Ok(gathered)
    }

    // First-success iteration over the plugins, in order.
    async fn actual_one(
        &self,
        resource: &ResourceDescriptor,
        request: &ActualCostRequest,
    ) -> Option<CostResult> {
        for source in self.plugins() {
            match source.actual(resource, request.from, request.to).await {
                Ok(Some(mut result)) => {
                    result.cost_period = period_label(request);
                    return Some(result);
                }
                Ok(None) => continue,
                Err(err) => {
                    warn!(
                        resource = %resource.id,
                        adapter = %source.name(),
                        error = %err,
                        "trying next plugin"
                    );
                }
            }
        }
        debug!(resource = %resource.id, "no actual cost data; omitting");
        None
    }
}

// Period label for a time-grouped query: the ISO day or month containing
// the range start.
fn period_label(request: &ActualCostRequest) -> Option<String> {
    use chrono::Datelike;
    let start = request.from.date_naive();
    match request.group_by {
        GroupBy::Daily | GroupBy::Date => Some(start.to_string()),
        GroupBy::Monthly => Some(format!("{:04}-{:02}", start.year(), start.month())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::specstore::SpecStore;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::Arc;

    fn request() -> ActualCostRequest {
        ActualCostRequest::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn reversed_range_is_rejected() {
        let mut req = request();
        std::mem::swap(&mut req.from, &mut req.to);
        assert!(matches!(
            req.validate(),
            Err(CostError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn tag_filter_requires_every_pair() {
        let mut req = request();
        req.tags.insert("env".to_string(), "prod".to_string());
        req.tags.insert("team".to_string(), "billing".to_string());

        let mut resource = ResourceDescriptor::new(
            "aws:ec2/instance:Instance",
            "web",
            "aws",
            BTreeMap::new(),
        );
        resource.properties.insert(
            "tags".to_string(),
            json!({"env": "prod", "team": "billing", "extra": "ok"}),
        );
        assert!(req.matches(&resource));

        resource
            .properties
            .insert("tags".to_string(), json!({"env": "prod"}));
        assert!(!req.matches(&resource));
    }

    #[tokio::test]
    async fn no_plugins_means_empty_output() {
        let engine = Engine::local_only(Arc::new(SpecStore::empty()), EngineConfig::default());
        let resource = ResourceDescriptor::new(
            "aws:ec2/instance:Instance",
            "web",
            "aws",
            BTreeMap::new(),
        );

        // No local-spec fallback on the actual path: the resource is
        // simply omitted.
        let results = engine.actual_costs(&[resource], &request()).await.unwrap();
        assert!(results.is_empty());
    }
}
