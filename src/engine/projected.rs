//! Projected Cost
//!
//! Bounded parallel fan-out over the input resources. Within one resource
//! every plugin is queried and every non-error answer kept; the local spec
//! store is consulted only on a total plugin miss, and the zero-cost floor
//! closes the chain. Output order is input order, then adapter order
//! within a resource.

use super::Engine;
use crate::engine::source::{CostSource, NullSource};
use crate::error::Result;
use crate::schemas::{CostResult, ResourceDescriptor};
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

impl Engine {
    /// Projected cost for every resource. Per-resource failures never fail
    /// the call; cancellation returns the results completed so far.
    pub async fn projected_costs(
        &self,
        resources: &[ResourceDescriptor],
    ) -> Result<Vec<CostResult>> {
        for resource in resources {
            resource.validate()?;
        }

        let cancel = self.cancellation_token();
        let deadline = tokio::time::Instant::now() + self.config().call_budget;
        let mut gathered = Vec::with_capacity(resources.len());
        let mut stream = stream::iter(0..resources.len())
            .map(|i| async move { self.project_one(&resources[i]).await })
            .buffered(self.config().fan_out.max(1));

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(completed = gathered.len(), "projected fan-out canceled");
                    break;
                }
                _ = tokio::time::sleep_until(deadline) => {
                    warn!(completed = gathered.len(), "call budget exhausted");
                    break;
                }
                next = stream.next() => match next {
                    Some(results) => gathered.push(results),
                    None => break,
                },
            }
        }

        Ok(gathered.into_iter().flatten().collect())
    }

    // The per-resource chain: all plugins, then the spec store, then the
    // explicit zero floor.
    async fn project_one(&self, resource: &ResourceDescriptor) -> Vec<CostResult> {
        let answers = futures::future::join_all(
            self.plugins()
                .iter()
                .map(|source| source.projected(resource)),
        )
        .await;

        let mut results = Vec::new();
        for (source, answer) in self.plugins().iter().zip(answers) {
            match answer {
                Ok(Some(result)) => results.push(result),
                Ok(None) => {
                    debug!(resource = %resource.id, adapter = %source.name(), "no data");
                }
                Err(err) => {
                    // One failing plugin never affects the others.
                    warn!(resource = %resource.id, error = %err, "plugin call failed");
                }
            }
        }
        if !results.is_empty() {
            return results;
        }

        match self.local_spec().projected(resource).await {
            Ok(Some(result)) => return vec![result],
            Ok(None) => {}
            Err(err) => {
                warn!(resource = %resource.id, error = %err, "spec lookup failed");
            }
        }

        match NullSource.projected(resource).await {
            Ok(Some(result)) => vec![result],
            _ => Vec::new(),
        }
    }
}
