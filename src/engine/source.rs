//! Cost Sources
//!
//! Everything that can produce a `CostResult` sits behind one capability
//! set: plugin hosts, the local spec store, and the zero-cost floor are
//! first-class peers, and engine dispatch is a plain iteration over them.

use crate::error::{CostError, Result};
use crate::plugin::PluginHost;
use crate::schemas::{
    Confidence, CostResult, ResourceDescriptor, ADAPTER_LOCAL_SPEC, AVG_DAYS_PER_MONTH,
    HOURS_PER_MONTH,
};
use crate::specstore::{price_from_spec, SpecStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A producer of cost results. `Ok(None)` means "no data for this
/// resource", which is not an error.
#[async_trait]
pub trait CostSource: Send + Sync {
    fn name(&self) -> &str;

    async fn supports(&self, type_token: &str) -> Result<bool>;

    async fn projected(&self, resource: &ResourceDescriptor) -> Result<Option<CostResult>>;

    async fn actual(
        &self,
        resource: &ResourceDescriptor,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<CostResult>>;
}

/// A plugin host as a cost source
pub struct PluginSource {
    host: Arc<PluginHost>,
}

impl PluginSource {
    pub fn new(host: Arc<PluginHost>) -> Self {
        Self { host }
    }
}

#[async_trait]
impl CostSource for PluginSource {
    fn name(&self) -> &str {
        self.host.name()
    }

    async fn supports(&self, type_token: &str) -> Result<bool> {
        self.host.supports(type_token).await
    }

    async fn projected(&self, resource: &ResourceDescriptor) -> Result<Option<CostResult>> {
        let response = match self.host.get_projected_cost(resource).await {
            Ok(response) => response,
            Err(err) if is_no_data(&err) => return Ok(None),
            Err(err) => return Err(err),
        };

        let mut monthly = response.monthly;
        let mut hourly = response.hourly;
        // Providers may report only one side of the pair.
        if hourly == 0.0 && monthly > 0.0 {
            hourly = monthly / HOURS_PER_MONTH;
        } else if monthly == 0.0 && hourly > 0.0 {
            monthly = hourly * HOURS_PER_MONTH;
        }

        let mut result = CostResult::projected(
            &resource.type_token,
            &resource.id,
            self.host.name(),
            response.currency,
            monthly,
            hourly,
        )
        .with_confidence(Confidence::derive(false, true));

        if !response.notes.is_empty() {
            result.notes = Some(response.notes);
        }
        result.breakdown = response.breakdown.into_iter().collect();
        result.recommendations = response
            .recommendations
            .iter()
            .map(crate::schemas::Recommendation::from)
            .collect();
        result.sustainability = response
            .sustainability
            .iter()
            .map(|(k, v)| (k.clone(), v.into()))
            .collect();

        Ok(Some(result))
    }

    async fn actual(
        &self,
        resource: &ResourceDescriptor,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<CostResult>> {
        let response = match self.host.get_actual_cost(&resource.id, from, to).await {
            Ok(response) => response,
            Err(err) if is_no_data(&err) => return Ok(None),
            Err(err) => return Err(err),
        };

        let range_hours = (to - from).num_seconds() as f64 / 3600.0;
        if range_hours <= 0.0 {
            return Ok(None);
        }
        let hourly = response.total_cost / range_hours;
        let monthly = response.total_cost * AVG_DAYS_PER_MONTH * 24.0 / range_hours;

        let mut result = CostResult::projected(
            &resource.type_token,
            &resource.id,
            self.host.name(),
            response.currency,
            monthly,
            hourly,
        )
        .with_confidence(Confidence::derive(response.total_cost > 0.0, true));
        result.total_cost = Some(response.total_cost);
        result.daily_costs = response.daily_costs;
        result.breakdown = response.breakdown.into_iter().collect();
        result.start_date = Some(from);
        result.end_date = Some(to);

        Ok(Some(result))
    }
}

/// The local pricing-spec store as a cost source. Projected only; there is
/// deliberately no spec fallback for actual cost.
pub struct LocalSpecSource {
    store: Arc<SpecStore>,
    deadline: Duration,
}

impl LocalSpecSource {
    pub fn new(store: Arc<SpecStore>, deadline: Duration) -> Self {
        Self { store, deadline }
    }
}

#[async_trait]
impl CostSource for LocalSpecSource {
    fn name(&self) -> &str {
        ADAPTER_LOCAL_SPEC
    }

    async fn supports(&self, _type_token: &str) -> Result<bool> {
        Ok(true)
    }

    async fn projected(&self, resource: &ResourceDescriptor) -> Result<Option<CostResult>> {
        let spec = match tokio::time::timeout(self.deadline, self.store.resolve(resource)).await {
            Ok(Some(spec)) => spec,
            Ok(None) => return Ok(None),
            Err(_) => {
                debug!(resource = %resource.id, "spec lookup deadline exceeded");
                return Ok(None);
            }
        };

        let (monthly, hourly) = price_from_spec(&spec, resource);
        let result = CostResult::projected(
            &resource.type_token,
            &resource.id,
            ADAPTER_LOCAL_SPEC,
            spec.currency.clone(),
            monthly,
            hourly,
        )
        .with_notes(format!(
            "Priced from local spec {}-{}-{}",
            spec.provider, spec.service, spec.sku
        ))
        .with_confidence(Confidence::derive(false, false));

        Ok(Some(result))
    }

    async fn actual(
        &self,
        _resource: &ResourceDescriptor,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> Result<Option<CostResult>> {
        Ok(None)
    }
}

/// The floor of the fallback chain: always produces a zero-cost result
/// with an explicit note, so a total miss is visible instead of plausible.
pub struct NullSource;

#[async_trait]
impl CostSource for NullSource {
    fn name(&self) -> &str {
        crate::schemas::ADAPTER_NONE
    }

    async fn supports(&self, _type_token: &str) -> Result<bool> {
        Ok(true)
    }

    async fn projected(&self, resource: &ResourceDescriptor) -> Result<Option<CostResult>> {
        Ok(Some(CostResult::none(&resource.type_token, &resource.id)))
    }

    async fn actual(
        &self,
        _resource: &ResourceDescriptor,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> Result<Option<CostResult>> {
        Ok(None)
    }
}

fn is_no_data(err: &CostError) -> bool {
    matches!(
        err,
        CostError::PluginRpc { status, .. } if status.code() == tonic::Code::NotFound
    )
}
