//! Domain Schemas
//!
//! The records exchanged between the ingestion mapper, the engine, the
//! plugin host, and the renderers. All of them are tree-shaped, passed by
//! value, and immutable once constructed.

pub mod cost;
pub mod plan;
pub mod resource;

pub use cost::{
    AggregationSummary, Confidence, CostResult, CrossProviderAggregation, GroupBy,
    PricingSpec, Recommendation, SustainabilityMetric, ADAPTER_LOCAL_SPEC, ADAPTER_NONE,
    AVG_DAYS_PER_MONTH, HOURS_PER_MONTH, NOTE_NO_PRICING,
};
pub use plan::{PlanDocument, PlanResource, PlanState};
pub use resource::ResourceDescriptor;
