//! Cost Records
//!
//! Per-resource cost results, recommendations, confidence tags, grouping,
//! local pricing specs, and the aggregation record shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Hours in a billing month; used for every monthly/hourly conversion.
pub const HOURS_PER_MONTH: f64 = 730.0;

/// Average days per month; used for daily/monthly period conversion.
pub const AVG_DAYS_PER_MONTH: f64 = 30.44;

/// Adapter label for results produced by the local pricing-spec store.
pub const ADAPTER_LOCAL_SPEC: &str = "local-spec";

/// Adapter label for the zero-cost floor when no producer had data.
pub const ADAPTER_NONE: &str = "none";

/// Note attached to the zero-cost floor result.
pub const NOTE_NO_PRICING: &str = "No pricing information available";

/// How much trust to put in a cost figure
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
    #[default]
    Unknown,
}

impl Confidence {
    /// Derivation rule: actual billing data wins outright; external
    /// estimates rank below locally grounded ones.
    pub fn derive(has_billing_data: bool, is_external: bool) -> Self {
        if has_billing_data {
            Confidence::High
        } else if is_external {
            Confidence::Low
        } else {
            Confidence::Medium
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::Low => write!(f, "low"),
            Confidence::Unknown => write!(f, "unknown"),
        }
    }
}

/// Bucketing tag for cost queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    Resource,
    Type,
    Provider,
    Date,
    Daily,
    Monthly,
    #[default]
    None,
}

impl GroupBy {
    /// Time-based tags feed cross-provider aggregation; the rest bucket
    /// results directly.
    pub fn is_time_based(self) -> bool {
        matches!(self, GroupBy::Daily | GroupBy::Monthly)
    }
}

impl FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "resource" => Ok(GroupBy::Resource),
            "type" => Ok(GroupBy::Type),
            "provider" => Ok(GroupBy::Provider),
            "date" => Ok(GroupBy::Date),
            "daily" => Ok(GroupBy::Daily),
            "monthly" => Ok(GroupBy::Monthly),
            "none" => Ok(GroupBy::None),
            other => Err(format!("unknown group-by tag '{other}'")),
        }
    }
}

impl std::fmt::Display for GroupBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            GroupBy::Resource => "resource",
            GroupBy::Type => "type",
            GroupBy::Provider => "provider",
            GroupBy::Date => "date",
            GroupBy::Daily => "daily",
            GroupBy::Monthly => "monthly",
            GroupBy::None => "none",
        };
        write!(f, "{tag}")
    }
}

/// A sustainability metric reported by a provider (e.g. carbon grams/month)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SustainabilityMetric {
    pub value: f64,
    pub unit: String,
}

/// An optimization suggestion attached to a cost result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub resource_id: String,

    /// Type label, e.g. "Right-sizing" or "Terminate"
    #[serde(rename = "type")]
    pub rec_type: String,

    pub description: String,

    /// Projected monthly savings; non-negative
    pub estimated_savings: f64,

    pub currency: String,
}

impl Recommendation {
    /// Malformed recommendations are silently dropped at render time:
    /// empty type or description, negative savings, or positive savings
    /// without a currency.
    pub fn is_valid(&self) -> bool {
        !self.rec_type.is_empty()
            && !self.description.is_empty()
            && self.estimated_savings >= 0.0
            && (self.estimated_savings == 0.0 || !self.currency.is_empty())
    }
}

/// Per-resource cost output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostResult {
    pub resource_type: String,
    pub resource_id: String,

    /// Producer of this result: a plugin's self-reported name,
    /// "local-spec", or "none"
    pub adapter: String,

    /// ISO 4217 code; "USD" when the producer left it unspecified
    pub currency: String,

    pub monthly: f64,
    pub hourly: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Component name -> monetary share of `monthly`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub breakdown: BTreeMap<String, f64>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sustainability: BTreeMap<String, SustainabilityMetric>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<Recommendation>,

    /// Historical queries only: total cost over `[start_date, end_date)`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,

    /// One entry per day starting at `start_date`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub daily_costs: Vec<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_period: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub confidence: Confidence,
}

impl CostResult {
    /// A projected estimate priced at `monthly` per month.
    pub fn projected(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        adapter: impl Into<String>,
        currency: impl Into<String>,
        monthly: f64,
        hourly: f64,
    ) -> Self {
        let currency = normalize_currency(currency.into());
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            adapter: adapter.into(),
            currency,
            monthly,
            hourly,
            notes: None,
            breakdown: BTreeMap::new(),
            sustainability: BTreeMap::new(),
            recommendations: Vec::new(),
            total_cost: None,
            daily_costs: Vec::new(),
            cost_period: None,
            start_date: None,
            end_date: None,
            confidence: Confidence::Unknown,
        }
    }

    /// The zero-cost floor emitted when no provider and no spec had data.
    pub fn none(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        let mut result = Self::projected(resource_type, resource_id, ADAPTER_NONE, "USD", 0.0, 0.0);
        result.notes = Some(NOTE_NO_PRICING.to_string());
        result
    }

    /// Provider label for aggregation purposes, derived from the type
    /// token prefix.
    pub fn provider(&self) -> String {
        super::resource::ResourceDescriptor::provider_from_type(&self.resource_type)
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }
}

/// Coerce an unspecified currency to the USD default.
pub fn normalize_currency(currency: String) -> String {
    if currency.is_empty() {
        "USD".to_string()
    } else {
        currency
    }
}

/// A local pricing fallback document, loaded from YAML on demand
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingSpec {
    pub provider: String,
    pub service: String,
    pub sku: String,

    #[serde(default = "default_currency")]
    pub currency: String,

    /// Free-form numeric pricing map; recognized keys are
    /// `monthlyEstimate`, `onDemandHourly`, `hourlyRate`, `pricePerGBMonth`
    #[serde(default)]
    pub pricing: BTreeMap<String, f64>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Totals plus per-dimension breakdowns over one result set
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AggregationSummary {
    pub total_monthly: f64,
    pub total_hourly: f64,
    pub currency: String,
    pub resource_count: usize,
    pub by_provider: BTreeMap<String, f64>,
    pub by_service: BTreeMap<String, f64>,
    pub by_adapter: BTreeMap<String, f64>,
}

/// Per-period totals across providers for a time-based grouping
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrossProviderAggregation {
    /// "YYYY-MM-DD" for daily grouping, "YYYY-MM" for monthly
    pub period: String,
    pub providers: BTreeMap<String, f64>,
    pub total: f64,
    pub currency: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_derivation_table() {
        assert_eq!(Confidence::derive(true, false), Confidence::High);
        assert_eq!(Confidence::derive(true, true), Confidence::High);
        assert_eq!(Confidence::derive(false, true), Confidence::Low);
        assert_eq!(Confidence::derive(false, false), Confidence::Medium);
    }

    #[test]
    fn group_by_time_based_tags() {
        assert!(GroupBy::Daily.is_time_based());
        assert!(GroupBy::Monthly.is_time_based());
        assert!(!GroupBy::Provider.is_time_based());
        assert!(!GroupBy::None.is_time_based());
    }

    #[test]
    fn group_by_round_trips_through_str() {
        for tag in ["resource", "type", "provider", "date", "daily", "monthly", "none"] {
            let parsed: GroupBy = tag.parse().unwrap();
            assert_eq!(parsed.to_string(), tag);
        }
        assert!("weekly".parse::<GroupBy>().is_err());
    }

    #[test]
    fn recommendation_validity_rules() {
        let valid = Recommendation {
            resource_id: "db".into(),
            rec_type: "Right-sizing".into(),
            description: "downsize".into(),
            estimated_savings: 12.0,
            currency: "USD".into(),
        };
        assert!(valid.is_valid());

        let mut missing_currency = valid.clone();
        missing_currency.currency.clear();
        assert!(!missing_currency.is_valid());

        let mut zero_savings_no_currency = valid.clone();
        zero_savings_no_currency.estimated_savings = 0.0;
        zero_savings_no_currency.currency.clear();
        assert!(zero_savings_no_currency.is_valid());

        let mut negative = valid.clone();
        negative.estimated_savings = -1.0;
        assert!(!negative.is_valid());

        let mut no_description = valid;
        no_description.description.clear();
        assert!(!no_description.is_valid());
    }

    #[test]
    fn none_result_carries_note_and_zero_cost() {
        let result = CostResult::none("aws:rds/instance:Instance", "db");
        assert_eq!(result.adapter, ADAPTER_NONE);
        assert_eq!(result.monthly, 0.0);
        assert_eq!(result.notes.as_deref(), Some(NOTE_NO_PRICING));
        assert_eq!(result.currency, "USD");
    }

    #[test]
    fn empty_currency_normalizes_to_usd() {
        let result = CostResult::projected("aws:ec2:Instance", "i", "aws-plugin", "", 10.0, 0.0137);
        assert_eq!(result.currency, "USD");
    }

    #[test]
    fn provider_derived_from_type_prefix() {
        let result = CostResult::projected("azure:compute:VM", "vm", "azure-plugin", "USD", 5.0, 0.0068);
        assert_eq!(result.provider(), "azure");
    }
}
