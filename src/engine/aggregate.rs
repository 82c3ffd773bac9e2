//! Aggregation
//!
//! Summary rollups over one result set and the cross-provider time
//! aggregation with its currency and date-range invariants.

use crate::error::{CostError, Result};
use crate::schemas::{
    AggregationSummary, CostResult, CrossProviderAggregation, GroupBy, ResourceDescriptor,
    AVG_DAYS_PER_MONTH,
};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;
use tracing::debug;

/// Totals plus the provider / service / adapter breakdowns. Currency is
/// taken from the first result; callers with mixed currencies belong in
/// [`create_cross_provider_aggregation`], which rejects them explicitly.
pub fn aggregate_results(results: &[CostResult]) -> AggregationSummary {
    let mut summary = AggregationSummary {
        currency: results
            .first()
            .map(|r| r.currency.clone())
            .unwrap_or_else(|| "USD".to_string()),
        resource_count: results.len(),
        ..Default::default()
    };

    for result in results {
        summary.total_monthly += result.monthly;
        summary.total_hourly += result.hourly;

        *summary.by_provider.entry(result.provider()).or_default() += result.monthly;
        *summary
            .by_service
            .entry(ResourceDescriptor::service_from_type(&result.resource_type))
            .or_default() += result.monthly;
        *summary
            .by_adapter
            .entry(result.adapter.clone())
            .or_default() += result.monthly;
    }

    summary
}

/// Bucket results directly by a non-time group-by tag, totalling the
/// observed cost (total over the range when present, else monthly).
pub fn group_totals(results: &[CostResult], group_by: GroupBy) -> BTreeMap<String, f64> {
    let mut buckets: BTreeMap<String, f64> = BTreeMap::new();
    for result in results {
        let key = match group_by {
            GroupBy::Resource => result.resource_id.clone(),
            GroupBy::Type => result.resource_type.clone(),
            GroupBy::Provider => result.provider(),
            GroupBy::Date => result
                .start_date
                .map(|d| d.date_naive().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            GroupBy::Daily | GroupBy::Monthly | GroupBy::None => "all".to_string(),
        };
        *buckets.entry(key).or_default() += result.total_cost.unwrap_or(result.monthly);
    }
    buckets
}

/// Per-period, per-provider totals for a time-based grouping.
///
/// Validation: non-empty input, time-based tag, uniform currency (empty
/// currencies coerce to USD first), and `end >= start` on every dated
/// result. Output is sorted by period, which for the ISO period formats is
/// also chronological.
pub fn create_cross_provider_aggregation(
    results: &[CostResult],
    group_by: GroupBy,
) -> Result<Vec<CrossProviderAggregation>> {
    if results.is_empty() {
        return Err(CostError::EmptyResults);
    }
    if !group_by.is_time_based() {
        return Err(CostError::InvalidGroupBy {
            group_by: group_by.to_string(),
        });
    }

    let mut currencies: Vec<String> = results
        .iter()
        .map(|r| {
            if r.currency.is_empty() {
                "USD".to_string()
            } else {
                r.currency.clone()
            }
        })
        .collect();
    currencies.sort();
    currencies.dedup();
    if currencies.len() > 1 {
        return Err(CostError::MixedCurrencies { currencies });
    }
    let currency = currencies.remove(0);

    for result in results {
        if let (Some(start), Some(end)) = (result.start_date, result.end_date) {
            if end < start {
                return Err(CostError::InvalidDateRange {
                    start: start.to_rfc3339(),
                    end: end.to_rfc3339(),
                });
            }
        }
    }

    // period -> provider -> sum
    let mut periods: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    for result in results {
        let provider = result.provider();
        for (period, amount) in contributions(result, group_by) {
            *periods
                .entry(period)
                .or_default()
                .entry(provider.clone())
                .or_default() += amount;
        }
    }

    Ok(periods
        .into_iter()
        .map(|(period, providers)| {
            let total = providers.values().sum();
            CrossProviderAggregation {
                period,
                providers,
                total,
                currency: currency.clone(),
            }
        })
        .collect())
}

// Per-period contributions of one result: itemized daily costs when
// present, else the range total attributed to the starting period, else
// the monthly figure converted to the period unit.
fn contributions(result: &CostResult, group_by: GroupBy) -> Vec<(String, f64)> {
    let start = result.start_date.map(|d| d.date_naive());

    if !result.daily_costs.is_empty() {
        let Some(start) = start else {
            debug!(resource = %result.resource_id, "daily costs without start date; skipping");
            return Vec::new();
        };
        return result
            .daily_costs
            .iter()
            .enumerate()
            .map(|(day, amount)| {
                let date = start + Duration::days(day as i64);
                (format_period(date, group_by), *amount)
            })
            .collect();
    }

    if let Some(total) = result.total_cost.filter(|t| *t > 0.0) {
        let Some(start) = start else {
            debug!(resource = %result.resource_id, "total cost without start date; skipping");
            return Vec::new();
        };
        return vec![(format_period(start, group_by), total)];
    }

    let Some(start) = start else {
        debug!(resource = %result.resource_id, "undated result; skipping");
        return Vec::new();
    };
    let amount = match group_by {
        GroupBy::Daily => result.monthly / AVG_DAYS_PER_MONTH,
        _ => result.monthly,
    };
    vec![(format_period(start, group_by), amount)]
}

fn format_period(date: NaiveDate, group_by: GroupBy) -> String {
    match group_by {
        GroupBy::Monthly => format!("{:04}-{:02}", date.year(), date.month()),
        _ => date.to_string(),
    }
}
