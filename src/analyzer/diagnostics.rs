//! Diagnostic Formatting
//!
//! Builds the advisory diagnostics surfaced inline during plan preview.
//! Every diagnostic carries the ADVISORY enforcement level; a MANDATORY
//! diagnostic would block deployment. Severity is LOW for a priced
//! estimate and MEDIUM for zero-with-note results and warnings.

use crate::proto::analyzer::v1::{Diagnostic, EnforcementLevel, Severity};
use crate::schemas::{CostResult, Recommendation};

const POLICY_RESOURCE: &str = "cost-estimate";
const POLICY_STACK: &str = "cost-summary";

/// Most recommendations shown inline before truncating to "and N more".
const MAX_RENDERED_RECOMMENDATIONS: usize = 3;

pub const MSG_UNABLE_TO_ESTIMATE: &str = "Unable to estimate cost";
pub const MSG_ANALYSIS_CANCELED: &str = "Analysis canceled; skipping cost estimate";

/// The per-resource diagnostic for one cost result.
pub fn resource_diagnostic(urn: &str, result: &CostResult) -> Diagnostic {
    if result.monthly <= 0.0 {
        let message = result
            .notes
            .clone()
            .unwrap_or_else(|| MSG_UNABLE_TO_ESTIMATE.to_string());
        return advisory(POLICY_RESOURCE, urn, message, Severity::Medium);
    }

    let mut message = format!(
        "Estimated Monthly Cost: ${:.2} {} (source: {})",
        result.monthly, result.currency, result.adapter
    );

    if !result.sustainability.is_empty() {
        let metrics: Vec<String> = result
            .sustainability
            .iter()
            .map(|(name, metric)| {
                format!("{}: {} {}", capitalize(name), metric.value, metric.unit)
            })
            .collect();
        message.push_str(&format!(" [{}]", metrics.join(", ")));
    }

    if let Some(rendered) = format_recommendations(&result.recommendations) {
        message.push_str(" | ");
        message.push_str(&rendered);
    }

    advisory(POLICY_RESOURCE, urn, message, Severity::Low)
}

/// A warning surfaced when analysis itself failed; preview is never
/// aborted.
pub fn warning_diagnostic(urn: &str, message: impl Into<String>) -> Diagnostic {
    advisory(POLICY_RESOURCE, urn, message.into(), Severity::Medium)
}

/// The single end-of-walk summary over the session cache.
pub fn stack_summary(results: &[CostResult]) -> Diagnostic {
    let total: f64 = results.iter().map(|r| r.monthly).sum();
    let priced = results.iter().filter(|r| r.monthly > 0.0).count();
    let currency = results
        .iter()
        .map(|r| r.currency.as_str())
        .find(|c| !c.is_empty())
        .unwrap_or("USD");

    let mut message = format!(
        "Total Estimated Monthly Cost: ${total:.2} {currency} ({priced} resources analyzed)"
    );

    let recommendations: Vec<&Recommendation> = results
        .iter()
        .flat_map(|r| r.recommendations.iter())
        .filter(|rec| rec.is_valid())
        .collect();
    if !recommendations.is_empty() {
        let mut currencies: Vec<&str> = recommendations
            .iter()
            .map(|rec| rec.currency.as_str())
            .filter(|c| !c.is_empty())
            .collect();
        currencies.sort();
        currencies.dedup();

        if currencies.len() <= 1 {
            let savings: f64 = recommendations.iter().map(|rec| rec.estimated_savings).sum();
            message.push_str(&format!(
                " | {} recommendations with ${savings:.2}/mo potential savings",
                recommendations.len()
            ));
        } else {
            message.push_str(&format!(
                " | {} recommendations (mixed currencies)",
                recommendations.len()
            ));
        }
    }

    advisory(POLICY_STACK, "", message, Severity::Low)
}

/// Render up to three valid recommendations, appending "and N more" for
/// the remainder. Malformed recommendations are silently dropped. Returns
/// `None` when nothing valid is left.
pub fn format_recommendations(recommendations: &[Recommendation]) -> Option<String> {
    let valid: Vec<&Recommendation> = recommendations
        .iter()
        .filter(|rec| rec.is_valid())
        .collect();
    if valid.is_empty() {
        return None;
    }

    let mut parts: Vec<String> = valid
        .iter()
        .take(MAX_RENDERED_RECOMMENDATIONS)
        .map(|rec| {
            format!(
                "{}: {} (save ${:.2}/mo)",
                rec.rec_type, rec.description, rec.estimated_savings
            )
        })
        .collect();

    if valid.len() > MAX_RENDERED_RECOMMENDATIONS {
        parts.push(format!(
            "and {} more",
            valid.len() - MAX_RENDERED_RECOMMENDATIONS
        ));
    }

    Some(format!("Recommendations: {}", parts.join("; ")))
}

fn advisory(policy: &str, urn: &str, message: String, severity: Severity) -> Diagnostic {
    Diagnostic {
        policy_name: policy.to_string(),
        description: "Cloud cost estimation".to_string(),
        message,
        enforcement_level: EnforcementLevel::Advisory as i32,
        severity: severity as i32,
        urn: urn.to_string(),
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::{Confidence, SustainabilityMetric};

    fn recommendation(rec_type: &str, savings: f64) -> Recommendation {
        Recommendation {
            resource_id: "r".into(),
            rec_type: rec_type.into(),
            description: "do it".into(),
            estimated_savings: savings,
            currency: "USD".into(),
        }
    }

    #[test]
    fn priced_result_renders_low_severity() {
        let result = CostResult::projected("aws:ec2:Instance", "web", "aws-plugin", "USD", 7.59, 0.0104)
            .with_confidence(Confidence::Low);
        let diag = resource_diagnostic("urn:x", &result);
        assert_eq!(
            diag.message,
            "Estimated Monthly Cost: $7.59 USD (source: aws-plugin)"
        );
        assert_eq!(diag.severity(), Severity::Low);
        assert_eq!(diag.enforcement_level(), EnforcementLevel::Advisory);
    }

    #[test]
    fn zero_with_note_renders_note_verbatim_medium() {
        let result = CostResult::none("aws:rds:Instance", "db");
        let diag = resource_diagnostic("urn:x", &result);
        assert_eq!(diag.message, "No pricing information available");
        assert_eq!(diag.severity(), Severity::Medium);
    }

    #[test]
    fn zero_without_note_is_unable_to_estimate() {
        let result = CostResult::projected("aws:ec2:Instance", "w", "p", "USD", 0.0, 0.0);
        let diag = resource_diagnostic("urn:x", &result);
        assert_eq!(diag.message, MSG_UNABLE_TO_ESTIMATE);
    }

    #[test]
    fn sustainability_metrics_appended() {
        let mut result =
            CostResult::projected("aws:ec2:Instance", "w", "p", "USD", 10.0, 0.0137);
        result.sustainability.insert(
            "carbon".to_string(),
            SustainabilityMetric {
                value: 12.5,
                unit: "kgCO2e/month".to_string(),
            },
        );
        let diag = resource_diagnostic("urn:x", &result);
        assert!(diag.message.contains("[Carbon: 12.5 kgCO2e/month]"));
    }

    #[test]
    fn recommendations_truncate_at_three() {
        let recs = vec![
            recommendation("Right-sizing", 1.0),
            recommendation("Terminate", 2.0),
            recommendation("Delete Unused", 3.0),
            recommendation("Reserved", 4.0),
            recommendation("Spot", 5.0),
        ];
        let rendered = format_recommendations(&recs).unwrap();
        assert!(rendered.contains("Right-sizing"));
        assert!(rendered.contains("Delete Unused"));
        assert!(!rendered.contains("Reserved"));
        assert!(rendered.ends_with("and 2 more"));
    }

    #[test]
    fn three_or_fewer_have_no_more_suffix() {
        let recs = vec![recommendation("Right-sizing", 1.0)];
        let rendered = format_recommendations(&recs).unwrap();
        assert!(!rendered.contains("more"));
    }

    #[test]
    fn malformed_recommendations_dropped_silently() {
        let mut bad_currency = recommendation("Right-sizing", 10.0);
        bad_currency.currency.clear();
        let mut negative = recommendation("Terminate", -5.0);
        negative.estimated_savings = -5.0;
        let mut empty_type = recommendation("", 1.0);
        empty_type.rec_type.clear();

        assert!(format_recommendations(&[bad_currency, negative, empty_type]).is_none());
    }

    #[test]
    fn stack_summary_counts_and_savings() {
        let mut first =
            CostResult::projected("aws:ec2:Instance", "a", "p", "USD", 50.0, 50.0 / 730.0);
        first.recommendations = vec![recommendation("Right-sizing", 15.0)];
        let mut second =
            CostResult::projected("aws:rds:Instance", "b", "p", "USD", 100.0, 100.0 / 730.0);
        second.recommendations = vec![
            recommendation("Terminate", 100.0),
            recommendation("Delete Unused", 10.0),
        ];

        let diag = stack_summary(&[first, second]);
        assert!(diag.message.contains("$150.00 USD"));
        assert!(diag.message.contains("2 resources analyzed"));
        assert!(diag.message.contains("3 recommendations"));
        assert!(diag.message.contains("$125.00"));
        assert_eq!(diag.enforcement_level(), EnforcementLevel::Advisory);
    }

    #[test]
    fn stack_summary_mixed_recommendation_currencies() {
        let mut first =
            CostResult::projected("aws:ec2:Instance", "a", "p", "USD", 50.0, 50.0 / 730.0);
        first.recommendations = vec![recommendation("Right-sizing", 15.0)];
        let mut second =
            CostResult::projected("azure:compute:VM", "b", "p", "USD", 10.0, 10.0 / 730.0);
        let mut eur = recommendation("Terminate", 5.0);
        eur.currency = "EUR".to_string();
        second.recommendations = vec![eur];

        let diag = stack_summary(&[first, second]);
        assert!(diag.message.contains("2 recommendations (mixed currencies)"));
        assert!(!diag.message.contains("potential savings"));
    }
}
