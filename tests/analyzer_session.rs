//! Integration Tests for the Analyzer Session
//!
//! Exercises the five-RPC service in-process: the internal-type
//! short-circuit, the per-session cache, and the stack summary with
//! aggregated recommendations.

use cloudcost::analyzer::CostAnalyzer;
use cloudcost::engine::{CostSource, Engine, EngineConfig};
use cloudcost::error::Result;
use cloudcost::proto::analyzer::v1::analyzer_server::Analyzer;
use cloudcost::proto::analyzer::v1::{
    AnalyzeRequest, AnalyzeStackRequest, ConfigureStackRequest, EnforcementLevel, Severity,
};
use cloudcost::schemas::{Confidence, CostResult, Recommendation, ResourceDescriptor};
use cloudcost::specstore::SpecStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tonic::Request;

// ============================================================================
// FAKE PROVIDER
// ============================================================================

/// An in-process cost source with canned answers per resource id.
struct CannedSource {
    calls: Arc<AtomicUsize>,
}

impl CannedSource {
    fn new() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: calls.clone(),
            },
            calls,
        )
    }

    fn recommendation(id: &str, rec_type: &str, savings: f64) -> Recommendation {
        Recommendation {
            resource_id: id.to_string(),
            rec_type: rec_type.to_string(),
            description: "suggested by canned provider".to_string(),
            estimated_savings: savings,
            currency: "USD".to_string(),
        }
    }
}

#[async_trait]
impl CostSource for CannedSource {
    fn name(&self) -> &str {
        "canned-aws"
    }

    async fn supports(&self, _type_token: &str) -> Result<bool> {
        Ok(true)
    }

    async fn projected(&self, resource: &ResourceDescriptor) -> Result<Option<CostResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut result = match resource.id.as_str() {
            "small" => CostResult::projected(
                &resource.type_token,
                &resource.id,
                "canned-aws",
                "USD",
                50.0,
                50.0 / 730.0,
            ),
            "big" => CostResult::projected(
                &resource.type_token,
                &resource.id,
                "canned-aws",
                "USD",
                100.0,
                100.0 / 730.0,
            ),
            _ => return Ok(None),
        };
        result.confidence = Confidence::Low;
        result.recommendations = match resource.id.as_str() {
            "small" => vec![Self::recommendation("small", "Right-sizing", 15.0)],
            "big" => vec![
                Self::recommendation("big", "Terminate", 100.0),
                Self::recommendation("big", "Delete Unused", 10.0),
            ],
            _ => Vec::new(),
        };
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

fn analyzer_with_canned() -> (CostAnalyzer, Arc<AtomicUsize>) {
    let (source, calls) = CannedSource::new();
    let engine = Engine::from_sources(
        vec![Arc::new(source)],
        Arc::new(SpecStore::empty()),
        EngineConfig::default(),
    );
    (CostAnalyzer::new(Arc::new(engine)), calls)
}

fn analyze_request(urn: &str, type_token: &str, name: &str) -> Request<AnalyzeRequest> {
    Request::new(AnalyzeRequest {
        urn: urn.to_string(),
        r#type: type_token.to_string(),
        name: name.to_string(),
        properties: None,
    })
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[tokio::test]
async fn internal_type_short_circuits_without_plugin_calls() {
    let (analyzer, calls) = analyzer_with_canned();

    let response = analyzer
        .analyze(analyze_request(
            "urn:pulumi:dev::app::pulumi:providers:aws::default",
            "pulumi:providers:aws",
            "default",
        ))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.diagnostics.len(), 1);
    let diagnostic = &response.diagnostics[0];
    assert_eq!(diagnostic.message, "Internal Pulumi resource (no cloud cost)");
    assert_eq!(diagnostic.enforcement_level(), EnforcementLevel::Advisory);
    assert_eq!(calls.load(Ordering::SeqCst), 0, "no plugin RPC issued");
}

#[tokio::test]
async fn stack_summary_aggregates_cache_and_recommendations() {
    let (analyzer, _calls) = analyzer_with_canned();

    analyzer
        .configure_stack(Request::new(ConfigureStackRequest {
            stack: "dev".to_string(),
            project: "app".to_string(),
            organization: "acme".to_string(),
            dry_run: true,
        }))
        .await
        .unwrap();

    analyzer
        .analyze(analyze_request(
            "urn:pulumi:dev::app::aws:ec2/instance:Instance::small",
            "aws:ec2/instance:Instance",
            "small",
        ))
        .await
        .unwrap();
    analyzer
        .analyze(analyze_request(
            "urn:pulumi:dev::app::aws:rds/instance:Instance::big",
            "aws:rds/instance:Instance",
            "big",
        ))
        .await
        .unwrap();

    let response = analyzer
        .analyze_stack(Request::new(AnalyzeStackRequest {}))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.diagnostics.len(), 1, "exactly one summary diagnostic");
    let message = &response.diagnostics[0].message;
    assert!(message.contains("$150.00 USD"), "got: {message}");
    assert!(message.contains("2 resources analyzed"), "got: {message}");
    assert!(message.contains("3 recommendations"), "got: {message}");
    assert!(message.contains("$125.00"), "got: {message}");
    assert_eq!(
        response.diagnostics[0].enforcement_level(),
        EnforcementLevel::Advisory
    );
}

#[tokio::test]
async fn per_resource_diagnostics_are_low_severity_estimates() {
    let (analyzer, _calls) = analyzer_with_canned();

    let response = analyzer
        .analyze(analyze_request(
            "urn:pulumi:dev::app::aws:ec2/instance:Instance::small",
            "aws:ec2/instance:Instance",
            "small",
        ))
        .await
        .unwrap()
        .into_inner();

    let diagnostic = &response.diagnostics[0];
    assert!(diagnostic
        .message
        .starts_with("Estimated Monthly Cost: $50.00 USD (source: canned-aws)"));
    assert!(diagnostic.message.contains("Right-sizing"));
    assert_eq!(diagnostic.severity(), Severity::Low);
}

#[tokio::test]
async fn analyze_repeats_are_idempotent_in_the_cache() {
    let (analyzer, _calls) = analyzer_with_canned();
    let request = || {
        analyze_request(
            "urn:pulumi:dev::app::aws:ec2/instance:Instance::small",
            "aws:ec2/instance:Instance",
            "small",
        )
    };

    analyzer.analyze(request()).await.unwrap();
    analyzer.analyze(request()).await.unwrap();

    let response = analyzer
        .analyze_stack(Request::new(AnalyzeStackRequest {}))
        .await
        .unwrap()
        .into_inner();
    assert!(response.diagnostics[0]
        .message
        .contains("1 resources analyzed"));
}

#[tokio::test]
async fn unknown_resource_falls_through_to_none_result() {
    let (analyzer, _calls) = analyzer_with_canned();

    let response = analyzer
        .analyze(analyze_request(
            "urn:pulumi:dev::app::aws:dynamodb/table:Table::events",
            "aws:dynamodb/table:Table",
            "events",
        ))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(
        response.diagnostics[0].message,
        "No pricing information available"
    );
    assert_eq!(response.diagnostics[0].severity(), Severity::Medium);
}
