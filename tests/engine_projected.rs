//! Integration Tests for Projected Cost
//!
//! End-to-end flows from a plan document through the engine with a local
//! spec directory, covering the spec fallback chain and the zero-cost
//! floor.

use cloudcost::engine::{aggregate_results, Engine, EngineConfig};
use cloudcost::ingest;
use cloudcost::schemas::{ResourceDescriptor, HOURS_PER_MONTH};
use cloudcost::specstore::SpecStore;

use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

// ============================================================================
// HELPERS
// ============================================================================

fn spec_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, body) in files {
        std::fs::write(dir.path().join(name), body).unwrap();
    }
    dir
}

fn engine_over(dir: Option<PathBuf>) -> Engine {
    Engine::local_only(Arc::new(SpecStore::new(dir)), EngineConfig::default())
}

fn ec2_instance() -> ResourceDescriptor {
    ResourceDescriptor::new(
        "aws:ec2/instance:Instance",
        "web-server",
        "aws",
        BTreeMap::from([("instanceType".to_string(), json!("t3.micro"))]),
    )
}

// ============================================================================
// SEED SCENARIOS
// ============================================================================

#[tokio::test]
async fn single_ec2_single_spec() {
    let dir = spec_dir(&[(
        "aws-ec2-t3.micro.yaml",
        "provider: aws\nservice: ec2\nsku: t3.micro\npricing:\n  monthlyEstimate: 7.59\n  onDemandHourly: 0.0104\n",
    )]);
    let engine = engine_over(Some(dir.path().to_path_buf()));

    let results = engine.projected_costs(&[ec2_instance()]).await.unwrap();
    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.adapter, "local-spec");
    assert_eq!(result.monthly, 7.59);
    assert!((result.hourly - 0.0104).abs() < 1e-9);
    assert_eq!(result.currency, "USD");
}

#[tokio::test]
async fn spec_fallback_chain_reaches_service_default() {
    let dir = spec_dir(&[(
        "aws-ec2-default.yaml",
        "provider: aws\nservice: ec2\nsku: default\npricing:\n  onDemandHourly: 0.05\n",
    )]);
    let engine = engine_over(Some(dir.path().to_path_buf()));

    let results = engine.projected_costs(&[ec2_instance()]).await.unwrap();
    assert_eq!(results.len(), 1);
    assert!((results[0].monthly - 36.5).abs() < 1e-9);
    assert_eq!(results[0].hourly, 0.05);
}

#[tokio::test]
async fn no_data_anywhere_yields_none_adapter() {
    let engine = engine_over(None);
    let rds = ResourceDescriptor::new(
        "aws:rds/instance:Instance",
        "db",
        "aws",
        BTreeMap::new(),
    );

    let results = engine.projected_costs(&[rds]).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].adapter, "none");
    assert_eq!(results[0].monthly, 0.0);
    assert_eq!(
        results[0].notes.as_deref(),
        Some("No pricing information available")
    );
}

// ============================================================================
// INVARIANTS
// ============================================================================

#[tokio::test]
async fn monthly_hourly_pair_stays_consistent() {
    let dir = spec_dir(&[
        (
            "aws-ec2-t3.micro.yaml",
            "provider: aws\nservice: ec2\nsku: t3.micro\npricing:\n  onDemandHourly: 0.0104\n",
        ),
        (
            "aws-s3-default.yaml",
            "provider: aws\nservice: s3\nsku: default\npricing:\n  monthlyEstimate: 2.3\n",
        ),
    ]);
    let engine = engine_over(Some(dir.path().to_path_buf()));
    let resources = vec![
        ec2_instance(),
        ResourceDescriptor::new("aws:s3/bucket:Bucket", "data", "aws", BTreeMap::new()),
    ];

    for result in engine.projected_costs(&resources).await.unwrap() {
        if result.monthly > 0.0 && result.hourly > 0.0 {
            assert!(
                (result.monthly - result.hourly * HOURS_PER_MONTH).abs() <= 0.01,
                "monthly {} vs hourly {} out of tolerance",
                result.monthly,
                result.hourly
            );
        }
    }
}

#[tokio::test]
async fn descriptors_survive_the_engine_unchanged() {
    let engine = engine_over(None);
    let resources = vec![ec2_instance()];
    let before = resources.clone();

    engine.projected_costs(&resources).await.unwrap();
    assert_eq!(resources, before);
}

#[tokio::test]
async fn summary_total_matches_result_sum() {
    let dir = spec_dir(&[(
        "aws-ec2-default.yaml",
        "provider: aws\nservice: ec2\nsku: default\npricing:\n  monthlyEstimate: 10.0\n",
    )]);
    let engine = engine_over(Some(dir.path().to_path_buf()));
    let resources: Vec<ResourceDescriptor> = (0..5)
        .map(|i| {
            ResourceDescriptor::new(
                "aws:ec2/instance:Instance",
                format!("node-{i}"),
                "aws",
                BTreeMap::new(),
            )
        })
        .collect();

    let results = engine.projected_costs(&resources).await.unwrap();
    let summary = aggregate_results(&results);
    let sum: f64 = results.iter().map(|r| r.monthly).sum();
    assert!((summary.total_monthly - sum).abs() < 1e-9);
    assert_eq!(summary.resource_count, 5);
}

// ============================================================================
// PLAN DOCUMENT TO RESULTS
// ============================================================================

#[tokio::test]
async fn plan_file_flows_to_costs() {
    let plan_dir = TempDir::new().unwrap();
    let plan_path = plan_dir.path().join("plan.json");
    std::fs::write(
        &plan_path,
        r#"{
            "steps": [
                {
                    "op": "create",
                    "urn": "urn:pulumi:dev::app::aws:ec2/instance:Instance::web",
                    "newState": {
                        "type": "aws:ec2/instance:Instance",
                        "inputs": {"instanceType": "t3.micro"}
                    }
                },
                {
                    "op": "create",
                    "urn": "urn:pulumi:dev::app::pulumi:providers:aws::default",
                    "newState": {"type": "pulumi:providers:aws", "inputs": {}}
                }
            ]
        }"#,
    )
    .unwrap();

    let document = ingest::load_plan(&plan_path).await.unwrap();
    let resources = ingest::map_plan(&document).unwrap();
    assert_eq!(resources.len(), 1, "internal provider resource filtered");

    let specs = spec_dir(&[(
        "aws-ec2-t3.micro.yaml",
        "provider: aws\nservice: ec2\nsku: t3.micro\npricing:\n  monthlyEstimate: 7.59\n",
    )]);
    let engine = engine_over(Some(specs.path().to_path_buf()));
    let results = engine.projected_costs(&resources).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].resource_id, "web");
    assert_eq!(results[0].monthly, 7.59);
}
