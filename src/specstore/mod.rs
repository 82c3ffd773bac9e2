//! Local Pricing Spec Store
//!
//! Fallback pricing documents on disk, one YAML file per
//! `(provider, service, sku)` key, consulted only when no plugin produced a
//! result. Files are loaded on demand and memoized for the lifetime of one
//! invocation; nothing is ever written back.

use crate::error::CostError;
use crate::schemas::{PricingSpec, ResourceDescriptor, HOURS_PER_MONTH};
use dashmap::DashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Pricing keys recognized by the calculation rules, in match order.
pub const KEY_MONTHLY_ESTIMATE: &str = "monthlyEstimate";
pub const KEY_ON_DEMAND_HOURLY: &str = "onDemandHourly";
pub const KEY_HOURLY_RATE: &str = "hourlyRate";
pub const KEY_PRICE_PER_GB_MONTH: &str = "pricePerGBMonth";

/// Property names that can carry a SKU, in probe order.
const SKU_PROPERTIES: [&str; 4] = ["instanceType", "sku", "size", "type"];

/// Property names that can carry a storage size, in probe order.
const SIZE_PROPERTIES: [&str; 4] = ["size", "sizeGb", "volumeSize", "allocatedStorage"];

/// Generic SKU names probed when no specific spec matches, in order.
const GENERIC_SKUS: [&str; 3] = ["standard", "basic", "default"];

/// Read-only store over a directory of `<provider>-<service>-<sku>.yaml`
/// pricing documents
pub struct SpecStore {
    dir: Option<PathBuf>,
    // cache key: the file stem; None records a confirmed miss
    cache: DashMap<String, Option<PricingSpec>>,
}

impl SpecStore {
    /// A store over `dir`; `None` yields a store that never matches.
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir,
            cache: DashMap::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new(None)
    }

    /// Look up the spec for an exact `(provider, service, sku)` key.
    pub async fn lookup(&self, provider: &str, service: &str, sku: &str) -> Option<PricingSpec> {
        let dir = self.dir.as_ref()?;
        if [provider, service, sku]
            .iter()
            .any(|part| part.is_empty() || part.contains(['/', '\\']))
        {
            return None;
        }

        let stem = format!("{provider}-{service}-{sku}");
        if let Some(cached) = self.cache.get(&stem) {
            return cached.clone();
        }

        let path = dir.join(format!("{stem}.yaml"));
        let loaded = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_yaml::from_str::<PricingSpec>(&raw) {
                Ok(spec) => Some(spec),
                Err(err) => {
                    // Corrupt files are skipped, never fatal.
                    warn!(
                        error = %CostError::ConfigCorrupted {
                            path: path.clone(),
                            reason: err.to_string(),
                        },
                        "skipping pricing spec"
                    );
                    None
                }
            },
            Err(_) => None,
        };

        self.cache.insert(stem, loaded.clone());
        loaded
    }

    /// The fallback chain of §projected-cost: the derived SKU first, then
    /// the service default, then the generic SKU names in order. Stops at
    /// the first match.
    pub async fn resolve(&self, resource: &ResourceDescriptor) -> Option<PricingSpec> {
        let provider = &resource.provider;
        let service = resource.service();

        if let Some(sku) = derive_sku(resource) {
            if let Some(spec) = self.lookup(provider, &service, &sku).await {
                return Some(spec);
            }
        }

        if let Some(spec) = self.lookup(provider, &service, "default").await {
            return Some(spec);
        }

        for sku in GENERIC_SKUS {
            if let Some(spec) = self.lookup(provider, &service, sku).await {
                return Some(spec);
            }
        }

        debug!(
            resource = %resource.id,
            provider = %provider,
            service = %service,
            "no pricing spec matched"
        );
        None
    }
}

/// SKU for spec lookup: the first SKU-bearing property, else the lowercased
/// third segment of the type token.
pub fn derive_sku(resource: &ResourceDescriptor) -> Option<String> {
    if let Some(sku) = resource.property_str(&SKU_PROPERTIES) {
        return Some(sku);
    }
    resource
        .type_token
        .split(':')
        .nth(2)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
}

/// Monthly and hourly figures from a pricing map, first matching rule wins:
/// a monthly estimate, an hourly rate, a per-GB-month price scaled by the
/// resource's size property, or the first positive numeric value read as an
/// hourly rate.
pub fn price_from_spec(spec: &PricingSpec, resource: &ResourceDescriptor) -> (f64, f64) {
    if let Some(&monthly) = spec.pricing.get(KEY_MONTHLY_ESTIMATE) {
        let hourly = spec
            .pricing
            .get(KEY_ON_DEMAND_HOURLY)
            .or_else(|| spec.pricing.get(KEY_HOURLY_RATE))
            .copied()
            .unwrap_or(monthly / HOURS_PER_MONTH);
        return (monthly, hourly);
    }

    if let Some(&hourly) = spec
        .pricing
        .get(KEY_ON_DEMAND_HOURLY)
        .or_else(|| spec.pricing.get(KEY_HOURLY_RATE))
    {
        return (hourly * HOURS_PER_MONTH, hourly);
    }

    if let Some(&per_gb) = spec.pricing.get(KEY_PRICE_PER_GB_MONTH) {
        if let Some(size) = resource.property_number(&SIZE_PROPERTIES) {
            let monthly = per_gb * size;
            return (monthly, monthly / HOURS_PER_MONTH);
        }
    }

    match spec.pricing.values().find(|v| **v > 0.0) {
        Some(&hourly) => (hourly * HOURS_PER_MONTH, hourly),
        None => (0.0, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_spec(dir: &TempDir, name: &str, body: &str) {
        let mut file = std::fs::File::create(dir.path().join(name)).unwrap();
        file.write_all(body.as_bytes()).unwrap();
    }

    fn ec2_instance() -> ResourceDescriptor {
        ResourceDescriptor::new(
            "aws:ec2/instance:Instance",
            "web",
            "aws",
            BTreeMap::from([("instanceType".to_string(), json!("t3.micro"))]),
        )
    }

    #[tokio::test]
    async fn exact_sku_match_wins() {
        let dir = TempDir::new().unwrap();
        write_spec(
            &dir,
            "aws-ec2-t3.micro.yaml",
            "provider: aws\nservice: ec2\nsku: t3.micro\npricing:\n  monthlyEstimate: 7.59\n  onDemandHourly: 0.0104\n",
        );
        write_spec(
            &dir,
            "aws-ec2-default.yaml",
            "provider: aws\nservice: ec2\nsku: default\npricing:\n  onDemandHourly: 0.05\n",
        );

        let store = SpecStore::new(Some(dir.path().to_path_buf()));
        let spec = store.resolve(&ec2_instance()).await.unwrap();
        assert_eq!(spec.sku, "t3.micro");
    }

    #[tokio::test]
    async fn falls_back_to_service_default() {
        let dir = TempDir::new().unwrap();
        write_spec(
            &dir,
            "aws-ec2-default.yaml",
            "provider: aws\nservice: ec2\nsku: default\npricing:\n  onDemandHourly: 0.05\n",
        );

        let store = SpecStore::new(Some(dir.path().to_path_buf()));
        let spec = store.resolve(&ec2_instance()).await.unwrap();
        assert_eq!(spec.sku, "default");
    }

    #[tokio::test]
    async fn generic_sku_probe_order() {
        let dir = TempDir::new().unwrap();
        write_spec(
            &dir,
            "aws-ec2-basic.yaml",
            "provider: aws\nservice: ec2\nsku: basic\npricing:\n  hourlyRate: 0.02\n",
        );
        write_spec(
            &dir,
            "aws-ec2-standard.yaml",
            "provider: aws\nservice: ec2\nsku: standard\npricing:\n  hourlyRate: 0.04\n",
        );

        let store = SpecStore::new(Some(dir.path().to_path_buf()));
        let mut resource = ec2_instance();
        resource.properties.clear();
        resource.type_token = "aws:ec2:Fleet".to_string();
        let spec = store.resolve(&resource).await.unwrap();
        assert_eq!(spec.sku, "standard");
    }

    #[tokio::test]
    async fn corrupt_spec_is_skipped() {
        let dir = TempDir::new().unwrap();
        write_spec(&dir, "aws-ec2-t3.micro.yaml", "pricing: [not, a, map\n");
        write_spec(
            &dir,
            "aws-ec2-default.yaml",
            "provider: aws\nservice: ec2\nsku: default\npricing:\n  onDemandHourly: 0.05\n",
        );

        let store = SpecStore::new(Some(dir.path().to_path_buf()));
        let spec = store.resolve(&ec2_instance()).await.unwrap();
        assert_eq!(spec.sku, "default");
    }

    #[tokio::test]
    async fn empty_store_never_matches() {
        let store = SpecStore::empty();
        assert!(store.resolve(&ec2_instance()).await.is_none());
    }

    #[test]
    fn sku_derivation_prefers_properties() {
        assert_eq!(derive_sku(&ec2_instance()).as_deref(), Some("t3.micro"));

        let mut bare = ec2_instance();
        bare.properties.clear();
        assert_eq!(derive_sku(&bare).as_deref(), Some("instance"));
    }

    #[test]
    fn pricing_rule_order() {
        let resource = ec2_instance();

        let monthly_spec = PricingSpec {
            provider: "aws".into(),
            service: "ec2".into(),
            sku: "t3.micro".into(),
            currency: "USD".into(),
            pricing: BTreeMap::from([
                (KEY_MONTHLY_ESTIMATE.to_string(), 7.59),
                (KEY_ON_DEMAND_HOURLY.to_string(), 0.0104),
            ]),
            metadata: BTreeMap::new(),
        };
        let (monthly, hourly) = price_from_spec(&monthly_spec, &resource);
        assert_eq!(monthly, 7.59);
        assert_eq!(hourly, 0.0104);

        let hourly_spec = PricingSpec {
            pricing: BTreeMap::from([(KEY_ON_DEMAND_HOURLY.to_string(), 0.05)]),
            ..monthly_spec.clone()
        };
        let (monthly, hourly) = price_from_spec(&hourly_spec, &resource);
        assert_eq!(monthly, 36.5);
        assert_eq!(hourly, 0.05);
    }

    #[test]
    fn per_gb_pricing_scales_by_size() {
        let mut volume = ResourceDescriptor::new(
            "aws:ebs/volume:Volume",
            "data",
            "aws",
            BTreeMap::new(),
        );
        volume.properties.insert("size".to_string(), json!("100"));

        let spec = PricingSpec {
            provider: "aws".into(),
            service: "ebs".into(),
            sku: "gp3".into(),
            currency: "USD".into(),
            pricing: BTreeMap::from([(KEY_PRICE_PER_GB_MONTH.to_string(), 0.08)]),
            metadata: BTreeMap::new(),
        };
        let (monthly, _) = price_from_spec(&spec, &volume);
        assert!((monthly - 8.0).abs() < 1e-9);
    }

    #[test]
    fn unrecognized_keys_fall_back_to_first_positive_hourly() {
        let resource = ec2_instance();
        let spec = PricingSpec {
            provider: "aws".into(),
            service: "ec2".into(),
            sku: "odd".into(),
            currency: "USD".into(),
            pricing: BTreeMap::from([
                ("aZeroRate".to_string(), 0.0),
                ("customRate".to_string(), 0.01),
            ]),
            metadata: BTreeMap::new(),
        };
        let (monthly, hourly) = price_from_spec(&spec, &resource);
        assert_eq!(hourly, 0.01);
        assert!((monthly - 7.3).abs() < 1e-9);
    }
}
