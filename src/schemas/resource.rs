//! Resource Descriptor
//!
//! The engine's view of one cloud resource: a colon-delimited type token
//! (e.g. `aws:ec2/instance:Instance`), a stable id, a provider label, and
//! the resource's input properties. Created by the ingestion mapper and
//! never mutated afterwards.

use crate::error::{CostError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub const MAX_TYPE_TOKEN_BYTES: usize = 256;
pub const MAX_ID_BYTES: usize = 1024;
pub const MAX_PROPERTIES: usize = 100;
pub const MAX_PROPERTY_KEY_BYTES: usize = 128;
pub const MAX_PROPERTY_VALUE_BYTES: usize = 10 * 1024;

/// Resource type prefixes that belong to the plan tool itself and never
/// carry a cloud cost.
pub const INTERNAL_TYPE_PREFIXES: [&str; 2] = ["pulumi:pulumi:", "pulumi:providers:"];

fn property_key_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\p{L}\p{N}_.\-]+$").expect("valid property key pattern"))
}

/// One cloud resource as seen by the cost engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceDescriptor {
    /// Colon-delimited type token, e.g. `aws:ec2/instance:Instance`
    #[serde(rename = "type")]
    pub type_token: String,

    /// Stable identifier: the URN tail or a user-chosen name
    pub id: String,

    /// Provider label, possibly derived from the type token
    pub provider: String,

    /// Resource input properties; nested structures are preserved
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl ResourceDescriptor {
    pub fn new(
        type_token: impl Into<String>,
        id: impl Into<String>,
        provider: impl Into<String>,
        properties: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            type_token: type_token.into(),
            id: id.into(),
            provider: provider.into(),
            properties,
        }
    }

    /// Check the descriptor against its structural bounds. Accepted
    /// descriptors survive the engine round-trip without mutation.
    pub fn validate(&self) -> Result<()> {
        if self.type_token.is_empty() {
            return self.invalid("type token is empty");
        }
        if self.type_token.len() > MAX_TYPE_TOKEN_BYTES {
            return self.invalid(&format!(
                "type token exceeds {MAX_TYPE_TOKEN_BYTES} bytes"
            ));
        }
        if self.id.len() > MAX_ID_BYTES {
            return self.invalid(&format!("id exceeds {MAX_ID_BYTES} bytes"));
        }
        if self.properties.len() > MAX_PROPERTIES {
            return self.invalid(&format!("more than {MAX_PROPERTIES} properties"));
        }
        for (key, value) in &self.properties {
            if key.len() > MAX_PROPERTY_KEY_BYTES {
                return self.invalid(&format!(
                    "property key '{key}' exceeds {MAX_PROPERTY_KEY_BYTES} bytes"
                ));
            }
            if !property_key_pattern().is_match(key) {
                return self.invalid(&format!("property key '{key}' contains invalid characters"));
            }
            if value.to_string().len() > MAX_PROPERTY_VALUE_BYTES {
                return self.invalid(&format!(
                    "value of property '{key}' exceeds {MAX_PROPERTY_VALUE_BYTES} bytes"
                ));
            }
        }
        Ok(())
    }

    fn invalid(&self, reason: &str) -> Result<()> {
        Err(CostError::ResourceValidation {
            resource_id: self.id.clone(),
            reason: reason.to_string(),
        })
    }

    /// Derive a provider label from a type token: `pulumi:providers:<p>`
    /// names `<p>` directly, anything else contributes its first colon
    /// segment. Empty tokens map to "unknown".
    pub fn provider_from_type(type_token: &str) -> String {
        if let Some(p) = type_token.strip_prefix("pulumi:providers:") {
            if !p.is_empty() {
                return p.to_string();
            }
        }
        match type_token.split(':').next() {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => "unknown".to_string(),
        }
    }

    /// Service name: the second colon segment with any module path trimmed,
    /// e.g. `aws:ec2/instance:Instance` names service `ec2`.
    pub fn service(&self) -> String {
        Self::service_from_type(&self.type_token)
    }

    pub fn service_from_type(type_token: &str) -> String {
        type_token
            .split(':')
            .nth(1)
            .map(|s| s.split('/').next().unwrap_or(s))
            .filter(|s| !s.is_empty())
            .unwrap_or("unknown")
            .to_string()
    }

    /// True for types owned by the plan tool (`pulumi:pulumi:*`,
    /// `pulumi:providers:*`), which are never priced.
    pub fn is_internal(&self) -> bool {
        INTERNAL_TYPE_PREFIXES
            .iter()
            .any(|p| self.type_token.starts_with(p))
    }

    /// Scalar string form of the first present property among `keys`.
    pub fn property_str(&self, keys: &[&str]) -> Option<String> {
        for key in keys {
            match self.properties.get(*key) {
                Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
                Some(Value::Number(n)) => return Some(n.to_string()),
                Some(Value::Bool(b)) => return Some(b.to_string()),
                _ => continue,
            }
        }
        None
    }

    /// Numeric form of the first present property among `keys`; numeric
    /// strings are accepted.
    pub fn property_number(&self, keys: &[&str]) -> Option<f64> {
        for key in keys {
            match self.properties.get(*key) {
                Some(Value::Number(n)) => return n.as_f64(),
                Some(Value::String(s)) => {
                    if let Ok(v) = s.trim().parse::<f64>() {
                        return Some(v);
                    }
                }
                _ => continue,
            }
        }
        None
    }

    /// The resource's tag map, read from a `tags` property when it is an
    /// object of scalar values.
    pub fn tags(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        if let Some(Value::Object(map)) = self.properties.get("tags") {
            for (k, v) in map {
                match v {
                    Value::String(s) => {
                        out.insert(k.clone(), s.clone());
                    }
                    Value::Number(n) => {
                        out.insert(k.clone(), n.to_string());
                    }
                    Value::Bool(b) => {
                        out.insert(k.clone(), b.to_string());
                    }
                    _ => {}
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::new(
            "aws:ec2/instance:Instance",
            "web-server",
            "aws",
            BTreeMap::from([("instanceType".to_string(), json!("t3.micro"))]),
        )
    }

    #[test]
    fn valid_descriptor_passes() {
        assert!(descriptor().validate().is_ok());
    }

    #[test]
    fn empty_type_token_rejected() {
        let mut r = descriptor();
        r.type_token.clear();
        assert!(r.validate().is_err());
    }

    #[test]
    fn oversized_type_token_rejected() {
        let mut r = descriptor();
        r.type_token = "x".repeat(MAX_TYPE_TOKEN_BYTES + 1);
        assert!(r.validate().is_err());
    }

    #[test]
    fn oversized_id_rejected() {
        let mut r = descriptor();
        r.id = "x".repeat(MAX_ID_BYTES + 1);
        assert!(r.validate().is_err());
    }

    #[test]
    fn too_many_properties_rejected() {
        let mut r = descriptor();
        for i in 0..=MAX_PROPERTIES {
            r.properties.insert(format!("key{i}"), json!(i));
        }
        assert!(r.validate().is_err());
    }

    #[test]
    fn property_key_pattern_enforced() {
        let mut r = descriptor();
        r.properties.insert("bad key!".to_string(), json!(1));
        assert!(r.validate().is_err());

        let mut r = descriptor();
        r.properties.insert("ok_key.v2-x".to_string(), json!(1));
        assert!(r.validate().is_ok());
    }

    #[test]
    fn oversized_property_value_rejected() {
        let mut r = descriptor();
        r.properties.insert(
            "blob".to_string(),
            json!("y".repeat(MAX_PROPERTY_VALUE_BYTES + 1)),
        );
        assert!(r.validate().is_err());
    }

    #[test]
    fn provider_from_type_token() {
        assert_eq!(
            ResourceDescriptor::provider_from_type("aws:ec2/instance:Instance"),
            "aws"
        );
        assert_eq!(
            ResourceDescriptor::provider_from_type("pulumi:providers:azure"),
            "azure"
        );
        assert_eq!(ResourceDescriptor::provider_from_type(""), "unknown");
    }

    #[test]
    fn service_extraction() {
        assert_eq!(descriptor().service(), "ec2");
        assert_eq!(
            ResourceDescriptor::service_from_type("azure:compute:VM"),
            "compute"
        );
        assert_eq!(ResourceDescriptor::service_from_type("aws"), "unknown");
    }

    #[test]
    fn internal_types_detected() {
        let mut r = descriptor();
        r.type_token = "pulumi:providers:aws".to_string();
        assert!(r.is_internal());
        r.type_token = "pulumi:pulumi:Stack".to_string();
        assert!(r.is_internal());
        assert!(!descriptor().is_internal());
    }

    #[test]
    fn property_number_accepts_numeric_strings() {
        let mut r = descriptor();
        r.properties.insert("size".to_string(), json!("100"));
        assert_eq!(r.property_number(&["size"]), Some(100.0));
        r.properties.insert("volumeSize".to_string(), json!(250));
        assert_eq!(r.property_number(&["volumeSize", "size"]), Some(250.0));
    }

    #[test]
    fn tags_read_from_properties() {
        let mut r = descriptor();
        r.properties.insert(
            "tags".to_string(),
            json!({"env": "prod", "replicas": 3}),
        );
        let tags = r.tags();
        assert_eq!(tags.get("env").map(String::as_str), Some("prod"));
        assert_eq!(tags.get("replicas").map(String::as_str), Some("3"));
    }
}
