//! Plan Document Dialect
//!
//! Serde view of the preview/export JSON emitted by the plan tool. Only
//! `urn`, the nested state's `type`, and its `inputs` are semantically
//! required; unknown fields are ignored. Sensitive values arrive as plain
//! strings and are never decrypted.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Top-level plan document. Preview output carries `steps`, exported
/// deployments carry `resources`; either shape is accepted.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PlanDocument {
    #[serde(default)]
    pub resources: Vec<PlanResource>,

    #[serde(default)]
    pub steps: Vec<PlanResource>,
}

impl PlanDocument {
    /// The resource records of this document, whichever envelope they
    /// arrived in.
    pub fn records(&self) -> &[PlanResource] {
        if !self.resources.is_empty() {
            &self.resources
        } else {
            &self.steps
        }
    }
}

/// One resource record of a plan document.
///
/// The authoritative resource state is nested under `newState` for creates
/// and updates, and under `priorState` for deletes. The outer envelope may
/// carry look-alike fields; they are deliberately not modeled here because
/// reading them yields empty property maps and silent pricing misses.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlanResource {
    #[serde(default)]
    pub urn: Option<String>,

    /// Step operation, e.g. "create", "update", "delete"
    #[serde(default)]
    pub op: Option<String>,

    #[serde(default)]
    pub new_state: Option<PlanState>,

    #[serde(default, alias = "oldState")]
    pub prior_state: Option<PlanState>,
}

impl PlanResource {
    /// The nested state to price: `newState` when present, else
    /// `priorState` (deletions).
    pub fn effective_state(&self) -> Option<&PlanState> {
        self.new_state.as_ref().or(self.prior_state.as_ref())
    }
}

/// The nested resource state
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlanState {
    #[serde(default)]
    pub urn: Option<String>,

    #[serde(rename = "type", default)]
    pub type_token: Option<String>,

    #[serde(default)]
    pub inputs: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_steps_and_export_resources_both_accepted() {
        let preview: PlanDocument = serde_json::from_str(
            r#"{"steps": [{"op": "create", "urn": "urn:pulumi:dev::app::aws:ec2/instance:Instance::web"}]}"#,
        )
        .unwrap();
        assert_eq!(preview.records().len(), 1);

        let export: PlanDocument = serde_json::from_str(
            r#"{"resources": [{"urn": "urn:pulumi:dev::app::aws:s3/bucket:Bucket::data"}]}"#,
        )
        .unwrap();
        assert_eq!(export.records().len(), 1);
    }

    #[test]
    fn effective_state_prefers_new_state() {
        let record: PlanResource = serde_json::from_str(
            r#"{
                "op": "update",
                "newState": {"type": "aws:ec2/instance:Instance", "inputs": {"instanceType": "t3.micro"}},
                "priorState": {"type": "aws:ec2/instance:Instance", "inputs": {"instanceType": "t2.micro"}}
            }"#,
        )
        .unwrap();
        let state = record.effective_state().unwrap();
        assert_eq!(
            state.inputs.get("instanceType").and_then(|v| v.as_str()),
            Some("t3.micro")
        );
    }

    #[test]
    fn deletions_fall_back_to_prior_state() {
        let record: PlanResource = serde_json::from_str(
            r#"{
                "op": "delete",
                "priorState": {"type": "aws:ebs/volume:Volume", "inputs": {"size": 100}}
            }"#,
        )
        .unwrap();
        let state = record.effective_state().unwrap();
        assert_eq!(state.type_token.as_deref(), Some("aws:ebs/volume:Volume"));
    }

    #[test]
    fn old_state_alias_accepted() {
        let record: PlanResource = serde_json::from_str(
            r#"{"op": "delete", "oldState": {"type": "aws:ebs/volume:Volume"}}"#,
        )
        .unwrap();
        assert!(record.prior_state.is_some());
    }
}
