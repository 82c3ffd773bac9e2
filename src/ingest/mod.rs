//! Plan Ingestion
//!
//! Converts plan-tool resource records into the engine's resource
//! descriptors. The authoritative state of a record is nested under
//! `newState` (creates/updates) or `priorState` (deletes); reading the
//! outer envelope instead yields empty property maps and silent pricing
//! misses, so this module only ever reads the nested state.

use crate::error::{CostError, Result};
use crate::schemas::{PlanDocument, PlanResource, ResourceDescriptor};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Read and decode a plan document from disk.
pub async fn load_plan(path: &Path) -> Result<PlanDocument> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|err| {
        CostError::PlanParse(format!("cannot read {}: {err}", path.display()))
    })?;
    serde_json::from_str(&raw)
        .map_err(|err| CostError::PlanParse(format!("{}: {err}", path.display())))
}

/// Map every record of a plan document. Records with no nested state or no
/// type are skipped with a warning; tool-internal resources
/// (`pulumi:pulumi:*`, `pulumi:providers:*`) carry no cloud cost and are
/// filtered out. Each produced descriptor is validated against its
/// structural bounds.
pub fn map_plan(document: &PlanDocument) -> Result<Vec<ResourceDescriptor>> {
    let mut resources = Vec::new();
    for record in document.records() {
        match map_record(record) {
            Some(resource) if resource.is_internal() => {
                debug!(resource = %resource.id, "skipping internal tooling resource");
            }
            Some(resource) => {
                resource.validate()?;
                resources.push(resource);
            }
            None => {
                warn!(
                    urn = record.urn.as_deref().unwrap_or("<missing>"),
                    "plan record has no usable nested state; skipping"
                );
            }
        }
    }
    Ok(resources)
}

/// Map one plan record to a descriptor, or `None` when the nested state or
/// its type token is missing.
pub fn map_record(record: &PlanResource) -> Option<ResourceDescriptor> {
    let state = record.effective_state()?;
    let type_token = state.type_token.as_deref().filter(|t| !t.is_empty())?;

    let urn = record
        .urn
        .as_deref()
        .or(state.urn.as_deref())
        .unwrap_or_default();

    let properties: BTreeMap<String, serde_json::Value> = state
        .inputs
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Some(ResourceDescriptor::new(
        type_token,
        resource_id_from_urn(urn),
        ResourceDescriptor::provider_from_type(type_token),
        properties,
    ))
}

/// The user-facing resource name: the last `::`-delimited URN segment, or
/// the URN verbatim when it has no segments.
pub fn resource_id_from_urn(urn: &str) -> String {
    urn.rsplit("::")
        .next()
        .filter(|tail| !tail.is_empty())
        .unwrap_or(urn)
        .to_string()
}
