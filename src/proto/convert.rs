//! Wire/Domain Conversions
//!
//! Mapping between the generated protobuf messages and the crate's domain
//! schemas. Property maps cross the wire as `google.protobuf.Struct`;
//! nested maps and lists of scalars are preserved.

use crate::schemas::{self, ResourceDescriptor};
use chrono::{DateTime, TimeZone, Utc};
use prost_types::value::Kind;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use super::costsource::v1 as pb;

pub fn json_to_proto_value(value: &JsonValue) -> prost_types::Value {
    let kind = match value {
        JsonValue::Null => Kind::NullValue(0),
        JsonValue::Bool(b) => Kind::BoolValue(*b),
        JsonValue::Number(n) => Kind::NumberValue(n.as_f64().unwrap_or(0.0)),
        JsonValue::String(s) => Kind::StringValue(s.clone()),
        JsonValue::Array(items) => Kind::ListValue(prost_types::ListValue {
            values: items.iter().map(json_to_proto_value).collect(),
        }),
        JsonValue::Object(map) => Kind::StructValue(prost_types::Struct {
            fields: map
                .iter()
                .map(|(k, v)| (k.clone(), json_to_proto_value(v)))
                .collect(),
        }),
    };
    prost_types::Value { kind: Some(kind) }
}

pub fn proto_value_to_json(value: &prost_types::Value) -> JsonValue {
    match &value.kind {
        None | Some(Kind::NullValue(_)) => JsonValue::Null,
        Some(Kind::BoolValue(b)) => JsonValue::Bool(*b),
        Some(Kind::NumberValue(n)) => serde_json::Number::from_f64(*n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Some(Kind::StringValue(s)) => JsonValue::String(s.clone()),
        Some(Kind::ListValue(list)) => {
            JsonValue::Array(list.values.iter().map(proto_value_to_json).collect())
        }
        Some(Kind::StructValue(s)) => JsonValue::Object(
            s.fields
                .iter()
                .map(|(k, v)| (k.clone(), proto_value_to_json(v)))
                .collect(),
        ),
    }
}

pub fn properties_to_struct(properties: &BTreeMap<String, JsonValue>) -> prost_types::Struct {
    prost_types::Struct {
        fields: properties
            .iter()
            .map(|(k, v)| (k.clone(), json_to_proto_value(v)))
            .collect(),
    }
}

pub fn struct_to_properties(fields: &prost_types::Struct) -> BTreeMap<String, JsonValue> {
    fields
        .fields
        .iter()
        .map(|(k, v)| (k.clone(), proto_value_to_json(v)))
        .collect()
}

pub fn timestamp_from_datetime(dt: DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: dt.timestamp(),
        nanos: dt.timestamp_subsec_nanos() as i32,
    }
}

pub fn datetime_from_timestamp(ts: &prost_types::Timestamp) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(ts.seconds, ts.nanos.max(0) as u32).single()
}

impl From<&ResourceDescriptor> for pb::ResourceDescriptor {
    fn from(resource: &ResourceDescriptor) -> Self {
        pb::ResourceDescriptor {
            r#type: resource.type_token.clone(),
            id: resource.id.clone(),
            provider: resource.provider.clone(),
            properties: Some(properties_to_struct(&resource.properties)),
        }
    }
}

impl From<&pb::ResourceDescriptor> for ResourceDescriptor {
    fn from(wire: &pb::ResourceDescriptor) -> Self {
        ResourceDescriptor::new(
            wire.r#type.clone(),
            wire.id.clone(),
            if wire.provider.is_empty() {
                ResourceDescriptor::provider_from_type(&wire.r#type)
            } else {
                wire.provider.clone()
            },
            wire.properties
                .as_ref()
                .map(struct_to_properties)
                .unwrap_or_default(),
        )
    }
}

impl From<&pb::Recommendation> for schemas::Recommendation {
    fn from(wire: &pb::Recommendation) -> Self {
        schemas::Recommendation {
            resource_id: wire.resource_id.clone(),
            rec_type: wire.r#type.clone(),
            description: wire.description.clone(),
            estimated_savings: wire.estimated_savings,
            currency: wire.currency.clone(),
        }
    }
}

impl From<&pb::SustainabilityMetric> for schemas::SustainabilityMetric {
    fn from(wire: &pb::SustainabilityMetric) -> Self {
        schemas::SustainabilityMetric {
            value: wire.value,
            unit: wire.unit.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn properties_round_trip_through_struct() {
        let props = BTreeMap::from([
            ("instanceType".to_string(), json!("t3.micro")),
            ("count".to_string(), json!(3.0)),
            ("tags".to_string(), json!({"env": "prod"})),
            ("zones".to_string(), json!(["us-east-1a", "us-east-1b"])),
        ]);
        let wire = properties_to_struct(&props);
        assert_eq!(struct_to_properties(&wire), props);
    }

    #[test]
    fn timestamps_round_trip() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 0).unwrap();
        let ts = timestamp_from_datetime(dt);
        assert_eq!(datetime_from_timestamp(&ts), Some(dt));
    }

    #[test]
    fn wire_descriptor_derives_missing_provider() {
        let wire = pb::ResourceDescriptor {
            r#type: "gcp:compute/instance:Instance".to_string(),
            id: "vm-1".to_string(),
            provider: String::new(),
            properties: None,
        };
        let resource = ResourceDescriptor::from(&wire);
        assert_eq!(resource.provider, "gcp");
    }
}
