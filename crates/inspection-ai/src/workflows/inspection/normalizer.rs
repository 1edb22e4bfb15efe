use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use super::domain::{InspectionRecord, Variant};
use super::schema::{self, FieldKey};

/// Column holding the variant designation.
pub const VARIANT_KEY: &str = "inspectionType";
/// Column holding the generated report text.
pub const REPORT_KEY: &str = "generated_report";

/// The only object written to the store: common attributes, the record's own
/// variant attributes and the generated report. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistencePayload {
    variant: Variant,
    fields: BTreeMap<FieldKey, Value>,
    report: String,
}

impl PersistencePayload {
    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn report_text(&self) -> &str {
        &self.report
    }

    pub fn get(&self, key: FieldKey) -> Option<&Value> {
        self.fields.get(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = FieldKey> + '_ {
        self.fields.keys().copied()
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for PersistencePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 2))?;
        map.serialize_entry(VARIANT_KEY, self.variant.designation())?;
        for (key, value) in &self.fields {
            map.serialize_entry(key.wire_name(), value)?;
        }
        map.serialize_entry(REPORT_KEY, &self.report)?;
        map.end()
    }
}

/// Builds the store payload for a record, copying only the fields the registry
/// declares for the record's variant.
pub fn normalize(record: &InspectionRecord, report_text: &str) -> PersistencePayload {
    let variant = record.variant();
    let fields = schema::declared_fields(variant)
        .filter_map(|descriptor| {
            record
                .value_of(descriptor.key)
                .map(|value| (descriptor.key, value.to_json()))
        })
        .collect();

    PersistencePayload {
        variant,
        fields,
        report: report_text.to_string(),
    }
}
