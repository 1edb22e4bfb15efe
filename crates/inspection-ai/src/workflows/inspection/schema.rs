//! Field schema registry.
//!
//! Pure mapping from a [`Variant`] to its ordered field descriptors. Rendering,
//! validation and the payload normalizer all consult these tables, so a field
//! added here flows through every stage at once.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use super::domain::{
    ChoiceDomain, ChoiceOption, CoatingCondition, EquipmentType, InsulationCondition, Variant,
};

/// Every attribute name any variant can carry. Serialized as the wire key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKey {
    InspectionDate,
    Inspector,
    Facility,
    Coating,
    Insulation,
    Welds,
    Recommendations,
    EquipmentId,
    EquipmentType,
    Shell,
    Heads,
    Nozzles,
    Supports,
    PipingId,
    PipingDetails,
    PipingComponents,
    Bolting,
    TankNumber,
    TankType,
    TankLocation,
    Bottom,
    Roof,
}

impl FieldKey {
    pub const ALL: [FieldKey; 22] = [
        FieldKey::InspectionDate,
        FieldKey::Inspector,
        FieldKey::Facility,
        FieldKey::Coating,
        FieldKey::Insulation,
        FieldKey::Welds,
        FieldKey::Recommendations,
        FieldKey::EquipmentId,
        FieldKey::EquipmentType,
        FieldKey::Shell,
        FieldKey::Heads,
        FieldKey::Nozzles,
        FieldKey::Supports,
        FieldKey::PipingId,
        FieldKey::PipingDetails,
        FieldKey::PipingComponents,
        FieldKey::Bolting,
        FieldKey::TankNumber,
        FieldKey::TankType,
        FieldKey::TankLocation,
        FieldKey::Bottom,
        FieldKey::Roof,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            FieldKey::InspectionDate => "inspectionDate",
            FieldKey::Inspector => "inspector",
            FieldKey::Facility => "facility",
            FieldKey::Coating => "coating",
            FieldKey::Insulation => "insulation",
            FieldKey::Welds => "welds",
            FieldKey::Recommendations => "recommendations",
            FieldKey::EquipmentId => "equipmentId",
            FieldKey::EquipmentType => "equipmentType",
            FieldKey::Shell => "shell",
            FieldKey::Heads => "heads",
            FieldKey::Nozzles => "nozzles",
            FieldKey::Supports => "supports",
            FieldKey::PipingId => "pipingId",
            FieldKey::PipingDetails => "pipingDetails",
            FieldKey::PipingComponents => "pipingComponents",
            FieldKey::Bolting => "bolting",
            FieldKey::TankNumber => "tankNumber",
            FieldKey::TankType => "tankType",
            FieldKey::TankLocation => "tankLocation",
            FieldKey::Bottom => "bottom",
            FieldKey::Roof => "roof",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        FieldKey::ALL
            .into_iter()
            .find(|key| key.wire_name() == name.trim())
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Input control used to capture a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputKind {
    Date,
    Text,
    TextArea,
    Select { options: &'static [ChoiceOption] },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub key: FieldKey,
    pub label: &'static str,
    pub input: InputKind,
    pub required: bool,
}

impl FieldDescriptor {
    const fn new(key: FieldKey, label: &'static str, input: InputKind) -> Self {
        Self {
            key,
            label,
            input,
            required: true,
        }
    }

    const fn text(key: FieldKey, label: &'static str) -> Self {
        Self::new(key, label, InputKind::Text)
    }

    const fn text_area(key: FieldKey, label: &'static str) -> Self {
        Self::new(key, label, InputKind::TextArea)
    }

    const fn select(key: FieldKey, label: &'static str, options: &'static [ChoiceOption]) -> Self {
        Self::new(key, label, InputKind::Select { options })
    }

    fn is_identifier(&self) -> bool {
        matches!(self.input, InputKind::Text | InputKind::Select { .. })
    }
}

const COMMON_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new(FieldKey::InspectionDate, "Inspection Date", InputKind::Date),
    FieldDescriptor::text(FieldKey::Inspector, "Inspector"),
    FieldDescriptor::text(FieldKey::Facility, "Facility"),
    FieldDescriptor::select(
        FieldKey::Coating,
        "Coating Condition",
        CoatingCondition::OPTIONS,
    ),
    FieldDescriptor::select(
        FieldKey::Insulation,
        "Insulation Condition",
        InsulationCondition::OPTIONS,
    ),
    FieldDescriptor::text_area(FieldKey::Welds, "Welds"),
    FieldDescriptor::text_area(FieldKey::Recommendations, "Recommendations"),
];

const PRESSURE_VESSEL_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::text(FieldKey::EquipmentId, "Equipment ID"),
    FieldDescriptor::select(
        FieldKey::EquipmentType,
        "Equipment Type",
        EquipmentType::OPTIONS,
    ),
    FieldDescriptor::text_area(FieldKey::Shell, "Shell"),
    FieldDescriptor::text_area(FieldKey::Heads, "Heads"),
    FieldDescriptor::text_area(FieldKey::Nozzles, "Nozzles"),
    FieldDescriptor::text_area(FieldKey::Supports, "Supports"),
];

const PIPING_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::text(FieldKey::PipingId, "Piping ID"),
    FieldDescriptor::text_area(FieldKey::PipingDetails, "Piping"),
    FieldDescriptor::text_area(FieldKey::PipingComponents, "Piping Components"),
    FieldDescriptor::text_area(FieldKey::Supports, "Supports"),
    FieldDescriptor::text_area(FieldKey::Bolting, "Bolting"),
];

const STORAGE_TANK_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::text(FieldKey::TankNumber, "Tank Number"),
    FieldDescriptor::text(FieldKey::TankType, "Tank Type"),
    FieldDescriptor::text(FieldKey::TankLocation, "Tank Location"),
    FieldDescriptor::text_area(FieldKey::Shell, "Shell"),
    FieldDescriptor::text_area(FieldKey::Bottom, "Bottom"),
    FieldDescriptor::text_area(FieldKey::Roof, "Roof"),
    FieldDescriptor::text_area(FieldKey::Nozzles, "Nozzles"),
];

pub fn common_fields() -> &'static [FieldDescriptor] {
    COMMON_FIELDS
}

pub fn variant_fields(variant: Variant) -> &'static [FieldDescriptor] {
    match variant {
        Variant::PressureVessel => PRESSURE_VESSEL_FIELDS,
        Variant::Piping => PIPING_FIELDS,
        Variant::StorageTank => STORAGE_TANK_FIELDS,
    }
}

/// Variant-specific descriptors, or the common descriptors when no variant is given.
pub fn fields(variant: Option<Variant>) -> &'static [FieldDescriptor] {
    match variant {
        Some(variant) => variant_fields(variant),
        None => common_fields(),
    }
}

/// Common descriptors followed by the variant's own descriptors.
pub fn declared_fields(variant: Variant) -> impl Iterator<Item = &'static FieldDescriptor> {
    common_fields().iter().chain(variant_fields(variant))
}

pub fn declared_keys(variant: Variant) -> BTreeSet<FieldKey> {
    declared_fields(variant).map(|descriptor| descriptor.key).collect()
}

pub fn is_declared(variant: Variant, key: FieldKey) -> bool {
    declared_fields(variant).any(|descriptor| descriptor.key == key)
}

/// First descriptor registered for a key in any table.
pub fn descriptor(key: FieldKey) -> Option<&'static FieldDescriptor> {
    COMMON_FIELDS
        .iter()
        .chain(PRESSURE_VESSEL_FIELDS)
        .chain(PIPING_FIELDS)
        .chain(STORAGE_TANK_FIELDS)
        .find(|descriptor| descriptor.key == key)
}

/// Titled group of descriptors in on-screen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormSection {
    pub title: &'static str,
    pub fields: Vec<&'static FieldDescriptor>,
}

/// Sections rendered for a variant: header data, identifiers, conditions,
/// component observations (welds last) and recommendations.
pub fn form_sections(variant: Variant) -> Vec<FormSection> {
    let common = |keys: &[FieldKey]| -> Vec<&'static FieldDescriptor> {
        keys.iter()
            .filter_map(|key| COMMON_FIELDS.iter().find(|d| d.key == *key))
            .collect()
    };
    let specific = variant_fields(variant);

    let mut observations: Vec<&'static FieldDescriptor> =
        specific.iter().filter(|d| !d.is_identifier()).collect();
    observations.extend(common(&[FieldKey::Welds]));

    vec![
        FormSection {
            title: "Inspection",
            fields: common(&[
                FieldKey::InspectionDate,
                FieldKey::Inspector,
                FieldKey::Facility,
            ]),
        },
        FormSection {
            title: "Identification",
            fields: specific.iter().filter(|d| d.is_identifier()).collect(),
        },
        FormSection {
            title: "Condition",
            fields: common(&[FieldKey::Coating, FieldKey::Insulation]),
        },
        FormSection {
            title: "Observations",
            fields: observations,
        },
        FormSection {
            title: "Recommendations",
            fields: common(&[FieldKey::Recommendations]),
        },
    ]
}

/// Flattened render order for a variant.
pub fn form_layout(variant: Variant) -> impl Iterator<Item = &'static FieldDescriptor> {
    form_sections(variant)
        .into_iter()
        .flat_map(|section| section.fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip_for_every_key() {
        for key in FieldKey::ALL {
            assert_eq!(FieldKey::from_wire(key.wire_name()), Some(key));
            let serialized = serde_json::to_value(key).expect("serializes");
            assert_eq!(serialized, key.wire_name());
        }
        assert_eq!(FieldKey::from_wire("generated_report"), None);
    }

    #[test]
    fn every_declared_field_is_required() {
        for variant in Variant::ALL {
            assert!(declared_fields(variant).all(|descriptor| descriptor.required));
        }
    }

    #[test]
    fn fields_without_variant_returns_common_descriptors() {
        assert_eq!(fields(None), common_fields());
        assert_eq!(fields(Some(Variant::Piping)), variant_fields(Variant::Piping));
    }

    #[test]
    fn variant_tables_do_not_repeat_common_keys() {
        let common: BTreeSet<FieldKey> = common_fields().iter().map(|d| d.key).collect();
        for variant in Variant::ALL {
            assert!(variant_fields(variant)
                .iter()
                .all(|descriptor| !common.contains(&descriptor.key)));
        }
    }

    #[test]
    fn form_layout_covers_exactly_the_declared_fields() {
        for variant in Variant::ALL {
            let rendered: Vec<FieldKey> = form_layout(variant).map(|d| d.key).collect();
            let rendered_set: BTreeSet<FieldKey> = rendered.iter().copied().collect();
            assert_eq!(rendered.len(), rendered_set.len(), "{variant} renders a key twice");
            assert_eq!(rendered_set, declared_keys(variant), "{variant}");
        }
    }

    #[test]
    fn pressure_vessel_sections_follow_form_order() {
        let sections = form_sections(Variant::PressureVessel);
        let titles: Vec<&str> = sections.iter().map(|s| s.title).collect();
        assert_eq!(
            titles,
            [
                "Inspection",
                "Identification",
                "Condition",
                "Observations",
                "Recommendations"
            ]
        );

        let identification: Vec<FieldKey> = sections[1].fields.iter().map(|d| d.key).collect();
        assert_eq!(
            identification,
            [FieldKey::EquipmentId, FieldKey::EquipmentType]
        );
        let observations: Vec<FieldKey> = sections[3].fields.iter().map(|d| d.key).collect();
        assert_eq!(observations.last(), Some(&FieldKey::Welds));
    }

    #[test]
    fn selects_expose_shared_domains() {
        let coating = descriptor(FieldKey::Coating).expect("coating registered");
        assert_eq!(
            coating.input,
            InputKind::Select {
                options: CoatingCondition::OPTIONS
            }
        );

        let rendered = serde_json::to_value(coating).expect("serializes");
        assert_eq!(rendered["input"]["kind"], "select");
        assert_eq!(
            rendered["input"]["options"][4],
            serde_json::json!({ "value": "not painted", "label": "Not painted" })
        );
        assert!(is_declared(Variant::PressureVessel, FieldKey::EquipmentType));
        assert!(!is_declared(Variant::StorageTank, FieldKey::EquipmentType));
    }
}
