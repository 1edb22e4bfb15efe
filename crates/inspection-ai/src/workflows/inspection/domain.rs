use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::schema::{self, FieldKey};

/// Regulatory inspection variant. Serialized as its public designation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Variant {
    #[serde(rename = "API510")]
    PressureVessel,
    #[serde(rename = "API570")]
    Piping,
    #[serde(rename = "API653")]
    StorageTank,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::PressureVessel, Variant::Piping, Variant::StorageTank];

    /// Public designation used on the wire, in filenames and in the store.
    pub fn designation(self) -> &'static str {
        match self {
            Variant::PressureVessel => "API510",
            Variant::Piping => "API570",
            Variant::StorageTank => "API653",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Variant::PressureVessel => "API 510 - Pressure Vessel",
            Variant::Piping => "API 570 - Piping",
            Variant::StorageTank => "API 653 - Storage Tank",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Variant::PressureVessel => "pressure-vessel",
            Variant::Piping => "piping",
            Variant::StorageTank => "storage-tank",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.designation())
    }
}

impl FromStr for Variant {
    type Err = FieldError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        Variant::ALL
            .into_iter()
            .find(|variant| {
                variant.designation().eq_ignore_ascii_case(trimmed)
                    || variant.slug().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| FieldError::UnknownVariant(trimmed.to_string()))
    }
}

/// Closed set of selectable values backing a select input.
pub trait ChoiceDomain: Sized + Copy + 'static {
    const ALL: &'static [Self];
    /// Registry options, in the same order as `ALL`.
    const OPTIONS: &'static [ChoiceOption];

    fn as_str(self) -> &'static str;

    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|value| value.as_str().eq_ignore_ascii_case(raw))
    }
}

/// Stored value of a select option and the label rendered for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChoiceOption {
    pub value: &'static str,
    pub label: &'static str,
}

impl ChoiceOption {
    const fn new(value: &'static str, label: &'static str) -> Self {
        Self { value, label }
    }
}

const COATING_CONDITIONS: &[ChoiceOption] = &[
    ChoiceOption::new("excellent", "Excellent"),
    ChoiceOption::new("good", "Good"),
    ChoiceOption::new("fair", "Fair"),
    ChoiceOption::new("poor", "Poor"),
    ChoiceOption::new("not painted", "Not painted"),
];
const INSULATION_CONDITIONS: &[ChoiceOption] = &[
    ChoiceOption::new("excellent", "Excellent"),
    ChoiceOption::new("good", "Good"),
    ChoiceOption::new("fair", "Fair"),
    ChoiceOption::new("poor", "Poor"),
    ChoiceOption::new("not insulated", "Not insulated"),
];
const EQUIPMENT_TYPES: &[ChoiceOption] = &[
    ChoiceOption::new("boiler", "Boiler"),
    ChoiceOption::new("drum", "Drum"),
    ChoiceOption::new("exchanger", "Exchanger"),
    ChoiceOption::new("reactor", "Reactor"),
    ChoiceOption::new("tower", "Tower"),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoatingCondition {
    Excellent,
    #[default]
    Good,
    Fair,
    Poor,
    #[serde(rename = "not painted")]
    NotPainted,
}

impl ChoiceDomain for CoatingCondition {
    const OPTIONS: &'static [ChoiceOption] = COATING_CONDITIONS;

    const ALL: &'static [Self] = &[
        Self::Excellent,
        Self::Good,
        Self::Fair,
        Self::Poor,
        Self::NotPainted,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
            Self::NotPainted => "not painted",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsulationCondition {
    Excellent,
    #[default]
    Good,
    Fair,
    Poor,
    #[serde(rename = "not insulated")]
    NotInsulated,
}

impl ChoiceDomain for InsulationCondition {
    const OPTIONS: &'static [ChoiceOption] = INSULATION_CONDITIONS;

    const ALL: &'static [Self] = &[
        Self::Excellent,
        Self::Good,
        Self::Fair,
        Self::Poor,
        Self::NotInsulated,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
            Self::NotInsulated => "not insulated",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentType {
    #[default]
    Boiler,
    Drum,
    Exchanger,
    Reactor,
    Tower,
}

impl ChoiceDomain for EquipmentType {
    const OPTIONS: &'static [ChoiceOption] = EQUIPMENT_TYPES;

    const ALL: &'static [Self] = &[
        Self::Boiler,
        Self::Drum,
        Self::Exchanger,
        Self::Reactor,
        Self::Tower,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::Boiler => "boiler",
            Self::Drum => "drum",
            Self::Exchanger => "exchanger",
            Self::Reactor => "reactor",
            Self::Tower => "tower",
        }
    }
}

/// Borrowed view of a single attribute, used by validation and normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Date(Option<NaiveDate>),
    Text(&'a str),
    Choice(&'static str),
}

impl FieldValue<'_> {
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Date(date) => date.is_none(),
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::Choice(_) => false,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Date(Some(date)) => serde_json::Value::String(date.to_string()),
            FieldValue::Date(None) => serde_json::Value::Null,
            FieldValue::Text(text) => serde_json::Value::String((*text).to_string()),
            FieldValue::Choice(choice) => serde_json::Value::String((*choice).to_string()),
        }
    }
}

/// Attributes shared by every inspection variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommonFields {
    #[serde(deserialize_with = "deserialize_optional_date")]
    pub inspection_date: Option<NaiveDate>,
    pub inspector: String,
    pub facility: String,
    pub coating: CoatingCondition,
    pub insulation: InsulationCondition,
    pub welds: String,
    pub recommendations: String,
}

impl CommonFields {
    fn value_of(&self, key: FieldKey) -> Option<FieldValue<'_>> {
        let value = match key {
            FieldKey::InspectionDate => FieldValue::Date(self.inspection_date),
            FieldKey::Inspector => FieldValue::Text(&self.inspector),
            FieldKey::Facility => FieldValue::Text(&self.facility),
            FieldKey::Coating => FieldValue::Choice(self.coating.as_str()),
            FieldKey::Insulation => FieldValue::Choice(self.insulation.as_str()),
            FieldKey::Welds => FieldValue::Text(&self.welds),
            FieldKey::Recommendations => FieldValue::Text(&self.recommendations),
            _ => return None,
        };
        Some(value)
    }

    /// Returns `Ok(false)` when the key is not a common attribute.
    fn set(&mut self, key: FieldKey, raw: &str) -> Result<bool, FieldError> {
        match key {
            FieldKey::InspectionDate => self.inspection_date = parse_form_date(raw)?,
            FieldKey::Coating => self.coating = parse_choice(key, raw)?,
            FieldKey::Insulation => self.insulation = parse_choice(key, raw)?,
            FieldKey::Inspector => self.inspector = raw.to_string(),
            FieldKey::Facility => self.facility = raw.to_string(),
            FieldKey::Welds => self.welds = raw.to_string(),
            FieldKey::Recommendations => self.recommendations = raw.to_string(),
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// API 510 pressure-vessel attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PressureVesselDetails {
    pub equipment_id: String,
    pub equipment_type: EquipmentType,
    pub shell: String,
    pub heads: String,
    pub nozzles: String,
    pub supports: String,
}

impl PressureVesselDetails {
    fn value_of(&self, key: FieldKey) -> Option<FieldValue<'_>> {
        match key {
            FieldKey::EquipmentType => Some(FieldValue::Choice(self.equipment_type.as_str())),
            FieldKey::EquipmentId => Some(FieldValue::Text(&self.equipment_id)),
            FieldKey::Shell => Some(FieldValue::Text(&self.shell)),
            FieldKey::Heads => Some(FieldValue::Text(&self.heads)),
            FieldKey::Nozzles => Some(FieldValue::Text(&self.nozzles)),
            FieldKey::Supports => Some(FieldValue::Text(&self.supports)),
            _ => None,
        }
    }

    fn text_slot(&mut self, key: FieldKey) -> Option<&mut String> {
        match key {
            FieldKey::EquipmentId => Some(&mut self.equipment_id),
            FieldKey::Shell => Some(&mut self.shell),
            FieldKey::Heads => Some(&mut self.heads),
            FieldKey::Nozzles => Some(&mut self.nozzles),
            FieldKey::Supports => Some(&mut self.supports),
            _ => None,
        }
    }
}

/// API 570 piping attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipingDetails {
    pub piping_id: String,
    pub piping_details: String,
    pub piping_components: String,
    pub supports: String,
    pub bolting: String,
}

impl PipingDetails {
    fn value_of(&self, key: FieldKey) -> Option<FieldValue<'_>> {
        let slot = match key {
            FieldKey::PipingId => &self.piping_id,
            FieldKey::PipingDetails => &self.piping_details,
            FieldKey::PipingComponents => &self.piping_components,
            FieldKey::Supports => &self.supports,
            FieldKey::Bolting => &self.bolting,
            _ => return None,
        };
        Some(FieldValue::Text(slot))
    }

    fn text_slot(&mut self, key: FieldKey) -> Option<&mut String> {
        match key {
            FieldKey::PipingId => Some(&mut self.piping_id),
            FieldKey::PipingDetails => Some(&mut self.piping_details),
            FieldKey::PipingComponents => Some(&mut self.piping_components),
            FieldKey::Supports => Some(&mut self.supports),
            FieldKey::Bolting => Some(&mut self.bolting),
            _ => None,
        }
    }
}

/// API 653 storage-tank attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageTankDetails {
    pub tank_number: String,
    pub tank_type: String,
    pub tank_location: String,
    pub shell: String,
    pub bottom: String,
    pub roof: String,
    pub nozzles: String,
}

impl StorageTankDetails {
    fn value_of(&self, key: FieldKey) -> Option<FieldValue<'_>> {
        let slot = match key {
            FieldKey::TankNumber => &self.tank_number,
            FieldKey::TankType => &self.tank_type,
            FieldKey::TankLocation => &self.tank_location,
            FieldKey::Shell => &self.shell,
            FieldKey::Bottom => &self.bottom,
            FieldKey::Roof => &self.roof,
            FieldKey::Nozzles => &self.nozzles,
            _ => return None,
        };
        Some(FieldValue::Text(slot))
    }

    fn text_slot(&mut self, key: FieldKey) -> Option<&mut String> {
        match key {
            FieldKey::TankNumber => Some(&mut self.tank_number),
            FieldKey::TankType => Some(&mut self.tank_type),
            FieldKey::TankLocation => Some(&mut self.tank_location),
            FieldKey::Shell => Some(&mut self.shell),
            FieldKey::Bottom => Some(&mut self.bottom),
            FieldKey::Roof => Some(&mut self.roof),
            FieldKey::Nozzles => Some(&mut self.nozzles),
            _ => None,
        }
    }
}

/// Variant-specific payload, tagged on the wire by `inspectionType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "inspectionType")]
pub enum VariantDetails {
    #[serde(rename = "API510")]
    PressureVessel(PressureVesselDetails),
    #[serde(rename = "API570")]
    Piping(PipingDetails),
    #[serde(rename = "API653")]
    StorageTank(StorageTankDetails),
}

impl VariantDetails {
    pub fn defaults(variant: Variant) -> Self {
        match variant {
            Variant::PressureVessel => Self::PressureVessel(PressureVesselDetails::default()),
            Variant::Piping => Self::Piping(PipingDetails::default()),
            Variant::StorageTank => Self::StorageTank(StorageTankDetails::default()),
        }
    }

    pub fn variant(&self) -> Variant {
        match self {
            Self::PressureVessel(_) => Variant::PressureVessel,
            Self::Piping(_) => Variant::Piping,
            Self::StorageTank(_) => Variant::StorageTank,
        }
    }

    fn value_of(&self, key: FieldKey) -> Option<FieldValue<'_>> {
        match self {
            Self::PressureVessel(details) => details.value_of(key),
            Self::Piping(details) => details.value_of(key),
            Self::StorageTank(details) => details.value_of(key),
        }
    }

    fn set(&mut self, key: FieldKey, raw: &str) -> Result<bool, FieldError> {
        let slot = match self {
            Self::PressureVessel(details) if key == FieldKey::EquipmentType => {
                details.equipment_type = parse_choice(key, raw)?;
                return Ok(true);
            }
            Self::PressureVessel(details) => details.text_slot(key),
            Self::Piping(details) => details.text_slot(key),
            Self::StorageTank(details) => details.text_slot(key),
        };

        match slot {
            Some(slot) => {
                *slot = raw.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// What happens to entered data when the inspector changes the variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VariantSwitchPolicy {
    /// Keep common attributes, reset variant-specific attributes to defaults.
    #[default]
    PreserveCommon,
    /// Start over with a blank record of the new variant.
    Reset,
}

impl VariantSwitchPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "preserve-common" | "preserve" => Some(Self::PreserveCommon),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

/// A single inspection: common attributes plus exactly one variant payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionRecord {
    #[serde(flatten)]
    pub common: CommonFields,
    #[serde(flatten)]
    pub details: VariantDetails,
}

impl Default for InspectionRecord {
    fn default() -> Self {
        Self::new(Variant::PressureVessel)
    }
}

impl InspectionRecord {
    pub fn new(variant: Variant) -> Self {
        Self {
            common: CommonFields::default(),
            details: VariantDetails::defaults(variant),
        }
    }

    pub fn variant(&self) -> Variant {
        self.details.variant()
    }

    /// Reads an attribute. `None` when the key does not belong to this record's variant.
    pub fn value_of(&self, key: FieldKey) -> Option<FieldValue<'_>> {
        self.common
            .value_of(key)
            .or_else(|| self.details.value_of(key))
    }

    /// Applies raw form input to one attribute of this record.
    pub fn set_field(&mut self, key: FieldKey, raw: &str) -> Result<(), FieldError> {
        if self.common.set(key, raw)? || self.details.set(key, raw)? {
            return Ok(());
        }
        Err(FieldError::NotInVariant {
            key,
            variant: self.variant(),
        })
    }

    pub fn switch_variant(&mut self, variant: Variant, policy: VariantSwitchPolicy) {
        if variant == self.variant() {
            return;
        }
        match policy {
            VariantSwitchPolicy::PreserveCommon => {
                self.details = VariantDetails::defaults(variant);
            }
            VariantSwitchPolicy::Reset => *self = Self::new(variant),
        }
    }

    /// Declared attributes for this variant that are still empty, in form order.
    pub fn missing_fields(&self) -> Vec<FieldKey> {
        schema::form_layout(self.variant())
            .filter(|descriptor| descriptor.required)
            .map(|descriptor| descriptor.key)
            .filter(|key| self.value_of(*key).map_or(true, |value| value.is_empty()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error("unknown inspection type `{0}`")]
    UnknownVariant(String),
    #[error("field `{key}` is not part of an {variant} inspection")]
    NotInVariant { key: FieldKey, variant: Variant },
    #[error("`{value}` is not a valid date (expected YYYY-MM-DD)")]
    InvalidDate { value: String },
    #[error("`{value}` is not an accepted value for `{key}`")]
    InvalidChoice { key: FieldKey, value: String },
}

fn parse_choice<T: ChoiceDomain>(key: FieldKey, raw: &str) -> Result<T, FieldError> {
    T::parse(raw).ok_or_else(|| FieldError::InvalidChoice {
        key,
        value: raw.to_string(),
    })
}

fn parse_form_date(raw: &str) -> Result<Option<NaiveDate>, FieldError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| FieldError::InvalidDate {
            value: raw.to_string(),
        })
}

fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(value) => parse_form_date(&value).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}
