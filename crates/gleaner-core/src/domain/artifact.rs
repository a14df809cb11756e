//! Artifact records and their property values.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::ArtifactId;

/// Property that marks an artifact as owned outside the pipeline.
pub const IS_EXTERNAL_PROPERTY: &str = "is_external";

/// Artifact lifecycle state.
///
/// - Live -> Deleted (only via garbage collection, or mirrored for external artifacts)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactState {
    Live,
    Deleted,
}

/// Type of a property value. Values of one grouping level must share a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueKind {
    Int,
    Double,
    String,
    Bool,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Int => "int",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// A typed or custom property value.
///
/// Values are totally ordered within a kind (doubles use IEEE total order) so
/// they can key a `BTreeMap` when artifacts are bucketed. Across kinds the
/// order falls back to the kind; evaluation rejects mixed kinds before that
/// ordering could matter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    Int(i64),
    Double(f64),
    String(String),
    Bool(bool),
}

impl PropertyValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            PropertyValue::Int(_) => ValueKind::Int,
            PropertyValue::Double(_) => ValueKind::Double,
            PropertyValue::String(_) => ValueKind::String,
            PropertyValue::Bool(_) => ValueKind::Bool,
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Double(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl Ord for PropertyValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (PropertyValue::Int(a), PropertyValue::Int(b)) => a.cmp(b),
            (PropertyValue::Double(a), PropertyValue::Double(b)) => a.total_cmp(b),
            (PropertyValue::String(a), PropertyValue::String(b)) => a.cmp(b),
            (PropertyValue::Bool(a), PropertyValue::Bool(b)) => a.cmp(b),
            _ => self.kind().cmp(&other.kind()),
        }
    }
}

impl PartialOrd for PropertyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PropertyValue {}

impl Hash for PropertyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match self {
            PropertyValue::Int(v) => v.hash(state),
            // total_cmp equality is bitwise equality
            PropertyValue::Double(v) => v.to_bits().hash(state),
            PropertyValue::String(v) => v.hash(state),
            PropertyValue::Bool(v) => v.hash(state),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::Double(v) => write!(f, "{v}"),
            PropertyValue::String(v) => write!(f, "{v:?}"),
            PropertyValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// A recorded unit of pipeline output.
///
/// Design:
/// - Created LIVE by the producing execution (outside this crate).
/// - The only transition performed here is Live -> Deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub uri: String,
    pub create_time: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyValue>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_properties: BTreeMap<String, PropertyValue>,

    pub state: ArtifactState,
}

impl Artifact {
    pub fn new(uri: impl Into<String>, create_time: DateTime<Utc>) -> Self {
        Self {
            id: ArtifactId::generate(),
            uri: uri.into(),
            create_time,
            properties: BTreeMap::new(),
            custom_properties: BTreeMap::new(),
            state: ArtifactState::Live,
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_custom_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.custom_properties.insert(name.into(), value.into());
        self
    }

    /// Mark as owned outside the pipeline (`is_external = 1`).
    pub fn external(self) -> Self {
        self.with_custom_property(IS_EXTERNAL_PROPERTY, 1_i64)
    }

    /// Look up a property by name. Typed properties shadow custom ones.
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .get(name)
            .or_else(|| self.custom_properties.get(name))
    }

    /// External artifacts are never removed from storage, only flipped to DELETED.
    ///
    /// Any value numerically equal to 1 counts: `1`, `1.0` or `true`.
    pub fn is_external(&self) -> bool {
        match self.property(IS_EXTERNAL_PROPERTY) {
            Some(PropertyValue::Int(v)) => *v == 1,
            Some(PropertyValue::Double(v)) => *v == 1.0,
            Some(PropertyValue::Bool(v)) => *v,
            Some(PropertyValue::String(_)) | None => false,
        }
    }

    pub fn is_live(&self) -> bool {
        self.state == ArtifactState::Live
    }

    pub fn mark_deleted(&mut self) {
        self.state = ArtifactState::Deleted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn typed_property_shadows_custom_property() {
        let artifact = Artifact::new("/tmp/a", at(0))
            .with_custom_property("span", 1_i64)
            .with_property("span", 7_i64);

        assert_eq!(artifact.property("span"), Some(&PropertyValue::Int(7)));
        assert_eq!(artifact.property("missing"), None);
    }

    #[rstest]
    #[case::custom_int_one(Some(PropertyValue::Int(1)), true)]
    #[case::custom_int_zero(Some(PropertyValue::Int(0)), false)]
    #[case::bool_true(Some(PropertyValue::Bool(true)), true)]
    #[case::bool_false(Some(PropertyValue::Bool(false)), false)]
    #[case::double_one(Some(PropertyValue::Double(1.0)), true)]
    #[case::double_half(Some(PropertyValue::Double(0.5)), false)]
    #[case::string_one(Some(PropertyValue::String("1".to_string())), false)]
    #[case::absent(None, false)]
    fn external_flag_comes_from_is_external(
        #[case] value: Option<PropertyValue>,
        #[case] expected: bool,
    ) {
        let mut artifact = Artifact::new("/tmp/a", at(0));
        if let Some(value) = value {
            artifact = artifact.with_custom_property(IS_EXTERNAL_PROPERTY, value);
        }
        assert_eq!(artifact.is_external(), expected);
    }

    #[test]
    fn doubles_are_totally_ordered() {
        let mut values = vec![
            PropertyValue::Double(2.5),
            PropertyValue::Double(-1.0),
            PropertyValue::Double(0.0),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                PropertyValue::Double(-1.0),
                PropertyValue::Double(0.0),
                PropertyValue::Double(2.5),
            ]
        );
    }

    #[test]
    fn mark_deleted_transitions_state() {
        let mut artifact = Artifact::new("/tmp/a", at(0));
        assert!(artifact.is_live());
        artifact.mark_deleted();
        assert_eq!(artifact.state, ArtifactState::Deleted);
    }

    #[test]
    fn artifact_roundtrip_json() {
        let artifact = Artifact::new("/tmp/a", at(10))
            .with_property("span", 3_i64)
            .external();

        let json = serde_json::to_value(&artifact).unwrap();
        assert_eq!(json["state"], "LIVE");
        assert_eq!(json["properties"]["span"]["int"], 3);

        let back: Artifact = serde_json::from_value(json).unwrap();
        assert_eq!(back, artifact);
    }
}
