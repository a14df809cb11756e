//! Garbage collection policy configuration.
//!
//! The serde shape keeps both retention rules optional so that "neither" and
//! "both" can be represented; `GarbageCollectionPolicy::retention` turns the
//! configuration into the exhaustively matched `Retention` or a configuration
//! error.

use serde::{Deserialize, Serialize};

use super::errors::GcError;

/// Keep the `num_artifacts` most recently published artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeepMostRecentlyPublished {
    #[serde(default)]
    pub num_artifacts: i64,
}

/// Order in which distinct property values are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeepOrder {
    /// Same as `Largest`.
    #[default]
    #[serde(rename = "KEEP_ORDER_UNSPECIFIED")]
    Unspecified,
    #[serde(rename = "KEEP_ORDER_LARGEST")]
    Largest,
    #[serde(rename = "KEEP_ORDER_SMALLEST")]
    Smallest,
    /// Any value this version does not understand.
    #[serde(rename = "KEEP_ORDER_UNRECOGNIZED", other)]
    Unrecognized,
}

/// One partitioning level of `KeepPropertyValueGroups`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grouping {
    pub property_name: String,
    #[serde(default)]
    pub keep_num: i64,
    #[serde(default)]
    pub keep_order: KeepOrder,
}

impl Grouping {
    pub fn new(property_name: impl Into<String>, keep_num: i64, keep_order: KeepOrder) -> Self {
        Self {
            property_name: property_name.into(),
            keep_num,
            keep_order,
        }
    }
}

/// Hierarchical retention by property value groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeepPropertyValueGroups {
    #[serde(default)]
    pub groupings: Vec<Grouping>,
}

/// A set of pipelines whose usage of an artifact keeps it alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineGroup {
    #[serde(default)]
    pub pipeline_ids: Vec<String>,
}

/// Extension block consumed by a `PipelineGroupFilter`. Opaque to the core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineGroupUsage {
    #[serde(default)]
    pub pipeline_groups: Vec<PipelineGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarbageCollectionPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_most_recently_published: Option<KeepMostRecentlyPublished>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_property_value_groups: Option<KeepPropertyValueGroups>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_if_used_in_pipeline_groups: Option<PipelineGroupUsage>,
}

/// The retention rule a policy selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention<'a> {
    MostRecentlyPublished(&'a KeepMostRecentlyPublished),
    PropertyValueGroups(&'a KeepPropertyValueGroups),
}

impl GarbageCollectionPolicy {
    pub fn keep_most_recently_published(num_artifacts: i64) -> Self {
        Self {
            keep_most_recently_published: Some(KeepMostRecentlyPublished { num_artifacts }),
            ..Self::default()
        }
    }

    pub fn keep_property_value_groups(groupings: Vec<Grouping>) -> Self {
        Self {
            keep_property_value_groups: Some(KeepPropertyValueGroups { groupings }),
            ..Self::default()
        }
    }

    pub fn with_pipeline_group_usage(mut self, usage: PipelineGroupUsage) -> Self {
        self.keep_if_used_in_pipeline_groups = Some(usage);
        self
    }

    /// Resolve the configured rule.
    ///
    /// Exactly one rule must be set, and every grouping must use a known
    /// keep order.
    pub fn retention(&self) -> Result<Retention<'_>, GcError> {
        match (
            &self.keep_most_recently_published,
            &self.keep_property_value_groups,
        ) {
            (Some(recent), None) => Ok(Retention::MostRecentlyPublished(recent)),
            (None, Some(groups)) => {
                if let Some(grouping) = groups
                    .groupings
                    .iter()
                    .find(|g| g.keep_order == KeepOrder::Unrecognized)
                {
                    return Err(GcError::UnknownKeepOrder {
                        property_name: grouping.property_name.clone(),
                    });
                }
                Ok(Retention::PropertyValueGroups(groups))
            }
            (None, None) => Err(GcError::UnsetPolicy),
            (Some(_), Some(_)) => Err(GcError::AmbiguousPolicy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retention_selects_the_configured_rule() {
        let policy = GarbageCollectionPolicy::keep_most_recently_published(3);
        assert!(matches!(
            policy.retention(),
            Ok(Retention::MostRecentlyPublished(KeepMostRecentlyPublished { num_artifacts: 3 }))
        ));

        let policy = GarbageCollectionPolicy::keep_property_value_groups(vec![Grouping::new(
            "span",
            1,
            KeepOrder::Largest,
        )]);
        assert!(matches!(policy.retention(), Ok(Retention::PropertyValueGroups(_))));
    }

    #[test]
    fn unset_policy_is_a_configuration_error() {
        let policy = GarbageCollectionPolicy::default();
        assert!(matches!(policy.retention(), Err(GcError::UnsetPolicy)));
    }

    #[test]
    fn both_rules_is_a_configuration_error() {
        let mut policy = GarbageCollectionPolicy::keep_most_recently_published(1);
        policy.keep_property_value_groups = Some(KeepPropertyValueGroups { groupings: vec![] });
        assert!(matches!(policy.retention(), Err(GcError::AmbiguousPolicy)));
    }

    #[test]
    fn unknown_keep_order_parses_and_is_rejected() {
        let policy: GarbageCollectionPolicy = serde_json::from_value(serde_json::json!({
            "keep_property_value_groups": {
                "groupings": [
                    { "property_name": "span", "keep_num": 2, "keep_order": "KEEP_ORDER_RANDOM" }
                ]
            }
        }))
        .unwrap();

        let grouping = &policy.keep_property_value_groups.as_ref().unwrap().groupings[0];
        assert_eq!(grouping.keep_order, KeepOrder::Unrecognized);
        assert!(matches!(
            policy.retention(),
            Err(GcError::UnknownKeepOrder { property_name }) if property_name == "span"
        ));
    }

    #[test]
    fn keep_order_defaults_to_unspecified() {
        let grouping: Grouping =
            serde_json::from_value(serde_json::json!({ "property_name": "span", "keep_num": 1 }))
                .unwrap();
        assert_eq!(grouping.keep_order, KeepOrder::Unspecified);
    }
}
