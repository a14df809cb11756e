//! Retention evaluation: artifacts + policy -> artifacts to collect.
//!
//! Pure functions, no side effects. Like the other domain decisions they take
//! the current records and return what should happen next; purging is left to
//! the app layer.

use std::collections::{BTreeMap, HashSet};

use super::artifact::{Artifact, PropertyValue, ValueKind};
use super::errors::GcError;
use super::ids::ArtifactId;
use super::policy::{GarbageCollectionPolicy, KeepOrder, KeepPropertyValueGroups, Retention};

/// Artifacts of one output key that `policy` does not keep, in input order.
pub fn artifacts_to_collect(
    artifacts: &[Artifact],
    policy: &GarbageCollectionPolicy,
) -> Result<Vec<Artifact>, GcError> {
    match policy.retention()? {
        Retention::MostRecentlyPublished(rule) => {
            Ok(not_most_recently_published(artifacts, rule.num_artifacts))
        }
        Retention::PropertyValueGroups(rule) => not_kept_by_property_value_groups(artifacts, rule),
    }
}

/// Everything strictly older than the `num_artifacts`-th newest publish time.
///
/// Artifacts sharing the cutoff time all survive, so more than
/// `num_artifacts` may be kept.
fn not_most_recently_published(artifacts: &[Artifact], num_artifacts: i64) -> Vec<Artifact> {
    let Ok(keep) = usize::try_from(num_artifacts) else {
        return Vec::new();
    };
    if keep == 0 || artifacts.len() <= keep {
        return Vec::new();
    }

    let mut publish_times: Vec<_> = artifacts.iter().map(|a| a.create_time).collect();
    publish_times.sort_unstable();
    let cutoff = publish_times[artifacts.len() - keep];

    artifacts
        .iter()
        .filter(|a| a.create_time < cutoff)
        .cloned()
        .collect()
}

/// Buckets of one group, keyed by property value. Missing values go to `nulls`.
struct Buckets<'a> {
    by_value: BTreeMap<&'a PropertyValue, Vec<&'a Artifact>>,
    nulls: Option<Vec<&'a Artifact>>,
}

fn not_kept_by_property_value_groups(
    artifacts: &[Artifact],
    rule: &KeepPropertyValueGroups,
) -> Result<Vec<Artifact>, GcError> {
    // worklist: surviving groups of the previous level
    let mut groups: Vec<Vec<&Artifact>> = vec![artifacts.iter().collect()];

    for grouping in &rule.groupings {
        let mut next_groups = Vec::new();
        // one value type per level, across all groups
        let mut level_kind: Option<ValueKind> = None;

        for group in groups {
            let mut buckets = Buckets {
                by_value: BTreeMap::new(),
                nulls: None,
            };
            for artifact in group {
                match artifact.property(&grouping.property_name) {
                    Some(value) => {
                        let found = value.kind();
                        if let Some(expected) = level_kind
                            && expected != found
                        {
                            return Err(GcError::MixedPropertyTypes {
                                property_name: grouping.property_name.clone(),
                                expected,
                                found,
                            });
                        }
                        level_kind = Some(found);
                        buckets.by_value.entry(value).or_default().push(artifact);
                    }
                    None => buckets.nulls.get_or_insert_with(Vec::new).push(artifact),
                }
            }

            // non-positive keep_num: re-partition only
            let keep_num = usize::try_from(grouping.keep_num).unwrap_or(0);
            if keep_num == 0 {
                next_groups.extend(buckets.by_value.into_values());
                next_groups.extend(buckets.nulls);
                continue;
            }

            let selected: Vec<Vec<&Artifact>> = match grouping.keep_order {
                KeepOrder::Unspecified | KeepOrder::Largest => {
                    buckets.by_value.into_values().rev().take(keep_num).collect()
                }
                KeepOrder::Smallest => buckets.by_value.into_values().take(keep_num).collect(),
                KeepOrder::Unrecognized => {
                    return Err(GcError::UnknownKeepOrder {
                        property_name: grouping.property_name.clone(),
                    });
                }
            };
            let kept_values = selected.len();
            next_groups.extend(selected);

            // the null bucket is the lowest-priority fallback
            if kept_values < keep_num
                && let Some(nulls) = buckets.nulls
            {
                next_groups.push(nulls);
            }
        }

        groups = next_groups;
    }

    let keep: HashSet<ArtifactId> = groups.into_iter().flatten().map(|a| a.id).collect();
    Ok(artifacts
        .iter()
        .filter(|a| !keep.contains(&a.id))
        .cloned()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::policy::Grouping;
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;
    use rstest::rstest;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn published_at(times: &[i64]) -> Vec<Artifact> {
        times
            .iter()
            .enumerate()
            .map(|(i, t)| Artifact::new(format!("/artifacts/{i}"), at(*t)))
            .collect()
    }

    fn with_spans(spans: &[Option<i64>]) -> Vec<Artifact> {
        spans
            .iter()
            .enumerate()
            .map(|(i, span)| {
                let artifact = Artifact::new(format!("/artifacts/{i}"), at(i as i64));
                match span {
                    Some(span) => artifact.with_custom_property("span", *span),
                    None => artifact,
                }
            })
            .collect()
    }

    fn ids(artifacts: &[Artifact]) -> Vec<ArtifactId> {
        artifacts.iter().map(|a| a.id).collect()
    }

    fn groups_policy(groupings: Vec<Grouping>) -> GarbageCollectionPolicy {
        GarbageCollectionPolicy::keep_property_value_groups(groupings)
    }

    // --- KeepMostRecentlyPublished ---

    #[test]
    fn ties_at_the_cutoff_are_kept() {
        let artifacts = published_at(&[10, 20, 20, 30]);
        let policy = GarbageCollectionPolicy::keep_most_recently_published(2);

        let collected = artifacts_to_collect(&artifacts, &policy).unwrap();

        assert_eq!(ids(&collected), vec![artifacts[0].id]);
    }

    #[rstest]
    #[case::zero(0)]
    #[case::negative(-3)]
    #[case::equal_to_count(4)]
    #[case::larger_than_count(10)]
    fn nothing_is_collected(#[case] num_artifacts: i64) {
        let artifacts = published_at(&[1, 2, 3, 4]);
        let policy = GarbageCollectionPolicy::keep_most_recently_published(num_artifacts);

        assert!(artifacts_to_collect(&artifacts, &policy).unwrap().is_empty());
    }

    #[test]
    fn collected_artifacts_keep_input_order() {
        let artifacts = published_at(&[50, 10, 40, 20, 30]);
        let policy = GarbageCollectionPolicy::keep_most_recently_published(2);

        let collected = artifacts_to_collect(&artifacts, &policy).unwrap();

        assert_eq!(
            ids(&collected),
            vec![artifacts[1].id, artifacts[3].id, artifacts[4].id]
        );
    }

    // --- KeepPropertyValueGroups ---

    #[test]
    fn keeps_the_largest_span_group() {
        let artifacts = with_spans(&[Some(1), Some(1), Some(2), Some(3)]);
        let policy = groups_policy(vec![Grouping::new("span", 1, KeepOrder::Largest)]);

        let collected = artifacts_to_collect(&artifacts, &policy).unwrap();

        assert_eq!(
            ids(&collected),
            vec![artifacts[0].id, artifacts[1].id, artifacts[2].id]
        );
    }

    #[rstest]
    #[case::unspecified_means_largest(KeepOrder::Unspecified, vec![0, 1])]
    #[case::largest(KeepOrder::Largest, vec![0, 1])]
    #[case::smallest(KeepOrder::Smallest, vec![2, 3])]
    fn keep_order_selects_the_end(#[case] order: KeepOrder, #[case] expected: Vec<usize>) {
        let artifacts = with_spans(&[Some(1), Some(2), Some(3), Some(4)]);
        let policy = groups_policy(vec![Grouping::new("span", 2, order)]);

        let collected = artifacts_to_collect(&artifacts, &policy).unwrap();

        let expected: Vec<_> = expected.into_iter().map(|i| artifacts[i].id).collect();
        assert_eq!(ids(&collected), expected);
    }

    #[test]
    fn null_bucket_survives_when_too_few_values() {
        let artifacts = with_spans(&[Some(1), None, None]);
        let policy = groups_policy(vec![Grouping::new("span", 2, KeepOrder::Largest)]);

        assert!(artifacts_to_collect(&artifacts, &policy).unwrap().is_empty());
    }

    #[test]
    fn null_bucket_is_collected_when_enough_values() {
        let artifacts = with_spans(&[Some(1), Some(2), None]);
        let policy = groups_policy(vec![Grouping::new("span", 2, KeepOrder::Largest)]);

        let collected = artifacts_to_collect(&artifacts, &policy).unwrap();

        assert_eq!(ids(&collected), vec![artifacts[2].id]);
    }

    #[rstest]
    #[case::zero(0)]
    #[case::negative(-1)]
    fn non_positive_keep_num_only_repartitions(#[case] keep_num: i64) {
        let artifacts = with_spans(&[Some(1), Some(2), None]);
        let policy = groups_policy(vec![Grouping::new("span", keep_num, KeepOrder::Largest)]);

        assert!(artifacts_to_collect(&artifacts, &policy).unwrap().is_empty());
    }

    #[test]
    fn nested_groupings_apply_per_group() {
        // keep every span, and within each span the newest version
        let artifacts: Vec<Artifact> = [(1, 1), (1, 2), (2, 1), (2, 2), (2, 3)]
            .iter()
            .enumerate()
            .map(|(i, (span, version))| {
                Artifact::new(format!("/artifacts/{i}"), at(i as i64))
                    .with_property("span", *span as i64)
                    .with_property("version", *version as i64)
            })
            .collect();
        let policy = groups_policy(vec![
            Grouping::new("span", 0, KeepOrder::Unspecified),
            Grouping::new("version", 1, KeepOrder::Largest),
        ]);

        let collected = artifacts_to_collect(&artifacts, &policy).unwrap();

        assert_eq!(
            ids(&collected),
            vec![artifacts[0].id, artifacts[2].id, artifacts[3].id]
        );
    }

    #[test]
    fn string_values_are_grouped() {
        let artifacts: Vec<Artifact> = ["2024-01", "2024-02", "2024-02", "2023-12"]
            .iter()
            .enumerate()
            .map(|(i, month)| {
                Artifact::new(format!("/artifacts/{i}"), at(i as i64)).with_property("month", *month)
            })
            .collect();
        let policy = groups_policy(vec![Grouping::new("month", 1, KeepOrder::Largest)]);

        let collected = artifacts_to_collect(&artifacts, &policy).unwrap();

        assert_eq!(ids(&collected), vec![artifacts[0].id, artifacts[3].id]);
    }

    #[test]
    fn mixed_value_types_fail() {
        let artifacts = vec![
            Artifact::new("/a", at(0)).with_property("span", 1_i64),
            Artifact::new("/b", at(1)).with_property("span", "two"),
        ];
        let policy = groups_policy(vec![Grouping::new("span", 1, KeepOrder::Largest)]);

        let err = artifacts_to_collect(&artifacts, &policy).unwrap_err();

        assert!(matches!(
            err,
            GcError::MixedPropertyTypes { expected: ValueKind::Int, found: ValueKind::String, .. }
        ));
    }

    #[test]
    fn unset_policy_fails() {
        let artifacts = published_at(&[1, 2]);
        let err = artifacts_to_collect(&artifacts, &GarbageCollectionPolicy::default()).unwrap_err();
        assert!(matches!(err, GcError::UnsetPolicy));
    }

    #[test]
    fn empty_groupings_keep_everything() {
        let artifacts = published_at(&[1, 2, 3]);
        let policy = groups_policy(vec![]);
        assert!(artifacts_to_collect(&artifacts, &policy).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn recency_collects_exactly_below_cutoff(
            times in proptest::collection::vec(0i64..50, 0..30),
            n in 1i64..10,
        ) {
            let artifacts = published_at(&times);
            let policy = GarbageCollectionPolicy::keep_most_recently_published(n);
            let collected = artifacts_to_collect(&artifacts, &policy).unwrap();

            if artifacts.len() <= n as usize {
                prop_assert!(collected.is_empty());
            } else {
                let mut sorted = times.clone();
                sorted.sort_unstable();
                let cutoff = sorted[times.len() - n as usize];
                let expected: Vec<_> = artifacts
                    .iter()
                    .filter(|a| a.create_time < at(cutoff))
                    .map(|a| a.id)
                    .collect();
                prop_assert_eq!(ids(&collected), expected);
                prop_assert!(artifacts.len() - collected.len() >= n as usize);
            }
        }

        #[test]
        fn single_grouping_keeps_the_k_largest_values(
            spans in proptest::collection::vec(proptest::option::of(0i64..8), 0..30),
            k in 1i64..5,
        ) {
            let artifacts = with_spans(&spans);
            let policy = groups_policy(vec![Grouping::new("span", k, KeepOrder::Largest)]);
            let collected = artifacts_to_collect(&artifacts, &policy).unwrap();

            let mut distinct: Vec<i64> = spans.iter().flatten().copied().collect();
            distinct.sort_unstable();
            distinct.dedup();
            let kept_values: Vec<i64> = distinct.iter().rev().take(k as usize).copied().collect();
            let nulls_kept = distinct.len() < k as usize;

            let expected: Vec<_> = artifacts
                .iter()
                .zip(&spans)
                .filter(|(_, span)| match span {
                    Some(v) => !kept_values.contains(v),
                    None => !nulls_kept,
                })
                .map(|(a, _)| a.id)
                .collect();
            prop_assert_eq!(ids(&collected), expected);
        }
    }
}
