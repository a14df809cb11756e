//! NodeGarbageCollector - 1 ノード分の GC パス
//!
//! # フロー
//! 1. 出力キーごとのポリシーを読む（無ければ何もしない）
//! 2. ノードの LIVE な出力 artifact を出力キーごとに取得
//! 3. 全 artifact の event を 1 回で取得
//! 4. キーごとに ポリシー評価 → PipelineGroupFilter → UsageFilter
//! 5. 全キーの候補をまとめて PurgeExecutor に渡す
//!
//! # エラー境界
//! - ポリシー評価の設定エラーはその出力キーだけをスキップ（error ログ）
//! - `run` がこのクレートで唯一のエラー境界です。ノード ID の不一致（Wiring）だけが
//!   呼び出し元に返り、それ以外は `NodeGcOutcome::Aborted` としてログに残ります。

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::{Instrument, debug, error, info, info_span, warn};

use super::purge::PurgeExecutor;
use super::report::{NodeGcOutcome, PurgeReport};
use super::usage_filter::UsageFilter;
use crate::domain::{
    Artifact, ArtifactId, Event, GarbageCollectionPolicy, GcError, NodeSpec, NodeUid,
    artifacts_to_collect,
};
use crate::ports::{Filesystem, MetadataStore, PipelineGroupFilter};

pub struct NodeGarbageCollector {
    store: Arc<dyn MetadataStore>,
    pipeline_groups: Arc<dyn PipelineGroupFilter>,
    usage: UsageFilter,
    purge: PurgeExecutor,
}

impl NodeGarbageCollector {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        filesystem: Arc<dyn Filesystem>,
        pipeline_groups: Arc<dyn PipelineGroupFilter>,
    ) -> Self {
        Self {
            usage: UsageFilter::new(store.clone()),
            purge: PurgeExecutor::new(store.clone(), filesystem),
            store,
            pipeline_groups,
        }
    }

    /// Delete candidates for `node`, without purging anything.
    pub async fn plan(&self, node_uid: &NodeUid, node: &NodeSpec) -> Result<Vec<Artifact>, GcError> {
        check_node(node_uid, node)?;
        let policies = node.gc_policies();
        if policies.is_empty() {
            return Ok(Vec::new());
        }
        self.candidates(node_uid, &policies).await
    }

    /// Run one GC pass for `node`.
    ///
    /// Only a node id mismatch is returned as `Err`. An invalid policy skips
    /// its output key; any other failure aborts the pass and is reported as
    /// `NodeGcOutcome::Aborted`.
    pub async fn run(&self, node_uid: &NodeUid, node: &NodeSpec) -> Result<NodeGcOutcome, GcError> {
        check_node(node_uid, node)?;
        let span = info_span!(
            "node_gc",
            pipeline_id = %node_uid.pipeline_id,
            node_id = %node_uid.node_id
        );
        Ok(self.collect(node_uid, node).instrument(span).await)
    }

    /// Run passes for several distinct nodes concurrently.
    ///
    /// Results come back in input order.
    pub async fn run_many(
        self: &Arc<Self>,
        nodes: Vec<(NodeUid, NodeSpec)>,
    ) -> Vec<(NodeUid, Result<NodeGcOutcome, GcError>)> {
        let mut handles = Vec::with_capacity(nodes.len());
        for (node_uid, node) in nodes {
            let collector = Arc::clone(self);
            let task_uid = node_uid.clone();
            let handle = tokio::spawn(async move { collector.run(&task_uid, &node).await });
            handles.push((node_uid, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (node_uid, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_err) => {
                    error!(node = %node_uid, error = %join_err, "gc task failed");
                    Err(GcError::from(join_err))
                }
            };
            results.push((node_uid, result));
        }
        results
    }

    async fn collect(&self, node_uid: &NodeUid, node: &NodeSpec) -> NodeGcOutcome {
        let policies = node.gc_policies();
        if policies.is_empty() {
            debug!("no garbage collection policy configured");
            return NodeGcOutcome::NoPolicy;
        }

        info!(output_keys = policies.len(), "gc pass started");
        match self.pass(node_uid, &policies).await {
            Ok(report) => {
                info!(
                    marked_deleted = report.mutated(),
                    deleted = report.deleted.len(),
                    marked_external = report.marked_external.len(),
                    failed = report.failed.len(),
                    "gc pass finished"
                );
                NodeGcOutcome::Collected(report)
            }
            Err(err) => {
                let kind = err.kind();
                error!(?kind, error = %err, "gc pass aborted");
                NodeGcOutcome::Aborted {
                    kind,
                    message: err.to_string(),
                }
            }
        }
    }

    async fn pass(
        &self,
        node_uid: &NodeUid,
        policies: &BTreeMap<&str, &GarbageCollectionPolicy>,
    ) -> Result<PurgeReport, GcError> {
        let candidates = self.candidates(node_uid, policies).await?;
        if candidates.is_empty() {
            return Ok(PurgeReport::default());
        }
        self.purge.purge(candidates).await
    }

    async fn candidates(
        &self,
        node_uid: &NodeUid,
        policies: &BTreeMap<&str, &GarbageCollectionPolicy>,
    ) -> Result<Vec<Artifact>, GcError> {
        let by_key = self.store.live_output_artifacts(node_uid).await?;
        let has_work = policies
            .keys()
            .any(|key| by_key.get(*key).is_some_and(|a| !a.is_empty()));
        if !has_work {
            debug!("no live artifacts under a configured output key");
            return Ok(Vec::new());
        }

        let mut ids: Vec<ArtifactId> = by_key.values().flatten().map(|a| a.id).collect();
        ids.sort();
        ids.dedup();
        let events = self.store.events_by_artifact_ids(&ids).await?;

        let mut seen: HashSet<ArtifactId> = HashSet::new();
        let mut selected = Vec::new();
        for (&output_key, &policy) in policies {
            let Some(artifacts) = by_key.get(output_key).filter(|a| !a.is_empty()) else {
                debug!(output_key, "no live artifacts");
                continue;
            };
            let evaluated = match artifacts_to_collect(artifacts, policy) {
                Ok(evaluated) => evaluated,
                Err(err) => {
                    error!(
                        output_key,
                        kind = ?err.kind(),
                        error = %err,
                        "invalid garbage collection policy, output key skipped"
                    );
                    continue;
                }
            };
            debug!(output_key, count = evaluated.len(), "not retained by policy");
            let collected = self
                .filter_candidates(evaluated, policy, &events)
                .await
                .map_err(|e| e.for_output_key(output_key))?;
            info!(
                output_key,
                live = artifacts.len(),
                candidates = collected.len(),
                "output key evaluated"
            );
            selected.extend(collected.into_iter().filter(|a| seen.insert(a.id)));
        }
        Ok(selected)
    }

    /// Pipeline group filter, then usage filter.
    async fn filter_candidates(
        &self,
        evaluated: Vec<Artifact>,
        policy: &GarbageCollectionPolicy,
        events: &[Event],
    ) -> Result<Vec<Artifact>, GcError> {
        if evaluated.is_empty() {
            return Ok(evaluated);
        }

        let allowed: HashSet<ArtifactId> = evaluated.iter().map(|a| a.id).collect();
        let filtered = self
            .pipeline_groups
            .retain_unused(policy.keep_if_used_in_pipeline_groups.as_ref(), evaluated)
            .await?;
        let filtered = retain_candidates(&allowed, filtered);

        self.usage.retain_unused(filtered, events).await
    }
}

fn check_node(node_uid: &NodeUid, node: &NodeSpec) -> Result<(), GcError> {
    if node_uid.node_id != node.id {
        return Err(GcError::NodeMismatch {
            declared: node.id.clone(),
            requested: node_uid.node_id.clone(),
        });
    }
    Ok(())
}

/// Drop anything the pipeline group filter returned that was not a candidate.
fn retain_candidates(allowed: &HashSet<ArtifactId>, returned: Vec<Artifact>) -> Vec<Artifact> {
    let mut seen = HashSet::new();
    returned
        .into_iter()
        .filter(|a| {
            if !allowed.contains(&a.id) {
                warn!(artifact_id = %a.id, "pipeline group filter returned a non-candidate, dropped");
                return false;
            }
            seen.insert(a.id)
        })
        .collect()
}
