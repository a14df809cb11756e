//! UsageFilter - 実行中の execution が入力として使っている artifact を除外
//!
//! # フロー
//! 1. 候補を指す入力方向の event を選ぶ
//! 2. その execution をまとめて 1 回で取得する
//! 3. active（NEW / RUNNING）な execution の入力になっている候補を外す

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, error};

use crate::domain::{Artifact, ArtifactId, Event, ExecutionId, GcError};
use crate::ports::MetadataStore;

pub struct UsageFilter {
    store: Arc<dyn MetadataStore>,
}

impl UsageFilter {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self { store }
    }

    /// Drop candidates read by an active execution.
    ///
    /// `events` may reference artifacts outside `candidates`; those are ignored.
    pub async fn retain_unused(
        &self,
        candidates: Vec<Artifact>,
        events: &[Event],
    ) -> Result<Vec<Artifact>, GcError> {
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let candidate_ids: HashSet<ArtifactId> = candidates.iter().map(|a| a.id).collect();
        let inputs: Vec<&Event> = events
            .iter()
            .filter(|e| e.kind.is_input() && candidate_ids.contains(&e.artifact_id))
            .collect();
        if inputs.is_empty() {
            return Ok(candidates);
        }

        let mut execution_ids: Vec<ExecutionId> = inputs.iter().map(|e| e.execution_id).collect();
        execution_ids.sort();
        execution_ids.dedup();

        let executions: HashMap<ExecutionId, bool> = self
            .store
            .executions_by_ids(&execution_ids)
            .await?
            .into_iter()
            .map(|e| (e.id, e.is_active()))
            .collect();

        let mut in_use: HashSet<ArtifactId> = HashSet::new();
        for event in inputs {
            match executions.get(&event.execution_id) {
                Some(true) => {
                    in_use.insert(event.artifact_id);
                }
                Some(false) => {}
                None => {
                    error!(
                        artifact_id = %event.artifact_id,
                        execution_id = %event.execution_id,
                        "event references an execution missing from the store"
                    );
                    return Err(GcError::MissingExecution(event.execution_id));
                }
            }
        }

        if !in_use.is_empty() {
            debug!(count = in_use.len(), "candidates kept: input of an active execution");
        }
        Ok(candidates
            .into_iter()
            .filter(|a| !in_use.contains(&a.id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Execution, ExecutionState, NodeUid};
    use crate::impls::InMemoryMetadataStore;
    use crate::ports::StoreError;
    use async_trait::async_trait;
    use chrono::Utc;
    use rstest::rstest;
    use std::collections::BTreeMap;

    fn consumer() -> NodeUid {
        NodeUid::new("pipeline", "evaluator")
    }

    async fn store_with(execution: &Execution) -> Arc<InMemoryMetadataStore> {
        let store = Arc::new(InMemoryMetadataStore::new());
        store.insert_execution(execution.clone()).await;
        store
    }

    #[rstest]
    #[case::new(ExecutionState::New, false)]
    #[case::running(ExecutionState::Running, false)]
    #[case::complete(ExecutionState::Complete, true)]
    #[case::failed(ExecutionState::Failed, true)]
    #[case::cached(ExecutionState::Cached, true)]
    #[case::canceled(ExecutionState::Canceled, true)]
    #[tokio::test]
    async fn only_active_consumers_protect_candidates(
        #[case] state: ExecutionState,
        #[case] collectable: bool,
    ) {
        let reader = Execution::new(consumer(), state);
        let store = store_with(&reader).await;
        let candidate = Artifact::new("/out/model", Utc::now());
        let events = vec![Event::input(candidate.id, reader.id)];

        let kept = UsageFilter::new(store)
            .retain_unused(vec![candidate.clone()], &events)
            .await
            .unwrap();

        assert_eq!(kept.len(), usize::from(collectable));
    }

    #[tokio::test]
    async fn output_events_do_not_protect() {
        let writer = Execution::new(consumer(), ExecutionState::Running);
        let store = store_with(&writer).await;
        let candidate = Artifact::new("/out/model", Utc::now());
        let events = vec![Event::output(candidate.id, writer.id, "model")];

        let kept = UsageFilter::new(store)
            .retain_unused(vec![candidate.clone()], &events)
            .await
            .unwrap();

        assert_eq!(kept, vec![candidate]);
    }

    #[tokio::test]
    async fn missing_execution_is_a_consistency_error() {
        let store = Arc::new(InMemoryMetadataStore::new());
        let candidate = Artifact::new("/out/model", Utc::now());
        let ghost = ExecutionId::generate();
        let events = vec![Event::input(candidate.id, ghost)];

        let err = UsageFilter::new(store)
            .retain_unused(vec![candidate], &events)
            .await
            .unwrap_err();

        assert!(matches!(err, GcError::MissingExecution(id) if id == ghost));
    }

    /// Fails every execution lookup, to prove it is never made.
    struct NoExecutions;

    #[async_trait]
    impl MetadataStore for NoExecutions {
        async fn live_output_artifacts(
            &self,
            _node: &NodeUid,
        ) -> Result<BTreeMap<String, Vec<Artifact>>, StoreError> {
            Ok(BTreeMap::new())
        }

        async fn events_by_artifact_ids(&self, _ids: &[ArtifactId]) -> Result<Vec<Event>, StoreError> {
            Ok(Vec::new())
        }

        async fn executions_by_ids(&self, _ids: &[ExecutionId]) -> Result<Vec<Execution>, StoreError> {
            Err(StoreError::Unavailable("executions queried".to_string()))
        }

        async fn put_artifacts(&self, _artifacts: &[Artifact]) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn no_input_events_skips_the_execution_lookup() {
        let candidate = Artifact::new("/out/model", Utc::now());
        let unrelated = Artifact::new("/out/other", Utc::now());
        let events = vec![Event::input(unrelated.id, ExecutionId::generate())];

        let kept = UsageFilter::new(Arc::new(NoExecutions))
            .retain_unused(vec![candidate.clone()], &events)
            .await
            .unwrap();

        assert_eq!(kept, vec![candidate]);
    }
}
