//! In-memory metadata store.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::domain::{Artifact, ArtifactId, Event, Execution, ExecutionId, NodeUid};
use crate::ports::{MetadataStore, StoreError};

/// Serializable content of a metadata store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default)]
    pub executions: Vec<Execution>,
    #[serde(default)]
    pub events: Vec<Event>,
}

struct InMemoryStoreState {
    /// All artifact records (single source of truth).
    artifacts: HashMap<ArtifactId, Artifact>,

    /// Insertion order, so snapshots and queries are deterministic.
    artifact_order: Vec<ArtifactId>,

    executions: HashMap<ExecutionId, Execution>,
    execution_order: Vec<ExecutionId>,

    events: Vec<Event>,

    /// Number of `put_artifacts` batches (observability for tests).
    artifact_batches: usize,
}

impl InMemoryStoreState {
    fn new() -> Self {
        Self {
            artifacts: HashMap::new(),
            artifact_order: Vec::new(),
            executions: HashMap::new(),
            execution_order: Vec::new(),
            events: Vec::new(),
            artifact_batches: 0,
        }
    }

    fn upsert_artifact(&mut self, artifact: Artifact) {
        if self.artifacts.insert(artifact.id, artifact.clone()).is_none() {
            self.artifact_order.push(artifact.id);
        }
    }

    fn upsert_execution(&mut self, execution: Execution) {
        if self.executions.insert(execution.id, execution.clone()).is_none() {
            self.execution_order.push(execution.id);
        }
    }
}

/// In-memory `MetadataStore`.
///
/// Design:
/// - State lives behind a tokio `Mutex`; no lock is held across another await.
/// - Cloning shares the same state (like an `Arc`'d connection handle).
#[derive(Clone)]
pub struct InMemoryMetadataStore {
    state: Arc<Mutex<InMemoryStoreState>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryStoreState::new())),
        }
    }

    /// Load a snapshot. Artifact ids must be unique.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, StoreError> {
        let mut state = InMemoryStoreState::new();
        for artifact in snapshot.artifacts {
            if state.artifacts.contains_key(&artifact.id) {
                return Err(StoreError::DuplicateArtifact(artifact.id));
            }
            state.upsert_artifact(artifact);
        }
        for execution in snapshot.executions {
            state.upsert_execution(execution);
        }
        state.events = snapshot.events;
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
        })
    }

    pub async fn snapshot(&self) -> Snapshot {
        let state = self.state.lock().await;
        Snapshot {
            artifacts: state
                .artifact_order
                .iter()
                .filter_map(|id| state.artifacts.get(id).cloned())
                .collect(),
            executions: state
                .execution_order
                .iter()
                .filter_map(|id| state.executions.get(id).cloned())
                .collect(),
            events: state.events.clone(),
        }
    }

    pub async fn insert_artifact(&self, artifact: Artifact) {
        self.state.lock().await.upsert_artifact(artifact);
    }

    pub async fn insert_execution(&self, execution: Execution) {
        self.state.lock().await.upsert_execution(execution);
    }

    pub async fn insert_event(&self, event: Event) {
        self.state.lock().await.events.push(event);
    }

    pub async fn artifact(&self, id: ArtifactId) -> Option<Artifact> {
        self.state.lock().await.artifacts.get(&id).cloned()
    }

    /// How many `put_artifacts` batches have been written.
    pub async fn artifact_batches(&self) -> usize {
        self.state.lock().await.artifact_batches
    }
}

impl Default for InMemoryMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn live_output_artifacts(
        &self,
        node: &NodeUid,
    ) -> Result<BTreeMap<String, Vec<Artifact>>, StoreError> {
        let state = self.state.lock().await;
        let node_executions: HashSet<ExecutionId> = state
            .executions
            .values()
            .filter(|e| &e.node == node)
            .map(|e| e.id)
            .collect();

        let mut by_key: BTreeMap<String, Vec<Artifact>> = BTreeMap::new();
        let mut seen: HashSet<(&str, ArtifactId)> = HashSet::new();
        for event in &state.events {
            if !event.kind.is_output() || !node_executions.contains(&event.execution_id) {
                continue;
            }
            let Some(output_key) = event.output_key.as_deref() else {
                continue;
            };
            let Some(artifact) = state.artifacts.get(&event.artifact_id) else {
                continue;
            };
            if artifact.is_live() && seen.insert((output_key, artifact.id)) {
                by_key
                    .entry(output_key.to_string())
                    .or_default()
                    .push(artifact.clone());
            }
        }
        Ok(by_key)
    }

    async fn events_by_artifact_ids(
        &self,
        artifact_ids: &[ArtifactId],
    ) -> Result<Vec<Event>, StoreError> {
        let wanted: HashSet<&ArtifactId> = artifact_ids.iter().collect();
        let state = self.state.lock().await;
        Ok(state
            .events
            .iter()
            .filter(|e| wanted.contains(&e.artifact_id))
            .cloned()
            .collect())
    }

    async fn executions_by_ids(
        &self,
        execution_ids: &[ExecutionId],
    ) -> Result<Vec<Execution>, StoreError> {
        let state = self.state.lock().await;
        let mut seen = HashSet::new();
        Ok(execution_ids
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| state.executions.get(id).cloned())
            .collect())
    }

    async fn put_artifacts(&self, artifacts: &[Artifact]) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        for artifact in artifacts {
            state.upsert_artifact(artifact.clone());
        }
        state.artifact_batches += 1;
        Ok(())
    }
}
