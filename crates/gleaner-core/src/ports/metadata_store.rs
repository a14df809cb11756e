//! MetadataStore port - artifact / event / execution の正本（source of truth）
//!
//! GC はこの trait 経由でのみストアに触れます。呼び出しはバッチ単位です
//! （候補集合ごとに events / executions を 1 回ずつ取得）。

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Artifact, ArtifactId, Event, Execution, ExecutionId, NodeUid};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("metadata store unavailable: {0}")]
    Unavailable(String),

    #[error("duplicate artifact id {0}")]
    DuplicateArtifact(ArtifactId),
}

/// MetadataStore は GC が使うメタデータ操作の最小集合
///
/// # 設計原則
/// - レコード単位の読み書きはアトミック（ストア側の保証）
/// - put_artifacts は upsert（状態遷移の永続化に使う）
/// - 存在しない id は結果から単に欠落する（エラーにしない）
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Live output artifacts of `node`, keyed by output key.
    async fn live_output_artifacts(
        &self,
        node: &NodeUid,
    ) -> Result<BTreeMap<String, Vec<Artifact>>, StoreError>;

    /// Every event that references one of `artifact_ids`.
    async fn events_by_artifact_ids(
        &self,
        artifact_ids: &[ArtifactId],
    ) -> Result<Vec<Event>, StoreError>;

    async fn executions_by_ids(
        &self,
        execution_ids: &[ExecutionId],
    ) -> Result<Vec<Execution>, StoreError>;

    /// Batch upsert.
    async fn put_artifacts(&self, artifacts: &[Artifact]) -> Result<(), StoreError>;
}
