//! Report types returned by a GC pass.

use serde::{Deserialize, Serialize};

use crate::domain::{ArtifactId, ErrorKind};

/// What `PurgeExecutor` did with each confirmed candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeReport {
    /// Removed from storage (or already gone) and marked DELETED.
    pub deleted: Vec<ArtifactId>,
    /// External artifacts flipped to DELETED without touching storage.
    pub marked_external: Vec<ArtifactId>,
    /// Still present in storage; left LIVE for the next pass.
    pub failed: Vec<ArtifactId>,
}

impl PurgeReport {
    /// Number of records transitioned to DELETED.
    pub fn mutated(&self) -> usize {
        self.deleted.len() + self.marked_external.len()
    }
}

/// NodeGcOutcome は 1 ノード分の GC パスの結果
///
/// - NoPolicy: どの出力にもポリシーが無い（ストアに触れない）
/// - Collected: パスが完了した
/// - Aborted: ノード境界で握りつぶされたエラー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NodeGcOutcome {
    NoPolicy,
    Collected(PurgeReport),
    Aborted { kind: ErrorKind, message: String },
}

impl NodeGcOutcome {
    pub fn report(&self) -> Option<&PurgeReport> {
        match self {
            NodeGcOutcome::Collected(report) => Some(report),
            _ => None,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, NodeGcOutcome::Aborted { .. })
    }
}
