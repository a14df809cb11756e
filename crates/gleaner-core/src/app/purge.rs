//! PurgeExecutor - 削除の確定（ストレージ削除 + メタデータ更新）
//!
//! # 状態遷移
//! - external: ストレージに触れず LIVE -> DELETED
//! - 削除成功、または失敗時点でパスが存在しない: LIVE -> DELETED
//! - 削除失敗でパスが残っている: LIVE のまま（次回のパスで再試行）
//!
//! 変更したレコードは最後に 1 回の `put_artifacts` でまとめて書き込みます。

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::report::PurgeReport;
use crate::domain::{Artifact, GcError};
use crate::ports::{Filesystem, FsError, MetadataStore};

pub struct PurgeExecutor {
    store: Arc<dyn MetadataStore>,
    filesystem: Arc<dyn Filesystem>,
}

/// Result of trying to purge one non-external artifact.
enum Removal {
    Removed,
    AlreadyGone,
    StillPresent(FsError),
}

impl PurgeExecutor {
    pub fn new(store: Arc<dyn MetadataStore>, filesystem: Arc<dyn Filesystem>) -> Self {
        Self { store, filesystem }
    }

    pub async fn purge(&self, artifacts: Vec<Artifact>) -> Result<PurgeReport, GcError> {
        let mut report = PurgeReport::default();
        let mut mutated: Vec<Artifact> = Vec::new();

        for mut artifact in artifacts {
            if !artifact.is_live() {
                debug!(artifact_id = %artifact.id, "already deleted, skipped");
                continue;
            }

            if artifact.is_external() {
                info!(artifact_id = %artifact.id, uri = %artifact.uri, "external artifact marked deleted");
                artifact.mark_deleted();
                report.marked_external.push(artifact.id);
                mutated.push(artifact);
                continue;
            }

            match self.remove(&artifact.uri).await {
                Removal::Removed => {
                    info!(artifact_id = %artifact.id, uri = %artifact.uri, "removed from storage");
                }
                Removal::AlreadyGone => {
                    info!(
                        artifact_id = %artifact.id,
                        uri = %artifact.uri,
                        "removal failed but the location is gone"
                    );
                }
                Removal::StillPresent(err) => {
                    warn!(artifact_id = %artifact.id, error = %err, "removal failed, artifact left live");
                    report.failed.push(artifact.id);
                    continue;
                }
            }
            artifact.mark_deleted();
            report.deleted.push(artifact.id);
            mutated.push(artifact);
        }

        if !mutated.is_empty() {
            self.store.put_artifacts(&mutated).await?;
            info!(count = mutated.len(), "artifacts marked deleted");
        }
        Ok(report)
    }

    async fn remove(&self, uri: &str) -> Removal {
        let result = match self.filesystem.is_dir(uri).await {
            Ok(true) => self.filesystem.remove_recursive(uri).await,
            Ok(false) => self.filesystem.remove(uri).await,
            Err(err) => Err(err),
        };
        let Err(err) = result else {
            return Removal::Removed;
        };

        match self.filesystem.exists(uri).await {
            Ok(false) => Removal::AlreadyGone,
            Ok(true) => Removal::StillPresent(err),
            Err(check_err) => {
                debug!(uri, error = %check_err, "exists check failed, assuming present");
                Removal::StillPresent(err)
            }
        }
    }
}
