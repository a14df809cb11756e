//! PipelineGroupFilter port - パイプライングループでの使用状況による除外
//!
//! ポリシー評価の後、UsageFilter の前に呼ばれる拡張ポイントです。
//! 既定の実装は何もしない（PassThroughPipelineGroupFilter）。

use async_trait::async_trait;

use crate::domain::{Artifact, GcError, PipelineGroupUsage};

/// PipelineGroupFilter は削除候補を絞り込む
///
/// # 契約
/// - 返す集合は `candidates` の部分集合（増やしてはいけない）
/// - 呼び出し側は候補外の artifact を捨てて warn ログを出す
#[async_trait]
pub trait PipelineGroupFilter: Send + Sync {
    async fn retain_unused(
        &self,
        usage: Option<&PipelineGroupUsage>,
        candidates: Vec<Artifact>,
    ) -> Result<Vec<Artifact>, GcError>;
}
