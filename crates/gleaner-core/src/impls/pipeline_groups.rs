//! PassThroughPipelineGroupFilter - 既定の PipelineGroupFilter
//!
//! パイプライングループの使用状況は見ずに、候補をそのまま返します。

use async_trait::async_trait;

use crate::domain::{Artifact, GcError, PipelineGroupUsage};
use crate::ports::PipelineGroupFilter;

pub struct PassThroughPipelineGroupFilter;

impl PassThroughPipelineGroupFilter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PassThroughPipelineGroupFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PipelineGroupFilter for PassThroughPipelineGroupFilter {
    async fn retain_unused(
        &self,
        _usage: Option<&PipelineGroupUsage>,
        candidates: Vec<Artifact>,
    ) -> Result<Vec<Artifact>, GcError> {
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PipelineGroup, PipelineGroupUsage};
    use chrono::Utc;

    #[tokio::test]
    async fn test_pass_through_returns_candidates() {
        let filter = PassThroughPipelineGroupFilter::new();
        let candidates = vec![Artifact::new("/a", Utc::now()), Artifact::new("/b", Utc::now())];
        let usage = PipelineGroupUsage {
            pipeline_groups: vec![PipelineGroup {
                pipeline_ids: vec!["other".to_string()],
            }],
        };

        let kept = filter
            .retain_unused(Some(&usage), candidates.clone())
            .await
            .unwrap();
        assert_eq!(kept, candidates);
    }
}
