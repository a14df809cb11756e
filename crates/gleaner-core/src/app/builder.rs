//! CollectorBuilder - NodeGarbageCollector の構築とワイヤリング
//!
//! # 起動時検証（Fail-fast）
//! - MetadataStore と Filesystem は必須
//! - PipelineGroupFilter は省略可能（既定は PassThroughPipelineGroupFilter）

use std::sync::Arc;

use super::node_gc::NodeGarbageCollector;
use crate::impls::PassThroughPipelineGroupFilter;
use crate::ports::{Filesystem, MetadataStore, PipelineGroupFilter};

/// CollectorBuilder は NodeGarbageCollector を構築
///
/// # 使用例
/// ```ignore
/// let collector = CollectorBuilder::new()
///     .store(Arc::new(store))
///     .filesystem(Arc::new(LocalFilesystem::new()))
///     .build()?;
/// ```
#[derive(Default)]
pub struct CollectorBuilder {
    store: Option<Arc<dyn MetadataStore>>,
    filesystem: Option<Arc<dyn Filesystem>>,
    pipeline_groups: Option<Arc<dyn PipelineGroupFilter>>,
}

/// BuildError は構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing port: {0}. It must be set before build().")]
    MissingPort(&'static str),
}

impl CollectorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(mut self, store: Arc<dyn MetadataStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn filesystem(mut self, filesystem: Arc<dyn Filesystem>) -> Self {
        self.filesystem = Some(filesystem);
        self
    }

    pub fn pipeline_group_filter(mut self, filter: Arc<dyn PipelineGroupFilter>) -> Self {
        self.pipeline_groups = Some(filter);
        self
    }

    pub fn build(self) -> Result<NodeGarbageCollector, BuildError> {
        let store = self.store.ok_or(BuildError::MissingPort("metadata store"))?;
        let filesystem = self.filesystem.ok_or(BuildError::MissingPort("filesystem"))?;
        let pipeline_groups = self
            .pipeline_groups
            .unwrap_or_else(|| Arc::new(PassThroughPipelineGroupFilter::new()));
        Ok(NodeGarbageCollector::new(store, filesystem, pipeline_groups))
    }
}
