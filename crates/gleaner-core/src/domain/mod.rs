//! Domain model (IDs, records, policies, retention decisions, errors).
//!
//! ここにあるものは ports に依存しない純粋なモデルです（errors の StoreError 変換を除く）。
//! - ids, artifact, event, execution, node: メタデータストアのレコード
//! - policy: ノード出力ごとの GC ポリシー設定
//! - retention: ポリシー評価（副作用なし）

pub mod artifact;
pub mod errors;
pub mod event;
pub mod execution;
pub mod ids;
pub mod node;
pub mod policy;
pub mod retention;

pub use self::artifact::{Artifact, ArtifactState, IS_EXTERNAL_PROPERTY, PropertyValue, ValueKind};
pub use self::errors::{ErrorKind, GcError};
pub use self::event::{Event, EventKind};
pub use self::execution::{Execution, ExecutionState};
pub use self::ids::{ArtifactId, ExecutionId};
pub use self::node::{NodeSpec, NodeUid, OutputSpec};
pub use self::policy::{
    GarbageCollectionPolicy, Grouping, KeepMostRecentlyPublished, KeepOrder,
    KeepPropertyValueGroups, PipelineGroup, PipelineGroupUsage, Retention,
};
pub use self::retention::artifacts_to_collect;
