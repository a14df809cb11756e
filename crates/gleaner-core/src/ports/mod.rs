//! Ports - 抽象化レイヤー
//!
//! GC エンジンが依存する外部システム（メタデータストア、ファイルシステム、
//! パイプライングループ拡張）へのインターフェースです。
//! 実装は `impls`（開発用・テスト用・ローカル）か、別クレートに置きます。
//!
//! ストアのハンドルはグローバルに持たず、常に明示的に渡します。

pub mod filesystem;
pub mod metadata_store;
pub mod pipeline_groups;

pub use self::filesystem::{FsError, Filesystem};
pub use self::metadata_store::{MetadataStore, StoreError};
pub use self::pipeline_groups::PipelineGroupFilter;
