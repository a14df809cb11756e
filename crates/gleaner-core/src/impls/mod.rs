//! Impls - 実装（開発用・テスト用・ローカル）
//!
//! このモジュールには ports の実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryMetadataStore**: テスト・dry run 用のメタデータストア（Snapshot の読み書き）
//! - **InMemoryFilesystem**: 削除失敗を注入できるテスト用ファイルシステム
//! - **LocalFilesystem**: ローカルディスク（tokio::fs）
//! - **PassThroughPipelineGroupFilter**: 既定の PipelineGroupFilter
//!
//! # 本番用実装
//! 本番のメタデータストアやオブジェクトストレージは別クレートに配置します。

pub mod inmem_fs;
pub mod inmem_store;
pub mod local_fs;
pub mod pipeline_groups;

pub use self::inmem_fs::InMemoryFilesystem;
pub use self::inmem_store::{InMemoryMetadataStore, Snapshot};
pub use self::local_fs::LocalFilesystem;
pub use self::pipeline_groups::PassThroughPipelineGroupFilter;
