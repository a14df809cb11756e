//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせて GC パスを実装します。
//!
//! # 主要コンポーネント
//! - **CollectorBuilder**: NodeGarbageCollector の構築とワイヤリング
//! - **NodeGarbageCollector**: ノード単位の GC パス（唯一のエラー境界）
//! - **UsageFilter**: active な execution の入力になっている候補の除外
//! - **PurgeExecutor**: ストレージ削除と DELETED への遷移
//! - **report**: PurgeReport / NodeGcOutcome

pub mod builder;
pub mod node_gc;
pub mod purge;
pub mod report;
pub mod usage_filter;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, CollectorBuilder};
pub use self::node_gc::NodeGarbageCollector;
pub use self::purge::PurgeExecutor;
pub use self::report::{NodeGcOutcome, PurgeReport};
pub use self::usage_filter::UsageFilter;
