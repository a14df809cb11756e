//! gleaner-core
//!
//! Garbage collection of pipeline node output artifacts.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, artifact, event, execution, node, policy, retention, errors）
//! - **ports**: 抽象化レイヤー（MetadataStore, Filesystem, PipelineGroupFilter）
//! - **app**: アプリケーションロジック（NodeGarbageCollector, UsageFilter, PurgeExecutor, builder）
//! - **impls**: 実装（InMemoryMetadataStore, InMemoryFilesystem, LocalFilesystem など）
//!
//! # ログ
//! `tracing` でログを出します。subscriber のインストールは呼び出し側（CLI など）の責務です。

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;

pub use self::app::{CollectorBuilder, NodeGarbageCollector, NodeGcOutcome, PurgeReport};
pub use self::domain::{ErrorKind, GcError};
