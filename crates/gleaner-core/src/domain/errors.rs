//! Errors - エラー型と分類
//!
//! `GcError` は GC パスの中で発生するエラー、`ErrorKind` は運用上の分類です。
//! `ErrorKind::Wiring` 以外はノード境界で握りつぶされ、ログにだけ残ります。

use thiserror::Error;

use super::artifact::ValueKind;
use super::ids::ExecutionId;
use crate::ports::StoreError;

/// ErrorKind は GC エラーの分類
///
/// - Configuration: ポリシー設定の誤り（今回のパスはスキップ）
/// - Consistency: メタデータの不整合（存在しない execution を参照する event など）
/// - Store: メタデータストアの障害
/// - Wiring: 呼び出し側の誤用やタスクの異常終了（呼び出し元に伝播する唯一の分類）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Consistency,
    Store,
    Wiring,
}

#[derive(Debug, Error)]
pub enum GcError {
    #[error("garbage collection policy selects no retention rule")]
    UnsetPolicy,

    #[error("garbage collection policy selects more than one retention rule")]
    AmbiguousPolicy,

    #[error("unknown keep_order in grouping on property '{property_name}'")]
    UnknownKeepOrder { property_name: String },

    #[error(
        "values of property '{property_name}' must share one type: expected {expected}, found {found}"
    )]
    MixedPropertyTypes {
        property_name: String,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("event references missing execution {0}")]
    MissingExecution(ExecutionId),

    #[error("output key '{output_key}': {source}")]
    OutputKey {
        output_key: String,
        #[source]
        source: Box<GcError>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("node ids do not match for garbage collection: declared={declared} requested={requested}")]
    NodeMismatch { declared: String, requested: String },

    #[error("collection task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

impl GcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GcError::UnsetPolicy
            | GcError::AmbiguousPolicy
            | GcError::UnknownKeepOrder { .. }
            | GcError::MixedPropertyTypes { .. } => ErrorKind::Configuration,
            GcError::MissingExecution(_) => ErrorKind::Consistency,
            GcError::OutputKey { source, .. } => source.kind(),
            GcError::Store(_) => ErrorKind::Store,
            GcError::NodeMismatch { .. } | GcError::TaskFailed(_) => ErrorKind::Wiring,
        }
    }

    /// Attach the output key being evaluated.
    pub fn for_output_key(self, output_key: impl Into<String>) -> Self {
        GcError::OutputKey {
            output_key: output_key.into(),
            source: Box::new(self),
        }
    }
}
