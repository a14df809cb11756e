//! Domain identifiers (strongly-typed IDs).
//!
//! ULID ベースの ID を Phantom type で型付けしています。
//! `ArtifactId` と `ExecutionId` は同じ表現ですが、混同するとコンパイルエラーになります。
//!
//! ## ULID の特性
//! - **時刻でソート可能**: timestamp が先頭にあるため、生成順序でソートできる
//! - **分散生成可能**: 調整なしで複数ノードで生成できる

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"artifact-", "execution-"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// Serialized as the bare ULID string; the prefix only appears in `Display`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    /// Fresh id for a record created outside a store (fixtures, snapshots).
    pub fn generate() -> Self {
        Self::from_ulid(Ulid::new())
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

// ========================================
// マーカー型の定義
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactMarker {}

impl IdMarker for ArtifactMarker {
    fn prefix() -> &'static str {
        "artifact-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExecutionMarker {}

impl IdMarker for ExecutionMarker {
    fn prefix() -> &'static str {
        "execution-"
    }
}

/// Identifier of an artifact record (unique within a metadata store).
pub type ArtifactId = Id<ArtifactMarker>;

/// Identifier of an execution record.
pub type ExecutionId = Id<ExecutionMarker>;
