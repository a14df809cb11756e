//! Events: artifact <-> execution associations.

use serde::{Deserialize, Serialize};

use super::ids::{ArtifactId, ExecutionId};

/// Direction (and flavour) of an artifact/execution association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Input,
    Output,
    DeclaredInput,
    DeclaredOutput,
    InternalInput,
    InternalOutput,
    PendingOutput,
}

impl EventKind {
    /// The execution consumes the artifact.
    pub fn is_input(self) -> bool {
        matches!(
            self,
            EventKind::Input | EventKind::DeclaredInput | EventKind::InternalInput
        )
    }

    /// The execution published the artifact. Pending outputs are not published yet.
    pub fn is_output(self) -> bool {
        matches!(
            self,
            EventKind::Output | EventKind::DeclaredOutput | EventKind::InternalOutput
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub artifact_id: ArtifactId,
    pub execution_id: ExecutionId,
    pub kind: EventKind,

    /// Output key the artifact was published under (output events only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
}

impl Event {
    pub fn input(artifact_id: ArtifactId, execution_id: ExecutionId) -> Self {
        Self {
            artifact_id,
            execution_id,
            kind: EventKind::Input,
            output_key: None,
        }
    }

    pub fn output(
        artifact_id: ArtifactId,
        execution_id: ExecutionId,
        output_key: impl Into<String>,
    ) -> Self {
        Self {
            artifact_id,
            execution_id,
            kind: EventKind::Output,
            output_key: Some(output_key.into()),
        }
    }

    pub fn with_kind(mut self, kind: EventKind) -> Self {
        self.kind = kind;
        self
    }
}
