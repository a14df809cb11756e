//! Execution records (one run of a pipeline node).

use serde::{Deserialize, Serialize};

use super::ids::ExecutionId;
use super::node::NodeUid;

/// Last known state of an execution.
///
/// State transitions:
/// - New -> Running -> Complete | Failed | Canceled
/// - New -> Cached (result reused from a previous run)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
    New,
    Running,
    Complete,
    Failed,
    Cached,
    Canceled,
}

impl ExecutionState {
    /// An active execution may still read its input artifacts.
    pub fn is_active(self) -> bool {
        matches!(self, ExecutionState::New | ExecutionState::Running)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    pub id: ExecutionId,
    pub node: NodeUid,
    pub state: ExecutionState,
}

impl Execution {
    pub fn new(node: NodeUid, state: ExecutionState) -> Self {
        Self {
            id: ExecutionId::generate(),
            node,
            state,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }
}
