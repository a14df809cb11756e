//! Node identity and per-output configuration.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::policy::GarbageCollectionPolicy;

/// Identifies a node within a pipeline in the metadata store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeUid {
    pub pipeline_id: String,
    pub node_id: String,
}

impl NodeUid {
    pub fn new(pipeline_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self {
            pipeline_id: pipeline_id.into(),
            node_id: node_id.into(),
        }
    }
}

impl fmt::Display for NodeUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.pipeline_id, self.node_id)
    }
}

/// Output configuration of one output key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub garbage_collection_policy: Option<GarbageCollectionPolicy>,
}

/// Declared shape of a pipeline node, as far as garbage collection cares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,

    #[serde(default)]
    pub outputs: BTreeMap<String, OutputSpec>,
}

impl NodeSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn with_output(
        mut self,
        output_key: impl Into<String>,
        policy: Option<GarbageCollectionPolicy>,
    ) -> Self {
        self.outputs.insert(
            output_key.into(),
            OutputSpec {
                garbage_collection_policy: policy,
            },
        );
        self
    }

    /// Output keys that carry a garbage collection policy.
    pub fn gc_policies(&self) -> BTreeMap<&str, &GarbageCollectionPolicy> {
        self.outputs
            .iter()
            .filter_map(|(key, spec)| {
                spec.garbage_collection_policy
                    .as_ref()
                    .map(|policy| (key.as_str(), policy))
            })
            .collect()
    }
}
