use crate::id::NodeId;
use serde::Serialize;

/// Why an instance could not be expanded.
///
/// Never returned to callers of `expand`. It is attached to the
/// `errorPlaceholder` node that stands in for the instance, so renderers can
/// label the error box and the UI can offer a fix.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ExpansionError {
    #[error("component `{component_id}` does not exist")]
    MissingComponent { component_id: NodeId },

    #[error("component `{component_id}` has no root node `{root_node_id}`")]
    MissingComponentRoot {
        component_id: NodeId,
        root_node_id: NodeId,
    },

    #[error("component `{component_id}` contains an instance of itself")]
    Cycle { component_id: NodeId },

    #[error("instance of `{component_id}` is nested deeper than {limit} levels")]
    DepthLimit { component_id: NodeId, limit: usize },
}

impl ExpansionError {
    /// The component the failing instance refers to.
    pub fn component_id(&self) -> NodeId {
        match self {
            ExpansionError::MissingComponent { component_id }
            | ExpansionError::MissingComponentRoot { component_id, .. }
            | ExpansionError::Cycle { component_id }
            | ExpansionError::DepthLimit { component_id, .. } => *component_id,
        }
    }
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Failure to read or write a document snapshot.
#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("snapshot decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}
