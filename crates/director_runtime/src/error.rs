//! Error types for the Director runtime

use director_types::{GraphId, NodeId, ValueKind};

/// Errors returned by the public runtime API
#[derive(Debug, thiserror::Error)]
pub enum DirectorError {
    #[error("no node type {category}.{name} is registered")]
    UnknownNodeType { name: String, category: String },

    #[error("node {0} does not exist")]
    NodeNotFound(NodeId),

    #[error("graph {0} does not exist")]
    GraphNotFound(GraphId),

    #[error("node {0} is not a value node")]
    NotAValueNode(NodeId),

    #[error("node {node} has no link named {link:?}")]
    MissingLink { node: NodeId, link: String },

    #[error("link {link:?} does not allow multiple connections")]
    FanInNotAllowed { node: NodeId, link: String },

    #[error("link {link:?} expects {expected}, got {found}")]
    TypeMismatch {
        link: String,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("node {node} has no property named {property:?}")]
    MissingProperty { node: NodeId, property: String },

    #[error("property {property:?} is read-only")]
    ReadOnlyProperty { property: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
