use serde_json::Value;
use std::fmt;

use crate::model::NodeRef;

/// What the form service hands back after a successful save
#[derive(Debug, Clone, PartialEq)]
pub enum PersistedObject {
    /// The save produced (or targeted) a node
    Reference(NodeRef),
    /// Any other representation of the persisted item
    Other(Value),
}

impl PersistedObject {
    pub fn as_node_ref(&self) -> Option<&NodeRef> {
        match self {
            PersistedObject::Reference(node_ref) => Some(node_ref),
            PersistedObject::Other(_) => None,
        }
    }
}

impl fmt::Display for PersistedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistedObject::Reference(node_ref) => write!(f, "{}", node_ref),
            PersistedObject::Other(Value::String(s)) => f.write_str(s),
            PersistedObject::Other(value) => write!(f, "{}", value),
        }
    }
}

impl From<NodeRef> for PersistedObject {
    fn from(node_ref: NodeRef) -> Self {
        PersistedObject::Reference(node_ref)
    }
}
