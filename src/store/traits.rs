use crate::model::{FieldData, Node, NodeRef, NodeUpdate, PersistedObject, RawMetadata};
use anyhow::Result;
use serde_json::{Map, Value};

/// Persists form field data against an item
#[async_trait::async_trait]
pub trait FormService: Send + Sync {
    /// Save `data` for the item identified by kind and id.
    /// Failures carry a message that callers classify by content.
    async fn save_form(&self, item_kind: &str, item_id: &str, data: &FieldData) -> Result<PersistedObject>;
}

/// Resolves a node reference string to a live node
#[async_trait::async_trait]
pub trait NodeResolver: Send + Sync {
    /// `Ok(None)` on a miss, including references that do not parse
    async fn find_node(&self, reference: &str) -> Result<Option<Node>>;
}

/// Writes changes produced by actions back to a node
#[async_trait::async_trait]
pub trait NodeWriter: Send + Sync {
    async fn update_node(&self, node_ref: &NodeRef, update: NodeUpdate) -> Result<()>;
}

/// A named, parameterized operation ready to be executed
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub name: String,
    pub parameters: Map<String, Value>,
}

impl Action {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parameters: Map::new(),
        }
    }
}

/// Creates and runs actions against nodes
#[async_trait::async_trait]
pub trait ActionService: Send + Sync {
    /// `None` when no executer is registered under `name`
    fn create_action(&self, name: &str) -> Option<Action>;

    async fn execute_action(
        &self,
        action: &Action,
        target: &Node,
        read_only: bool,
        new_transaction: bool,
    ) -> Result<()>;
}

/// Pulls raw metadata out of a document
#[async_trait::async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// `Ok(None)` when the document has nothing to extract from
    async fn extract(&self, node: &Node) -> Result<Option<RawMetadata>>;
}
