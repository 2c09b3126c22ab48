use anyhow::{bail, Result};
use chrono::Utc;
use log::{debug, warn};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc::UnboundedSender;

use crate::model::{
    generate_id, FieldData, FieldValue, Node, NodeRef, NodeUpdate, PersistedObject, VersionCreated,
    CONTENT_FIELD, DESTINATION_KEY, PROP_NAME, TYPE_CONTENT,
};
use crate::store::traits::{FormService, NodeResolver, NodeWriter};

pub const DEFAULT_MAX_PROPERTY_LENGTH: usize = 1024;

/// Node repository held entirely in memory
#[derive(Debug)]
pub struct MemoryStore {
    nodes: RwLock<HashMap<NodeRef, Node>>,
    /// Types whose nodes count as documents
    document_types: RwLock<HashSet<String>>,
    max_property_length: usize,
    version_events: Option<UnboundedSender<VersionCreated>>,
}

/// Everything a form save will write, validated before the node is touched
#[derive(Debug, Default)]
struct PendingChanges {
    properties: Map<String, Value>,
    content: Option<String>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_max_property_length(DEFAULT_MAX_PROPERTY_LENGTH)
    }

    pub fn with_max_property_length(max_property_length: usize) -> Self {
        let mut document_types = HashSet::new();
        document_types.insert(TYPE_CONTENT.to_string());

        Self {
            nodes: RwLock::new(HashMap::new()),
            document_types: RwLock::new(document_types),
            max_property_length,
            version_events: None,
        }
    }

    /// Publish a [`VersionCreated`] event whenever content is written to a versionable node
    pub fn with_version_events(mut self, sender: UnboundedSender<VersionCreated>) -> Self {
        self.version_events = Some(sender);
        self
    }

    pub fn register_document_type(&self, node_type: &str) {
        self.document_types.write().insert(node_type.to_string());
    }

    pub fn is_document_type(&self, node_type: &str) -> bool {
        self.document_types.read().contains(node_type)
    }

    /// Insert or replace a node as-is
    pub fn insert_node(&self, node: Node) {
        self.nodes.write().insert(node.node_ref.clone(), node);
    }

    pub fn get_node(&self, node_ref: &NodeRef) -> Option<Node> {
        self.nodes.read().get(node_ref).cloned()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.read().len()
    }

    /// Save against an existing node
    fn persist_node(&self, item_id: &str, data: &FieldData) -> Result<(NodeRef, Option<VersionCreated>)> {
        let node_ref = node_ref_for_item(item_id)?;
        let changes = self.collect_changes(data)?;

        let mut nodes = self.nodes.write();
        let Some(node) = nodes.get_mut(&node_ref) else {
            bail!("FormNotFoundException: node [{}] not found", node_ref);
        };
        let event = apply_changes(node, changes);

        Ok((node_ref, event))
    }

    /// Create a new node of type `type_name`
    fn create_node(&self, type_name: &str, data: &FieldData) -> Result<(NodeRef, Option<VersionCreated>)> {
        if type_name.trim().is_empty() {
            bail!("FormNotFoundException: no type given for new node");
        }

        let parent = match data.get_field_data(DESTINATION_KEY).and_then(FieldValue::first) {
            Some(Value::String(destination)) => Some(self.resolve_destination(destination)?),
            Some(other) => bail!("FormNotFoundException: invalid destination {}", other),
            None => None,
        };
        let changes = self.collect_changes(data)?;

        let node_ref = NodeRef::in_default_store(&generate_id());
        let mut node = Node::new(node_ref.clone(), type_name, self.is_document_type(type_name));
        node.parent = parent;
        node.properties
            .insert(PROP_NAME.to_string(), Value::String(node_ref.id.clone()));
        let event = apply_changes(&mut node, changes);

        debug!("Created {} node {}", type_name, node_ref);
        self.nodes.write().insert(node_ref.clone(), node);

        Ok((node_ref, event))
    }

    fn resolve_destination(&self, destination: &str) -> Result<NodeRef> {
        let node_ref = node_ref_for_item(destination)?;
        match self.nodes.read().get(&node_ref) {
            Some(parent) if !parent.is_document => Ok(node_ref),
            Some(_) => bail!("FormNotFoundException: destination [{}] is not a container", node_ref),
            None => bail!("FormNotFoundException: destination [{}] not found", node_ref),
        }
    }

    fn collect_changes(&self, data: &FieldData) -> Result<PendingChanges> {
        let mut changes = PendingChanges::default();

        for (name, value) in data.iter() {
            if name == CONTENT_FIELD {
                changes.content = Some(content_text(value));
                continue;
            }
            if name == DESTINATION_KEY {
                continue;
            }

            match property_name(name) {
                Some(property) => {
                    let value = value.clone().into_json();
                    self.check_length(&property, &value)?;
                    changes.properties.insert(property, value);
                }
                None => debug!("Ignoring non-property field {}", name),
            }
        }

        Ok(changes)
    }

    fn check_length(&self, property: &str, value: &Value) -> Result<()> {
        let too_long = match value {
            Value::String(s) => s.chars().count() > self.max_property_length,
            Value::Array(items) => items.iter().any(|item| {
                item.as_str()
                    .map_or(false, |s| s.chars().count() > self.max_property_length)
            }),
            _ => false,
        };

        if too_long {
            bail!(
                "PropertyValueSizeIsMoreMaxLengthException: value of property [{}] exceeds maximum length of {}",
                property,
                self.max_property_length
            );
        }
        Ok(())
    }

    fn publish(&self, event: VersionCreated) {
        if let Some(sender) = &self.version_events {
            if sender.send(event).is_err() {
                warn!("Version listener has shut down; version event dropped");
            }
        }
    }
}

fn apply_changes(node: &mut Node, changes: PendingChanges) -> Option<VersionCreated> {
    node.properties.extend(changes.properties);
    node.modified_at = Utc::now();

    let content = changes.content?;
    node.content = Some(content);
    if !node.is_versionable() {
        return None;
    }

    let version_label = node.bump_version();
    Some(VersionCreated {
        node_ref: node.node_ref.clone(),
        version_label,
    })
}

/// Accepts `workspace://SpacesStore/id`, `workspace/SpacesStore/id` or a bare id
fn node_ref_for_item(item_id: &str) -> Result<NodeRef> {
    if item_id.contains("://") {
        return item_id
            .parse()
            .map_err(|e| anyhow::anyhow!("FormNotFoundException: {}", e));
    }

    let parts: Vec<&str> = item_id.splitn(3, '/').collect();
    match parts.as_slice() {
        [protocol, identifier, id] if !protocol.is_empty() && !identifier.is_empty() && !id.is_empty() => {
            Ok(NodeRef::new(protocol, identifier, id))
        }
        [id] if !id.is_empty() => Ok(NodeRef::in_default_store(id)),
        _ => bail!("FormNotFoundException: invalid node id [{}]", item_id),
    }
}

/// `prop_cm_title` names the property `cm:title`
fn property_name(field: &str) -> Option<String> {
    let (prefix, local) = field.strip_prefix("prop_")?.split_once('_')?;
    if prefix.is_empty() || local.is_empty() {
        return None;
    }
    Some(format!("{}:{}", prefix, local))
}

fn content_text(value: &FieldValue) -> String {
    match value.first() {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[async_trait::async_trait]
impl FormService for MemoryStore {
    async fn save_form(&self, item_kind: &str, item_id: &str, data: &FieldData) -> Result<PersistedObject> {
        let (node_ref, event) = match item_kind {
            "node" => self.persist_node(item_id, data)?,
            "type" => self.create_node(item_id, data)?,
            other => bail!("FormNotFoundException: no form processor for item kind [{}]", other),
        };

        if let Some(event) = event {
            self.publish(event);
        }

        Ok(PersistedObject::Reference(node_ref))
    }
}

#[async_trait::async_trait]
impl NodeResolver for MemoryStore {
    async fn find_node(&self, reference: &str) -> Result<Option<Node>> {
        let node_ref: NodeRef = match reference.parse() {
            Ok(node_ref) => node_ref,
            Err(e) => {
                debug!("{}", e);
                return Ok(None);
            }
        };
        Ok(self.get_node(&node_ref))
    }
}

#[async_trait::async_trait]
impl NodeWriter for MemoryStore {
    async fn update_node(&self, node_ref: &NodeRef, update: NodeUpdate) -> Result<()> {
        let mut nodes = self.nodes.write();
        let Some(node) = nodes.get_mut(node_ref) else {
            bail!("Node [{}] not found", node_ref);
        };

        node.properties.extend(update.properties);
        node.tags.extend(update.add_tags);
        node.modified_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ASPECT_VERSIONABLE, TYPE_FOLDER};
    use serde_json::json;
    use tokio::sync::mpsc;

    fn fields(pairs: &[(&str, Value)]) -> FieldData {
        let mut data = FieldData::new();
        for (key, value) in pairs {
            data.add_field_data(key, value.clone());
        }
        data
    }

    fn folder(store: &MemoryStore, id: &str) -> NodeRef {
        let node = Node::new(NodeRef::in_default_store(id), TYPE_FOLDER, false);
        let node_ref = node.node_ref.clone();
        store.insert_node(node);
        node_ref
    }

    #[tokio::test]
    async fn test_create_node_of_type() {
        let store = MemoryStore::new();
        let home = folder(&store, "home");

        let data = fields(&[
            ("prop_cm_name", json!("report.txt")),
            ("prop_cm_title", json!("Quarterly report")),
            ("alf_destination", json!(home.to_string())),
            ("prop_cm_content", json!("Title: Q3")),
        ]);
        let persisted = store.save_form("type", "cm:content", &data).await.unwrap();

        let node_ref = persisted.as_node_ref().cloned().unwrap();
        let node = store.get_node(&node_ref).unwrap();
        assert!(node.is_document);
        assert_eq!(node.parent, Some(home));
        assert_eq!(node.name(), Some("report.txt"));
        assert_eq!(node.properties["cm:title"], json!("Quarterly report"));
        assert_eq!(node.content.as_deref(), Some("Title: Q3"));
        assert!(!node.properties.contains_key("alf:destination"));
    }

    #[tokio::test]
    async fn test_update_existing_node() {
        let store = MemoryStore::new();
        store.insert_node(Node::new(NodeRef::in_default_store("abc"), TYPE_CONTENT, true));

        let data = fields(&[("prop_cm_description", json!("updated")), ("assoc_cm_x_added", json!("y"))]);
        for item_id in ["abc", "workspace://SpacesStore/abc", "workspace/SpacesStore/abc"] {
            let persisted = store.save_form("node", item_id, &data).await.unwrap();
            assert_eq!(persisted.to_string(), "workspace://SpacesStore/abc");
        }

        let node = store.get_node(&NodeRef::in_default_store("abc")).unwrap();
        assert_eq!(node.properties.len(), 1);
        assert_eq!(node.properties["cm:description"], json!("updated"));
    }

    #[tokio::test]
    async fn test_unknown_node_and_kind_are_form_not_found() {
        let store = MemoryStore::new();
        let data = FieldData::new();

        let err = store.save_form("node", "missing", &data).await.unwrap_err();
        assert!(err.to_string().contains("FormNotFoundException"));

        let err = store.save_form("task", "wf$1", &data).await.unwrap_err();
        assert!(err.to_string().contains("FormNotFoundException"));

        let err = store
            .save_form("type", "cm:content", &fields(&[("alf_destination", json!("workspace://SpacesStore/nowhere"))]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("FormNotFoundException"));
    }

    #[tokio::test]
    async fn test_oversized_property_is_rejected_without_writing() {
        let store = MemoryStore::with_max_property_length(5);
        store.insert_node(Node::new(NodeRef::in_default_store("abc"), TYPE_CONTENT, true));

        let data = fields(&[
            ("prop_cm_title", json!("ok")),
            ("prop_cm_description", json!("far too long")),
            ("prop_cm_content", json!("content is not a property and may be long")),
        ]);
        let err = store.save_form("node", "abc", &data).await.unwrap_err();
        assert!(err.to_string().contains("PropertyValueSizeIsMoreMaxLengthException"));

        let node = store.get_node(&NodeRef::in_default_store("abc")).unwrap();
        assert!(node.properties.is_empty());
        assert!(node.content.is_none());
    }

    #[tokio::test]
    async fn test_content_on_versionable_node_publishes_version() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let store = MemoryStore::new().with_version_events(tx);

        let mut node = Node::new(NodeRef::in_default_store("doc"), TYPE_CONTENT, true);
        node.aspects.insert(ASPECT_VERSIONABLE.to_string());
        node.version_label = Some("1.0".to_string());
        store.insert_node(node);

        store
            .save_form("node", "doc", &fields(&[("prop_cm_title", json!("no content"))]))
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());

        store
            .save_form("node", "doc", &fields(&[("prop_cm_content", json!("new text"))]))
            .await
            .unwrap();
        let event = rx.try_recv().unwrap();
        assert_eq!(event.node_ref, NodeRef::in_default_store("doc"));
        assert_eq!(event.version_label, "1.1");
    }

    #[tokio::test]
    async fn test_find_node_misses() {
        let store = MemoryStore::new();
        assert!(store.find_node("not a reference").await.unwrap().is_none());
        assert!(store.find_node("workspace://SpacesStore/none").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_node_adds_properties_and_tags() {
        let store = MemoryStore::new();
        let node_ref = folder(&store, "f");

        let mut update = NodeUpdate::default();
        update.properties.insert("cm:title".to_string(), json!("Folder"));
        update.add_tags.push("finance".to_string());
        store.update_node(&node_ref, update).await.unwrap();

        let node = store.get_node(&node_ref).unwrap();
        assert_eq!(node.properties["cm:title"], json!("Folder"));
        assert!(node.tags.contains("finance"));

        let missing = NodeRef::in_default_store("missing");
        assert!(store.update_node(&missing, NodeUpdate::default()).await.is_err());
    }

    #[test]
    fn test_property_names() {
        assert_eq!(property_name("prop_cm_title"), Some("cm:title".to_string()));
        assert_eq!(property_name("prop_exif_pixel_x"), Some("exif:pixel_x".to_string()));
        assert_eq!(property_name("prop_cm"), None);
        assert_eq!(property_name("assoc_cm_x_added"), None);
    }
}
