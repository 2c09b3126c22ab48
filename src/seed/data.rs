use crate::model::{Node, NodeRef, ASPECT_VERSIONABLE, PROP_NAME, TYPE_CONTENT, TYPE_FOLDER};
use crate::store::MemoryStore;
use serde_json::json;

pub const COMPANY_HOME_ID: &str = "company-home";
pub const WELCOME_DOCUMENT_ID: &str = "welcome-txt";

/// Helper function to create a node with a name
fn create_system_node(id: &str, node_type: &str, is_document: bool, name: &str) -> Node {
    let mut node = Node::new(NodeRef::in_default_store(id), node_type, is_document);
    node.properties.insert(PROP_NAME.to_string(), json!(name));
    node
}

/// Seed a Company Home folder holding one versionable document
pub fn load_seed_data(store: &MemoryStore) {
    let home = create_system_node(COMPANY_HOME_ID, TYPE_FOLDER, false, "Company Home");

    let mut welcome = create_system_node(WELCOME_DOCUMENT_ID, TYPE_CONTENT, true, "welcome.txt");
    welcome.parent = Some(home.node_ref.clone());
    welcome.aspects.insert(ASPECT_VERSIONABLE.to_string());
    welcome.version_label = Some("1.0".to_string());
    welcome.content = Some("Title: Welcome\nAuthor: System\n\nWelcome to the repository.".to_string());

    store.insert_node(home);
    store.insert_node(welcome);
}
