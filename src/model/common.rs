use uuid::Uuid;

pub type Id = String;

/// Body key that carries the client redirect instead of form data
pub const REDIRECT_KEY: &str = "alf_redirect";

/// Body key naming the parent folder for newly created nodes
pub const DESTINATION_KEY: &str = "alf_destination";

/// Form field holding the primary content of a document
pub const CONTENT_FIELD: &str = "prop_cm_content";

/// Action that extracts metadata from document content
pub const EXTRACT_METADATA_ACTION: &str = "extract-metadata";

/// Store used to qualify bare node ids
pub const DEFAULT_STORE: &str = "workspace://SpacesStore";

pub const TYPE_CONTENT: &str = "cm:content";
pub const TYPE_FOLDER: &str = "cm:folder";
pub const ASPECT_VERSIONABLE: &str = "cm:versionable";
pub const PROP_NAME: &str = "cm:name";
pub const PROP_TAGGABLE: &str = "cm:taggable";

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

/// Build a durable reference for a bare id in the default store
pub fn default_store_ref(id: &str) -> String {
    format!("{}/{}", DEFAULT_STORE, id)
}
