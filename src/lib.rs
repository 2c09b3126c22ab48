pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

pub use logic::{
    classify, decode_submission, durable_reference, ErrorKind, FormPostError, FormPostHandler,
    FormPostResponse,
};

// Export all model types
pub use model::*;

// Export store types
pub use store::{ActionRegistry, ActionService, FormService, MemoryStore, NodeResolver};

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::api::handlers::AppState;
use crate::config::AppConfig;
use crate::logic::{ExtractMetadataExecuter, ExtractOnNewVersion, HeaderMetadataExtractor, MetadataApplier};

/// Wire the in-memory repository, the action registry and the form handler together
pub fn build_state(config: &AppConfig) -> AppState {
    let mut store = MemoryStore::with_max_property_length(config.repository.max_property_length);
    let version_events = if config.extraction.extract_on_new_version {
        let (sender, receiver) = mpsc::unbounded_channel();
        store = store.with_version_events(sender);
        Some(receiver)
    } else {
        None
    };
    let store = Arc::new(store);

    if config.load_seed_data() {
        log::info!("Loading seed data...");
        seed::load_seed_data(&store);
    }

    let actions = Arc::new(ActionRegistry::new());
    actions.register(
        EXTRACT_METADATA_ACTION,
        Arc::new(ExtractMetadataExecuter::new(
            Arc::new(HeaderMetadataExtractor::new()),
            store.clone(),
            MetadataApplier::default(),
        )),
    );

    if let Some(receiver) = version_events {
        ExtractOnNewVersion::new(store.clone(), actions.clone()).spawn(receiver);
    }

    AppState {
        forms: Arc::new(FormPostHandler::new(store.clone(), store.clone(), actions)),
        nodes: store,
    }
}
