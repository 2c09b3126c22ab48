use anyhow::Result;
use log::{debug, error, info};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::model::{VersionCreated, EXTRACT_METADATA_ACTION};
use crate::store::traits::{ActionService, NodeResolver};

/// Runs `extract-metadata` on documents after a new version is created.
///
/// Content written by a check-in creates a version without going through the
/// form handler, so extraction is repeated here, in a transaction of its own,
/// once the version exists.
pub struct ExtractOnNewVersion {
    nodes: Arc<dyn NodeResolver>,
    actions: Arc<dyn ActionService>,
}

impl ExtractOnNewVersion {
    pub fn new(nodes: Arc<dyn NodeResolver>, actions: Arc<dyn ActionService>) -> Self {
        Self { nodes, actions }
    }

    pub async fn after_create_version(&self, event: &VersionCreated) -> Result<()> {
        let Some(action) = self.actions.create_action(EXTRACT_METADATA_ACTION) else {
            debug!("Action [{}] is not available", EXTRACT_METADATA_ACTION);
            return Ok(());
        };

        let Some(node) = self.nodes.find_node(&event.node_ref.to_string()).await? else {
            debug!("Versioned node {} no longer exists", event.node_ref);
            return Ok(());
        };
        if !node.is_document {
            return Ok(());
        }

        self.actions
            .execute_action(&action, &node, false, true)
            .await
    }

    /// Handle version events in the background until the sender side is dropped
    pub fn spawn(self, mut events: UnboundedReceiver<VersionCreated>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if let Err(e) = self.after_create_version(&event).await {
                    error!(
                        "Metadata extraction for version {} of {} failed: {}",
                        event.version_label, event.node_ref, e
                    );
                }
            }
            info!("Version listener stopped");
        })
    }
}
