use anyhow::Result;
use log::{debug, trace};
use std::sync::Arc;

use crate::logic::metadata::MetadataApplier;
use crate::model::Node;
use crate::store::actions::{ActionExecuter, ExecutionContext};
use crate::store::traits::{Action, MetadataExtractor, NodeWriter};

/// Executer behind the `extract-metadata` action
pub struct ExtractMetadataExecuter {
    extractor: Arc<dyn MetadataExtractor>,
    writer: Arc<dyn NodeWriter>,
    applier: MetadataApplier,
}

impl ExtractMetadataExecuter {
    pub fn new(
        extractor: Arc<dyn MetadataExtractor>,
        writer: Arc<dyn NodeWriter>,
        applier: MetadataApplier,
    ) -> Self {
        Self {
            extractor,
            writer,
            applier,
        }
    }
}

#[async_trait::async_trait]
impl ActionExecuter for ExtractMetadataExecuter {
    async fn execute(&self, _action: &Action, target: &Node, context: ExecutionContext) -> Result<()> {
        trace!("Update metadata on {} ({:?})", target.node_ref, context);

        if !target.is_document {
            debug!("{} is not a document; nothing to extract", target.node_ref);
            return Ok(());
        }

        let Some(metadata) = self.extractor.extract(target).await? else {
            debug!("No metadata found in {}", target.node_ref);
            return Ok(());
        };

        let update = self.applier.apply(target, metadata);
        if update.is_empty() {
            return Ok(());
        }

        self.writer.update_node(&target.node_ref, update).await?;
        trace!("Extraction of metadata from {} complete", target.node_ref);
        Ok(())
    }
}
