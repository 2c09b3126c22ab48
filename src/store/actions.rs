use anyhow::{bail, Result};
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::model::Node;
use crate::store::traits::{Action, ActionService};

/// Transaction flags an action runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    pub read_only: bool,
    pub new_transaction: bool,
}

/// Implementation behind a named action
#[async_trait::async_trait]
pub trait ActionExecuter: Send + Sync {
    /// Whether the executer writes to the repository
    fn writes(&self) -> bool {
        true
    }

    async fn execute(&self, action: &Action, target: &Node, context: ExecutionContext) -> Result<()>;
}

/// Action service backed by a registry of executers
#[derive(Default)]
pub struct ActionRegistry {
    executers: RwLock<HashMap<String, Arc<dyn ActionExecuter>>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: &str, executer: Arc<dyn ActionExecuter>) {
        self.executers.write().insert(name.to_string(), executer);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.executers.read().contains_key(name)
    }
}

#[async_trait::async_trait]
impl ActionService for ActionRegistry {
    fn create_action(&self, name: &str) -> Option<Action> {
        if self.is_registered(name) {
            Some(Action::new(name))
        } else {
            None
        }
    }

    async fn execute_action(
        &self,
        action: &Action,
        target: &Node,
        read_only: bool,
        new_transaction: bool,
    ) -> Result<()> {
        let executer = self.executers.read().get(&action.name).cloned();
        let Some(executer) = executer else {
            bail!("No action executer registered for [{}]", action.name);
        };

        if read_only && executer.writes() {
            bail!(
                "Action [{}] writes to the repository and cannot run in a read-only transaction",
                action.name
            );
        }

        debug!(
            "Executing action [{}] on {} (read_only={}, new_transaction={})",
            action.name, target.node_ref, read_only, new_transaction
        );
        executer
            .execute(
                action,
                target,
                ExecutionContext {
                    read_only,
                    new_transaction,
                },
            )
            .await
    }
}
