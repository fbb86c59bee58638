use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::Config;
use crate::tree::{TreeError, WidgetTree};
use crate::view::{Services, View};
use crate::widget::WireNode;

use super::error::ServerError;

/// Produces the root view of a new session.
pub type RootFactory = Arc<dyn Fn() -> Arc<dyn View> + Send + Sync>;

/// Live sessions, one [`WidgetTree`] each.
pub struct SessionManager {
    sessions: RwLock<HashMap<Uuid, Arc<WidgetTree>>>,
    factory: RootFactory,
    config: Arc<Config>,
    services: Services,
}

impl SessionManager {
    pub fn new(config: Arc<Config>, factory: RootFactory, services: Services) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            factory,
            config,
            services,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start a session and render its first tree.
    pub async fn create(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(Arc<WidgetTree>, WireNode), ServerError> {
        let tree = Arc::new(WidgetTree::new(
            (self.factory)(),
            self.config.clone(),
            self.services.clone(),
        ));
        let id = tree.session_id();

        {
            let mut sessions = self.sessions.write();
            let limit = self.config.session.max_sessions;
            if sessions.len() >= limit {
                return Err(ServerError::TooManySessions { limit });
            }
            sessions.insert(id, tree.clone());
        }

        match tree.build(cancel).await {
            Ok(wire) => {
                tracing::info!(session = %id, "session created");
                Ok((tree, wire))
            }
            Err(err) => {
                self.sessions.write().remove(&id);
                tree.dispose().await;
                Err(err.into())
            }
        }
    }

    pub fn get(&self, id: &str) -> Result<Arc<WidgetTree>, ServerError> {
        Uuid::parse_str(id)
            .ok()
            .and_then(|uuid| self.sessions.read().get(&uuid).cloned())
            .ok_or_else(|| ServerError::SessionNotFound(id.to_string()))
    }

    /// End a session, running its cleanups.
    pub async fn remove(&self, id: &str) -> Result<(), ServerError> {
        let tree = self.get(id)?;
        self.sessions.write().remove(&tree.session_id());
        tree.dispose().await;
        tracing::info!(session = %tree.session_id(), "session closed");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.sessions.read().keys().copied().collect()
    }

    /// Rebuild every session. Sessions are reloaded one after another; a
    /// failure in one does not stop the others.
    pub async fn hot_reload_all(
        &self,
        cancel: &CancellationToken,
    ) -> Vec<(Uuid, Result<WireNode, TreeError>)> {
        let trees: Vec<Arc<WidgetTree>> = self.sessions.read().values().cloned().collect();
        let mut results = Vec::with_capacity(trees.len());
        for tree in trees {
            let result = tree.hot_reload(cancel).await;
            if let Err(err) = &result {
                tracing::warn!(session = %tree.session_id(), error = %err, "hot reload failed");
            }
            results.push((tree.session_id(), result));
        }
        results
    }

    /// Dispose every session.
    pub async fn dispose_all(&self) {
        let trees: Vec<Arc<WidgetTree>> = self.sessions.write().drain().map(|(_, t)| t).collect();
        for tree in &trees {
            tree.dispose().await;
        }
        if !trees.is_empty() {
            tracing::info!(count = trees.len(), "sessions disposed");
        }
    }
}
