//! Registry of live list coordinators.
//!
//! DESIGN
//! ======
//! Hosts that need to reach a list from elsewhere (a toolbar refreshing the
//! list it sits above, a bulk action reading its selection) look it up here.
//! The registry is an ordinary value owned by the application and passed
//! where it is needed, so two applications in one process never share lists.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::coordinator::ListCoordinator;

/// Application-scoped map of list handles. Cheap to clone.
#[derive(Clone, Default)]
pub struct ListRegistry {
    lists: Arc<RwLock<HashMap<Uuid, Arc<ListCoordinator>>>>,
}

impl ListRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a coordinator and return its handle id.
    pub async fn register(&self, coordinator: Arc<ListCoordinator>) -> Uuid {
        let id = Uuid::new_v4();
        debug!(%id, cache_key = coordinator.cache_key(), "list registered");
        self.lists.write().await.insert(id, coordinator);
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<ListCoordinator>> {
        self.lists.read().await.get(&id).cloned()
    }

    /// First registered list using `cache_key`, if any.
    pub async fn find(&self, cache_key: &str) -> Option<(Uuid, Arc<ListCoordinator>)> {
        self.lists
            .read()
            .await
            .iter()
            .find(|(_, list)| list.cache_key() == cache_key)
            .map(|(id, list)| (*id, list.clone()))
    }

    /// Remove a list; the coordinator lives on while other handles exist.
    pub async fn unregister(&self, id: Uuid) -> Option<Arc<ListCoordinator>> {
        let removed = self.lists.write().await.remove(&id);
        if removed.is_some() {
            debug!(%id, "list unregistered");
        }
        removed
    }

    /// Refresh every registered list concurrently. Returns how many ran.
    pub async fn refresh_all(&self) -> usize {
        let lists: Vec<Arc<ListCoordinator>> = self.lists.read().await.values().cloned().collect();
        join_all(lists.iter().map(|list| list.refresh())).await;
        lists.len()
    }

    pub async fn len(&self) -> usize {
        self.lists.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.lists.read().await.is_empty()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
