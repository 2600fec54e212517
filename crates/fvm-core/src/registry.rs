//! Controller registry
//!
//! Maps account usernames to their controllers. The registry is owned and
//! passed around by the caller; there is no process-wide instance.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::controller::MeterController;

/// In-memory map from username to [`MeterController`]
#[derive(Debug, Default, Clone)]
pub struct ControllerRegistry {
    controllers: Arc<RwLock<HashMap<String, Arc<MeterController>>>>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a controller unless one already exists for its username
    ///
    /// Returns the controller that ends up registered.
    pub async fn get_or_insert(&self, controller: MeterController) -> Arc<MeterController> {
        let username = controller.username().to_string();

        let controllers = self.controllers.read().await;
        if let Some(existing) = controllers.get(&username) {
            return Arc::clone(existing);
        }
        drop(controllers);

        let mut controllers = self.controllers.write().await;
        Arc::clone(
            controllers
                .entry(username)
                .or_insert_with(|| Arc::new(controller)),
        )
    }

    /// Get the controller registered for a username
    pub async fn get(&self, username: &str) -> Option<Arc<MeterController>> {
        let controllers = self.controllers.read().await;
        controllers.get(username).cloned()
    }

    pub async fn contains(&self, username: &str) -> bool {
        let controllers = self.controllers.read().await;
        controllers.contains_key(username)
    }

    /// Remove a controller, e.g. when its account is reconfigured
    pub async fn remove(&self, username: &str) -> Option<Arc<MeterController>> {
        let mut controllers = self.controllers.write().await;
        controllers.remove(username)
    }

    pub async fn len(&self) -> usize {
        let controllers = self.controllers.read().await;
        controllers.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Registered usernames in sorted order
    pub async fn usernames(&self) -> Vec<String> {
        let controllers = self.controllers.read().await;
        let mut usernames: Vec<String> = controllers.keys().cloned().collect();
        usernames.sort();
        usernames
    }
}
