//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use lesson_core::controller::Controller;
use lesson_core::ports::{ContentGenerationService, ImageGenerationService};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// There is exactly one controller: the service runs for a single local
/// teacher, the way the browser page does. Handlers release the lock while
/// a model call is in flight.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Mutex<Controller>>,
    pub config: Arc<Config>,
    pub content_adapter: Arc<dyn ContentGenerationService>,
    pub image_adapter: Arc<dyn ImageGenerationService>,
}

impl AppState {
    /// Runs the configured splash interval in the background, then lets the
    /// controller leave `Initializing`.
    pub fn spawn_initialization(&self) -> tokio::task::JoinHandle<()> {
        let controller = self.controller.clone();
        let splash = self.config.splash_delay;
        tokio::spawn(async move {
            tokio::time::sleep(splash).await;
            let mut controller = controller.lock().await;
            controller.complete_initialization();
            info!(phase = ?controller.phase(), "Initialization complete");
        })
    }
}
