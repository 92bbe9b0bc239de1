use std::sync::Arc;

use crate::client::AnalysisClient;
use crate::config::Config;
use crate::poller::JobPoller;

pub mod analyze;
pub mod dashboard;
pub mod error;
pub mod health;
pub mod landing;
pub mod report;
pub mod results;
pub mod routes;

pub use error::{ApiError, ErrorResponse};

// ============================================
// Application State
// ============================================

#[derive(Clone)]
pub struct AppState {
    pub client: AnalysisClient,
    pub poller: JobPoller<AnalysisClient>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the analysis client into a poller using the configured
    /// polling policy.
    pub fn new(client: AnalysisClient, config: Config) -> Self {
        let poller = JobPoller::new(client.clone(), config.poll_policy());
        Self {
            client,
            poller,
            config: Arc::new(config),
        }
    }

    pub fn max_upload_files(&self) -> usize {
        self.config.max_upload_files
    }
}
