use std::sync::Arc;

use crate::config::Config;
use crate::engine::Clock;
use crate::services::session_service::SessionService;
use crate::services::test_catalog::TestCatalog;

pub mod scoring_service;
pub mod session_runner;
pub mod session_service;
pub mod test_catalog;

pub struct AppState {
    pub config: Config,
    pub sessions: SessionService,
}

impl AppState {
    pub fn new(config: Config, catalog: Arc<dyn TestCatalog>, clock: Arc<dyn Clock>) -> Self {
        let sessions = SessionService::new(catalog, clock, config.session.clone());
        Self { config, sessions }
    }
}
