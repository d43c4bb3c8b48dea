use std::sync::Arc;

use crate::{config::AppConfig, error::AppResult, services::lodgify::LodgifyClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub lodgify: Arc<LodgifyClient>,
}

impl AppState {
    pub fn build(config: AppConfig) -> AppResult<Self> {
        let lodgify = LodgifyClient::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            lodgify: Arc::new(lodgify),
        })
    }
}
