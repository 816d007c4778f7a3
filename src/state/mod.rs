use std::sync::Arc;

use crate::{config::Config, error::AppError, store::Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, AppError> {
        let store = Store::open(&config.db_path)?;
        Ok(Self {
            store,
            config: Arc::new(config),
        })
    }

    pub fn with_store(store: Store, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}
