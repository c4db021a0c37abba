use std::sync::Arc;

use anyhow::Result;

use super::{
    config::Config,
    database::{RecordStore, init_store},
    mail::{Notifier, init_notifier},
};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn RecordStore>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub async fn new() -> Result<Arc<Self>> {
        let config = Config::load()?;

        let store = init_store(&config.db_path).await;
        let notifier = init_notifier(&config);

        Ok(Self::with_parts(config, store, notifier))
    }

    pub fn with_parts(
        config: Config,
        store: Arc<dyn RecordStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            store,
            notifier,
        })
    }
}
