use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{LightboxError, Result};
use crate::config::Config;
use crate::mediator::PageMediator;
use crate::remote::{HttpRemoteSource, RemoteSource};
use crate::store::SqliteStore;

/// Wires the engine together: config, store, remote source, mediator.
/// Background tasks (scheduler, banner reducer, daemon) are spawned by
/// whoever needs them, on top of this context.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub remote: Arc<dyn RemoteSource>,
    pub mediator: Arc<PageMediator<SqliteStore>>,
}

impl AppContext {
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let config = Config::load().map_err(|e| LightboxError::Config(e.to_string()))?;
        Self::with_config(config, db_path)
    }

    pub fn with_config(config: Config, db_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        let remote: Arc<dyn RemoteSource> = Arc::new(HttpRemoteSource::new(
            &config.api.base_url,
            config.api.api_key.as_deref(),
            config.api.timeout(),
        )?);
        let mediator = Arc::new(PageMediator::new(store.clone(), remote.clone())?);

        Ok(Self {
            config,
            store,
            remote,
            mediator,
        })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| LightboxError::Config("Could not find data directory".into()))?;
        let lightbox_dir = data_dir.join("lightbox");
        std::fs::create_dir_all(&lightbox_dir)?;
        Ok(lightbox_dir.join("catalog.db"))
    }
}
