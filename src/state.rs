use crate::config::{AppConfig, Backend};
use crate::errors::{AppError, StartupError};
use crate::rows::RowStore;
use crate::schema::{DailyLayout, TaskLayout};
use crate::store::auth::{CredentialChain, EnvSecretResolver, KeyFileResolver};
use crate::store::{LocalStore, SheetsStore, TabularStore};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// One lock per table: an interaction reads and writes its table
/// without another interaction in between.
#[derive(Clone)]
pub struct AppState {
    pub daily: Arc<Mutex<RowStore>>,
    pub tasks: Arc<Mutex<RowStore>>,
    pub daily_layout: DailyLayout,
    pub task_layout: TaskLayout,
}

impl AppState {
    pub fn new(daily: RowStore, tasks: RowStore, daily_layout: DailyLayout, task_layout: TaskLayout) -> Self {
        Self {
            daily: Arc::new(Mutex::new(daily)),
            tasks: Arc::new(Mutex::new(tasks)),
            daily_layout,
            task_layout,
        }
    }

    /// Opens the configured backend and both worksheets.
    pub async fn connect(config: &AppConfig) -> Result<Self, StartupError> {
        let store = open_backend(&config.backend).await?;
        let daily = RowStore::open(
            store.clone(),
            config.daily.clone(),
            config.daily_layout.schema(),
            config.header_policy,
        )
        .await?;
        let tasks = RowStore::open(
            store,
            config.tasks.clone(),
            config.task_layout.schema(),
            config.header_policy,
        )
        .await?;
        Ok(Self::new(daily, tasks, config.daily_layout, config.task_layout))
    }

    pub fn table(&self, name: &str) -> Result<&Arc<Mutex<RowStore>>, AppError> {
        match name {
            "daily" => Ok(&self.daily),
            "tasks" => Ok(&self.tasks),
            other => Err(AppError::not_found(format!("unknown table '{other}'"))),
        }
    }
}

pub async fn open_backend(backend: &Backend) -> Result<Arc<dyn TabularStore>, StartupError> {
    match backend {
        Backend::File(path) => {
            info!(path = %path.display(), "using workbook file");
            Ok(Arc::new(LocalStore::load(path).await?))
        }
        Backend::Memory => {
            info!("using in-memory workbook");
            Ok(Arc::new(LocalStore::in_memory()))
        }
        Backend::Sheets { secret_var, key_file } => {
            let key = CredentialChain::new()
                .with(EnvSecretResolver::from_env(secret_var.clone()))
                .with(KeyFileResolver::new(key_file.clone()))
                .resolve()
                .await?;
            Ok(Arc::new(SheetsStore::new(key)?))
        }
    }
}
