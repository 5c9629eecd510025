use crate::rows::HeaderPolicy;
use crate::schema::{DailyLayout, TaskLayout};
use crate::store::TableLocator;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: {message}")]
    Invalid { var: &'static str, message: String },

    #[error("{0} is required for the sheets backend")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// JSON workbook on disk.
    File(PathBuf),
    Memory,
    Sheets { secret_var: String, key_file: PathBuf },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub backend: Backend,
    pub daily: TableLocator,
    pub tasks: TableLocator,
    pub daily_layout: DailyLayout,
    pub task_layout: TaskLayout,
    pub header_policy: HeaderPolicy,
}

const LOCAL_SPREADSHEET: &str = "local";

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(value) => value.parse::<u16>().map_err(|err| ConfigError::Invalid {
                var: "PORT",
                message: err.to_string(),
            })?,
            None => 8080,
        };

        let backend = match get("TRACKER_BACKEND").as_deref().unwrap_or("file") {
            "file" => Backend::File(PathBuf::from(
                get("TRACKER_DATA_PATH").unwrap_or_else(|| "data/tracker.json".to_string()),
            )),
            "memory" => Backend::Memory,
            "sheets" => Backend::Sheets {
                secret_var: get("TRACKER_SECRET_VAR")
                    .unwrap_or_else(|| "GCP_SERVICE_ACCOUNT".to_string()),
                key_file: PathBuf::from(
                    get("TRACKER_KEY_FILE")
                        .unwrap_or_else(|| "gspread_service_account.json".to_string()),
                ),
            },
            other => {
                return Err(ConfigError::Invalid {
                    var: "TRACKER_BACKEND",
                    message: format!("unknown backend '{other}' (expected file, memory or sheets)"),
                });
            }
        };

        let daily_sheet = match (&backend, get("TRACKER_DAILY_SHEET")) {
            (_, Some(sheet)) => sheet,
            (Backend::Sheets { .. }, None) => return Err(ConfigError::Missing("TRACKER_DAILY_SHEET")),
            (_, None) => LOCAL_SPREADSHEET.to_string(),
        };
        let task_sheet = get("TRACKER_TASK_SHEET").unwrap_or_else(|| daily_sheet.clone());

        let daily = TableLocator::new(
            daily_sheet,
            get("TRACKER_DAILY_WORKSHEET").unwrap_or_else(|| "Sheet1".to_string()),
        );
        let tasks = TableLocator::new(
            task_sheet,
            get("TRACKER_TASK_WORKSHEET").unwrap_or_else(|| "Task Tracker".to_string()),
        );

        let daily_layout = match get("TRACKER_DAILY_LAYOUT") {
            Some(value) => value.parse().map_err(|message| ConfigError::Invalid {
                var: "TRACKER_DAILY_LAYOUT",
                message,
            })?,
            None => DailyLayout::default(),
        };
        let task_layout = match get("TRACKER_TASK_LAYOUT") {
            Some(value) => value.parse().map_err(|message| ConfigError::Invalid {
                var: "TRACKER_TASK_LAYOUT",
                message,
            })?,
            None => TaskLayout::default(),
        };

        let header_policy = match get("TRACKER_RESET_HEADER").as_deref() {
            None | Some("false") | Some("0") => HeaderPolicy::Validate,
            Some("true") | Some("1") => HeaderPolicy::Reset,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "TRACKER_RESET_HEADER",
                    message: format!("expected true or false, got '{other}'"),
                });
            }
        };

        Ok(Self {
            port,
            backend,
            daily,
            tasks,
            daily_layout,
            task_layout,
            header_policy,
        })
    }
}
