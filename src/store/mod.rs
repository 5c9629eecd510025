//! Boundary to the remote tabular store.
//!
//! A worksheet is a grid of string cells whose first row is the header.
//! Row numbers used here are physical and 1-based, header included.

pub mod auth;
pub mod local;
pub mod sheets;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::CellRef;

pub use local::LocalStore;
pub use sheets::SheetsStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("row not found: {0}")]
    RowNotFound(String),

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("header mismatch in '{worksheet}': expected {expected:?}, found {found:?}")]
    SchemaMismatch {
        worksheet: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// Identifies a worksheet: a spreadsheet locator (URL or bare id) plus a
/// worksheet title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableLocator {
    pub spreadsheet: String,
    pub worksheet: String,
}

impl TableLocator {
    pub fn new(spreadsheet: impl Into<String>, worksheet: impl Into<String>) -> Self {
        Self {
            spreadsheet: spreadsheet.into(),
            worksheet: worksheet.into(),
        }
    }

    /// The spreadsheet id, extracted from `…/spreadsheets/d/<id>/…` URLs.
    pub fn spreadsheet_id(&self) -> String {
        spreadsheet_id(&self.spreadsheet)
    }
}

pub fn spreadsheet_id(locator: &str) -> String {
    if let Ok(parsed) = url::Url::parse(locator) {
        if let Some(segments) = parsed.path_segments() {
            let segments: Vec<&str> = segments.collect();
            if let Some(pos) = segments.iter().position(|s| *s == "d") {
                if let Some(id) = segments.get(pos + 1) {
                    return (*id).to_string();
                }
            }
        }
    }
    locator.trim().to_string()
}

/// An opened worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHandle {
    pub locator: TableLocator,
    /// Numeric worksheet id where the backend has one.
    pub sheet_id: Option<i64>,
}

impl TableHandle {
    pub fn worksheet(&self) -> &str {
        &self.locator.worksheet
    }
}

#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Resolves a worksheet, `Ok(None)` when it does not exist.
    async fn open(&self, locator: &TableLocator) -> Result<Option<TableHandle>, StoreError>;

    /// Every row as raw cells, header at index 0. Trailing empty cells
    /// may be omitted.
    async fn read_raw(&self, handle: &TableHandle) -> Result<Vec<Vec<String>>, StoreError>;

    /// Every data row keyed by the header.
    async fn read_all(
        &self,
        handle: &TableHandle,
    ) -> Result<Vec<Vec<(String, String)>>, StoreError> {
        let mut raw = self.read_raw(handle).await?.into_iter();
        let header = raw.next().unwrap_or_default();
        Ok(raw
            .map(|row| {
                header
                    .iter()
                    .enumerate()
                    .map(|(i, name)| (name.clone(), row.get(i).cloned().unwrap_or_default()))
                    .collect()
            })
            .collect())
    }

    /// Adds one row after the last non-empty row.
    async fn append_row(&self, handle: &TableHandle, row: &[String]) -> Result<(), StoreError>;

    /// Overwrites a contiguous block starting at `start`.
    async fn update_range(
        &self,
        handle: &TableHandle,
        start: CellRef,
        rows: &[Vec<String>],
    ) -> Result<(), StoreError>;

    /// Removes one physical row; rows below move up by one.
    async fn delete_row(&self, handle: &TableHandle, physical_index: u32) -> Result<(), StoreError>;

    async fn create_worksheet(
        &self,
        locator: &TableLocator,
        header: &[String],
    ) -> Result<TableHandle, StoreError>;

    /// Removes every cell of the worksheet.
    async fn clear(&self, handle: &TableHandle) -> Result<(), StoreError>;
}
