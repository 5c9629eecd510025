use crate::models::CellRef;
use crate::store::{StoreError, TableHandle, TableLocator, TabularStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error};

/// Spreadsheet id -> worksheet title -> rows.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Workbook {
    pub spreadsheets: BTreeMap<String, BTreeMap<String, Vec<Vec<String>>>>,
}

impl Workbook {
    fn sheet(&self, locator: &TableLocator) -> Option<&Vec<Vec<String>>> {
        self.spreadsheets
            .get(&locator.spreadsheet_id())
            .and_then(|book| book.get(&locator.worksheet))
    }

    fn sheet_mut(&mut self, locator: &TableLocator) -> Result<&mut Vec<Vec<String>>, StoreError> {
        self.spreadsheets
            .get_mut(&locator.spreadsheet_id())
            .and_then(|book| book.get_mut(&locator.worksheet))
            .ok_or_else(|| StoreError::WriteFailed(format!("worksheet '{}' does not exist", locator.worksheet)))
    }
}

/// Workbook held in process, optionally mirrored to a JSON file after
/// every mutation.
pub struct LocalStore {
    path: Option<PathBuf>,
    book: Mutex<Workbook>,
}

impl LocalStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            book: Mutex::new(Workbook::default()),
        }
    }

    /// Loads the workbook file; a missing file starts empty and an
    /// unreadable one is logged and replaced on the next write.
    pub async fn load(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|err| StoreError::Unavailable(err.to_string()))?;
            }
        }
        Ok(Self {
            path: Some(path.to_path_buf()),
            book: Mutex::new(load_workbook(path).await),
        })
    }

    /// Applies `change` to a copy of the workbook and keeps the copy only
    /// once it has been written.
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Workbook) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut book = self.book.lock().await;
        let mut next = book.clone();
        let out = change(&mut next)?;
        self.persist(&next).await?;
        *book = next;
        Ok(out)
    }

    async fn persist(&self, book: &Workbook) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let payload = serde_json::to_vec_pretty(book)
            .map_err(|err| StoreError::WriteFailed(err.to_string()))?;
        fs::write(path, payload)
            .await
            .map_err(|err| StoreError::WriteFailed(err.to_string()))?;
        debug!(path = %path.display(), "workbook persisted");
        Ok(())
    }
}

async fn load_workbook(path: &Path) -> Workbook {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(book) => book,
            Err(err) => {
                error!("failed to parse workbook file: {err}");
                Workbook::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Workbook::default(),
        Err(err) => {
            error!("failed to read workbook file: {err}");
            Workbook::default()
        }
    }
}

fn handle_for(locator: &TableLocator) -> TableHandle {
    TableHandle {
        locator: locator.clone(),
        sheet_id: None,
    }
}

#[async_trait]
impl TabularStore for LocalStore {
    async fn open(&self, locator: &TableLocator) -> Result<Option<TableHandle>, StoreError> {
        let book = self.book.lock().await;
        Ok(book.sheet(locator).map(|_| handle_for(locator)))
    }

    async fn read_raw(&self, handle: &TableHandle) -> Result<Vec<Vec<String>>, StoreError> {
        let book = self.book.lock().await;
        book.sheet(&handle.locator).cloned().ok_or_else(|| {
            StoreError::Unavailable(format!("worksheet '{}' does not exist", handle.worksheet()))
        })
    }

    async fn append_row(&self, handle: &TableHandle, row: &[String]) -> Result<(), StoreError> {
        self.mutate(|book| {
            book.sheet_mut(&handle.locator)?.push(row.to_vec());
            Ok(())
        })
        .await
    }

    async fn update_range(
        &self,
        handle: &TableHandle,
        start: CellRef,
        rows: &[Vec<String>],
    ) -> Result<(), StoreError> {
        if start.row.get() == 0 {
            return Err(StoreError::WriteFailed(format!("invalid start cell {start}")));
        }
        let first = start.row.get() as usize - 1;
        let column = start.column as usize;
        self.mutate(|book| {
            let sheet = book.sheet_mut(&handle.locator)?;
            for (offset, values) in rows.iter().enumerate() {
                let index = first + offset;
                if sheet.len() <= index {
                    sheet.resize(index + 1, Vec::new());
                }
                let target = &mut sheet[index];
                if target.len() < column + values.len() {
                    target.resize(column + values.len(), String::new());
                }
                target[column..column + values.len()].clone_from_slice(values);
            }
            Ok(())
        })
        .await
    }

    async fn delete_row(&self, handle: &TableHandle, physical_index: u32) -> Result<(), StoreError> {
        let index = physical_index as usize;
        self.mutate(|book| {
            let sheet = book.sheet_mut(&handle.locator)?;
            if index == 0 || index > sheet.len() {
                return Err(StoreError::RowNotFound(format!(
                    "row {physical_index} is outside '{}'",
                    handle.worksheet()
                )));
            }
            sheet.remove(index - 1);
            Ok(())
        })
        .await
    }

    async fn create_worksheet(
        &self,
        locator: &TableLocator,
        header: &[String],
    ) -> Result<TableHandle, StoreError> {
        self.mutate(|book| {
            let sheets = book.spreadsheets.entry(locator.spreadsheet_id()).or_default();
            if sheets.contains_key(&locator.worksheet) {
                return Err(StoreError::WriteFailed(format!(
                    "worksheet '{}' already exists",
                    locator.worksheet
                )));
            }
            sheets.insert(locator.worksheet.clone(), vec![header.to_vec()]);
            Ok(handle_for(locator))
        })
        .await
    }

    async fn clear(&self, handle: &TableHandle) -> Result<(), StoreError> {
        self.mutate(|book| {
            book.sheet_mut(&handle.locator)?.clear();
            Ok(())
        })
        .await
    }
}
