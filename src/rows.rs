//! Position-addressed access to one worksheet.
//!
//! The snapshot returned by [`RowStore::fetch_all`] is the arena and
//! [`RowAddress`] the index into it. Nothing here guards against another
//! writer: after any append or delete, addresses from an earlier snapshot
//! may point at a different row. Callers that act on user input should
//! resolve by key ([`RowStore::update_by_key`], [`RowStore::delete_by_key`])
//! at submit time rather than hold on to an address.

use crate::models::{CellRef, Record, RowAddress, RowView};
use crate::schema::TableSchema;
use crate::store::{StoreError, TableHandle, TableLocator, TabularStore};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Rows above the first record.
pub const HEADER_ROWS: u32 = 1;

/// What to do when the worksheet's first row is not the expected header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderPolicy {
    /// Refuse to start.
    #[default]
    Validate,
    /// Clear the worksheet and write the expected header.
    Reset,
}

pub struct RowStore {
    store: Arc<dyn TabularStore>,
    handle: TableHandle,
    schema: TableSchema,
}

impl RowStore {
    /// Opens the worksheet, creating it or writing its header when absent.
    pub async fn open(
        store: Arc<dyn TabularStore>,
        locator: TableLocator,
        schema: TableSchema,
        policy: HeaderPolicy,
    ) -> Result<Self, StoreError> {
        let expected = schema.header();
        let handle = match store.open(&locator).await? {
            Some(handle) => handle,
            None => {
                info!(table = schema.name, worksheet = %locator.worksheet, "creating worksheet");
                let handle = store.create_worksheet(&locator, &expected).await?;
                return Ok(Self { store, handle, schema });
            }
        };

        let raw = store.read_raw(&handle).await?;
        let found = trim_trailing(raw.first().cloned().unwrap_or_default());
        if found.is_empty() {
            info!(table = schema.name, worksheet = %locator.worksheet, "writing missing header");
            store
                .update_range(&handle, CellRef::row_start(RowAddress(1)), &[expected])
                .await?;
        } else if found != expected {
            match policy {
                HeaderPolicy::Validate => {
                    return Err(StoreError::SchemaMismatch {
                        worksheet: locator.worksheet.clone(),
                        expected,
                        found,
                    });
                }
                HeaderPolicy::Reset => {
                    warn!(table = schema.name, ?found, "header mismatch, resetting worksheet");
                    store.clear(&handle).await?;
                    store
                        .update_range(&handle, CellRef::row_start(RowAddress(1)), &[expected])
                        .await?;
                }
            }
        }

        Ok(Self { store, handle, schema })
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn handle(&self) -> &TableHandle {
        &self.handle
    }

    /// Current rows in physical order, header excluded. Not cached.
    pub async fn fetch_all(&self) -> Result<Vec<RowView>, StoreError> {
        let raw = self.store.read_raw(&self.handle).await?;
        Ok(raw
            .iter()
            .skip(HEADER_ROWS as usize)
            .enumerate()
            .map(|(index, cells)| RowView {
                address: RowAddress::from_index(index, HEADER_ROWS),
                record: self.schema.record_from_cells(cells),
            })
            .collect())
    }

    /// Adds a row after the last one. Duplicate keys are accepted.
    pub async fn append(&self, record: &Record) -> Result<(), StoreError> {
        let cells = self.to_cells(record, false)?;
        self.store.append_row(&self.handle, &cells).await?;
        info!(table = self.schema.name, "row appended");
        Ok(())
    }

    /// Replaces every column of the row at `address`.
    pub async fn update_by_address(
        &self,
        address: RowAddress,
        record: &Record,
    ) -> Result<(), StoreError> {
        let cells = self.to_cells(record, true)?;
        self.check_address(address).await?;
        self.store
            .update_range(&self.handle, CellRef::row_start(address), &[cells])
            .await?;
        info!(table = self.schema.name, %address, "row updated");
        Ok(())
    }

    /// Removes the row at `address`; later rows move up by one. Calling
    /// this twice with the same address removes two different rows.
    pub async fn delete_by_address(&self, address: RowAddress) -> Result<(), StoreError> {
        self.check_address(address).await?;
        self.store.delete_row(&self.handle, address.get()).await?;
        info!(table = self.schema.name, %address, "row deleted");
        Ok(())
    }

    /// Updates the first row whose `column` equals `value` exactly.
    pub async fn update_by_key(
        &self,
        column: &str,
        value: &str,
        record: &Record,
    ) -> Result<RowAddress, StoreError> {
        let cells = self.to_cells(record, true)?;
        let address = self.resolve_key(column, value).await?;
        self.store
            .update_range(&self.handle, CellRef::row_start(address), &[cells])
            .await?;
        info!(table = self.schema.name, column, value, %address, "row updated by key");
        Ok(address)
    }

    /// Deletes the first row whose `column` equals `value` exactly.
    pub async fn delete_by_key(&self, column: &str, value: &str) -> Result<RowAddress, StoreError> {
        let address = self.resolve_key(column, value).await?;
        self.store.delete_row(&self.handle, address.get()).await?;
        info!(table = self.schema.name, column, value, %address, "row deleted by key");
        Ok(address)
    }

    fn key_index(&self, column: &str) -> Result<usize, StoreError> {
        self.schema
            .index_of(column)
            .ok_or_else(|| StoreError::InvalidRecord(format!("unknown column '{column}'")))
    }

    async fn resolve_key(&self, column: &str, value: &str) -> Result<RowAddress, StoreError> {
        let index = self.key_index(column)?;
        let raw = self.store.read_raw(&self.handle).await?;
        let found = raw
            .iter()
            .skip(HEADER_ROWS as usize)
            .position(|cells| cells.get(index).map(String::as_str).unwrap_or("") == value);
        match found {
            Some(position) => {
                let address = RowAddress::from_index(position, HEADER_ROWS);
                debug!(table = self.schema.name, column, value, %address, "key resolved");
                Ok(address)
            }
            None => Err(StoreError::RowNotFound(format!("no row with {column} = '{value}'"))),
        }
    }

    async fn check_address(&self, address: RowAddress) -> Result<(), StoreError> {
        let raw = self.store.read_raw(&self.handle).await?;
        let rows = raw.len().saturating_sub(HEADER_ROWS as usize);
        match address.table_index(HEADER_ROWS) {
            Some(index) if index < rows => Ok(()),
            _ => Err(StoreError::RowNotFound(format!(
                "address {address} is outside '{}' ({rows} rows)",
                self.handle.worksheet()
            ))),
        }
    }

    /// Lays a record out in header order. Columns may only be left out as
    /// a trailing run; `full_width` pads that run with empty cells.
    fn to_cells(&self, record: &Record, full_width: bool) -> Result<Vec<String>, StoreError> {
        if let Some(unknown) = record.columns().find(|c| !self.schema.has_column(c)) {
            return Err(StoreError::InvalidRecord(format!("unknown column '{unknown}'")));
        }

        let mut cells = Vec::with_capacity(self.schema.columns.len());
        let mut first_missing: Option<&str> = None;
        for column in &self.schema.columns {
            match (record.get(column.name), first_missing) {
                (Some(_), Some(missing)) => {
                    return Err(StoreError::InvalidRecord(format!(
                        "column '{missing}' is missing but '{}' is present",
                        column.name
                    )));
                }
                (Some(value), None) => cells.push(value.to_cell()),
                (None, _) => {
                    first_missing.get_or_insert(column.name);
                }
            }
        }
        if full_width {
            cells.resize(self.schema.columns.len(), String::new());
        }
        Ok(cells)
    }
}

fn trim_trailing(mut cells: Vec<String>) -> Vec<String> {
    while cells.last().is_some_and(|c| c.trim().is_empty()) {
        cells.pop();
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellValue;
    use crate::schema::{DailyLayout, TaskLayout};
    use crate::store::LocalStore;
    use async_trait::async_trait;

    fn locator() -> TableLocator {
        TableLocator::new("book", "Sheet1")
    }

    async fn daily_store() -> (Arc<LocalStore>, RowStore) {
        let local = Arc::new(LocalStore::in_memory());
        let rows = RowStore::open(
            local.clone(),
            locator(),
            DailyLayout::Detailed.schema(),
            HeaderPolicy::Validate,
        )
        .await
        .unwrap();
        (local, rows)
    }

    async fn simple_store() -> RowStore {
        RowStore::open(
            Arc::new(LocalStore::in_memory()),
            locator(),
            DailyLayout::Simple.schema(),
            HeaderPolicy::Validate,
        )
        .await
        .unwrap()
    }

    fn entry(date: &str, steps: i64) -> Record {
        Record::new()
            .with("DATE", date)
            .with("TARGET_WEIGHT", 70i64)
            .with("CURRENT_WEIGHT", 72i64)
            .with("STEPS", steps)
            .with("YOGA", true)
            .with("BREATHING", false)
            .with("BLOOD_PRESSURE", "120/80")
            .with("FASTING_SUGAR", "95")
            .with("MOOD_JOURNAL", "ok")
            .with("COMMENTS", "")
    }

    fn note(date: &str, value: &str) -> Record {
        Record::new()
            .with("DATE", date)
            .with("PARAMETER", "weight")
            .with("VALUE", value)
            .with("NOTES", "")
    }

    #[tokio::test]
    async fn appended_rows_come_back_in_order_with_addresses() {
        let rows = simple_store().await;
        for (i, value) in ["71", "70.5", "70"].iter().enumerate() {
            rows.append(&note(&format!("2025-01-0{}", i + 1), value)).await.unwrap();
        }

        let snapshot = rows.fetch_all().await.unwrap();
        assert_eq!(snapshot.len(), 3);
        for (i, row) in snapshot.iter().enumerate() {
            assert_eq!(row.address, RowAddress(HEADER_ROWS + 1 + i as u32));
        }
        assert_eq!(snapshot[1].record.cell("VALUE"), "70.5");
    }

    #[tokio::test]
    async fn update_by_address_round_trips() {
        let rows = simple_store().await;
        rows.append(&note("2025-01-01", "71")).await.unwrap();
        rows.append(&note("2025-01-02", "70")).await.unwrap();

        let replacement = note("2025-01-02", "69.8");
        rows.update_by_address(RowAddress(3), &replacement).await.unwrap();

        let snapshot = rows.fetch_all().await.unwrap();
        assert_eq!(snapshot[1].record, replacement);
        assert_eq!(snapshot[0].record.cell("VALUE"), "71");
    }

    #[tokio::test]
    async fn update_overwrites_the_whole_row() {
        let rows = simple_store().await;
        rows.append(&note("2025-01-01", "71").with("NOTES", "heavy dinner")).await.unwrap();

        let partial = Record::new().with("DATE", "2025-01-01").with("PARAMETER", "steps");
        rows.update_by_address(RowAddress(2), &partial).await.unwrap();

        let record = &rows.fetch_all().await.unwrap()[0].record;
        assert_eq!(record.cell("VALUE"), "");
        assert_eq!(record.cell("NOTES"), "");
    }

    #[tokio::test]
    async fn delete_by_address_shifts_later_rows_up() {
        let rows = simple_store().await;
        for date in ["2025-01-01", "2025-01-02", "2025-01-03", "2025-01-04"] {
            rows.append(&note(date, "70")).await.unwrap();
        }

        rows.delete_by_address(RowAddress(3)).await.unwrap();

        let snapshot = rows.fetch_all().await.unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].record.cell("DATE"), "2025-01-01");
        assert_eq!(snapshot[1].address, RowAddress(3));
        assert_eq!(snapshot[1].record.cell("DATE"), "2025-01-03");
        assert_eq!(snapshot[2].address, RowAddress(4));
        assert_eq!(snapshot[2].record.cell("DATE"), "2025-01-04");
    }

    #[tokio::test]
    async fn stale_address_deletes_the_row_that_moved_in() {
        let rows = simple_store().await;
        for date in ["2025-01-01", "2025-01-02", "2025-01-03"] {
            rows.append(&note(date, "70")).await.unwrap();
        }

        rows.delete_by_address(RowAddress(2)).await.unwrap();
        rows.delete_by_address(RowAddress(2)).await.unwrap();

        let snapshot = rows.fetch_all().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].record.cell("DATE"), "2025-01-03");
    }

    #[tokio::test]
    async fn addresses_outside_the_table_are_not_found() {
        let rows = simple_store().await;
        rows.append(&note("2025-01-01", "70")).await.unwrap();

        for address in [RowAddress(0), RowAddress(1), RowAddress(3)] {
            assert!(matches!(
                rows.delete_by_address(address).await,
                Err(StoreError::RowNotFound(_))
            ));
            assert!(matches!(
                rows.update_by_address(address, &note("x", "1")).await,
                Err(StoreError::RowNotFound(_))
            ));
        }
        assert_eq!(rows.fetch_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_keys_resolve_to_the_lowest_address() {
        let rows = simple_store().await;
        rows.append(&note("X", "1")).await.unwrap();
        rows.append(&note("X", "2")).await.unwrap();

        let address = rows.update_by_key("DATE", "X", &note("X", "changed")).await.unwrap();
        assert_eq!(address, RowAddress(2));

        let snapshot = rows.fetch_all().await.unwrap();
        assert_eq!(snapshot[0].record.cell("VALUE"), "changed");
        assert_eq!(snapshot[1].record.cell("VALUE"), "2");
    }

    #[tokio::test]
    async fn key_matching_is_exact() {
        let rows = simple_store().await;
        rows.append(&note("2025-01-01", "1")).await.unwrap();

        let result = rows.update_by_key("DATE", " 2025-01-01", &note("x", "2")).await;
        assert!(matches!(result, Err(StoreError::RowNotFound(_))));
    }

    #[tokio::test]
    async fn delete_by_missing_key_leaves_table_unchanged() {
        let rows = simple_store().await;
        rows.append(&note("2025-01-01", "1")).await.unwrap();
        let before = rows.fetch_all().await.unwrap();

        let result = rows.delete_by_key("DATE", "2030-01-01").await;
        assert!(matches!(result, Err(StoreError::RowNotFound(_))));
        assert_eq!(rows.fetch_all().await.unwrap(), before);
    }

    #[tokio::test]
    async fn unknown_key_column_is_rejected() {
        let rows = simple_store().await;
        let result = rows.delete_by_key("NOPE", "x").await;
        assert!(matches!(result, Err(StoreError::InvalidRecord(_))));
    }

    #[tokio::test]
    async fn daily_entry_lifecycle() {
        let (_, rows) = daily_store().await;
        let input = entry("2025-01-01", 5000);
        rows.append(&input).await.unwrap();

        let snapshot = rows.fetch_all().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].address, RowAddress(2));
        assert_eq!(snapshot[0].record, input);

        rows.update_by_key("DATE", "2025-01-01", &entry("2025-01-01", 6000))
            .await
            .unwrap();
        let record = &rows.fetch_all().await.unwrap()[0].record;
        assert_eq!(record.get("STEPS"), Some(&CellValue::Number(6000.0)));
        assert_eq!(record.get("YOGA"), Some(&CellValue::Flag(true)));
        assert_eq!(record.cell("BLOOD_PRESSURE"), "120/80");
        assert_eq!(record.cell("FASTING_SUGAR"), "95");

        rows.delete_by_key("DATE", "2025-01-01").await.unwrap();
        assert!(rows.fetch_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn textual_entry_comes_back_equal() {
        let (_, rows) = daily_store().await;
        let input = Record::new()
            .with("DATE", "2025-01-01")
            .with("TARGET_WEIGHT", "70")
            .with("CURRENT_WEIGHT", 72i64)
            .with("STEPS", 5000i64)
            .with("YOGA", "Yes")
            .with("BREATHING", "No")
            .with("BLOOD_PRESSURE", "120/80")
            .with("FASTING_SUGAR", "95")
            .with("MOOD_JOURNAL", "ok")
            .with("COMMENTS", "");
        rows.append(&input).await.unwrap();

        let snapshot = rows.fetch_all().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].address, RowAddress(2));
        assert_eq!(snapshot[0].record, input);
        assert_eq!(snapshot[0].record.get("YOGA"), Some(&CellValue::text("Yes")));

        let updated = input.clone().with("STEPS", "6000");
        rows.update_by_key("DATE", "2025-01-01", &updated).await.unwrap();
        assert_eq!(rows.fetch_all().await.unwrap()[0].record, updated);
    }

    #[tokio::test]
    async fn trailing_columns_may_be_left_out_on_append() {
        let (local, rows) = daily_store().await;
        let short = Record::new().with("DATE", "2025-01-01").with("TARGET_WEIGHT", 70i64);
        rows.append(&short).await.unwrap();

        let raw = local.read_raw(rows.handle()).await.unwrap();
        assert_eq!(raw[1], vec!["2025-01-01".to_string(), "70".to_string()]);
        let record = &rows.fetch_all().await.unwrap()[0].record;
        assert_eq!(record.len(), 10);
        assert_eq!(record.cell("COMMENTS"), "");
    }

    #[tokio::test]
    async fn gaps_and_unknown_columns_are_invalid() {
        let (_, rows) = daily_store().await;
        let gap = Record::new().with("DATE", "2025-01-01").with("STEPS", 10i64);
        assert!(matches!(rows.append(&gap).await, Err(StoreError::InvalidRecord(_))));

        let unknown = entry("2025-01-01", 1).with("HEART_RATE", 60i64);
        assert!(matches!(rows.append(&unknown).await, Err(StoreError::InvalidRecord(_))));
        assert!(rows.fetch_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn open_writes_header_into_empty_worksheet() {
        let local = Arc::new(LocalStore::in_memory());
        let handle = local.create_worksheet(&locator(), &[]).await.unwrap();
        local.clear(&handle).await.unwrap();

        let schema = TaskLayout::StatusLast.schema();
        RowStore::open(local.clone(), locator(), schema.clone(), HeaderPolicy::Validate)
            .await
            .unwrap();
        assert_eq!(local.read_raw(&handle).await.unwrap(), vec![schema.header()]);
    }

    #[tokio::test]
    async fn open_rejects_other_layout_unless_reset() {
        let local = Arc::new(LocalStore::in_memory());
        let fourth = TaskLayout::StatusFourth.schema();
        let handle = local.create_worksheet(&locator(), &fourth.header()).await.unwrap();
        local
            .append_row(&handle, &["2025-01-01".to_string(), "old".to_string()])
            .await
            .unwrap();

        let last = TaskLayout::StatusLast.schema();
        let result = RowStore::open(local.clone(), locator(), last.clone(), HeaderPolicy::Validate).await;
        assert!(matches!(result, Err(StoreError::SchemaMismatch { .. })));

        let rows = RowStore::open(local.clone(), locator(), last.clone(), HeaderPolicy::Reset)
            .await
            .unwrap();
        assert!(rows.fetch_all().await.unwrap().is_empty());
        assert_eq!(local.read_raw(&handle).await.unwrap(), vec![last.header()]);
    }

    struct ReadOnly(LocalStore);

    #[async_trait]
    impl TabularStore for ReadOnly {
        async fn open(&self, locator: &TableLocator) -> Result<Option<TableHandle>, StoreError> {
            self.0.open(locator).await
        }

        async fn read_raw(&self, handle: &TableHandle) -> Result<Vec<Vec<String>>, StoreError> {
            self.0.read_raw(handle).await
        }

        async fn append_row(&self, _: &TableHandle, _: &[String]) -> Result<(), StoreError> {
            Err(StoreError::WriteFailed("permission denied".to_string()))
        }

        async fn update_range(&self, _: &TableHandle, _: CellRef, _: &[Vec<String>]) -> Result<(), StoreError> {
            Err(StoreError::WriteFailed("permission denied".to_string()))
        }

        async fn delete_row(&self, _: &TableHandle, _: u32) -> Result<(), StoreError> {
            Err(StoreError::WriteFailed("permission denied".to_string()))
        }

        async fn create_worksheet(&self, locator: &TableLocator, header: &[String]) -> Result<TableHandle, StoreError> {
            self.0.create_worksheet(locator, header).await
        }

        async fn clear(&self, _: &TableHandle) -> Result<(), StoreError> {
            Err(StoreError::WriteFailed("permission denied".to_string()))
        }
    }

    #[tokio::test]
    async fn rejected_writes_surface_as_write_failed() {
        let store = Arc::new(ReadOnly(LocalStore::in_memory()));
        let rows = RowStore::open(store, locator(), DailyLayout::Simple.schema(), HeaderPolicy::Validate)
            .await
            .unwrap();

        assert!(matches!(
            rows.append(&note("2025-01-01", "1")).await,
            Err(StoreError::WriteFailed(_))
        ));
    }
}
