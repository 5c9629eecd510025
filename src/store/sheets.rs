//! Google Sheets v4 backend.

use crate::models::CellRef;
use crate::store::auth::{AuthError, ServiceAccountKey, TokenSource};
use crate::store::{StoreError, TableHandle, TableLocator, TabularStore};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const NEW_SHEET_ROWS: u32 = 100;
const NEW_SHEET_COLS: u32 = 10;

pub struct SheetsStore {
    client: reqwest::Client,
    tokens: TokenSource,
    base: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<Value>,
}

/// Whether a failed call was a read or a mutation.
#[derive(Clone, Copy)]
enum Op {
    Read,
    Write,
}

impl Op {
    fn fail(self, message: String) -> StoreError {
        match self {
            Op::Read => StoreError::Unavailable(message),
            Op::Write => StoreError::WriteFailed(message),
        }
    }
}

/// `'Task Tracker'` with embedded quotes doubled.
pub fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

pub fn a1_range(title: &str, start: Option<CellRef>) -> String {
    match start {
        Some(cell) => format!("{}!{cell}", quote_title(title)),
        None => quote_title(title),
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl SheetsStore {
    pub fn new(key: ServiceAccountKey) -> Result<Self, AuthError> {
        let client = reqwest::Client::new();
        let tokens = TokenSource::new(key, client.clone())?;
        Ok(Self {
            client,
            tokens,
            base: API_BASE.to_string(),
        })
    }

    fn endpoint(&self, spreadsheet_id: &str, tail: &[&str], op: Op) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.base).map_err(|err| op.fail(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| op.fail(format!("cannot build url from {}", self.base)))?
            .push(spreadsheet_id)
            .extend(tail);
        Ok(url)
    }

    async fn request(&self, method: Method, url: Url) -> Result<RequestBuilder, StoreError> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    async fn send(&self, builder: RequestBuilder, op: Op) -> Result<Response, StoreError> {
        let response = builder.send().await.map_err(|err| op.fail(err.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(op.fail(format!("{status}: {body}")))
    }

    async fn batch_update(&self, spreadsheet_id: &str, requests: Value) -> Result<BatchUpdateResponse, StoreError> {
        let url = self.endpoint(&format!("{spreadsheet_id}:batchUpdate"), &[], Op::Write)?;
        let builder = self.request(Method::POST, url).await?;
        let response = self
            .send(builder.json(&json!({ "requests": requests })), Op::Write)
            .await?;
        response
            .json()
            .await
            .map_err(|err| StoreError::WriteFailed(err.to_string()))
    }
}

#[async_trait]
impl TabularStore for SheetsStore {
    async fn open(&self, locator: &TableLocator) -> Result<Option<TableHandle>, StoreError> {
        let mut url = self.endpoint(&locator.spreadsheet_id(), &[], Op::Read)?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties(sheetId,title)");
        let builder = self.request(Method::GET, url).await?;
        let meta: SpreadsheetMeta = self
            .send(builder, Op::Read)
            .await?
            .json()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;

        Ok(meta
            .sheets
            .into_iter()
            .find(|sheet| sheet.properties.title == locator.worksheet)
            .map(|sheet| TableHandle {
                locator: locator.clone(),
                sheet_id: Some(sheet.properties.sheet_id),
            }))
    }

    async fn read_raw(&self, handle: &TableHandle) -> Result<Vec<Vec<String>>, StoreError> {
        let range = a1_range(handle.worksheet(), None);
        let url = self.endpoint(&handle.locator.spreadsheet_id(), &["values", range.as_str()], Op::Read)?;
        let builder = self.request(Method::GET, url).await?;
        let values: ValueRange = self
            .send(builder, Op::Read)
            .await?
            .json()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        debug!(worksheet = handle.worksheet(), rows = values.values.len(), "sheet read");
        Ok(values
            .values
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }

    async fn append_row(&self, handle: &TableHandle, row: &[String]) -> Result<(), StoreError> {
        let range = format!("{}:append", a1_range(handle.worksheet(), None));
        let mut url = self.endpoint(&handle.locator.spreadsheet_id(), &["values", range.as_str()], Op::Write)?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        let builder = self.request(Method::POST, url).await?;
        self.send(builder.json(&json!({ "values": [row] })), Op::Write)
            .await?;
        Ok(())
    }

    async fn update_range(
        &self,
        handle: &TableHandle,
        start: CellRef,
        rows: &[Vec<String>],
    ) -> Result<(), StoreError> {
        let range = a1_range(handle.worksheet(), Some(start));
        let mut url = self.endpoint(&handle.locator.spreadsheet_id(), &["values", range.as_str()], Op::Write)?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let builder = self.request(Method::PUT, url).await?;
        let body = json!({ "range": range, "majorDimension": "ROWS", "values": rows });
        self.send(builder.json(&body), Op::Write).await?;
        Ok(())
    }

    async fn delete_row(&self, handle: &TableHandle, physical_index: u32) -> Result<(), StoreError> {
        let sheet_id = handle.sheet_id.ok_or_else(|| {
            StoreError::WriteFailed(format!("worksheet '{}' has no sheet id", handle.worksheet()))
        })?;
        if physical_index == 0 {
            return Err(StoreError::RowNotFound("row 0 does not exist".to_string()));
        }
        let requests = json!([{
            "deleteDimension": {
                "range": {
                    "sheetId": sheet_id,
                    "dimension": "ROWS",
                    "startIndex": physical_index - 1,
                    "endIndex": physical_index,
                }
            }
        }]);
        self.batch_update(&handle.locator.spreadsheet_id(), requests).await?;
        Ok(())
    }

    async fn create_worksheet(
        &self,
        locator: &TableLocator,
        header: &[String],
    ) -> Result<TableHandle, StoreError> {
        let requests = json!([{
            "addSheet": {
                "properties": {
                    "title": locator.worksheet,
                    "gridProperties": { "rowCount": NEW_SHEET_ROWS, "columnCount": NEW_SHEET_COLS },
                }
            }
        }]);
        let reply = self.batch_update(&locator.spreadsheet_id(), requests).await?;
        let sheet_id = reply
            .replies
            .first()
            .and_then(|r| r.pointer("/addSheet/properties/sheetId"))
            .and_then(Value::as_i64)
            .ok_or_else(|| StoreError::WriteFailed("addSheet reply carried no sheet id".to_string()))?;

        let handle = TableHandle {
            locator: locator.clone(),
            sheet_id: Some(sheet_id),
        };
        self.append_row(&handle, header).await?;
        Ok(handle)
    }

    async fn clear(&self, handle: &TableHandle) -> Result<(), StoreError> {
        let range = format!("{}:clear", a1_range(handle.worksheet(), None));
        let url = self.endpoint(&handle.locator.spreadsheet_id(), &["values", range.as_str()], Op::Write)?;
        let builder = self.request(Method::POST, url).await?;
        self.send(builder.json(&json!({})), Op::Write).await?;
        Ok(())
    }
}
