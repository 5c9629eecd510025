use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A single scalar cell value.
///
/// Two values are equal when they write the same cell, so `Text("Yes")`
/// equals `Flag(true)` and `Text("70")` equals `Number(70.0)`.
#[derive(Debug, Clone)]
pub enum CellValue {
    Text(String),
    Number(f64),
    /// Stored as the `Yes`/`No` tokens.
    Flag(bool),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn empty() -> Self {
        Self::Text(String::new())
    }

    /// The string written to the store for this value.
    pub fn to_cell(&self) -> String {
        match self {
            CellValue::Text(text) => text.clone(),
            CellValue::Number(number) => number.to_string(),
            CellValue::Flag(true) => "Yes".to_string(),
            CellValue::Flag(false) => "No".to_string(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(number) => Some(*number),
            CellValue::Text(text) => text.trim().parse().ok(),
            CellValue::Flag(_) => None,
        }
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellValue::Text(a), CellValue::Text(b)) => a == b,
            (CellValue::Flag(a), CellValue::Flag(b)) => a == b,
            _ => self.to_cell() == other.to_cell(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_cell())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Text(text) => serializer.serialize_str(text),
            CellValue::Number(number) => match whole_number(*number) {
                Some(integer) => serializer.serialize_i64(integer),
                None => serializer.serialize_f64(*number),
            },
            CellValue::Flag(_) => serializer.serialize_str(&self.to_cell()),
        }
    }
}

fn whole_number(number: f64) -> Option<i64> {
    const LIMIT: f64 = 9_007_199_254_740_992.0;
    (number.fract() == 0.0 && number.abs() <= LIMIT).then_some(number as i64)
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(text) => Ok(CellValue::Text(text)),
            serde_json::Value::Bool(flag) => Ok(CellValue::Flag(flag)),
            serde_json::Value::Null => Ok(CellValue::empty()),
            serde_json::Value::Number(number) => number
                .as_f64()
                .map(CellValue::Number)
                .ok_or_else(|| serde::de::Error::custom("number out of range")),
            other => Err(serde::de::Error::custom(format!(
                "cell values must be scalars, got {other}"
            ))),
        }
    }
}

/// One logical row: column names mapped to values, in column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, CellValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Record::insert`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.insert(column, value);
        self
    }

    /// Sets a column, replacing an existing value in place.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Cell text for a column, empty when absent.
    pub fn cell(&self, column: &str) -> String {
        self.get(column).map(CellValue::to_cell).unwrap_or_default()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = Record;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of column names to scalar values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Record, A::Error> {
                let mut record = Record::new();
                while let Some((column, value)) = access.next_entry::<String, CellValue>()? {
                    record.insert(column, value);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

/// Physical 1-based row number in the store, header rows included.
///
/// An address taken from one snapshot is only meaningful until the next
/// insert or delete on the same table; rows below a deleted row move up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowAddress(pub u32);

impl RowAddress {
    /// Saturates at `u32::MAX` rather than wrapping.
    pub fn from_index(table_index: usize, header_rows: u32) -> Self {
        let index = u32::try_from(table_index).unwrap_or(u32::MAX);
        Self(index.saturating_add(header_rows).saturating_add(1))
    }

    /// Zero-based snapshot index, `None` for header rows and row 0.
    pub fn table_index(self, header_rows: u32) -> Option<usize> {
        self.0
            .checked_sub(header_rows + 1)
            .map(|index| index as usize)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RowAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A cell position in A1 notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    /// Zero-based column index.
    pub column: u32,
    pub row: RowAddress,
}

impl CellRef {
    pub fn row_start(row: RowAddress) -> Self {
        Self { column: 0, row }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.column), self.row)
    }
}

/// `0 -> A`, `25 -> Z`, `26 -> AA`.
pub fn column_letters(index: u32) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// A record together with the address it had in the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowView {
    pub address: RowAddress,
    pub record: Record,
}

#[derive(Debug, Serialize)]
pub struct RowsResponse {
    pub table: String,
    pub header: Vec<String>,
    pub rows: Vec<RowView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct WeightPoint {
    pub date: String,
    pub target: f64,
    pub current: f64,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub entries: usize,
    pub latest: Option<Record>,
    pub points: Vec<WeightPoint>,
}

#[derive(Debug, Serialize)]
pub struct TaskGroup {
    pub category: String,
    pub rows: Vec<RowView>,
}

#[derive(Debug, Serialize)]
pub struct BoardResponse {
    pub groups: Vec<TaskGroup>,
}
