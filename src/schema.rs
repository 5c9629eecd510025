use crate::models::{CellValue, Record};
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Text,
    Number,
    Flag,
    /// ISO `YYYY-MM-DD`, kept as text.
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn col(name: &'static str, kind: ColumnKind) -> ColumnDef {
    ColumnDef { name, kind }
}

/// Column layout of one worksheet. The first row of the worksheet must
/// match [`TableSchema::header`] exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn header(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.to_string()).collect()
    }

    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.index_of(column).is_some()
    }

    pub fn kind_of(&self, column: &str) -> ColumnKind {
        self.columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.kind)
            .unwrap_or(ColumnKind::Text)
    }

    /// Interprets a raw cell read from the store.
    pub fn coerce(&self, column: &str, raw: &str) -> CellValue {
        match self.kind_of(column) {
            ColumnKind::Number => match raw.trim().parse::<f64>() {
                Ok(number) if !raw.trim().is_empty() => CellValue::Number(number),
                _ => CellValue::text(raw),
            },
            ColumnKind::Flag => match raw.trim() {
                "Yes" => CellValue::Flag(true),
                "No" => CellValue::Flag(false),
                _ => CellValue::text(raw),
            },
            ColumnKind::Text | ColumnKind::Date => CellValue::text(raw),
        }
    }

    /// Builds a record from raw row cells; short rows are padded with
    /// empty cells, extra cells beyond the header are ignored.
    pub fn record_from_cells(&self, cells: &[String]) -> Record {
        let mut record = Record::new();
        for (index, column) in self.columns.iter().enumerate() {
            let raw = cells.get(index).map(String::as_str).unwrap_or("");
            record.insert(column.name, self.coerce(column.name, raw));
        }
        record
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DailyLayout {
    #[default]
    Detailed,
    Simple,
}

impl FromStr for DailyLayout {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "detailed" => Ok(Self::Detailed),
            "simple" => Ok(Self::Simple),
            other => Err(format!("unknown daily layout '{other}' (expected detailed or simple)")),
        }
    }
}

impl DailyLayout {
    pub fn schema(self) -> TableSchema {
        use ColumnKind::*;
        let columns = match self {
            DailyLayout::Detailed => vec![
                col(daily::DATE, Date),
                col(daily::TARGET_WEIGHT, Number),
                col(daily::CURRENT_WEIGHT, Number),
                col(daily::STEPS, Number),
                col(daily::YOGA, Flag),
                col(daily::BREATHING, Flag),
                col(daily::BLOOD_PRESSURE, Text),
                col(daily::FASTING_SUGAR, Text),
                col(daily::MOOD_JOURNAL, Text),
                col(daily::COMMENTS, Text),
            ],
            DailyLayout::Simple => vec![
                col(daily::DATE, Date),
                col(daily::PARAMETER, Text),
                col(daily::VALUE, Text),
                col(daily::NOTES, Text),
            ],
        };
        TableSchema { name: "daily", columns }
    }
}

/// Where the status column sits in the task sheet. Both layouts exist in
/// deployed sheets; the choice is a deployment setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskLayout {
    #[default]
    StatusLast,
    StatusFourth,
}

impl FromStr for TaskLayout {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "status-last" => Ok(Self::StatusLast),
            "status-fourth" => Ok(Self::StatusFourth),
            other => Err(format!(
                "unknown task layout '{other}' (expected status-last or status-fourth)"
            )),
        }
    }
}

impl TaskLayout {
    pub fn status_column(self) -> &'static str {
        match self {
            TaskLayout::StatusLast => tasks::STATUS,
            TaskLayout::StatusFourth => tasks::TASK_STATUS,
        }
    }

    pub fn schema(self) -> TableSchema {
        use ColumnKind::*;
        let columns = match self {
            TaskLayout::StatusLast => vec![
                col(tasks::ADD_DATE, Date),
                col(tasks::TASK, Text),
                col(tasks::TARGET_DATE, Date),
                col(tasks::TASK_CATEGORY, Text),
                col(tasks::TASK_TYPE, Text),
                col(tasks::STATUS, Text),
                col(tasks::COMMENTS, Text),
            ],
            TaskLayout::StatusFourth => vec![
                col(tasks::ADD_DATE, Date),
                col(tasks::TASK, Text),
                col(tasks::TARGET_DATE, Date),
                col(tasks::TASK_STATUS, Text),
                col(tasks::TASK_CATEGORY, Text),
                col(tasks::TASK_TYPE, Text),
                col(tasks::COMMENTS, Text),
            ],
        };
        TableSchema { name: "tasks", columns }
    }
}

pub mod daily {
    pub const DATE: &str = "DATE";
    pub const TARGET_WEIGHT: &str = "TARGET_WEIGHT";
    pub const CURRENT_WEIGHT: &str = "CURRENT_WEIGHT";
    pub const STEPS: &str = "STEPS";
    pub const YOGA: &str = "YOGA";
    pub const BREATHING: &str = "BREATHING";
    pub const BLOOD_PRESSURE: &str = "BLOOD_PRESSURE";
    pub const FASTING_SUGAR: &str = "FASTING_SUGAR";
    pub const MOOD_JOURNAL: &str = "MOOD_JOURNAL";
    pub const COMMENTS: &str = "COMMENTS";
    pub const PARAMETER: &str = "PARAMETER";
    pub const VALUE: &str = "VALUE";
    pub const NOTES: &str = "NOTES";
}

pub mod tasks {
    pub const ADD_DATE: &str = "ADD_DATE";
    pub const TASK: &str = "TASK";
    pub const TARGET_DATE: &str = "TARGET_DATE";
    pub const TASK_CATEGORY: &str = "TASK_CATEGORY";
    pub const TASK_TYPE: &str = "TASK_TYPE";
    pub const STATUS: &str = "STATUS";
    pub const TASK_STATUS: &str = "TASK_STATUS";
    pub const COMMENTS: &str = "COMMENTS";

    pub const STATUSES: [&str; 3] = ["Pending", "In Progress", "Done"];
    pub const ACTIVE_STATUSES: [&str; 2] = ["Pending", "In Progress"];
    pub const TYPES: [&str; 4] = ["Important and Urgent", "Important", "Urgent", "Optional"];
    pub const CATEGORIES: [&str; 2] = ["Personal", "Office"];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detailed_daily_header_has_ten_columns() {
        let header = DailyLayout::Detailed.schema().header();
        assert_eq!(header.len(), 10);
        assert_eq!(header[0], "DATE");
        assert_eq!(header[9], "COMMENTS");
    }

    #[test]
    fn task_layouts_differ_in_status_position() {
        let last = TaskLayout::StatusLast.schema();
        let fourth = TaskLayout::StatusFourth.schema();
        assert_eq!(last.index_of("STATUS"), Some(5));
        assert_eq!(fourth.index_of("TASK_STATUS"), Some(3));
        assert!(!last.has_column("TASK_STATUS"));
        assert_eq!("status-fourth".parse::<TaskLayout>(), Ok(TaskLayout::StatusFourth));
        assert!("status".parse::<TaskLayout>().is_err());
    }

    #[test]
    fn coerce_follows_column_kind() {
        let schema = DailyLayout::Detailed.schema();
        assert_eq!(schema.coerce("STEPS", "5000"), CellValue::Number(5000.0));
        assert_eq!(schema.coerce("STEPS", ""), CellValue::text(""));
        assert_eq!(schema.coerce("YOGA", "Yes"), CellValue::Flag(true));
        assert_eq!(schema.coerce("YOGA", "maybe"), CellValue::text("maybe"));
        assert_eq!(schema.coerce("FASTING_SUGAR", "95"), CellValue::text("95"));
        assert_eq!(schema.coerce("DATE", "2025-01-01"), CellValue::text("2025-01-01"));
    }

    #[test]
    fn short_rows_are_padded() {
        let schema = DailyLayout::Simple.schema();
        let record = schema.record_from_cells(&["2025-01-01".to_string(), "weight".to_string()]);
        assert_eq!(record.len(), 4);
        assert_eq!(record.cell("NOTES"), "");
    }
}
