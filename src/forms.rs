//! Submitted form fields to records.

use crate::models::Record;
use crate::schema::{daily, tasks, DailyLayout, TaskLayout};
use crate::store::StoreError;
use chrono::NaiveDate;
use std::collections::HashMap;

pub type Fields = HashMap<String, String>;

const WEIGHT_RANGE: std::ops::RangeInclusive<f64> = 30.0..=200.0;

fn field<'a>(fields: &'a Fields, name: &str) -> &'a str {
    fields.get(name).map(|v| v.trim()).unwrap_or("")
}

fn invalid(message: impl Into<String>) -> StoreError {
    StoreError::InvalidRecord(message.into())
}

fn required<'a>(fields: &'a Fields, name: &str, label: &str) -> Result<&'a str, StoreError> {
    match field(fields, name) {
        "" => Err(invalid(format!("{label} is required"))),
        value => Ok(value),
    }
}

/// Validates `YYYY-MM-DD`; empty input falls back to `default`.
pub fn parse_date(value: &str, label: &str, default: Option<NaiveDate>) -> Result<String, StoreError> {
    if value.is_empty() {
        return default
            .map(|d| d.format("%Y-%m-%d").to_string())
            .ok_or_else(|| invalid(format!("{label} is required")));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| invalid(format!("{label} must be YYYY-MM-DD, got '{value}'")))
}

fn parse_weight(fields: &Fields, name: &str, label: &str) -> Result<f64, StoreError> {
    let raw = required(fields, name, label)?;
    let weight: f64 = raw
        .parse()
        .map_err(|_| invalid(format!("{label} must be a number, got '{raw}'")))?;
    if !WEIGHT_RANGE.contains(&weight) {
        return Err(invalid(format!(
            "{label} must be between {} and {}",
            WEIGHT_RANGE.start(),
            WEIGHT_RANGE.end()
        )));
    }
    Ok(weight)
}

fn checkbox(fields: &Fields, name: &str) -> bool {
    matches!(field(fields, name), "on" | "true" | "Yes" | "yes" | "1")
}

fn or_default<'a>(fields: &'a Fields, name: &str, default: &'a str) -> &'a str {
    match field(fields, name) {
        "" => default,
        value => value,
    }
}

pub fn daily_record(layout: DailyLayout, fields: &Fields) -> Result<Record, StoreError> {
    let date = parse_date(field(fields, "date"), "Date", None)?;
    match layout {
        DailyLayout::Detailed => {
            let target = parse_weight(fields, "target_weight", "Target weight")?;
            let current = parse_weight(fields, "current_weight", "Current weight")?;
            let steps_raw = or_default(fields, "steps", "0");
            let steps: u64 = steps_raw
                .parse()
                .map_err(|_| invalid(format!("Steps must be a whole number, got '{steps_raw}'")))?;

            Ok(Record::new()
                .with(daily::DATE, date)
                .with(daily::TARGET_WEIGHT, target)
                .with(daily::CURRENT_WEIGHT, current)
                .with(daily::STEPS, steps as f64)
                .with(daily::YOGA, checkbox(fields, "yoga"))
                .with(daily::BREATHING, checkbox(fields, "breathing"))
                .with(daily::BLOOD_PRESSURE, or_default(fields, "blood_pressure", "120/80"))
                .with(daily::FASTING_SUGAR, or_default(fields, "fasting_sugar", "95"))
                .with(daily::MOOD_JOURNAL, field(fields, "mood_journal"))
                .with(daily::COMMENTS, field(fields, "comments")))
        }
        DailyLayout::Simple => Ok(Record::new()
            .with(daily::DATE, date)
            .with(daily::PARAMETER, required(fields, "parameter", "Parameter")?)
            .with(daily::VALUE, field(fields, "value"))
            .with(daily::NOTES, field(fields, "notes"))),
    }
}

fn one_of<'a>(value: &'a str, allowed: &[&str], label: &str) -> Result<&'a str, StoreError> {
    if allowed.contains(&value) {
        Ok(value)
    } else {
        Err(invalid(format!("{label} must be one of {}", allowed.join(", "))))
    }
}

pub fn task_record(layout: TaskLayout, fields: &Fields, today: NaiveDate) -> Result<Record, StoreError> {
    let add_date = parse_date(field(fields, "add_date"), "Add date", Some(today))?;
    let task = required(fields, "task", "Task")?;
    let target_date = parse_date(field(fields, "target_date"), "Target date", Some(today))?;
    let category = or_default(fields, "category", tasks::CATEGORIES[0]);
    let task_type = one_of(or_default(fields, "task_type", tasks::TYPES[0]), &tasks::TYPES, "Task type")?;
    let status = one_of(or_default(fields, "status", tasks::STATUSES[0]), &tasks::STATUSES, "Status")?;
    let comments = field(fields, "comments");

    let record = match layout {
        TaskLayout::StatusLast => Record::new()
            .with(tasks::ADD_DATE, add_date)
            .with(tasks::TASK, task)
            .with(tasks::TARGET_DATE, target_date)
            .with(tasks::TASK_CATEGORY, category)
            .with(tasks::TASK_TYPE, task_type)
            .with(tasks::STATUS, status)
            .with(tasks::COMMENTS, comments),
        TaskLayout::StatusFourth => Record::new()
            .with(tasks::ADD_DATE, add_date)
            .with(tasks::TASK, task)
            .with(tasks::TARGET_DATE, target_date)
            .with(tasks::TASK_STATUS, status)
            .with(tasks::TASK_CATEGORY, category)
            .with(tasks::TASK_TYPE, task_type)
            .with(tasks::COMMENTS, comments),
    };
    Ok(record)
}
