use crate::models::{BoardResponse, ProgressResponse, RowView, TaskGroup, WeightPoint};
use crate::schema::{daily, tasks};
use std::collections::BTreeMap;

/// Weight series for the daily chart, oldest first.
pub fn build_progress(rows: &[RowView]) -> ProgressResponse {
    let mut sorted: Vec<&RowView> = rows.iter().collect();
    sorted.sort_by(|a, b| a.record.cell(daily::DATE).cmp(&b.record.cell(daily::DATE)));

    let points = sorted
        .iter()
        .filter_map(|row| {
            let target = row.record.get(daily::TARGET_WEIGHT)?.as_f64()?;
            let current = row.record.get(daily::CURRENT_WEIGHT)?.as_f64()?;
            Some(WeightPoint {
                date: row.record.cell(daily::DATE),
                target,
                current,
            })
        })
        .collect();

    ProgressResponse {
        entries: rows.len(),
        latest: sorted.last().map(|row| row.record.clone()),
        points,
    }
}

/// Pending and in-progress tasks grouped by category, each group ordered
/// by task type.
pub fn build_board(rows: &[RowView], status_column: &str) -> BoardResponse {
    let mut groups: BTreeMap<String, Vec<RowView>> = BTreeMap::new();
    for row in rows {
        let status = row.record.cell(status_column);
        if tasks::ACTIVE_STATUSES.contains(&status.as_str()) {
            groups
                .entry(row.record.cell(tasks::TASK_CATEGORY))
                .or_default()
                .push(row.clone());
        }
    }

    BoardResponse {
        groups: groups
            .into_iter()
            .map(|(category, mut rows)| {
                rows.sort_by(|a, b| {
                    a.record
                        .cell(tasks::TASK_TYPE)
                        .cmp(&b.record.cell(tasks::TASK_TYPE))
                });
                TaskGroup { category, rows }
            })
            .collect(),
    }
}
