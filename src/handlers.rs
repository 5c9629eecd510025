use crate::dashboard::{build_board, build_progress};
use crate::errors::AppError;
use crate::forms::{self, Fields};
use crate::models::{BoardResponse, ProgressResponse, Record, RowAddress, RowsResponse, StatusResponse};
use crate::schema::{daily, tasks};
use crate::state::AppState;
use crate::store::StoreError;
use crate::ui::{self, Notice};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, Redirect},
    Form, Json,
};
use chrono::Local;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub notice: Option<String>,
    pub error: Option<String>,
    pub edit: Option<String>,
}

impl PageQuery {
    fn notice(&self) -> Option<Notice<'_>> {
        match (&self.error, &self.notice) {
            (Some(error), _) => Some(Notice::Error(error)),
            (None, Some(notice)) => Some(Notice::Ok(notice)),
            (None, None) => None,
        }
    }
}

pub async fn index() -> Html<String> {
    Html(ui::render_index())
}

pub async fn daily_page(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Html<String> {
    let rows = state.daily.lock().await;
    let (snapshot, load_error) = match rows.fetch_all().await {
        Ok(snapshot) => (snapshot, None),
        Err(err) => {
            warn!("daily dashboard failed to load: {err}");
            (Vec::new(), Some(err.to_string()))
        }
    };
    let editing = query.edit.as_deref().and_then(|date| {
        snapshot
            .iter()
            .find(|row| row.record.cell(daily::DATE) == date)
            .map(|row| &row.record)
    });
    let notice = match &load_error {
        Some(message) => Some(Notice::Error(message)),
        None => query.notice(),
    };
    Html(ui::render_daily(
        rows.schema(),
        state.daily_layout,
        &snapshot,
        editing,
        query.edit.as_deref(),
        notice,
    ))
}

pub async fn daily_add(State(state): State<AppState>, Form(fields): Form<Fields>) -> Redirect {
    let outcome = async {
        let record = forms::daily_record(state.daily_layout, &fields)?;
        state.daily.lock().await.append(&record).await?;
        Ok::<_, StoreError>(format!("Entry for {} added", record.cell(daily::DATE)))
    }
    .await;
    back("/daily", outcome)
}

pub async fn daily_update(State(state): State<AppState>, Form(fields): Form<Fields>) -> Redirect {
    let outcome = async {
        let record = forms::daily_record(state.daily_layout, &fields)?;
        let date = record.cell(daily::DATE);
        state
            .daily
            .lock()
            .await
            .update_by_key(daily::DATE, &date, &record)
            .await?;
        Ok::<_, StoreError>(format!("Entry for {date} updated"))
    }
    .await;
    back("/daily", outcome)
}

pub async fn daily_delete(State(state): State<AppState>, Form(fields): Form<Fields>) -> Redirect {
    let date = fields.get("date").map(|d| d.trim().to_string()).unwrap_or_default();
    let outcome = async {
        state.daily.lock().await.delete_by_key(daily::DATE, &date).await?;
        Ok::<_, StoreError>(format!("Entry for {date} deleted"))
    }
    .await;
    back("/daily", outcome)
}

pub async fn tasks_page(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Html<String> {
    let rows = state.tasks.lock().await;
    let (snapshot, load_error) = match rows.fetch_all().await {
        Ok(snapshot) => (snapshot, None),
        Err(err) => {
            warn!("task board failed to load: {err}");
            (Vec::new(), Some(err.to_string()))
        }
    };
    let board = build_board(&snapshot, state.task_layout.status_column());
    let editing = query.edit.as_deref().and_then(|task| {
        snapshot
            .iter()
            .find(|row| row.record.cell(tasks::TASK) == task)
            .map(|row| &row.record)
    });
    let notice = match &load_error {
        Some(message) => Some(Notice::Error(message)),
        None => query.notice(),
    };
    Html(ui::render_tasks(
        state.task_layout,
        &snapshot,
        &board,
        editing,
        query.edit.as_deref(),
        notice,
    ))
}

pub async fn tasks_add(State(state): State<AppState>, Form(fields): Form<Fields>) -> Redirect {
    let outcome = async {
        let record = forms::task_record(state.task_layout, &fields, Local::now().date_naive())?;
        state.tasks.lock().await.append(&record).await?;
        Ok::<_, StoreError>(format!("Task '{}' added", record.cell(tasks::TASK)))
    }
    .await;
    back("/tasks", outcome)
}

pub async fn tasks_update(State(state): State<AppState>, Form(fields): Form<Fields>) -> Redirect {
    let outcome = async {
        let record = forms::task_record(state.task_layout, &fields, Local::now().date_naive())?;
        let key = match fields.get("key").map(|k| k.trim()) {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => record.cell(tasks::TASK),
        };
        state
            .tasks
            .lock()
            .await
            .update_by_key(tasks::TASK, &key, &record)
            .await?;
        Ok::<_, StoreError>(format!("Task '{key}' updated"))
    }
    .await;
    back("/tasks", outcome)
}

pub async fn tasks_delete(State(state): State<AppState>, Form(fields): Form<Fields>) -> Redirect {
    let task = fields.get("task").map(|t| t.trim().to_string()).unwrap_or_default();
    let outcome = async {
        state.tasks.lock().await.delete_by_key(tasks::TASK, &task).await?;
        Ok::<_, StoreError>(format!("Task '{task}' deleted"))
    }
    .await;
    back("/tasks", outcome)
}

/// Redirects to `path` carrying the outcome as a status message.
fn back(path: &str, outcome: Result<String, StoreError>) -> Redirect {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    match outcome {
        Ok(message) => {
            query.append_pair("notice", &message);
        }
        Err(err) => {
            warn!("{path}: {err}");
            query.append_pair("error", &err.to_string());
        }
    }
    Redirect::to(&format!("{path}?{}", query.finish()))
}

pub async fn list_rows(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> Result<Json<RowsResponse>, AppError> {
    let rows = state.table(&table)?.lock().await;
    let snapshot = rows.fetch_all().await?;
    Ok(Json(RowsResponse {
        table,
        header: rows.schema().header(),
        rows: snapshot,
    }))
}

pub async fn append_row(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Json(record): Json<Record>,
) -> Result<(StatusCode, Json<StatusResponse>), AppError> {
    if record.is_empty() {
        return Err(AppError::bad_request("record has no columns"));
    }
    state.table(&table)?.lock().await.append(&record).await?;
    Ok((StatusCode::CREATED, status("appended")))
}

pub async fn update_row(
    State(state): State<AppState>,
    Path((table, address)): Path<(String, u32)>,
    Json(record): Json<Record>,
) -> Result<Json<StatusResponse>, AppError> {
    state
        .table(&table)?
        .lock()
        .await
        .update_by_address(RowAddress(address), &record)
        .await?;
    Ok(status("updated"))
}

pub async fn delete_row(
    State(state): State<AppState>,
    Path((table, address)): Path<(String, u32)>,
) -> Result<Json<StatusResponse>, AppError> {
    state
        .table(&table)?
        .lock()
        .await
        .delete_by_address(RowAddress(address))
        .await?;
    Ok(status("deleted"))
}

pub async fn update_by_key(
    State(state): State<AppState>,
    Path((table, column, value)): Path<(String, String, String)>,
    Json(record): Json<Record>,
) -> Result<Json<StatusResponse>, AppError> {
    let address = state
        .table(&table)?
        .lock()
        .await
        .update_by_key(&column, &value, &record)
        .await?;
    Ok(status(&format!("updated row {address}")))
}

pub async fn delete_by_key(
    State(state): State<AppState>,
    Path((table, column, value)): Path<(String, String, String)>,
) -> Result<Json<StatusResponse>, AppError> {
    let address = state
        .table(&table)?
        .lock()
        .await
        .delete_by_key(&column, &value)
        .await?;
    Ok(status(&format!("deleted row {address}")))
}

pub async fn get_progress(State(state): State<AppState>) -> Result<Json<ProgressResponse>, AppError> {
    let snapshot = state.daily.lock().await.fetch_all().await?;
    Ok(Json(build_progress(&snapshot)))
}

pub async fn get_board(State(state): State<AppState>) -> Result<Json<BoardResponse>, AppError> {
    let snapshot = state.tasks.lock().await.fetch_all().await?;
    Ok(Json(build_board(&snapshot, state.task_layout.status_column())))
}

fn status(message: &str) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: message.to_string(),
    })
}
