use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post, put}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/daily", get(handlers::daily_page))
        .route("/daily/add", post(handlers::daily_add))
        .route("/daily/update", post(handlers::daily_update))
        .route("/daily/delete", post(handlers::daily_delete))
        .route("/tasks", get(handlers::tasks_page))
        .route("/tasks/add", post(handlers::tasks_add))
        .route("/tasks/update", post(handlers::tasks_update))
        .route("/tasks/delete", post(handlers::tasks_delete))
        .route("/api/progress", get(handlers::get_progress))
        .route("/api/board", get(handlers::get_board))
        .route(
            "/api/:table/rows",
            get(handlers::list_rows).post(handlers::append_row),
        )
        .route(
            "/api/:table/rows/:address",
            put(handlers::update_row).delete(handlers::delete_row),
        )
        .route(
            "/api/:table/keys/:column/:value",
            put(handlers::update_by_key).delete(handlers::delete_by_key),
        )
        .with_state(state)
}
