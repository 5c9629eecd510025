pub mod app;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod forms;
pub mod handlers;
pub mod models;
pub mod rows;
pub mod schema;
pub mod state;
pub mod store;
pub mod ui;

pub use app::router;
pub use config::AppConfig;
pub use rows::RowStore;
pub use state::AppState;
