pub mod app;
pub mod config;
pub mod content;
pub mod counter;
pub mod errors;
pub mod handlers;
pub mod i18n;
pub mod models;
pub mod offline;
pub mod scheduler;
pub mod state;
pub mod storage;
pub mod ui;

pub use app::router;
pub use config::{Config, OfflineConfig};
pub use state::AppState;
