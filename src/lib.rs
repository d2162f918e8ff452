//! Labdesk core — the data/state layer of a clinical-records desktop app.
//!
//! Patient registration, exam catalog, attendance queue and clinical
//! record views, backed by a local command bridge to a native backend
//! (`bridge::BackendClient`). This crate holds the pure transforms, the
//! validation pipelines and the async view state; rendering and transport
//! belong to the app shell.

pub mod bridge;
pub mod catalog;
pub mod config;
pub mod models;
pub mod patients;
pub mod queue;
pub mod record;
pub mod state;
pub mod toast;
pub mod version;

use tracing_subscriber::EnvFilter;

pub use bridge::{BackendClient, InvokeError};
pub use state::AppState;

/// Initialize tracing for the host process.
///
/// Respects `RUST_LOG`; falls back to the crate default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
