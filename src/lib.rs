//! Lending lifecycle server
//!
//! Loans, reservations and penalties of a lending facility, exposed as a
//! REST JSON API. Catalog and member profiles are owned by other systems;
//! this crate only reads the rows it needs from them.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repository: repository::Repository,
    pub services: Arc<services::Services>,
}
