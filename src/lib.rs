//! Family Moments server library
//!
//! Family groups, their membership workflow and the HTTP surface over them.
//! Exported for the binary and the integration tests.

pub mod auth;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod storage;

pub use config::Config;
pub use db::{create_pool, run_migrations};
pub use error::{AppError, Result};
pub use routes::router;
pub use services::FamilyService;
pub use storage::ImageStore;

use sqlx::SqlitePool;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub families: FamilyService,
    pub images: ImageStore,
}

impl AppState {
    /// Create a new AppState with the given pool and configuration
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        let families = FamilyService::new(pool.clone());
        let images = ImageStore::from_config(&config);
        Self {
            pool,
            config,
            families,
            images,
        }
    }
}
