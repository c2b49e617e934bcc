pub mod config;
pub mod database;
pub mod error;
pub mod money;
pub mod payroll;
pub mod services;

pub use config::Config;
pub use error::PayrollError;
pub use services::{ClaimService, RunCoordinator};

use sqlx::SqlitePool;

/// Entry point wiring the services over one shared pool.
pub struct PayrollCore {
    pub runs: RunCoordinator,
    pub claims: ClaimService,
}

impl PayrollCore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            runs: RunCoordinator::new(pool.clone()),
            claims: ClaimService::new(pool),
        }
    }
}
