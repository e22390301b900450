use std::sync::Arc;

use sqlx::PgPool;

use crate::config;
use crate::database::profiles::PgProfileStore;
use crate::database::{self, DatabaseError};
use crate::services::AdminService;

/// Per-process application state shared by the router and the CLI.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub admin: Arc<AdminService>,
}

impl AppState {
    pub fn init() -> Result<Self, DatabaseError> {
        let pool = database::connect_pool()?;
        let store = Arc::new(PgProfileStore::new(pool.clone()));
        let admin = Arc::new(AdminService::from_config(config::config(), store));

        Ok(Self { pool, admin })
    }
}
