//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! registry-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `REGISTRY_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Migrations live in `crates/api/migrations/` and are embedded at compile
//! time:
//! ```text
//! migrations/
//! ├── 20250620000001_create_customers.sql
//! ├── 20250620000002_create_customer_history.sql
//! └── 20250621000001_create_customer_summary_view.sql
//! ```

use secrecy::ExposeSecret;
use sqlx::PgPool;

use super::{CommandError, database_url};

/// Run the registry database migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails,
/// or a migration fails to apply.
pub async fn run() -> Result<(), CommandError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to registry database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Running registry migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Registry migrations complete!");
    Ok(())
}
