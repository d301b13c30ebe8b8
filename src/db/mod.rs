//! Database layer: pool, migrations, and the Postgres identity directory.

mod pool;
mod repositories;

pub use pool::{create_pool, run_migrations, DbPool};
pub use repositories::PgDirectory;
