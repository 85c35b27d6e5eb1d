//! Database layer
//!
//! SQLite is the default backend; MySQL is selected through configuration.
//! Repositories work against the `DatabasePool` trait and never see which
//! backend they run on until they dispatch a query.
//!
//! ```ignore
//! use crowdfund::config::DatabaseConfig;
//! use crowdfund::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
