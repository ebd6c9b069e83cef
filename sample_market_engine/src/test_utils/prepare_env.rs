use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::SqliteDatabase;

/// Creates a fresh database at `url` and brings its schema up to date.
pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    run_migrations(url).await;
}

/// A URL for a throw-away SQLite database in the system temp directory.
pub fn random_db_url() -> String {
    let path = std::env::temp_dir().join(format!("sample_market_test_{}.db", rand::random::<u64>()));
    format!("sqlite://{}", path.display())
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    db.close().await;
    info!("🚀️ Migrations complete");
}

pub async fn create_database(url: &str) {
    if let Err(e) = Sqlite::drop_database(url).await {
        trace!("Database {url} could not be dropped: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("Created Sqlite database {url}");
}

/// Connects to a brand-new, migrated database.
pub async fn new_test_db() -> SqliteDatabase {
    let url = random_db_url();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 10).await.expect("Error creating connection to database")
}
