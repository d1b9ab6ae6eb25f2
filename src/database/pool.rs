use log::info;
use sqlx::{migrate::MigrateError, postgres::PgPoolOptions, Pool, Postgres};

use crate::config::Config;

pub async fn connect(config: &Config) -> Result<Pool<Postgres>, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    info!("Connected to database");
    Ok(pool)
}

pub async fn run_migrations(pool: &Pool<Postgres>) -> Result<(), MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;

    info!("Database migrations applied");
    Ok(())
}
