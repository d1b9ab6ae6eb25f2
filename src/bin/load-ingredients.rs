use std::{error::Error, fs::File, path::PathBuf};

use clap::Parser;
use env_logger::Env;
use foodgram::actions::load_ingredients;
use log::info;
use sqlx::postgres::PgPoolOptions;

/// Loads the ingredient catalog from a CSV file with a
/// `name,measurement_unit` header.
#[derive(Parser)]
#[command(name = "load-ingredients")]
struct Args {
    /// CSV file to import
    #[arg(default_value = "data/ingredients.csv")]
    path: PathBuf,

    /// Database URL override
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let args = Args::parse();
    let file = File::open(&args.path)?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&args.database_url)
        .await?;

    let count = load_ingredients(file, &pool).await?;
    info!("Imported {count} ingredients from {}", args.path.display());

    Ok(())
}
