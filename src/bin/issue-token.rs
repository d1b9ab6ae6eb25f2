use std::error::Error;

use chrono::Duration;
use clap::Parser;
use env_logger::Env;
use foodgram::{
    actions::get_user_by_id, error::ApiError, jwt::generate_jwt_session, schema::Id,
    SESSION_LIFETIME_HOURS,
};
use log::info;
use sqlx::postgres::PgPoolOptions;

/// Prints a session token for an existing user.
#[derive(Parser)]
#[command(name = "issue-token")]
struct Args {
    /// Id of the user the token is issued for
    user_id: Id,

    /// Token lifetime in hours
    #[arg(long, default_value_t = SESSION_LIFETIME_HOURS)]
    hours: i64,

    /// Database URL override
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// HMAC key the server verifies tokens with
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("warn"));

    let args = Args::parse();
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&args.database_url)
        .await?;

    let user = get_user_by_id(&pool, args.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("No user exists with specified id"))?;

    let token = generate_jwt_session(
        &user,
        args.jwt_secret.as_bytes(),
        Duration::hours(args.hours),
    )?;

    info!("Issued token for {} valid for {} hours", user.username, args.hours);
    println!("{token}");

    Ok(())
}
