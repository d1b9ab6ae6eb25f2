use std::error::Error;

use env_logger::Env;
use foodgram::{
    api::{self, Context},
    config::Config,
    pool::{connect, run_migrations},
};
use log::{error, info};
use tokio::signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use warp::Filter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = Config::load()?;
    let pool = connect(&config).await?;
    run_migrations(&pool).await?;

    let media = warp::path("media").and(warp::fs::dir(config.media_root.clone()));
    let routes = media.or(api::routes(Context::new(pool, &config)));

    let (address, server) =
        warp::serve(routes).try_bind_with_graceful_shutdown(config.bind_address, shutdown_signal())?;

    info!("Server running on {address}");
    server.await;
    info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install terminate handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
