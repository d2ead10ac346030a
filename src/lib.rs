pub mod axum_http;
pub mod config;
pub mod domain;
pub mod infra;
pub mod observability;
pub mod payments;
pub mod usecases;

use std::sync::Arc;

use anyhow::Result;
use infra::postgres::postgres_connection;
use tracing::info;

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    observability::init_observability("stripe-webhook")?;

    let dotenvy_env = config::config_loader::load()?;
    info!(
        stage = %config::config_loader::get_stage(),
        "ENV has been loaded"
    );

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database.url)?;
    info!("Postgres connection has been established");

    axum_http::http_serve::start(Arc::new(dotenvy_env), Arc::new(postgres_pool)).await?;

    Ok(())
}
