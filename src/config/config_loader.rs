use anyhow::{Context, Result};
use axum::http::HeaderValue;

use super::{
    config_model::{Database, DotEnvyConfig, Landing, Secret, Server, Stripe},
    stage::Stage,
};

pub const DEFAULT_AUTHENTICATION_PATH: &str = "/authentication";

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    load_from(|key| std::env::var(key).ok())
}

/// Builds the config from an arbitrary key lookup. Every required key must be
/// present and non-blank.
pub fn load_from<F>(lookup: F) -> Result<DotEnvyConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |key: &str| -> Result<String> {
        lookup(key)
            .filter(|value| !value.trim().is_empty())
            .with_context(|| format!("{key} is invalid"))
    };

    let server = Server {
        port: required("SERVER_PORT")?
            .parse()
            .context("SERVER_PORT is not a valid port")?,
        body_limit: required("SERVER_BODY_LIMIT")?
            .parse()
            .context("SERVER_BODY_LIMIT is not a number")?,
        timeout: required("SERVER_TIMEOUT")?
            .parse()
            .context("SERVER_TIMEOUT is not a number")?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
    };

    let stripe = Stripe {
        secret_key: Secret::new(required("STRIPE_SECRET_KEY")?),
        webhook_secret: Secret::new(required("STRIPE_WEBHOOK_SECRET")?),
    };

    let authentication_path = lookup("AUTHENTICATION_PATH")
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_AUTHENTICATION_PATH.to_string());
    // Becomes the `Location` header of the landing redirect.
    HeaderValue::try_from(authentication_path.as_str())
        .context("AUTHENTICATION_PATH is not a valid redirect target")?;
    let landing = Landing {
        authentication_path,
    };

    Ok(DotEnvyConfig {
        server,
        database,
        stripe,
        landing,
    })
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or("".to_string());
    Stage::try_from(&stage_str).unwrap_or_default()
}
