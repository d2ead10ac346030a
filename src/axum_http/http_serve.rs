use crate::{
    axum_http::{default_routers, routers},
    config::config_model::DotEnvyConfig,
    infra::postgres::postgres_connection::PgPoolSquad,
};
use anyhow::Result;
use axum::{Router, extract::DefaultBodyLimit, routing::get};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let stripe_webhook = routers::stripe_webhook::routes(Arc::clone(&db_pool), Arc::clone(&config));
    let app = build_router(&config, stripe_webhook)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Assembles every route plus the middleware stack around the given webhook router.
pub fn build_router(config: &DotEnvyConfig, stripe_webhook: Router) -> Result<Router> {
    let body_limit: usize = (config.server.body_limit * 1024 * 1024).try_into()?;

    let app = Router::new()
        .fallback(default_routers::not_found)
        .merge(routers::landing::routes(config.landing.clone()))
        .nest("/api/stripe", stripe_webhook)
        .route("/api/v1/health-check", get(default_routers::health_check))
        .layer(TimeoutLayer::new(Duration::from_secs(config.server.timeout)))
        // `Bytes` extraction has its own 2 MiB default; align it with the configured limit.
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to install CTRL+C signal handler");
        std::future::pending::<()>().await;
    }
    info!("Received ctrl+C signal");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::config_model::{Database, Landing, Secret, Server, Stripe},
        domain::repositories::users::MockUserRepository,
        payments::stripe_client::StripeClient,
        usecases::stripe_webhook::StripeWebhookUseCase,
    };
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header::LOCATION},
    };
    use tower::ServiceExt;

    fn test_config() -> DotEnvyConfig {
        DotEnvyConfig {
            server: Server {
                port: 0,
                body_limit: 1,
                timeout: 5,
            },
            database: Database {
                url: "postgres://localhost:5432/test".to_string(),
            },
            stripe: Stripe {
                secret_key: Secret::new("sk_test"),
                webhook_secret: Secret::new("whsec_test"),
            },
            landing: Landing {
                authentication_path: "/authentication".to_string(),
            },
        }
    }

    fn test_app() -> Router {
        test_app_with(&test_config())
    }

    fn test_app_with(config: &DotEnvyConfig) -> Router {
        let usecase = StripeWebhookUseCase::new(
            Arc::new(MockUserRepository::new()),
            Arc::new(StripeClient::new(
                "sk_test".to_string(),
                "whsec_test".to_string(),
            )),
        );
        build_router(config, routers::stripe_webhook::router(Arc::new(usecase))).unwrap()
    }

    fn webhook_post(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/stripe/webhook")
            .body(Body::from(body))
            .unwrap()
    }

    async fn get(uri: &str) -> axum::response::Response {
        test_app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn root_redirects_to_authentication() {
        let response = get("/").await;

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[LOCATION], "/authentication");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn health_check_answers_ok() {
        let response = get("/api/v1/health-check").await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = get("/pricing").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn webhook_is_mounted_under_api_stripe() {
        let response = test_app()
            .oneshot(webhook_post(b"{}".to_vec()))
            .await
            .unwrap();

        // No signature header, so the handler itself rejects.
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn configured_body_limit_above_two_mib_reaches_the_handler() {
        let mut config = test_config();
        config.server.body_limit = 10;

        let response = test_app_with(&config)
            .oneshot(webhook_post(vec![b'a'; 3 * 1024 * 1024]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn body_over_configured_limit_is_too_large() {
        let response = test_app()
            .oneshot(webhook_post(vec![b'a'; 2 * 1024 * 1024]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
