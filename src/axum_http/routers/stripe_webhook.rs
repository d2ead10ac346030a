use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    config::config_model::DotEnvyConfig,
    domain::repositories::users::UserRepository,
    infra::postgres::{postgres_connection::PgPoolSquad, repositories::users::UserPostgres},
    payments::stripe_client::StripeClient,
    usecases::stripe_webhook::{StripeGateway, StripeWebhookUseCase, WebhookError},
};

pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

pub fn routes(db_pool: Arc<PgPoolSquad>, config: Arc<DotEnvyConfig>) -> Router {
    let user_repository = UserPostgres::new(Arc::clone(&db_pool));
    let stripe_client = StripeClient::new(
        config.stripe.secret_key.expose().to_string(),
        config.stripe.webhook_secret.expose().to_string(),
    );
    let usecase = StripeWebhookUseCase::new(Arc::new(user_repository), Arc::new(stripe_client));

    router(Arc::new(usecase))
}

pub fn router<U, S>(usecase: Arc<StripeWebhookUseCase<U, S>>) -> Router
where
    U: UserRepository + Send + Sync + 'static,
    S: StripeGateway + 'static,
{
    Router::new()
        .route("/webhook", post(handle_stripe_webhook::<U, S>))
        .with_state(usecase)
}

/// Takes the body as raw bytes: the signature covers the exact payload.
pub async fn handle_stripe_webhook<U, S>(
    State(usecase): State<Arc<StripeWebhookUseCase<U, S>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    U: UserRepository + Send + Sync + 'static,
    S: StripeGateway + 'static,
{
    let Some(signature) = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
    else {
        let err = WebhookError::MissingSignature;
        warn!(
            status = err.status_code().as_u16(),
            "stripe_webhook: request without stripe-signature header"
        );
        return err.into_response();
    };

    match usecase.handle_stripe_webhook(&body, signature).await {
        Ok(outcome) => {
            debug!(?outcome, "stripe_webhook: event acknowledged");
            (StatusCode::OK, Json(WebhookAck { received: true })).into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::users::MockUserRepository;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use chrono::Utc;
    use hmac::{Hmac, Mac};
    use serde_json::{Value, json};
    use sha2::Sha256;
    use tower::ServiceExt;

    const WEBHOOK_SECRET: &str = "whsec_router_test";

    fn app(users: MockUserRepository) -> Router {
        let stripe_client = StripeClient::new("sk_test".to_string(), WEBHOOK_SECRET.to_string());
        let usecase = StripeWebhookUseCase::new(Arc::new(users), Arc::new(stripe_client));
        Router::new().nest("/api/stripe", router(Arc::new(usecase)))
    }

    fn signature_for(payload: &[u8]) -> String {
        let timestamp = Utc::now().timestamp();
        let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        format!(
            "t={},v1={}",
            timestamp,
            hex::encode(mac.finalize().into_bytes())
        )
    }

    fn signed_request(event: Value) -> Request<Body> {
        let payload = serde_json::to_vec(&event).unwrap();
        Request::builder()
            .method("POST")
            .uri("/api/stripe/webhook")
            .header("content-type", "application/json")
            .header(STRIPE_SIGNATURE_HEADER, signature_for(&payload))
            .body(Body::from(payload))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_signature_header_is_rejected_without_database_access() {
        let mut users = MockUserRepository::new();
        users.expect_assign_subscription().never();
        users.expect_clear_subscription().never();

        let response = app(users)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/stripe/webhook")
                    .body(Body::from(r#"{"type":"checkout.session.completed"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], 400);
    }

    #[tokio::test]
    async fn forged_signature_is_rejected() {
        let mut users = MockUserRepository::new();
        users.expect_assign_subscription().never();

        let response = app(users)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/stripe/webhook")
                    .header(
                        STRIPE_SIGNATURE_HEADER,
                        format!("t={},v1={}", Utc::now().timestamp(), "ab".repeat(32)),
                    )
                    .body(Body::from(r#"{"type":"checkout.session.completed"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn signed_checkout_completed_is_acknowledged() {
        let mut users = MockUserRepository::new();
        users
            .expect_assign_subscription()
            .withf(|user_id, assignment| {
                user_id == "user_1"
                    && assignment.subscription_id == "sub_1"
                    && assignment.customer_id == "cus_1"
            })
            .times(1)
            .returning(|_, _| Ok(1));

        let response = app(users)
            .oneshot(signed_request(json!({
                "id": "evt_1",
                "type": "checkout.session.completed",
                "data": { "object": {
                    "id": "cs_1",
                    "subscription": "sub_1",
                    "customer": "cus_1",
                    "metadata": { "userId": "user_1" }
                }}
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "received": true }));
    }

    #[tokio::test]
    async fn checkout_completed_without_user_id_is_still_acknowledged() {
        let mut users = MockUserRepository::new();
        users.expect_assign_subscription().never();

        let response = app(users)
            .oneshot(signed_request(json!({
                "id": "evt_2",
                "type": "checkout.session.completed",
                "data": { "object": {
                    "id": "cs_2",
                    "subscription": "sub_1",
                    "customer": "cus_1",
                    "metadata": {}
                }}
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "received": true }));
    }

    #[tokio::test]
    async fn invoice_paid_without_subscription_is_a_failing_response() {
        let mut users = MockUserRepository::new();
        users.expect_assign_subscription().never();

        let response = app(users)
            .oneshot(signed_request(json!({
                "id": "evt_3",
                "type": "invoice.paid",
                "data": { "object": {
                    "id": "in_1",
                    "customer": "cus_1",
                    "parent": { "subscription_details": { "metadata": { "userId": "user_1" } } }
                }}
            })))
            .await
            .unwrap();

        assert!(!response.status().is_success());
    }
}
