use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use axum::http::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    domain::{
        repositories::users::UserRepository,
        value_objects::{
            enums::{plans::Plan, stripe_event_kinds::StripeEventKind},
            subscriptions::SubscriptionAssignment,
        },
    },
    payments::stripe_client::{
        StripeCheckoutSession, StripeClient, StripeEvent, StripeInvoice, StripeSubscription,
    },
};

/// The Stripe operations the webhook flow depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StripeGateway: Send + Sync {
    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> AnyResult<StripeEvent>;

    async fn retrieve_subscription(&self, subscription_id: &str) -> AnyResult<StripeSubscription>;
}

#[async_trait]
impl StripeGateway for StripeClient {
    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> AnyResult<StripeEvent> {
        self.verify_webhook_signature(payload, signature)
    }

    async fn retrieve_subscription(&self, subscription_id: &str) -> AnyResult<StripeSubscription> {
        self.retrieve_subscription(subscription_id).await
    }
}

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("stripe signature not found")]
    MissingSignature,
    #[error("stripe signature verification failed")]
    InvalidSignature,
    #[error("invalid webhook payload: {0}")]
    InvalidWebhook(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl WebhookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingSignature
            | WebhookError::InvalidSignature
            | WebhookError::InvalidWebhook(_) => StatusCode::BAD_REQUEST,
            WebhookError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, WebhookError>;

/// What a delivered event ended up doing. Every variant is acknowledged to Stripe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    SubscriptionAssigned { user_id: String },
    SubscriptionCleared { user_id: String },
    Skipped { reason: &'static str },
    Ignored { event_type: String },
}

pub struct StripeWebhookUseCase<U, S>
where
    U: UserRepository + Send + Sync + 'static,
    S: StripeGateway + 'static,
{
    user_repo: Arc<U>,
    stripe_client: Arc<S>,
}

impl<U, S> StripeWebhookUseCase<U, S>
where
    U: UserRepository + Send + Sync + 'static,
    S: StripeGateway + 'static,
{
    pub fn new(user_repo: Arc<U>, stripe_client: Arc<S>) -> Self {
        Self {
            user_repo,
            stripe_client,
        }
    }

    pub async fn handle_stripe_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> UseCaseResult<WebhookOutcome> {
        debug!(
            payload_len = payload.len(),
            "stripe_webhook: payload received"
        );
        let event = self
            .stripe_client
            .verify_webhook_signature(payload, signature)
            .map_err(|err| {
                let rejection = WebhookError::InvalidSignature;
                warn!(
                    error = %err,
                    status = rejection.status_code().as_u16(),
                    "stripe_webhook: signature verification failed"
                );
                rejection
            })?;

        info!(
            event_id = ?event.id,
            event_type = %event.type_,
            "stripe_webhook: event verified"
        );

        match StripeEventKind::from_str(&event.type_) {
            StripeEventKind::CheckoutSessionCompleted => self.handle_checkout_completed(&event).await,
            StripeEventKind::InvoicePaid => self.handle_invoice_paid(&event).await,
            StripeEventKind::CustomerSubscriptionDeleted => {
                self.handle_subscription_deleted(&event).await
            }
            StripeEventKind::Other => {
                debug!(event_type = %event.type_, "stripe_webhook: unhandled event type");
                Ok(WebhookOutcome::Ignored {
                    event_type: event.type_.clone(),
                })
            }
        }
    }

    /// Missing data here is skipped and acknowledged: Stripe would redeliver
    /// the same broken session forever.
    async fn handle_checkout_completed(&self, event: &StripeEvent) -> UseCaseResult<WebhookOutcome> {
        let session: StripeCheckoutSession = match event.object() {
            Ok(session) => session,
            Err(err) => {
                error!(
                    event_id = ?event.id,
                    error = %err,
                    "stripe_webhook: checkout session payload unreadable, skipping"
                );
                return Ok(WebhookOutcome::Skipped {
                    reason: "unreadable checkout session",
                });
            }
        };

        let Some(user_id) = session.user_id() else {
            error!(
                event_id = ?event.id,
                checkout_session_id = ?session.id,
                "stripe_webhook: userId missing from checkout session metadata, skipping"
            );
            return Ok(WebhookOutcome::Skipped {
                reason: "missing userId",
            });
        };

        let (Some(subscription_id), Some(customer_id)) =
            (session.subscription_id(), session.customer_id())
        else {
            error!(
                event_id = ?event.id,
                checkout_session_id = ?session.id,
                %user_id,
                "stripe_webhook: subscription or customer id missing from checkout session, skipping"
            );
            return Ok(WebhookOutcome::Skipped {
                reason: "missing subscription or customer id",
            });
        };

        let assignment = SubscriptionAssignment {
            subscription_id: subscription_id.to_string(),
            customer_id: customer_id.to_string(),
            plan: Plan::Essential,
        };
        self.assign_subscription(user_id, assignment).await
    }

    async fn handle_invoice_paid(&self, event: &StripeEvent) -> UseCaseResult<WebhookOutcome> {
        let invoice: StripeInvoice = event
            .object()
            .map_err(|err| invalid_webhook(format!("invalid invoice payload: {err}")))?;

        if invoice.id.as_deref().is_none_or(str::is_empty) {
            return Err(invalid_webhook("invoice id missing".to_string()));
        }

        let details = invoice.subscription_details();
        let subscription_id = details
            .and_then(|details| details.subscription_id())
            .ok_or_else(|| invalid_webhook("invoice subscription id missing".to_string()))?;
        let user_id = details
            .and_then(|details| details.user_id())
            .ok_or_else(|| invalid_webhook("invoice subscription userId missing".to_string()))?;
        let customer_id = invoice
            .customer_id()
            .ok_or_else(|| invalid_webhook("invoice customer id missing".to_string()))?;

        let assignment = SubscriptionAssignment {
            subscription_id: subscription_id.to_string(),
            customer_id: customer_id.to_string(),
            plan: Plan::Essential,
        };
        self.assign_subscription(user_id, assignment).await
    }

    async fn handle_subscription_deleted(
        &self,
        event: &StripeEvent,
    ) -> UseCaseResult<WebhookOutcome> {
        #[derive(Deserialize)]
        struct SubscriptionObject {
            id: Option<String>,
        }

        let subscription: SubscriptionObject = event
            .object()
            .map_err(|err| invalid_webhook(format!("invalid subscription payload: {err}")))?;
        let subscription_id = subscription
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| invalid_webhook("subscription id missing".to_string()))?;

        // The event copy may be stale; the live object carries the metadata we trust.
        let subscription = self
            .stripe_client
            .retrieve_subscription(&subscription_id)
            .await
            .map_err(|err| {
                error!(
                    %subscription_id,
                    error = ?err,
                    "stripe_webhook: failed to retrieve deleted subscription"
                );
                WebhookError::Internal(err)
            })?;

        let user_id = subscription
            .user_id()
            .ok_or_else(|| invalid_webhook("subscription userId missing".to_string()))?;

        let affected = self
            .user_repo
            .clear_subscription(user_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %subscription_id,
                    db_error = ?err,
                    "stripe_webhook: failed to clear user subscription"
                );
                WebhookError::Internal(err)
            })?;

        if affected == 0 {
            warn!(%user_id, %subscription_id, "stripe_webhook: no user row matched subscription removal");
        } else {
            info!(%user_id, %subscription_id, "stripe_webhook: subscription cleared for user");
        }

        Ok(WebhookOutcome::SubscriptionCleared {
            user_id: user_id.to_string(),
        })
    }

    async fn assign_subscription(
        &self,
        user_id: &str,
        assignment: SubscriptionAssignment,
    ) -> UseCaseResult<WebhookOutcome> {
        let subscription_id = assignment.subscription_id.clone();
        let customer_id = assignment.customer_id.clone();
        let plan = assignment.plan;

        let affected = self
            .user_repo
            .assign_subscription(user_id, assignment)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %subscription_id,
                    db_error = ?err,
                    "stripe_webhook: failed to assign subscription to user"
                );
                WebhookError::Internal(err)
            })?;

        if affected == 0 {
            warn!(%user_id, %subscription_id, "stripe_webhook: no user row matched subscription update");
        } else {
            info!(
                %user_id,
                %subscription_id,
                %customer_id,
                %plan,
                "stripe_webhook: subscription assigned to user"
            );
        }

        Ok(WebhookOutcome::SubscriptionAssigned {
            user_id: user_id.to_string(),
        })
    }
}

fn invalid_webhook(reason: String) -> WebhookError {
    let err = WebhookError::InvalidWebhook(reason);
    warn!(
        status = err.status_code().as_u16(),
        error = %err,
        "stripe_webhook: rejecting malformed event"
    );
    err
}
