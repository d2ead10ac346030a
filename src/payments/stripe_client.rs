use std::collections::HashMap;

use anyhow::{Result, anyhow};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, de::DeserializeOwned};
use sha2::Sha256;
use tracing::error;

type HmacSha256 = Hmac<Sha256>;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";
const STRIPE_API_VERSION: &str = "2025-05-28.basil";

/// Oldest signed timestamp accepted, in seconds. Matches Stripe's own libraries.
pub const DEFAULT_SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Metadata key the checkout flow stores the application user id under.
pub const USER_ID_METADATA_KEY: &str = "userId";

/// Minimal Stripe client built on reqwest.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    webhook_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

impl StripeEvent {
    /// Deserializes `data.object` into the payload type of this event.
    pub fn object<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(self.data.object.clone())
    }
}

/// A reference to another Stripe object: a bare id, or the expanded object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ExpandableId {
    Id(String),
    Object { id: String },
}

impl ExpandableId {
    pub fn id(&self) -> &str {
        match self {
            ExpandableId::Id(id) => id,
            ExpandableId::Object { id } => id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: Option<String>,
    pub subscription: Option<ExpandableId>,
    pub customer: Option<ExpandableId>,
    pub metadata: Option<HashMap<String, String>>,
}

impl StripeCheckoutSession {
    pub fn user_id(&self) -> Option<&str> {
        metadata_value(self.metadata.as_ref(), USER_ID_METADATA_KEY)
    }

    pub fn subscription_id(&self) -> Option<&str> {
        expandable_id(self.subscription.as_ref())
    }

    pub fn customer_id(&self) -> Option<&str> {
        expandable_id(self.customer.as_ref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeInvoice {
    pub id: Option<String>,
    pub customer: Option<ExpandableId>,
    pub parent: Option<StripeInvoiceParent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeInvoiceParent {
    pub subscription_details: Option<StripeSubscriptionDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionDetails {
    pub subscription: Option<ExpandableId>,
    pub metadata: Option<HashMap<String, String>>,
}

impl StripeInvoice {
    pub fn customer_id(&self) -> Option<&str> {
        expandable_id(self.customer.as_ref())
    }

    pub fn subscription_details(&self) -> Option<&StripeSubscriptionDetails> {
        self.parent
            .as_ref()
            .and_then(|parent| parent.subscription_details.as_ref())
    }
}

impl StripeSubscriptionDetails {
    pub fn subscription_id(&self) -> Option<&str> {
        expandable_id(self.subscription.as_ref())
    }

    pub fn user_id(&self) -> Option<&str> {
        metadata_value(self.metadata.as_ref(), USER_ID_METADATA_KEY)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub metadata: Option<HashMap<String, String>>,
}

impl StripeSubscription {
    pub fn user_id(&self) -> Option<&str> {
        metadata_value(self.metadata.as_ref(), USER_ID_METADATA_KEY)
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

fn metadata_value<'a>(metadata: Option<&'a HashMap<String, String>>, key: &str) -> Option<&'a str> {
    metadata
        .and_then(|values| values.get(key))
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

fn expandable_id(value: Option<&ExpandableId>) -> Option<&str> {
    value.map(ExpandableId::id).filter(|id| !id.is_empty())
}

/// Checks a `Stripe-Signature` header against the raw payload.
/// https://stripe.com/docs/webhooks/signatures
pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    webhook_secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<()> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in signature_header.split(',') {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("t=") {
            timestamp = Some(rest);
        } else if let Some(rest) = part.strip_prefix("v1=") {
            // A non-hex entry can never match, so it is simply not a candidate.
            if let Ok(bytes) = hex::decode(rest) {
                signatures.push(bytes);
            }
        }
    }

    let timestamp = timestamp.ok_or_else(|| anyhow!("missing timestamp in stripe-signature"))?;
    let signed_at: i64 = timestamp
        .parse()
        .map_err(|_| anyhow!("invalid timestamp in stripe-signature"))?;
    if signatures.is_empty() {
        anyhow::bail!("missing v1 in stripe-signature");
    }

    let mut mac = HmacSha256::new_from_slice(webhook_secret.as_bytes())?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures
        .iter()
        .any(|signature| mac.clone().verify_slice(signature).is_ok());
    if !matched {
        anyhow::bail!("invalid webhook signature");
    }

    if tolerance_secs > 0 && now.saturating_sub(signed_at) > tolerance_secs {
        anyhow::bail!("webhook timestamp outside the tolerance zone");
    }

    Ok(())
}

impl StripeClient {
    pub fn new(secret_key: String, webhook_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
            webhook_secret,
        }
    }

    async fn ensure_success(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let (stripe_error_type, stripe_error_code, stripe_error_message) =
            match serde_json::from_str::<StripeErrorEnvelope>(&body) {
                Ok(envelope) => (
                    envelope.error.type_,
                    envelope.error.code,
                    envelope.error.message,
                ),
                Err(_) => (None, None, None),
            };

        error!(
            status = %status,
            stripe_request_id = ?request_id,
            stripe_error_type = ?stripe_error_type,
            stripe_error_code = ?stripe_error_code,
            stripe_error_message = ?stripe_error_message,
            context = %context,
            "stripe api request failed"
        );

        anyhow::bail!(
            "Stripe API request failed: {} (status {}, request_id={:?})",
            context,
            status,
            request_id
        );
    }

    /// Verifies the signature, then parses the event envelope from the same bytes.
    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent> {
        verify_signature(
            payload,
            signature_header,
            &self.webhook_secret,
            DEFAULT_SIGNATURE_TOLERANCE_SECS,
            Utc::now().timestamp(),
        )?;

        let event: StripeEvent = serde_json::from_slice(payload)?;
        Ok(event)
    }

    pub async fn retrieve_subscription(&self, subscription_id: &str) -> Result<StripeSubscription> {
        // https://stripe.com/docs/api/subscriptions/retrieve
        let resp = self
            .http
            .get(format!("{}/subscriptions/{}", STRIPE_API_BASE, subscription_id))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header("Stripe-Version", STRIPE_API_VERSION)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "retrieve subscription").await?;

        let subscription: StripeSubscription = resp.json().await?;
        Ok(subscription)
    }
}
