//! Payment gateway token contract and navigation sniffing.
//!
//! The gateway computes and signs the charged amount server-side from the
//! order id; the basket lines sent here are display data, never the source
//! of truth for the amount.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use keepsake_core::PurchaseId;

/// Whether token requests run against the gateway's test or live endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    Test,
    Live,
}

/// One display line of the gateway basket: name, unit price as a decimal
/// string (e.g. `"12.50"`), quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketLine {
    pub name: String,
    pub unit_price: String,
    pub quantity: u32,
}

/// Request body for the gateway's token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
    pub order_id: PurchaseId,
    pub basket: Vec<BasketLine>,
    pub buyer_email: String,
    pub buyer_name: String,
    pub buyer_address: String,
    pub buyer_phone: String,
    pub buyer_ip: String,
    pub mode: GatewayMode,
}

/// Raw token endpoint response shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub status: String,
    #[serde(default)]
    pub token: Option<String>,
    /// Correlation id to persist on the purchase before handoff.
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// A successfully issued payment token plus its correlation id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub token: String,
    pub reference: String,
}

impl TokenResponse {
    /// Interpret the raw response. `status == "success"` must carry both a
    /// token and a correlation reference; anything else is declined or
    /// malformed.
    pub fn into_grant(self) -> Result<TokenGrant, GatewayError> {
        match self.status.as_str() {
            "success" => match (self.token, self.reference) {
                (Some(token), Some(reference)) => Ok(TokenGrant { token, reference }),
                _ => Err(GatewayError::MalformedResponse(
                    "success response missing token or reference".to_string(),
                )),
            },
            "failure" => Err(GatewayError::Declined(
                self.reason
                    .unwrap_or_else(|| "token request declined".to_string()),
            )),
            other => Err(GatewayError::MalformedResponse(format!(
                "unknown status '{other}'"
            ))),
        }
    }
}

/// Token issuance failure. Fatal to the current checkout attempt; retry
/// re-runs issuance from scratch and never reuses a stale token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("token request failed: {0}")]
    Request(String),

    #[error("token request declined: {0}")]
    Declined(String),

    #[error("malformed gateway response: {0}")]
    MalformedResponse(String),
}

/// What a hosted-page navigation URL tells us. A heuristic UI hint only;
/// the authoritative payment state lives on the purchase record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentSignal {
    Success,
    Failure,
    Indeterminate,
}

/// External payment gateway: token issuance plus the hosted payment page.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn issue_token(&self, request: &TokenRequest) -> Result<TokenGrant, GatewayError>;

    /// Hosted payment page for a token (`https://<gateway>/pay/<token>`).
    fn payment_page_url(&self, token: &str) -> String;

    /// Known destination prefix the hosted page navigates to on success.
    fn success_url_prefix(&self) -> &str;

    /// Known destination prefix the hosted page navigates to on failure.
    fn failure_url_prefix(&self) -> &str;

    /// Match an observed navigation URL against the known destinations.
    fn classify_navigation(&self, url: &str) -> PaymentSignal {
        if url.contains(self.success_url_prefix()) {
            PaymentSignal::Success
        } else if url.contains(self.failure_url_prefix()) {
            PaymentSignal::Failure
        } else {
            PaymentSignal::Indeterminate
        }
    }
}

#[async_trait]
impl<G> PaymentGateway for Arc<G>
where
    G: PaymentGateway + ?Sized,
{
    async fn issue_token(&self, request: &TokenRequest) -> Result<TokenGrant, GatewayError> {
        (**self).issue_token(request).await
    }

    fn payment_page_url(&self, token: &str) -> String {
        (**self).payment_page_url(token)
    }

    fn success_url_prefix(&self) -> &str {
        (**self).success_url_prefix()
    }

    fn failure_url_prefix(&self) -> &str {
        (**self).failure_url_prefix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_response_yields_grant() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"status":"success","token":"tok_1","reference":"oid_1"}"#,
        )
        .unwrap();
        let grant = response.into_grant().unwrap();
        assert_eq!(grant.token, "tok_1");
        assert_eq!(grant.reference, "oid_1");
    }

    #[test]
    fn failure_response_is_declined_with_reason() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"status":"failure","reason":"card country blocked"}"#)
                .unwrap();
        match response.into_grant().unwrap_err() {
            GatewayError::Declined(reason) => assert_eq!(reason, "card country blocked"),
            other => panic!("Expected Declined, got {other:?}"),
        }
    }

    #[test]
    fn success_without_token_is_malformed() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"status":"success","reference":"oid_1"}"#).unwrap();
        assert!(matches!(
            response.into_grant(),
            Err(GatewayError::MalformedResponse(_))
        ));
    }
}
