//! Gateway adapter that issues tokens without network IO. Intended for
//! tests/dev; the hosted gateway client slots in behind the same trait.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;

use keepsake_orders::{GatewayError, PaymentGateway, TokenGrant, TokenRequest};

#[derive(Debug)]
pub struct LocalGateway {
    page_base: String,
    success_prefix: String,
    failure_prefix: String,
    counter: AtomicU32,
    decline_next: AtomicBool,
}

impl Default for LocalGateway {
    fn default() -> Self {
        Self {
            page_base: "https://gateway.example/pay".to_string(),
            success_prefix: "https://keepsake.example/payment/success".to_string(),
            failure_prefix: "https://keepsake.example/payment/fail".to_string(),
            counter: AtomicU32::new(0),
            decline_next: AtomicBool::new(false),
        }
    }
}

impl LocalGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next token request fail as declined.
    pub fn decline_next(&self) {
        self.decline_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for LocalGateway {
    async fn issue_token(&self, request: &TokenRequest) -> Result<TokenGrant, GatewayError> {
        if self.decline_next.swap(false, Ordering::SeqCst) {
            return Err(GatewayError::Declined("declined by configuration".to_string()));
        }
        if request.basket.is_empty() {
            return Err(GatewayError::Request("empty basket".to_string()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(TokenGrant {
            token: format!("tok_{n}"),
            reference: format!("ref_{}", request.order_id),
        })
    }

    fn payment_page_url(&self, token: &str) -> String {
        format!("{}/{token}", self.page_base)
    }

    fn success_url_prefix(&self) -> &str {
        &self.success_prefix
    }

    fn failure_url_prefix(&self) -> &str {
        &self.failure_prefix
    }
}
