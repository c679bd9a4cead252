//! Checkout state machine.
//!
//! Linear flow with one branch:
//! `NoOrder → PackageChosen → ProductsChosen → OrderCreated →
//! AddressCaptured → PaymentTokenIssued → GatewayHandoff →
//! {PaymentConfirmed | PaymentFailed}`, plus a cancellation transition from
//! any state at-or-after `OrderCreated` back to `NoOrder` while the purchase
//! is still fully pending.
//!
//! The pipeline only advances state after the corresponding backend write
//! has been confirmed, and it never writes payment status: `confirmed` here
//! is a provisional UI signal; the authoritative state change arrives
//! out-of-band on the purchase record.

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

use keepsake_cart::Cart;
use keepsake_catalog::Package;
use keepsake_core::{DataAccessError, DomainError, EventId, Money, PurchaseId};

use crate::gateway::{
    BasketLine, GatewayError, GatewayMode, PaymentGateway, PaymentSignal, TokenGrant,
    TokenRequest,
};
use crate::purchase::{
    PaymentStatus, Purchase, PurchaseItem, PurchaseStatus, ShippingDetails,
};
use crate::store::PurchaseStore;

const DEFAULT_BUYER_EMAIL: &str = "guest@keepsake.example";
const DEFAULT_BUYER_NAME: &str = "Guest";
const DEFAULT_BUYER_PHONE: &str = "0000000000";
const DEFAULT_BUYER_IP: &str = "127.0.0.1";
const FALLBACK_BASKET_LABEL: &str = "Keepsake order";

/// Position in the checkout flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutState {
    NoOrder,
    PackageChosen,
    ProductsChosen,
    OrderCreated,
    AddressCaptured,
    PaymentTokenIssued,
    GatewayHandoff,
    PaymentConfirmed,
    PaymentFailed,
}

impl CheckoutState {
    pub fn name(&self) -> &'static str {
        match self {
            CheckoutState::NoOrder => "no_order",
            CheckoutState::PackageChosen => "package_chosen",
            CheckoutState::ProductsChosen => "products_chosen",
            CheckoutState::OrderCreated => "order_created",
            CheckoutState::AddressCaptured => "address_captured",
            CheckoutState::PaymentTokenIssued => "payment_token_issued",
            CheckoutState::GatewayHandoff => "gateway_handoff",
            CheckoutState::PaymentConfirmed => "payment_confirmed",
            CheckoutState::PaymentFailed => "payment_failed",
        }
    }

    fn at_or_after_order(&self) -> bool {
        !matches!(
            self,
            CheckoutState::NoOrder | CheckoutState::PackageChosen | CheckoutState::ProductsChosen
        )
    }
}

/// Buyer contact details from the profile, all optional. The pipeline fills
/// gaps from the purchase's shipping fields and fixed placeholders so token
/// issuance never fails on missing profile data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuyerContact {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub ip: Option<String>,
}

/// Checkout failure.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("illegal transition: {attempted} from {from}")]
    IllegalTransition {
        from: &'static str,
        attempted: &'static str,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Data(#[from] DataAccessError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Orchestrates order creation, address capture, payment-token exchange,
/// gateway handoff, and completion/cancellation for one event's checkout.
#[derive(Debug)]
pub struct CheckoutPipeline<S, G> {
    store: S,
    gateway: G,
    event_id: EventId,
    currency: String,
    mode: GatewayMode,
    state: CheckoutState,
    package: Option<Package>,
    cart: Cart,
    purchase: Option<Purchase>,
    items: Vec<PurchaseItem>,
    token: Option<TokenGrant>,
}

impl<S, G> CheckoutPipeline<S, G>
where
    S: PurchaseStore,
    G: PaymentGateway,
{
    pub fn new(store: S, gateway: G, event_id: EventId) -> Self {
        Self {
            store,
            gateway,
            event_id,
            currency: "TRY".to_string(),
            mode: GatewayMode::Test,
            state: CheckoutState::NoOrder,
            package: None,
            cart: Cart::new(),
            purchase: None,
            items: Vec::new(),
            token: None,
        }
    }

    pub fn with_mode(mut self, mode: GatewayMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Rehydrate a pipeline from a still-pending purchase (the "resume
    /// checkout" affordance). Resumes at the address step, or past it if
    /// shipping was already captured.
    pub fn resume(
        store: S,
        gateway: G,
        purchase: Purchase,
        items: Vec<PurchaseItem>,
    ) -> Result<Self, PipelineError> {
        if !purchase.is_cancellable() {
            return Err(DomainError::conflict("only a fully pending order can be resumed").into());
        }
        let state = if purchase.shipping.is_some() {
            CheckoutState::AddressCaptured
        } else {
            CheckoutState::OrderCreated
        };
        debug!(purchase_id = %purchase.id, state = state.name(), "resuming checkout");
        Ok(Self {
            store,
            gateway,
            event_id: purchase.event_id,
            currency: purchase.currency.clone(),
            mode: GatewayMode::Test,
            state,
            package: None,
            cart: Cart::new(),
            purchase: Some(purchase),
            items,
            token: None,
        })
    }

    pub fn state(&self) -> CheckoutState {
        self.state
    }

    pub fn purchase(&self) -> Option<&Purchase> {
        self.purchase.as_ref()
    }

    pub fn items(&self) -> &[PurchaseItem] {
        &self.items
    }

    fn illegal(&self, attempted: &'static str) -> PipelineError {
        PipelineError::IllegalTransition {
            from: self.state.name(),
            attempted,
        }
    }

    /// Select the package tier (optional: add-on-only orders carry none).
    pub fn choose_package(&mut self, package: Option<Package>) -> Result<(), PipelineError> {
        if self.state != CheckoutState::NoOrder {
            return Err(self.illegal("choose_package"));
        }
        self.package = package;
        self.state = CheckoutState::PackageChosen;
        Ok(())
    }

    /// Take the cart as built by the cart aggregator. An order must contain
    /// a package or at least one product.
    pub fn choose_products(&mut self, cart: Cart) -> Result<(), PipelineError> {
        if self.state != CheckoutState::PackageChosen {
            return Err(self.illegal("choose_products"));
        }
        if self.package.is_none() && cart.is_empty() {
            return Err(
                DomainError::validation("order needs a package or at least one product").into(),
            );
        }
        self.cart = cart;
        self.state = CheckoutState::ProductsChosen;
        Ok(())
    }

    /// Persist the purchase and its items as one logical unit.
    ///
    /// The total (cart total plus package price) is computed here and
    /// persisted; it is never recomputed from live catalog prices later.
    /// On failure the pipeline stays in `ProductsChosen` and a retry
    /// re-attempts the whole creation under a fresh order id.
    pub async fn create_order(&mut self) -> Result<PurchaseId, PipelineError> {
        if self.state != CheckoutState::ProductsChosen {
            return Err(self.illegal("create_order"));
        }

        let purchase_id = PurchaseId::new();
        let items: Vec<PurchaseItem> = self
            .cart
            .lines()
            .map(|line| PurchaseItem {
                purchase_id,
                product_id: line.product.id,
                quantity: line.quantity,
                unit_price: line.product.price,
                customization_text: line.customization.clone(),
                product_name_snapshot: match &line.customization {
                    Some(text) => format!("{} ({})", line.product.name, text),
                    None => line.product.name.clone(),
                },
            })
            .collect();

        let package_price = self
            .package
            .as_ref()
            .map(|p| p.price)
            .unwrap_or(Money::ZERO);
        let total = self.cart.total().add(package_price);

        let purchase = Purchase {
            id: purchase_id,
            event_id: self.event_id,
            package_id: self.package.as_ref().map(|p| p.id),
            status: PurchaseStatus::Pending,
            payment_status: PaymentStatus::Pending,
            total_amount: total,
            currency: self.currency.clone(),
            shipping: None,
            gateway_ref: None,
            created_at: Utc::now(),
        };

        self.store
            .create_with_items(purchase.clone(), items.clone())
            .await
            .inspect_err(|e| warn!(purchase_id = %purchase_id, error = %e, "order creation failed"))?;

        debug!(purchase_id = %purchase_id, total = %total, "order created");
        self.purchase = Some(purchase);
        self.items = items;
        self.state = CheckoutState::OrderCreated;
        Ok(purchase_id)
    }

    /// Store the shipping fields on the purchase. Refuses to proceed if any
    /// required field is blank.
    pub async fn capture_address(&mut self, shipping: ShippingDetails) -> Result<(), PipelineError> {
        if !matches!(
            self.state,
            CheckoutState::OrderCreated | CheckoutState::AddressCaptured
        ) {
            return Err(self.illegal("capture_address"));
        }
        shipping.validate()?;

        let purchase = self.purchase.as_mut().ok_or(DomainError::NotFound)?;
        self.store.update_shipping(purchase.id, shipping.clone()).await?;
        purchase.shipping = Some(shipping);
        self.state = CheckoutState::AddressCaptured;
        Ok(())
    }

    fn build_basket(&self, purchase: &Purchase) -> Vec<BasketLine> {
        let mut basket: Vec<BasketLine> = self
            .items
            .iter()
            .map(|item| BasketLine {
                name: item.product_name_snapshot.clone(),
                unit_price: item.unit_price.to_unit_string(),
                quantity: item.quantity,
            })
            .collect();

        if let Some(package) = &self.package {
            basket.push(BasketLine {
                name: package.name.clone(),
                unit_price: package.price.to_unit_string(),
                quantity: 1,
            });
        }

        // Package-only resume has no package row loaded; the gateway signs
        // the amount server-side, so a single display line is enough.
        if basket.is_empty() {
            basket.push(BasketLine {
                name: FALLBACK_BASKET_LABEL.to_string(),
                unit_price: purchase.total_amount.to_unit_string(),
                quantity: 1,
            });
        }

        basket
    }

    /// Exchange the order for a payment token and return the hosted payment
    /// page URL.
    ///
    /// The returned correlation id is persisted on the purchase *before*
    /// this method returns, so the asynchronous server-side confirmation can
    /// be matched back to this order even if the app is closed mid-flow.
    /// Any failure discards the attempt entirely; retrying issues a fresh
    /// token from scratch.
    pub async fn issue_payment_token(
        &mut self,
        contact: &BuyerContact,
    ) -> Result<String, PipelineError> {
        if !matches!(
            self.state,
            CheckoutState::AddressCaptured
                | CheckoutState::PaymentTokenIssued
                | CheckoutState::GatewayHandoff
                | CheckoutState::PaymentFailed
        ) {
            return Err(self.illegal("issue_payment_token"));
        }

        // Never reuse a stale token across attempts.
        self.token = None;

        let purchase = self.purchase.as_ref().ok_or(DomainError::NotFound)?;
        let shipping = purchase.shipping.as_ref();

        let request = TokenRequest {
            order_id: purchase.id,
            basket: self.build_basket(purchase),
            buyer_email: contact
                .email
                .clone()
                .unwrap_or_else(|| DEFAULT_BUYER_EMAIL.to_string()),
            buyer_name: shipping
                .map(|s| s.recipient_name.clone())
                .or_else(|| contact.name.clone())
                .unwrap_or_else(|| DEFAULT_BUYER_NAME.to_string()),
            buyer_address: shipping
                .map(|s| format!("{}, {}, {}", s.address, s.district, s.city))
                .unwrap_or_else(|| "address not provided".to_string()),
            buyer_phone: shipping
                .map(|s| s.recipient_phone.clone())
                .or_else(|| contact.phone.clone())
                .unwrap_or_else(|| DEFAULT_BUYER_PHONE.to_string()),
            buyer_ip: contact
                .ip
                .clone()
                .unwrap_or_else(|| DEFAULT_BUYER_IP.to_string()),
            mode: self.mode,
        };

        let grant = match self.gateway.issue_token(&request).await {
            Ok(grant) => grant,
            Err(e) => {
                warn!(purchase_id = %purchase.id, error = %e, "token issuance failed");
                self.state = CheckoutState::AddressCaptured;
                return Err(e.into());
            }
        };

        // Persist the correlation id before navigating to the hosted page.
        if let Err(e) = self.store.set_gateway_ref(purchase.id, &grant.reference).await {
            warn!(purchase_id = %purchase.id, error = %e, "persisting gateway reference failed");
            self.state = CheckoutState::AddressCaptured;
            return Err(e.into());
        }

        let page_url = self.gateway.payment_page_url(&grant.token);
        debug!(purchase_id = %purchase.id, reference = %grant.reference, "payment token issued");

        if let Some(purchase) = self.purchase.as_mut() {
            purchase.gateway_ref = Some(grant.reference.clone());
        }
        self.token = Some(grant);
        self.state = CheckoutState::PaymentTokenIssued;
        Ok(page_url)
    }

    /// Mark that the hosted payment page has been opened.
    pub fn begin_handoff(&mut self) -> Result<(), PipelineError> {
        if self.state != CheckoutState::PaymentTokenIssued {
            return Err(self.illegal("begin_handoff"));
        }
        self.state = CheckoutState::GatewayHandoff;
        Ok(())
    }

    /// Feed an observed hosted-page navigation URL into the pipeline.
    ///
    /// A success destination moves to `PaymentConfirmed`, failure to
    /// `PaymentFailed`, anything else is ignored. This is a UI hint: the
    /// purchase record is not touched, and the caller should re-run
    /// entitlement resolution after a success signal.
    pub fn observe_navigation(&mut self, url: &str) -> Result<PaymentSignal, PipelineError> {
        if self.state != CheckoutState::GatewayHandoff {
            return Err(self.illegal("observe_navigation"));
        }
        let signal = self.gateway.classify_navigation(url);
        match signal {
            PaymentSignal::Success => {
                debug!(url, "gateway navigation signalled success (provisional)");
                self.state = CheckoutState::PaymentConfirmed;
            }
            PaymentSignal::Failure => {
                warn!(url, "gateway navigation signalled failure");
                self.state = CheckoutState::PaymentFailed;
            }
            PaymentSignal::Indeterminate => {}
        }
        Ok(signal)
    }

    /// Delete the purchase (cascading to its items) and return to `NoOrder`.
    ///
    /// Legal from any state at-or-after `OrderCreated`, but only while the
    /// authoritative record is still fully pending; the record is re-read
    /// first since a payment callback may have landed in the meantime. The
    /// caller must re-run entitlement resolution afterwards.
    pub async fn cancel(&mut self) -> Result<(), PipelineError> {
        if !self.state.at_or_after_order() {
            return Err(self.illegal("cancel"));
        }
        let purchase_id = self.purchase.as_ref().map(|p| p.id).ok_or(DomainError::NotFound)?;

        match self.store.get(purchase_id).await? {
            Some(current) if !current.is_cancellable() => {
                return Err(DomainError::conflict("order is no longer pending").into());
            }
            Some(_) => {
                self.store.delete_with_items(purchase_id).await?;
                debug!(purchase_id = %purchase_id, "order cancelled");
            }
            // Already deleted elsewhere; resetting is still correct.
            None => {}
        }

        self.reset();
        Ok(())
    }

    fn reset(&mut self) {
        self.state = CheckoutState::NoOrder;
        self.package = None;
        self.cart = Cart::new();
        self.purchase = None;
        self.items.clear();
        self.token = None;
    }
}
