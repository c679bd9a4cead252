//! `keepsake-orders` — purchase records and the checkout pipeline.
//!
//! A purchase ties an event to an optional package and product line items.
//! The pipeline drives the multi-step checkout (order → address → payment
//! token → gateway handoff → confirmation) as an explicit state machine.
//! Payment itself is delegated to an external hosted gateway; the purchase's
//! `status`/`payment_status` fields are updated out-of-band by a trusted
//! callback handler and are never written by this crate.

pub mod gateway;
pub mod pipeline;
pub mod purchase;
pub mod store;

pub use gateway::{
    BasketLine, GatewayError, GatewayMode, PaymentGateway, PaymentSignal, TokenGrant,
    TokenRequest, TokenResponse,
};
pub use pipeline::{BuyerContact, CheckoutPipeline, CheckoutState, PipelineError};
pub use purchase::{PaymentStatus, Purchase, PurchaseItem, PurchaseStatus, ShippingDetails};
pub use store::PurchaseStore;
