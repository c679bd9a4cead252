//! Per-user session tying entitlement to the media gallery and checkout.

use std::sync::Arc;

use tracing::{debug, warn};

use keepsake_catalog::CatalogReader;
use keepsake_core::{DomainError, UserId};
use keepsake_entitlement::{Entitlement, EntitlementError, EntitlementResolver, EventStore};
use keepsake_media::{MediaChangeFeed, MediaFilter, MediaStore, MediaSynchronizer, ObjectStorage};
use keepsake_orders::{CheckoutPipeline, PaymentGateway, PipelineError, PurchaseStore};

/// The gallery mirror as held by a session.
pub type SessionGallery =
    MediaSynchronizer<Arc<dyn MediaStore>, Arc<dyn ObjectStorage>, Arc<dyn MediaChangeFeed>>;

/// A checkout pipeline wired to the session's backends.
pub type SessionCheckout = CheckoutPipeline<Arc<dyn PurchaseStore>, Arc<dyn PaymentGateway>>;

/// Composition root for one signed-in user.
///
/// `refresh` re-derives entitlement and keeps the gallery consistent with
/// it: media is only loaded and subscribed while a package is active, and
/// the subscription is torn down the moment access lapses. Safe to call on
/// every app foreground and payment return.
pub struct EventSession {
    resolver: EntitlementResolver<
        Arc<dyn EventStore>,
        Arc<dyn PurchaseStore>,
        Arc<dyn CatalogReader>,
    >,
    purchases: Arc<dyn PurchaseStore>,
    gateway: Arc<dyn PaymentGateway>,
    media_store: Arc<dyn MediaStore>,
    storage: Arc<dyn ObjectStorage>,
    feed: Arc<dyn MediaChangeFeed>,
    user_id: UserId,
    entitlement: Option<Entitlement>,
    gallery: Option<SessionGallery>,
}

impl EventSession {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        events: Arc<dyn EventStore>,
        purchases: Arc<dyn PurchaseStore>,
        catalog: Arc<dyn CatalogReader>,
        media_store: Arc<dyn MediaStore>,
        storage: Arc<dyn ObjectStorage>,
        feed: Arc<dyn MediaChangeFeed>,
        gateway: Arc<dyn PaymentGateway>,
        user_id: UserId,
    ) -> Self {
        Self {
            resolver: EntitlementResolver::new(events, purchases.clone(), catalog),
            purchases,
            gateway,
            media_store,
            storage,
            feed,
            user_id,
            entitlement: None,
            gallery: None,
        }
    }

    pub fn entitlement(&self) -> Option<&Entitlement> {
        self.entitlement.as_ref()
    }

    pub fn gallery(&self) -> Option<&SessionGallery> {
        self.gallery.as_ref()
    }

    pub fn gallery_mut(&mut self) -> Option<&mut SessionGallery> {
        self.gallery.as_mut()
    }

    /// Re-resolve entitlement and reconcile the gallery with it.
    ///
    /// Gaining access loads the gallery and opens its live subscription;
    /// losing access (or switching events) tears both down. While access is
    /// unchanged, queued live changes are drained into the mirror.
    pub async fn refresh(&mut self) -> Result<&Entitlement, EntitlementError> {
        let entitlement = self.resolver.resolve(self.user_id).await?;

        if entitlement.media_enabled() {
            let same_event = self
                .gallery
                .as_ref()
                .is_some_and(|g| g.event_id() == entitlement.event.id);
            if same_event {
                if let Some(gallery) = self.gallery.as_mut() {
                    gallery.drain();
                }
            } else {
                let mut gallery = MediaSynchronizer::new(
                    self.media_store.clone(),
                    self.storage.clone(),
                    self.feed.clone(),
                    entitlement.event.id,
                );
                // Subscribe before the initial load so nothing lands in the
                // gap between them.
                gallery.subscribe();
                if let Err(e) = gallery.load(MediaFilter::All).await {
                    warn!(event_id = %entitlement.event.id, error = %e, "initial media load failed");
                }
                self.gallery = Some(gallery);
            }
        } else if self.gallery.take().is_some() {
            debug!(event_id = %entitlement.event.id, "media access lapsed; gallery torn down");
        }

        Ok(self.entitlement.insert(entitlement))
    }

    /// Begin a fresh checkout for the session's event. Requires a prior
    /// successful `refresh`.
    pub fn start_checkout(&self) -> Result<SessionCheckout, DomainError> {
        let entitlement = self
            .entitlement
            .as_ref()
            .ok_or_else(|| DomainError::invariant("refresh the session before checkout"))?;
        Ok(CheckoutPipeline::new(
            self.purchases.clone(),
            self.gateway.clone(),
            entitlement.event.id,
        ))
    }

    /// Rehydrate the still-pending order surfaced by the last refresh, if
    /// there is one to resume.
    pub fn resume_checkout(&self) -> Result<Option<SessionCheckout>, PipelineError> {
        let Some(entitlement) = &self.entitlement else {
            return Ok(None);
        };
        let Some(purchase) = &entitlement.purchase else {
            return Ok(None);
        };
        if !purchase.is_cancellable() {
            return Ok(None);
        }
        let pipeline = CheckoutPipeline::resume(
            self.purchases.clone(),
            self.gateway.clone(),
            purchase.clone(),
            entitlement.purchase_items.clone(),
        )?;
        Ok(Some(pipeline))
    }
}
