//! Per-store orchestration: render, extract, normalize, discount.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use offerdb_core::{AppConfig, NormalizedOffer, Store};

use crate::classify::normalize_offer;
use crate::discount::compute_discount;
use crate::error::ScraperError;
use crate::extract::extract_raw_promotions;
use crate::readiness::{PromotionListReadiness, ReadinessStrategy};
use crate::render::{render_page, DEFAULT_RENDER_DEADLINE, OFFERS_CONTAINER_SELECTOR};
use crate::session::SessionLauncher;
use crate::types::RawPromotion;

pub const DEFAULT_BASE_URL: &str = "https://www.ica.se/erbjudanden";

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Listing root; each store's page is `{base_url}/{url_slug}`.
    pub base_url: String,
    /// Upper bound on readiness plus HTML extraction for one store.
    pub deadline: Duration,
    pub container_selector: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            deadline: DEFAULT_RENDER_DEADLINE,
            container_selector: OFFERS_CONTAINER_SELECTOR.to_string(),
        }
    }
}

impl PipelineSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            deadline: Duration::from_secs(config.render_timeout_secs),
            ..Self::default()
        }
    }
}

/// Result of scraping one store in a multi-store run.
#[derive(Debug)]
pub struct StoreOutcome {
    pub store: Store,
    pub result: Result<Vec<NormalizedOffer>, ScraperError>,
}

impl StoreOutcome {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Turns stores into normalized offers, one browser session per store.
pub struct OfferPipeline {
    launcher: Arc<dyn SessionLauncher>,
    readiness: Arc<dyn ReadinessStrategy>,
    settings: PipelineSettings,
}

impl OfferPipeline {
    pub fn new(
        launcher: Arc<dyn SessionLauncher>,
        readiness: Arc<dyn ReadinessStrategy>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            launcher,
            readiness,
            settings,
        }
    }

    /// Pipeline using the promotion-list readiness strategy with the render
    /// timings from `config`.
    pub fn from_app_config(launcher: Arc<dyn SessionLauncher>, config: &AppConfig) -> Self {
        let readiness = PromotionListReadiness::with_settle_delay(Duration::from_millis(
            config.render_settle_delay_ms,
        ));
        Self::new(
            launcher,
            Arc::new(readiness),
            PipelineSettings::from_app_config(config),
        )
    }

    #[must_use]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Scrapes one store's current promotions.
    ///
    /// The browser session is closed on every path, including timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] when the session cannot be launched or the
    /// page cannot be rendered. Per-card problems never fail the store.
    pub async fn get_store_offers(
        &self,
        store: &Store,
    ) -> Result<Vec<NormalizedOffer>, ScraperError> {
        let url = store.listing_url(&self.settings.base_url);
        tracing::info!(store = %store.name, url = %url, "scraping store offers");

        let session = self.launcher.launch().await?;
        let rendered = render_page(
            session.as_ref(),
            &url,
            self.readiness.as_ref(),
            &self.settings.container_selector,
            self.settings.deadline,
        )
        .await;
        session.close().await;

        let html = rendered.inspect_err(|e| {
            tracing::error!(store = %store.name, error = %e, kind = e.kind(), "render failed");
        })?;

        let raw = extract_raw_promotions(&html);
        let offers = self.normalize_all(&raw, store);

        tracing::info!(
            store = %store.name,
            raw = raw.len(),
            offers = offers.len(),
            "store scrape complete"
        );
        Ok(offers)
    }

    /// One offer per raw promotion, with discounts filled in.
    fn normalize_all(&self, raw: &[RawPromotion], store: &Store) -> Vec<NormalizedOffer> {
        raw.iter()
            .map(|promotion| {
                let mut offer = normalize_offer(promotion, store, &self.settings.base_url);
                offer.discount_percentage = compute_discount(&offer);
                offer
            })
            .collect()
    }

    /// Scrapes every store with at most `max_concurrent` sessions open.
    ///
    /// A failing store never cancels its siblings; every store gets an
    /// outcome, in completion order.
    pub async fn scrape_stores(
        &self,
        stores: &[Store],
        max_concurrent: usize,
    ) -> Vec<StoreOutcome> {
        stream::iter(stores.iter().cloned().map(|store| async move {
            let result = self.get_store_offers(&store).await;
            StoreOutcome { store, result }
        }))
        .buffer_unordered(max_concurrent.max(1))
            .collect()
            .await
    }
}
