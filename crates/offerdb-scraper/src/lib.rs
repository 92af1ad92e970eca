pub mod classify;
pub mod discount;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod price;
pub mod readiness;
pub mod render;
pub mod session;
pub mod types;

#[cfg(feature = "browser")]
pub mod browser;

#[cfg(test)]
pub(crate) mod test_support;

#[cfg(feature = "browser")]
pub use browser::{BrowserSettings, ChromiumLauncher};
pub use classify::normalize_offer;
pub use discount::compute_discount;
pub use error::ScraperError;
pub use extract::extract_raw_promotions;
pub use pipeline::{OfferPipeline, PipelineSettings, StoreOutcome};
pub use price::parse_price;
pub use readiness::{PromotionListReadiness, ReadinessStrategy};
pub use render::render_page;
pub use session::{RenderSession, SessionLauncher};
pub use types::RawPromotion;
