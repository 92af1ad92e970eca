//! Deciding when a dynamically rendered promotion list is complete.
//!
//! The listing page reports its own cardinality: every promotion card carries
//! a `data-promotion-list-length` attribute. Waiting for the first card, then
//! for the card at that position, proves the whole list has rendered without
//! guessing at a fixed sleep.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScraperError;
use crate::session::RenderSession;

pub const PROMOTION_CARD_SELECTOR: &str = "article";
pub const LIST_LENGTH_ATTRIBUTE: &str = "data-promotion-list-length";
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Site-specific procedure that returns once a page is safe to scrape.
///
/// Runs inside the caller's deadline; implementations should not impose
/// their own overall timeout.
#[async_trait]
pub trait ReadinessStrategy: Send + Sync {
    async fn await_ready(&self, session: &dyn RenderSession, url: &str)
        -> Result<(), ScraperError>;
}

/// Two-phase wait on the promotion list's self-reported length.
#[derive(Debug, Clone)]
pub struct PromotionListReadiness {
    pub card_selector: String,
    pub count_attribute: String,
    /// Pause after the last card appears, for trailing layout and script work.
    pub settle_delay: Duration,
}

impl Default for PromotionListReadiness {
    fn default() -> Self {
        Self {
            card_selector: PROMOTION_CARD_SELECTOR.to_string(),
            count_attribute: LIST_LENGTH_ATTRIBUTE.to_string(),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

impl PromotionListReadiness {
    #[must_use]
    pub fn with_settle_delay(settle_delay: Duration) -> Self {
        Self {
            settle_delay,
            ..Self::default()
        }
    }

    /// Selector for the card at 1-based position `n`.
    #[must_use]
    pub fn nth_card_selector(&self, n: usize) -> String {
        format!("{}:nth-child({n})", self.card_selector)
    }
}

/// Parses the expected item count. Absent, non-numeric, and non-positive
/// values are all structural page failures.
fn parse_expected_count(
    raw: Option<&str>,
    attribute: &str,
    url: &str,
) -> Result<usize, ScraperError> {
    let raw = raw.ok_or_else(|| ScraperError::MalformedPage {
        url: url.to_string(),
        reason: format!("promotion card has no '{attribute}' attribute"),
    })?;

    match raw.trim().parse::<i64>() {
        Ok(n) if n > 0 => usize::try_from(n).map_err(|_| ScraperError::MalformedPage {
            url: url.to_string(),
            reason: format!("'{attribute}' value {n} is out of range"),
        }),
        _ => Err(ScraperError::MalformedPage {
            url: url.to_string(),
            reason: format!("'{attribute}' must be a positive integer, got '{raw}'"),
        }),
    }
}

#[async_trait]
impl ReadinessStrategy for PromotionListReadiness {
    async fn await_ready(
        &self,
        session: &dyn RenderSession,
        url: &str,
    ) -> Result<(), ScraperError> {
        session.navigate(url).await?;
        session.wait_visible(&self.card_selector).await?;

        let raw = session
            .attribute(&self.card_selector, &self.count_attribute)
            .await?;
        let expected = parse_expected_count(raw.as_deref(), &self.count_attribute, url)?;

        tracing::info!(url, expected, "waiting for promotion list to render");

        session
            .wait_visible(&self.nth_card_selector(expected))
            .await?;

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        tracing::debug!(url, expected, "promotion list ready");
        Ok(())
    }
}
