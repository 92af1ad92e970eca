//! Deadline-bounded render step: readiness, then container HTML.

use std::time::Duration;

use crate::error::ScraperError;
use crate::readiness::ReadinessStrategy;
use crate::session::RenderSession;

pub const OFFERS_CONTAINER_SELECTOR: &str = ".offers__container";
pub const DEFAULT_RENDER_DEADLINE: Duration = Duration::from_secs(45);

/// Drives `session` to `url`, waits for `strategy` to report the page ready,
/// and returns the outer HTML of `container_selector`.
///
/// Readiness and extraction share one `deadline`. On expiry the in-flight
/// browser call is dropped and [`ScraperError::RenderTimeout`] is returned;
/// the caller still owns the session and must close it.
///
/// # Errors
///
/// Returns [`ScraperError::RenderTimeout`] when the deadline elapses, or any
/// navigation, malformed-page, or browser error raised along the way.
pub async fn render_page(
    session: &dyn RenderSession,
    url: &str,
    strategy: &dyn ReadinessStrategy,
    container_selector: &str,
    deadline: Duration,
) -> Result<String, ScraperError> {
    let work = async {
        strategy.await_ready(session, url).await?;
        session.outer_html(container_selector).await
    };

    if let Ok(result) = tokio::time::timeout(deadline, work).await {
        result
    } else {
        tracing::warn!(url, deadline_secs = deadline.as_secs(), "render deadline exceeded");
        Err(ScraperError::RenderTimeout {
            url: url.to_string(),
            timeout_secs: deadline.as_secs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readiness::PromotionListReadiness;
    use crate::test_support::FakeSession;

    const URL: &str = "https://offers.test/store-1";

    #[tokio::test(start_paused = true)]
    async fn returns_container_html_once_ready() {
        let session = FakeSession::new(2, Some("2"));
        let html = render_page(
            &session,
            URL,
            &PromotionListReadiness::default(),
            OFFERS_CONTAINER_SELECTOR,
            DEFAULT_RENDER_DEADLINE,
        )
        .await
        .unwrap();
        assert!(html.contains("offers__container"));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_page_times_out_with_deadline_in_error() {
        let session = FakeSession::new(11, Some("12"));
        let err = render_page(
            &session,
            URL,
            &PromotionListReadiness::default(),
            OFFERS_CONTAINER_SELECTOR,
            DEFAULT_RENDER_DEADLINE,
        )
        .await
        .unwrap_err();
        match err {
            ScraperError::RenderTimeout { url, timeout_secs } => {
                assert_eq!(url, URL);
                assert_eq!(timeout_secs, 45);
            }
            other => panic!("expected RenderTimeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn settle_delay_counts_against_the_deadline() {
        let session = FakeSession::new(1, Some("1"));
        let strategy = PromotionListReadiness::with_settle_delay(Duration::from_secs(10));
        let err = render_page(
            &session,
            URL,
            &strategy,
            OFFERS_CONTAINER_SELECTOR,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "render_timeout");
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_page_is_not_reported_as_timeout() {
        let session = FakeSession::new(4, Some("0"));
        let err = render_page(
            &session,
            URL,
            &PromotionListReadiness::default(),
            OFFERS_CONTAINER_SELECTOR,
            DEFAULT_RENDER_DEADLINE,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ScraperError::MalformedPage { .. }));
    }
}
