//! Rendering-engine seam.
//!
//! The readiness strategy and the render step only talk to a browser through
//! [`RenderSession`]; [`SessionLauncher`] hands out one fresh session per
//! store so concurrent scrapes never share browser state.

use async_trait::async_trait;

use crate::error::ScraperError;

/// One live rendering session (a browser tab with its own process).
#[async_trait]
pub trait RenderSession: Send + Sync {
    /// Navigates to `url` and returns once the navigation has committed.
    async fn navigate(&self, url: &str) -> Result<(), ScraperError>;

    /// Resolves once an element matching `selector` is present and visible.
    ///
    /// Implementations wait indefinitely; callers bound the wait with a
    /// deadline.
    async fn wait_visible(&self, selector: &str) -> Result<(), ScraperError>;

    /// Reads attribute `name` of the first element matching `selector`.
    async fn attribute(
        &self,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, ScraperError>;

    /// Returns the outer HTML of the first element matching `selector`.
    async fn outer_html(&self, selector: &str) -> Result<String, ScraperError>;

    /// Tears the session down. Safe to call more than once.
    async fn close(&self);
}

/// Opens new rendering sessions.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn RenderSession>, ScraperError>;
}
