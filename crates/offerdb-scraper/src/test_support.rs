//! In-memory rendering session for readiness, render, and pipeline tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::ScraperError;
use crate::session::{RenderSession, SessionLauncher};

/// A page as the fake browser would see it once rendering stops.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakePage {
    pub visible_cards: usize,
    pub list_length: Option<String>,
    pub html: String,
}

impl FakePage {
    /// A fully rendered page whose list length matches its cards.
    pub fn complete(html: &str, cards: usize) -> Self {
        Self {
            visible_cards: cards,
            list_length: Some(cards.to_string()),
            html: html.to_string(),
        }
    }
}

/// Pages keyed by URL, plus counters shared by every session it hands out.
#[derive(Debug, Default)]
pub(crate) struct FakeSite {
    pages: HashMap<String, FakePage>,
    fallback: Option<FakePage>,
    pub launches: AtomicUsize,
    pub closes: AtomicUsize,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, page: FakePage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    fn page_for(&self, url: &str) -> Option<FakePage> {
        self.pages.get(url).cloned().or_else(|| self.fallback.clone())
    }
}

pub(crate) struct FakeSession {
    site: Arc<FakeSite>,
    current: Mutex<Option<FakePage>>,
    navigations: Mutex<Vec<String>>,
    waits: Mutex<Vec<String>>,
}

impl FakeSession {
    /// A session where every URL resolves to the same page.
    pub fn new(visible_cards: usize, list_length: Option<&str>) -> Self {
        let site = FakeSite {
            fallback: Some(FakePage {
                visible_cards,
                list_length: list_length.map(str::to_string),
                html: "<div class=\"offers__container\"></div>".to_string(),
            }),
            ..FakeSite::default()
        };
        Self::on_site(Arc::new(site))
    }

    pub fn on_site(site: Arc<FakeSite>) -> Self {
        Self {
            site,
            current: Mutex::new(None),
            navigations: Mutex::new(Vec::new()),
            waits: Mutex::new(Vec::new()),
        }
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn waited_selectors(&self) -> Vec<String> {
        self.waits.lock().unwrap().clone()
    }

    fn current_page(&self) -> Result<FakePage, ScraperError> {
        self.current
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ScraperError::Browser("no page loaded".to_string()))
    }
}

/// Position `n` out of `article:nth-child(n)`, if the selector has that form.
fn nth_child_index(selector: &str) -> Option<usize> {
    let rest = selector.split_once(":nth-child(")?.1;
    rest.strip_suffix(')')?.parse().ok()
}

#[async_trait]
impl RenderSession for FakeSession {
    async fn navigate(&self, url: &str) -> Result<(), ScraperError> {
        self.navigations.lock().unwrap().push(url.to_string());
        let page = self.site.page_for(url).ok_or_else(|| ScraperError::Navigation {
            url: url.to_string(),
            reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
        })?;
        *self.current.lock().unwrap() = Some(page);
        Ok(())
    }

    async fn wait_visible(&self, selector: &str) -> Result<(), ScraperError> {
        self.waits.lock().unwrap().push(selector.to_string());
        let page = self.current_page()?;
        let needed = nth_child_index(selector).unwrap_or(1);
        if page.visible_cards >= needed {
            Ok(())
        } else {
            std::future::pending().await
        }
    }

    async fn attribute(&self, _selector: &str, name: &str) -> Result<Option<String>, ScraperError> {
        let page = self.current_page()?;
        if name == crate::readiness::LIST_LENGTH_ATTRIBUTE {
            Ok(page.list_length)
        } else {
            Ok(None)
        }
    }

    async fn outer_html(&self, _selector: &str) -> Result<String, ScraperError> {
        Ok(self.current_page()?.html)
    }

    async fn close(&self) {
        self.site.closes.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) struct FakeLauncher {
    pub site: Arc<FakeSite>,
}

impl FakeLauncher {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site: Arc::new(site),
        }
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn RenderSession>, ScraperError> {
        self.site.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession::on_site(Arc::clone(&self.site))))
    }
}

/// One promotion card as the listing page renders it.
pub(crate) fn card(id: &str, title: &str, original: &str, deal: &str) -> String {
    format!(
        r#"<article data-promotion-id="{id}">
  <h3 class="offer-card__title">{title}</h3>
  <p class="offer-card__text">{original}</p>
  <div class="price-splash"><span class="price-splash__text">{deal}</span></div>
</article>"#
    )
}

pub(crate) fn container(cards: &[String]) -> String {
    format!(
        "<div class=\"offers__container\">{}</div>",
        cards.concat()
    )
}
