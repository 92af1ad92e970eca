//! Raw promotion extraction from rendered listing HTML.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::types::RawPromotion;

pub const PROMOTION_ID_ATTRIBUTE: &str = "data-promotion-id";

static CARD_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article").expect("valid card selector"));
static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".offer-card__title").expect("valid title selector"));
static ORIGINAL_TEXT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".offer-card__text").expect("valid card text selector"));
static DEAL_TEXT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".price-splash__text").expect("valid splash selector"));

/// Concatenated text of every descendant of `card` matching `selector`.
fn text_of(card: &ElementRef<'_>, selector: &Selector) -> String {
    card.select(selector)
        .flat_map(|el| el.text())
        .collect::<String>()
}

/// Walks rendered listing HTML and returns one [`RawPromotion`] per card, in
/// document order.
///
/// Never fails. Cards without a promotion id are not promotions and are
/// skipped silently. Cards with a blank title, or repeating an id already
/// seen in this document, are skipped with a warning.
#[must_use]
pub fn extract_raw_promotions(html: &str) -> Vec<RawPromotion> {
    let document = Html::parse_fragment(html);
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut promotions = Vec::new();

    for card in document.select(&CARD_SELECTOR) {
        let Some(id) = card.value().attr(PROMOTION_ID_ATTRIBUTE) else {
            continue;
        };

        let name = text_of(&card, &TITLE_SELECTOR).trim().to_string();
        if name.is_empty() {
            tracing::warn!(promotion_id = %id, "promotion card has no title; skipping");
            continue;
        }

        if !seen_ids.insert(id.to_string()) {
            tracing::warn!(promotion_id = %id, name = %name, "duplicate promotion id; skipping");
            continue;
        }

        promotions.push(RawPromotion {
            id: id.to_string(),
            name,
            original_price_text: text_of(&card, &ORIGINAL_TEXT_SELECTOR),
            deal_text: text_of(&card, &DEAL_TEXT_SELECTOR).to_lowercase(),
        });
    }

    tracing::debug!(count = promotions.len(), "extracted raw promotions");
    promotions
}
