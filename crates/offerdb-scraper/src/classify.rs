//! Classification of raw promotion text into a [`PricingScheme`] and the
//! structured fields that scheme uses.
//!
//! Rules are tried in table order and the first match wins. Adding a scheme
//! means adding a rule to [`RULES`]; nothing else in the normalizer changes.

use std::borrow::Cow;
use std::sync::LazyLock;

use offerdb_core::{NormalizedOffer, PricingScheme, Store};
use regex::Regex;
use rust_decimal::Decimal;

use crate::price::parse_price;
use crate::types::RawPromotion;

static ORIGINAL_PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Ord\.pris\s*([\d:,-]+)").expect("valid original price regex"));
static PERCENTAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)%").expect("valid percentage regex"));
static PARENTHESIZED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("valid parenthesized regex"));
static MULTIBUY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*för\s*([\d\s:,.]+)").expect("valid multibuy regex"));
static SINGLE_PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:[.,:]\d+)?)\s*(?:[-:/]|kr|st|kg)*").expect("valid single price regex")
});

/// A classification rule: on match, fills the scheme-specific fields of the
/// offer and returns `true`.
type Rule = fn(&str, &mut NormalizedOffer) -> bool;

const RULES: [Rule; 3] = [percentage_off, multi_buy, single_price];

/// `"20%"`, `"spara 25%"`. Parenthesized percentages annotate another
/// scheme (`"2 för 30:- (20%)"`) and are ignored here.
fn percentage_off(deal_text: &str, offer: &mut NormalizedOffer) -> bool {
    let without_notes: Cow<'_, str> = PARENTHESIZED_RE.replace_all(deal_text, "");
    let Some(caps) = PERCENTAGE_RE.captures(&without_notes) else {
        return false;
    };
    offer.scheme = PricingScheme::PercentageOff;
    offer.percent_off_value = caps[1].parse().unwrap_or(0);
    true
}

/// `"2 för 30:-"`, `"3 för 100 kr"`.
fn multi_buy(deal_text: &str, offer: &mut NormalizedOffer) -> bool {
    let Some(caps) = MULTIBUY_RE.captures(deal_text) else {
        return false;
    };
    offer.scheme = PricingScheme::MultiBuy;
    offer.sale_quantity = caps[1].parse().unwrap_or(0);
    offer.sale_price_total = parse_price(&caps[2]);
    true
}

/// `"15:-"`, `"25:90/st"`, `"79 kr/kg"`.
fn single_price(deal_text: &str, offer: &mut NormalizedOffer) -> bool {
    let Some(caps) = SINGLE_PRICE_RE.captures(deal_text) else {
        return false;
    };
    offer.scheme = PricingScheme::SinglePrice;
    offer.sale_price = parse_price(&caps[1]);
    true
}

/// Link to the promotion's detail view on the store's listing page.
#[must_use]
pub fn product_url(base_url: &str, store: &Store, promotion_id: &str) -> String {
    format!(
        "{}?id={promotion_id}&action=details",
        store.listing_url(base_url)
    )
}

/// Builds a [`NormalizedOffer`] from one raw promotion.
///
/// Never fails: deal text no rule recognizes yields
/// [`PricingScheme::Unknown`] with every scheme field left at zero.
/// `discount_percentage` is left at zero for
/// [`crate::discount::compute_discount`] to fill.
#[must_use]
pub fn normalize_offer(raw: &RawPromotion, store: &Store, base_url: &str) -> NormalizedOffer {
    let original_price = ORIGINAL_PRICE_RE
        .captures(&raw.original_price_text)
        .map_or(Decimal::ZERO, |caps| parse_price(&caps[1]));

    let mut offer = NormalizedOffer {
        store_name: store.name.clone(),
        product_name: raw.name.clone(),
        product_url: product_url(base_url, store, &raw.id),
        original_price,
        ..NormalizedOffer::default()
    };

    if !RULES.iter().any(|rule| rule(&raw.deal_text, &mut offer)) {
        tracing::debug!(
            promotion_id = %raw.id,
            deal_text = %raw.deal_text,
            "deal text matched no pricing scheme"
        );
    }

    offer
}

#[cfg(test)]
#[path = "classify_test.rs"]
mod tests;
