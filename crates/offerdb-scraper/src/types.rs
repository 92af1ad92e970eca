/// Unparsed text captured from one promotion card.
///
/// Produced by [`crate::extract::extract_raw_promotions`] and consumed once by
/// [`crate::classify::normalize_offer`]. `deal_text` is already lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPromotion {
    /// Value of the card's `data-promotion-id` attribute.
    pub id: String,
    /// Trimmed card title. Never empty.
    pub name: String,
    /// Free text that may contain an `Ord.pris <price>` fragment.
    pub original_price_text: String,
    /// Price splash text, e.g. `"2 för 30:-"` or `"25:-/st"`.
    pub deal_text: String,
}
