//! Database operations for the `offers` table.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use offerdb_core::{CategoryMap, NormalizedOffer, PricingScheme};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::DbError;

/// Rows per multi-row `INSERT` statement.
pub const UPSERT_BATCH_SIZE: usize = 100;

/// A row from the `offers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OfferRow {
    pub id: i64,
    pub store_name: String,
    pub product_name: String,
    pub product_url: String,
    /// One of `unknown`, `single`, `multibuy`, `percentage`.
    pub scheme: String,
    pub original_price: Decimal,
    pub sale_price: Decimal,
    pub sale_quantity: i32,
    pub sale_price_total: Decimal,
    pub discount_percentage: Decimal,
    pub percent_off_value: i32,
    pub categories: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OfferRow {
    /// Parsed `scheme`; values outside the known set read as `Unknown`.
    #[must_use]
    pub fn pricing_scheme(&self) -> PricingScheme {
        self.scheme.parse().unwrap_or_default()
    }
}

/// Input filters for offer listing.
#[derive(Debug, Clone, Default)]
pub struct OfferFilters<'a> {
    pub store_name: Option<&'a str>,
    pub scheme: Option<PricingScheme>,
    pub limit: Option<i64>,
}

type OfferKey<'a> = (&'a str, &'a str, &'a str);

fn offer_key(offer: &NormalizedOffer) -> OfferKey<'_> {
    (&offer.store_name, &offer.product_name, &offer.product_url)
}

/// Drops all but the last occurrence of each conflict key, keeping the
/// original relative order. Postgres rejects an upsert that touches the same
/// row twice in one statement.
fn dedupe_last_wins(offers: &[NormalizedOffer]) -> Vec<&NormalizedOffer> {
    let last_index: HashMap<OfferKey<'_>, usize> = offers
        .iter()
        .enumerate()
        .map(|(i, offer)| (offer_key(offer), i))
        .collect();

    offers
        .iter()
        .enumerate()
        .filter(|(i, offer)| last_index.get(&offer_key(offer)) == Some(i))
        .map(|(_, offer)| offer)
        .collect()
}

/// Upserts offers in batches of [`UPSERT_BATCH_SIZE`] inside one transaction.
///
/// Conflicts on `(store_name, product_name, product_url)` overwrite every
/// price field and bump `updated_at`. Categories come from `categories`
/// keyed by product name; an empty set keeps whatever the row already has.
///
/// Returns the number of rows inserted or updated.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any batch fails; the whole call is rolled
/// back.
pub async fn upsert_offers(
    pool: &PgPool,
    offers: &[NormalizedOffer],
    categories: &CategoryMap,
) -> Result<u64, DbError> {
    if offers.is_empty() {
        return Ok(0);
    }

    let unique = dedupe_last_wins(offers);
    if unique.len() < offers.len() {
        tracing::debug!(
            dropped = offers.len() - unique.len(),
            "collapsed duplicate offers before upsert"
        );
    }

    let mut tx = pool.begin().await?;
    let mut affected: u64 = 0;

    for batch in unique.chunks(UPSERT_BATCH_SIZE) {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "INSERT INTO offers \
                 (store_name, product_name, product_url, scheme, original_price, \
                  sale_price, sale_quantity, sale_price_total, discount_percentage, \
                  percent_off_value, categories) ",
        );

        builder.push_values(batch.iter().copied(), |mut row, offer| {
            let labels: Vec<String> = categories
                .get(&offer.product_name)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default();
            row.push_bind(&offer.store_name)
                .push_bind(&offer.product_name)
                .push_bind(&offer.product_url)
                .push_bind(offer.scheme.as_str())
                .push_bind(offer.original_price)
                .push_bind(offer.sale_price)
                .push_bind(offer.sale_quantity)
                .push_bind(offer.sale_price_total)
                .push_bind(offer.discount_percentage)
                .push_bind(offer.percent_off_value)
                .push_bind(labels);
        });

        builder.push(
            " ON CONFLICT (store_name, product_name, product_url) DO UPDATE SET \
                 scheme              = EXCLUDED.scheme, \
                 original_price      = EXCLUDED.original_price, \
                 sale_price          = EXCLUDED.sale_price, \
                 sale_quantity       = EXCLUDED.sale_quantity, \
                 sale_price_total    = EXCLUDED.sale_price_total, \
                 discount_percentage = EXCLUDED.discount_percentage, \
                 percent_off_value   = EXCLUDED.percent_off_value, \
                 categories          = CASE \
                     WHEN cardinality(EXCLUDED.categories) > 0 THEN EXCLUDED.categories \
                     ELSE offers.categories \
                 END, \
                 updated_at          = NOW()",
        );

        let result = builder.build().execute(&mut *tx).await?;
        affected += result.rows_affected();
    }

    tx.commit().await?;
    Ok(affected)
}

/// Total number of persisted offers.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_offers(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM offers")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Lists offers, biggest discount first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_offers(
    pool: &PgPool,
    filters: OfferFilters<'_>,
) -> Result<Vec<OfferRow>, DbError> {
    let rows = sqlx::query_as::<_, OfferRow>(
        "SELECT \
             id, store_name, product_name, product_url, scheme, original_price, \
             sale_price, sale_quantity, sale_price_total, discount_percentage, \
             percent_off_value, categories, created_at, updated_at \
         FROM offers \
         WHERE ($1::TEXT IS NULL OR store_name = $1) \
           AND ($2::TEXT IS NULL OR scheme = $2) \
         ORDER BY discount_percentage DESC, id ASC \
         LIMIT COALESCE($3, 9223372036854775807)",
    )
    .bind(filters.store_name)
    .bind(filters.scheme.map(PricingScheme::as_str))
    .bind(filters.limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
