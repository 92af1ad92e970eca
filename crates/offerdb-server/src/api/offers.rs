use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use offerdb_core::PricingScheme;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct OfferItem {
    id: i64,
    store_name: String,
    product_name: String,
    product_url: String,
    scheme: PricingScheme,
    original_price: Decimal,
    sale_price: Decimal,
    sale_quantity: i32,
    sale_price_total: Decimal,
    discount_percentage: Decimal,
    percent_off_value: i32,
    categories: Vec<String>,
    updated_at: DateTime<Utc>,
}

impl From<offerdb_db::OfferRow> for OfferItem {
    fn from(row: offerdb_db::OfferRow) -> Self {
        Self {
            id: row.id,
            scheme: row.pricing_scheme(),
            store_name: row.store_name,
            product_name: row.product_name,
            product_url: row.product_url,
            original_price: row.original_price,
            sale_price: row.sale_price,
            sale_quantity: row.sale_quantity,
            sale_price_total: row.sale_price_total,
            discount_percentage: row.discount_percentage,
            percent_off_value: row.percent_off_value,
            categories: row.categories,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct OfferQuery {
    pub store: Option<String>,
    pub scheme: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct CountData {
    count: i64,
}

/// Empty query values count as absent.
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

pub(super) async fn list_offers(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<OfferQuery>,
) -> Result<Json<ApiResponse<Vec<OfferItem>>>, ApiError> {
    let scheme = non_empty(query.scheme.as_deref())
        .map(str::parse::<PricingScheme>)
        .transpose()
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;

    let rows = offerdb_db::list_offers(
        &state.pool,
        offerdb_db::OfferFilters {
            store_name: non_empty(query.store.as_deref()),
            scheme,
            limit: Some(normalize_limit(query.limit)),
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(OfferItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn count_offers(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<CountData>>, ApiError> {
    let count = offerdb_db::count_offers(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: CountData { count },
        meta: ResponseMeta::new(req_id.0),
    }))
}
