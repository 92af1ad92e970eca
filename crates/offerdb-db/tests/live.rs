//! Live integration tests for offerdb-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/offerdb-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory. Run with `cargo test -- --ignored` and `DATABASE_URL`
//! pointing at a Postgres server.

use std::collections::BTreeSet;

use offerdb_core::{CategoryMap, NormalizedOffer, PricingScheme};
use offerdb_db::{count_offers, health_check, list_offers, upsert_offers, OfferFilters};
use rust_decimal::Decimal;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_offer(store: &str, name: &str, id: &str, discount: i64) -> NormalizedOffer {
    NormalizedOffer {
        store_name: store.to_string(),
        product_name: name.to_string(),
        product_url: format!("https://www.ica.se/erbjudanden/{store}?id={id}&action=details"),
        scheme: PricingScheme::SinglePrice,
        original_price: Decimal::from(20),
        sale_price: Decimal::from(15),
        discount_percentage: Decimal::from(discount),
        ..NormalizedOffer::default()
    }
}

fn categories(name: &str, labels: &[&str]) -> CategoryMap {
    let labels: BTreeSet<String> = labels.iter().map(|l| (*l).to_string()).collect();
    CategoryMap::from([(name.to_string(), labels)])
}

// ---------------------------------------------------------------------------
// Upsert
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn upsert_inserts_then_updates_in_place(pool: sqlx::PgPool) {
    let first = vec![make_offer("ica-a", "Mjölk", "p1", 25)];
    let affected = upsert_offers(&pool, &first, &CategoryMap::new())
        .await
        .expect("first upsert failed");
    assert_eq!(affected, 1);

    let mut second = first.clone();
    second[0].sale_price = Decimal::from(12);
    second[0].discount_percentage = Decimal::from(40);
    upsert_offers(&pool, &second, &CategoryMap::new())
        .await
        .expect("second upsert failed");

    assert_eq!(count_offers(&pool).await.unwrap(), 1);
    let rows = list_offers(&pool, OfferFilters::default()).await.unwrap();
    assert_eq!(rows[0].sale_price, Decimal::from(12));
    assert_eq!(rows[0].discount_percentage, Decimal::from(40));
    assert_eq!(rows[0].pricing_scheme(), PricingScheme::SinglePrice);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_keys_in_one_call_keep_last(pool: sqlx::PgPool) {
    let mut late = make_offer("ica-a", "Mjölk", "p1", 10);
    late.sale_price = Decimal::from(18);
    let offers = vec![make_offer("ica-a", "Mjölk", "p1", 25), late];

    upsert_offers(&pool, &offers, &CategoryMap::new())
        .await
        .expect("upsert with duplicates failed");

    let rows = list_offers(&pool, OfferFilters::default()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].sale_price, Decimal::from(18));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn empty_category_set_keeps_existing_categories(pool: sqlx::PgPool) {
    let offers = vec![make_offer("ica-a", "Kaffe", "p2", 20)];

    upsert_offers(&pool, &offers, &categories("Kaffe", &["Dryck", "Skafferi"]))
        .await
        .unwrap();
    upsert_offers(&pool, &offers, &CategoryMap::new()).await.unwrap();

    let rows = list_offers(&pool, OfferFilters::default()).await.unwrap();
    assert_eq!(rows[0].categories, vec!["Dryck".to_string(), "Skafferi".to_string()]);

    upsert_offers(&pool, &offers, &categories("Kaffe", &["Frukost"]))
        .await
        .unwrap();
    let rows = list_offers(&pool, OfferFilters::default()).await.unwrap();
    assert_eq!(rows[0].categories, vec!["Frukost".to_string()]);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn upsert_spans_multiple_batches(pool: sqlx::PgPool) {
    let offers: Vec<NormalizedOffer> = (0..250)
        .map(|i| make_offer("ica-a", &format!("Vara {i}"), &format!("p{i}"), 10))
        .collect();

    let affected = upsert_offers(&pool, &offers, &CategoryMap::new())
        .await
        .unwrap();
    assert_eq!(affected, 250);
    assert_eq!(count_offers(&pool).await.unwrap(), 250);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn empty_upsert_is_a_no_op(pool: sqlx::PgPool) {
    let affected = upsert_offers(&pool, &[], &CategoryMap::new()).await.unwrap();
    assert_eq!(affected, 0);
    assert_eq!(count_offers(&pool).await.unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn list_filters_and_orders_by_discount(pool: sqlx::PgPool) {
    let mut multi = make_offer("ica-b", "Chips", "p3", 30);
    multi.scheme = PricingScheme::MultiBuy;
    let offers = vec![
        make_offer("ica-a", "Mjölk", "p1", 10),
        make_offer("ica-a", "Bröd", "p2", 50),
        multi,
    ];
    upsert_offers(&pool, &offers, &CategoryMap::new()).await.unwrap();

    let all = list_offers(&pool, OfferFilters::default()).await.unwrap();
    let names: Vec<&str> = all.iter().map(|r| r.product_name.as_str()).collect();
    assert_eq!(names, vec!["Bröd", "Chips", "Mjölk"]);

    let store_a = list_offers(
        &pool,
        OfferFilters {
            store_name: Some("ica-a"),
            ..OfferFilters::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(store_a.len(), 2);

    let multibuy = list_offers(
        &pool,
        OfferFilters {
            scheme: Some(PricingScheme::MultiBuy),
            ..OfferFilters::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(multibuy.len(), 1);
    assert_eq!(multibuy[0].product_name, "Chips");

    let limited = list_offers(
        &pool,
        OfferFilters {
            limit: Some(1),
            ..OfferFilters::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].product_name, "Bröd");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn health_check_succeeds_on_live_pool(pool: sqlx::PgPool) {
    health_check(&pool).await.expect("health check failed");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn extreme_discounts_and_prices_are_stored_exactly(pool: sqlx::PgPool) {
    let mut offer = make_offer("ica-a", "Mjölk", "p1", 0);
    offer.original_price = Decimal::new(1, 2);
    offer.sale_price = Decimal::from(100_000_000_000_i64);
    offer.discount_percentage = Decimal::from(-999_999_999_999_900_i64);

    upsert_offers(&pool, &[offer], &CategoryMap::new())
        .await
        .expect("upsert of extreme values failed");

    let rows = list_offers(&pool, OfferFilters::default()).await.unwrap();
    assert_eq!(rows[0].original_price, Decimal::new(1, 2));
    assert_eq!(rows[0].sale_price, Decimal::from(100_000_000_000_i64));
    assert_eq!(rows[0].discount_percentage, Decimal::from(-999_999_999_999_900_i64));
}
