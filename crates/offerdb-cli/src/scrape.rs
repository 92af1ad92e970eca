//! `scrape` and `stores` command handlers.
//!
//! A failing store is logged and skipped; the run only fails when every
//! selected store failed.

use std::future::Future;
use std::sync::Arc;

use offerdb_categorizer::{Categorizer, GeminiCategorizer};
use offerdb_core::{load_stores, AppConfig, CategoryMap, NormalizedOffer, Store, StoresFile};
use offerdb_scraper::{BrowserSettings, ChromiumLauncher, OfferPipeline, StoreOutcome};
use sqlx::PgPool;

/// Totals for one scrape run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScrapeSummary {
    pub stores: usize,
    pub failed: usize,
    pub offers: usize,
    pub persisted: u64,
}

/// Offers scraped from one store. Each store is persisted on its own.
#[derive(Debug)]
pub(crate) struct StoreOffers {
    pub store: Store,
    pub offers: Vec<NormalizedOffer>,
}

/// Picks the stores to scrape: all of them, or the one whose slug matches.
pub(crate) fn select_stores(
    file: StoresFile,
    filter: Option<&str>,
) -> anyhow::Result<Vec<Store>> {
    match filter {
        Some(slug) => {
            let store = file
                .find(slug)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("store '{slug}' not found in stores file"))?;
            Ok(vec![store])
        }
        None => Ok(file.stores),
    }
}

/// Keeps the successful outcomes grouped by store and counts the failures.
///
/// # Errors
///
/// Fails when every store failed.
pub(crate) fn gather_offers(
    outcomes: Vec<StoreOutcome>,
) -> anyhow::Result<(Vec<StoreOffers>, usize)> {
    let total = outcomes.len();
    let mut failed = 0;
    let mut batches = Vec::with_capacity(total);

    for outcome in outcomes {
        match outcome.result {
            Ok(offers) => batches.push(StoreOffers {
                store: outcome.store,
                offers,
            }),
            Err(e) => {
                tracing::error!(
                    store = %outcome.store.name,
                    error = %e,
                    kind = e.kind(),
                    "store scrape failed"
                );
                failed += 1;
            }
        }
    }

    if failed > 0 {
        tracing::warn!(
            failed_stores = failed,
            total_stores = total,
            "some stores failed during scrape"
        );
    }

    if total > 0 && failed == total {
        anyhow::bail!("all {failed} stores failed to scrape");
    }

    Ok((batches, failed))
}

/// Writes each store's offers with a separate `persist` call. A store whose
/// write fails is logged and counted; the remaining stores are still written.
///
/// Returns the rows persisted and the number of stores that failed.
pub(crate) async fn persist_per_store<F, Fut>(
    batches: Vec<StoreOffers>,
    mut persist: F,
) -> (u64, usize)
where
    F: FnMut(Vec<NormalizedOffer>) -> Fut,
    Fut: Future<Output = anyhow::Result<u64>>,
{
    let mut persisted = 0;
    let mut failed = 0;

    for StoreOffers { store, offers } in batches {
        let count = offers.len();
        match persist(offers).await {
            Ok(rows) => {
                tracing::debug!(
                    store = %store.name,
                    offers = count,
                    rows,
                    "store offers persisted"
                );
                persisted += rows;
            }
            Err(e) => {
                tracing::error!(
                    store = %store.name,
                    offers = count,
                    error = %e,
                    "failed to persist store offers"
                );
                failed += 1;
            }
        }
    }

    (persisted, failed)
}

fn print_outcome(outcome: &StoreOutcome) {
    match &outcome.result {
        Ok(offers) => println!("{}: {} offers", outcome.store.name, offers.len()),
        Err(e) => println!("{}: failed ({})", outcome.store.name, e.kind()),
    }
}

/// Scrapes the selected stores, categorizes the products and upserts the
/// offers store by store. With `dry_run` the offers are printed and nothing
/// is written.
///
/// # Errors
///
/// Returns an error if the stores file cannot be loaded, the filter matches
/// no store, or every store fails to scrape or persist.
pub(crate) async fn run_scrape(
    pool: Option<&PgPool>,
    config: &AppConfig,
    store_filter: Option<&str>,
    dry_run: bool,
) -> anyhow::Result<ScrapeSummary> {
    let stores = select_stores(load_stores(&config.stores_path)?, store_filter)?;

    let launcher = ChromiumLauncher::new(BrowserSettings::from_app_config(config));
    let pipeline = OfferPipeline::from_app_config(Arc::new(launcher), config);

    tracing::info!(stores = stores.len(), dry_run, "starting scrape run");
    let outcomes = pipeline
        .scrape_stores(&stores, config.max_concurrent_stores)
        .await;
    for outcome in &outcomes {
        print_outcome(outcome);
    }
    let (batches, failed) = gather_offers(outcomes)?;

    let mut summary = ScrapeSummary {
        stores: stores.len(),
        failed,
        offers: batches.iter().map(|b| b.offers.len()).sum(),
        persisted: 0,
    };

    if dry_run {
        for offer in batches.iter().flat_map(|b| &b.offers) {
            println!(
                "  [{}] {} ({}) {}%",
                offer.store_name,
                offer.product_name,
                offer.scheme.as_str(),
                offer.discount_percentage
            );
        }
        println!(
            "dry-run: {} offers from {} stores; nothing written",
            summary.offers,
            summary.stores - summary.failed
        );
        return Ok(summary);
    }

    let Some(pool) = pool else {
        anyhow::bail!("a database connection is required unless --dry-run is set");
    };

    let names: Vec<String> = batches
        .iter()
        .flat_map(|b| &b.offers)
        .map(|o| o.product_name.clone())
        .collect();
    let categories = categorize(config, &names).await?;
    let categories = &categories;

    let (persisted, persist_failed) = persist_per_store(batches, |offers| async move {
        Ok(offerdb_db::upsert_offers(pool, &offers, categories).await?)
    })
    .await;
    summary.persisted = persisted;
    summary.failed += persist_failed;

    if summary.stores > 0 && summary.failed == summary.stores {
        anyhow::bail!("all {} stores failed to scrape or persist", summary.stores);
    }

    println!(
        "persisted {} offers from {} stores ({} failed)",
        summary.persisted,
        summary.stores - summary.failed,
        summary.failed
    );
    Ok(summary)
}

async fn categorize(config: &AppConfig, names: &[String]) -> anyhow::Result<CategoryMap> {
    let Some(api_key) = config.categorizer_api_key.as_deref() else {
        tracing::info!("no categorizer API key configured; skipping categorization");
        return Ok(CategoryMap::new());
    };

    let categorizer = GeminiCategorizer::new(
        api_key,
        config.categorizer_timeout_secs,
        config.categorizer_batch_size,
    )
    .map_err(|e| anyhow::anyhow!("failed to build categorizer client: {e}"))?;

    Ok(categorizer.categorize(names).await)
}

/// Prints every configured store with its listing URL.
///
/// # Errors
///
/// Returns an error if the stores file cannot be loaded.
pub(crate) fn print_stores(config: &AppConfig) -> anyhow::Result<()> {
    let file = load_stores(&config.stores_path)?;
    for store in &file.stores {
        println!(
            "{:<40} {}",
            store.name,
            store.listing_url(&config.base_url)
        );
    }
    Ok(())
}
