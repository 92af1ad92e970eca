pub mod client;
pub mod error;
pub mod types;

use async_trait::async_trait;
use offerdb_core::CategoryMap;

pub use client::{GeminiCategorizer, DEFAULT_BATCH_SIZE, DEFAULT_MODEL};
pub use error::CategorizerError;

/// Assigns grocery category labels to product names.
///
/// Best effort: names the service cannot categorize are simply absent from
/// the returned map.
#[async_trait]
pub trait Categorizer: Send + Sync {
    async fn categorize(&self, product_names: &[String]) -> CategoryMap;
}
