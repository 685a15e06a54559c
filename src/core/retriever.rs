use crate::domain::model::{ProductRecord, SearchTerm};
use crate::domain::ports::{ProductSearch, RawProduct, SearchQuery};
use crate::utils::error::Result;
use futures::stream::{self, StreamExt, TryStreamExt};

pub const DEFAULT_STORE_CODE: &str = "130";
pub const DEFAULT_PAGE_SIZE: u32 = 15;
pub const DEFAULT_CONCURRENT_REQUESTS: usize = 4;

/// Issues one retailer search per term and tags every result with that term.
pub struct ProductRetriever<S: ProductSearch> {
    search: S,
    store_code: String,
    page_size: u32,
    concurrent_requests: usize,
}

impl<S: ProductSearch> ProductRetriever<S> {
    pub fn new(search: S) -> Self {
        Self {
            search,
            store_code: DEFAULT_STORE_CODE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            concurrent_requests: DEFAULT_CONCURRENT_REQUESTS,
        }
    }

    pub fn with_store_code(mut self, store_code: impl Into<String>) -> Self {
        self.store_code = store_code.into();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_concurrency(mut self, concurrent_requests: usize) -> Self {
        self.concurrent_requests = concurrent_requests.max(1);
        self
    }

    fn query_for(&self, term: &str) -> SearchQuery {
        SearchQuery {
            search_text: term.to_string(),
            store_context: self.store_code.clone(),
            page_size: self.page_size,
            page_offset: 0,
        }
    }

    pub async fn retrieve(&self, term: &str) -> Result<Vec<ProductRecord>> {
        tracing::debug!("🛒 Searching retailer for '{}' (store {})", term, self.store_code);

        let items = self.search.search(&self.query_for(term)).await.map_err(|e| {
            tracing::error!("❌ Retailer search for '{}' failed: {}", term, e);
            e
        })?;

        tracing::debug!("🛒 '{}' returned {} items", term, items.len());
        Ok(items.into_iter().map(|item| tag_product(item, term)).collect())
    }

    /// 各關鍵字可並行查詢，但結果一律依關鍵字順序串接
    pub async fn retrieve_all(&self, terms: &[SearchTerm]) -> Result<Vec<ProductRecord>> {
        let per_term: Vec<Vec<ProductRecord>> = stream::iter(terms)
            .map(|term| self.retrieve(term))
            .buffered(self.concurrent_requests)
            .try_collect()
            .await?;

        let candidates: Vec<ProductRecord> = per_term.into_iter().flatten().collect();
        tracing::info!(
            "🛒 Retrieved {} candidate products across {} terms",
            candidates.len(),
            terms.len()
        );
        Ok(candidates)
    }
}

fn tag_product(item: RawProduct, term: &str) -> ProductRecord {
    ProductRecord {
        name: item.name,
        description: item.description,
        image_url: item.image_url,
        retail_price: item.retail_price,
        package_size: item.package_size,
        unit_description: item.unit_description,
        matched_term: term.to_string(),
    }
}
