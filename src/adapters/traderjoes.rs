use crate::domain::ports::{ProductSearch, RawProduct, SearchQuery};
use crate::utils::error::{PlannerError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_GRAPHQL_ENDPOINT: &str = "https://www.traderjoes.com/api/graphql";
pub const DEFAULT_RETAILER_TIMEOUT_SECS: u64 = 15;

const SERVICE: &str = "retailer";
const ORIGIN: &str = "https://www.traderjoes.com";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:137.0) Gecko/20100101 Firefox/137.0";

const SEARCH_PRODUCTS_QUERY: &str = r#"
query SearchProducts($search: String, $pageSize: Int, $currentPage: Int, $storeCode: String = "130", $availability: String = "1", $published: String = "1") {
  products(
    search: $search
    filter: {
      store_code: { eq: $storeCode }
      published: { eq: $published }
      availability: { match: $availability }
    }
    pageSize: $pageSize
    currentPage: $currentPage
  ) {
    items {
      name
      item_description
      primary_image
      retail_price
      sales_size
      sales_uom_description
    }
  }
}
"#;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    operation_name: &'a str,
    variables: SearchVariables<'a>,
    query: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchVariables<'a> {
    store_code: &'a str,
    availability: &'a str,
    published: &'a str,
    search: &'a str,
    current_page: u32,
    page_size: u32,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<SearchData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct SearchData {
    products: Option<ProductPage>,
}

#[derive(Deserialize)]
struct ProductPage {
    #[serde(default)]
    items: Option<Vec<ProductItem>>,
}

#[derive(Deserialize)]
struct ProductItem {
    name: Option<String>,
    item_description: Option<Value>,
    primary_image: Option<Value>,
    retail_price: Option<Value>,
    sales_size: Option<Value>,
    sales_uom_description: Option<Value>,
}

/// 數字或字串欄位一律轉為字串，空值視為缺少
fn text_field(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl From<ProductItem> for RawProduct {
    fn from(item: ProductItem) -> Self {
        RawProduct {
            name: item.name.unwrap_or_default(),
            description: text_field(item.item_description),
            image_url: text_field(item.primary_image),
            retail_price: text_field(item.retail_price),
            package_size: text_field(item.sales_size),
            unit_description: text_field(item.sales_uom_description),
        }
    }
}

/// Trader Joe's GraphQL product search implementing [`ProductSearch`].
pub struct TraderJoesSearch {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl TraderJoesSearch {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(DEFAULT_RETAILER_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ProductSearch for TraderJoesSearch {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawProduct>> {
        let body = SearchRequest {
            operation_name: "SearchProducts",
            variables: SearchVariables {
                store_code: &query.store_context,
                availability: "1",
                published: "1",
                search: &query.search_text,
                current_page: query.page_offset,
                page_size: query.page_size,
            },
            query: SEARCH_PRODUCTS_QUERY,
        };

        tracing::debug!(
            "📡 [TraderJoe's] Searching: \"{}\" (store {})",
            query.search_text,
            query.store_context
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("Origin", ORIGIN)
            .header("Referer", format!("{}/", ORIGIN))
            .header("User-Agent", USER_AGENT)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| PlannerError::external(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PlannerError::ExternalServiceError {
                service: SERVICE.to_string(),
                message: format!("status {}: {}", status, detail.trim()),
            });
        }

        let payload: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| PlannerError::external(SERVICE, e))?;

        if payload.data.is_none() && !payload.errors.is_empty() {
            let messages: Vec<String> = payload.errors.into_iter().map(|e| e.message).collect();
            return Err(PlannerError::ExternalServiceError {
                service: SERVICE.to_string(),
                message: format!("GraphQL errors: {}", messages.join("; ")),
            });
        }

        let items: Vec<RawProduct> = payload
            .data
            .and_then(|data| data.products)
            .and_then(|page| page.items)
            .unwrap_or_default()
            .into_iter()
            .map(RawProduct::from)
            .collect();

        tracing::debug!("📡 [TraderJoe's] Received {} items.", items.len());
        Ok(items)
    }
}
