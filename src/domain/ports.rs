use crate::utils::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Parameters for one retailer product search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    pub search_text: String,
    pub store_context: String,
    pub page_size: u32,
    pub page_offset: u32,
}

/// 零售商回傳的原始商品欄位
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProduct {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub retail_price: Option<String>,
    pub package_size: Option<String>,
    pub unit_description: Option<String>,
}

/// Free-text generation. No structure is guaranteed on the returned string.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String>;
}

#[async_trait]
pub trait ProductSearch: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawProduct>>;
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
        (**self).generate(prompt, temperature).await
    }
}

#[async_trait]
impl<'a, T: TextGenerator + ?Sized> TextGenerator for &'a T {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
        (**self).generate(prompt, temperature).await
    }
}

#[async_trait]
impl<T: ProductSearch + ?Sized> ProductSearch for Arc<T> {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawProduct>> {
        (**self).search(query).await
    }
}

#[async_trait]
impl<'a, T: ProductSearch + ?Sized> ProductSearch for &'a T {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawProduct>> {
        (**self).search(query).await
    }
}
