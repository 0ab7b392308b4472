//! Read-only product catalog client.
//!
//! Products are immutable from the client's perspective, so list and detail
//! reads are cached (5-minute TTL). Search results are never cached. The
//! category list is a convenience read: it degrades to an empty list on
//! failure instead of surfacing an error.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};

use shoppy_core::ProductId;

use crate::error::ApiError;
use crate::transport::Transport;
use crate::types::{CategoryOption, Product};

const CACHE_CAPACITY: u64 = 1000;
const CACHE_TTL: Duration = Duration::from_secs(300); // 5 minutes

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
    Categories(Vec<CategoryOption>),
}

/// Client for the read-only product surface.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    transport: Transport,
    cache: Cache<String, CacheValue>,
}

impl CatalogClient {
    /// Create a catalog client over the given transport.
    #[must_use]
    pub fn new(transport: Transport) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(CatalogInner { transport, cache }),
        }
    }

    /// List products, optionally filtered by category.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn products(&self, category: Option<&str>) -> Result<Vec<Product>, ApiError> {
        let cache_key = format!("products:{}", category.unwrap_or(""));

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let path = category.map_or_else(
            || "/products".to_owned(),
            |c| format!("/products?category={}", urlencoding::encode(c)),
        );
        let products: Vec<Product> = self.inner.transport.get(&path).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Keyword search over name, description, and category. Never cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn search(&self, query: &str) -> Result<Vec<Product>, ApiError> {
        let path = format!("/products/search?q={}", urlencoding::encode(query));
        self.inner.transport.get(&path).await
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn product(&self, product_id: ProductId) -> Result<Product, ApiError> {
        let cache_key = format!("product:{product_id}");

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Product = self
            .inner
            .transport
            .get(&format!("/products/{product_id}"))
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// The fixed category list, for filters and navigation.
    ///
    /// Degrades to an empty list on failure - the navigation bar is never
    /// the reason a page hard-fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Vec<CategoryOption> {
        let cache_key = "categories".to_owned();

        if let Some(CacheValue::Categories(categories)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for categories");
            return categories;
        }

        match self
            .inner
            .transport
            .get::<Vec<CategoryOption>>("/products/categories")
            .await
        {
            Ok(categories) => {
                self.inner
                    .cache
                    .insert(cache_key, CacheValue::Categories(categories.clone()))
                    .await;
                categories
            }
            Err(err) => {
                debug!(error = %err, "Category list unavailable");
                Vec::new()
            }
        }
    }

    /// Invalidate all cached catalog data.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}
