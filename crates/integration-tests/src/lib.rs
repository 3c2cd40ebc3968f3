//! Integration tests for RocketShoes.
//!
//! The tests run the storefront library against [`StubApi`], an in-process
//! HTTP server that serves the catalog and stock endpoints on an ephemeral
//! port. No external services are needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p rocketshoes-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use rocketshoes_core::{Price, Product, ProductId, Stock};
use rocketshoes_storefront::StorefrontConfig;
use rocketshoes_storefront::config::ConfigError;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Default)]
struct StubState {
    products: Vec<Product>,
    stock: HashMap<ProductId, u32>,
    failing: HashSet<ProductId>,
    product_requests: AtomicUsize,
    stock_requests: AtomicUsize,
}

/// Builder for [`StubApi`].
#[derive(Default)]
pub struct StubApiBuilder {
    state: StubState,
}

impl StubApiBuilder {
    /// Serve a product with the given stock amount.
    #[must_use]
    pub fn product(mut self, product: Product, stock: u32) -> Self {
        self.state.stock.insert(product.id, stock);
        self.state.products.push(product);
        self
    }

    /// Answer every request about `id` with a 500.
    #[must_use]
    pub fn failing(mut self, id: ProductId) -> Self {
        self.state.failing.insert(id);
        self
    }

    /// Bind an ephemeral local port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn spawn(self) -> std::io::Result<StubApi> {
        let state = Arc::new(self.state);
        let app = Router::new()
            .route("/products", get(list_products))
            .route("/products/{id}", get(get_product))
            .route("/stock/{id}", get(get_stock))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        // Runs until aborted on drop
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(StubApi {
            addr,
            state,
            handle,
        })
    }
}

/// A running stub of the catalog and stock API.
///
/// The server task is aborted when the value is dropped.
pub struct StubApi {
    addr: SocketAddr,
    state: Arc<StubState>,
    handle: JoinHandle<()>,
}

impl StubApi {
    #[must_use]
    pub fn builder() -> StubApiBuilder {
        StubApiBuilder::default()
    }

    /// The standard three-product catalog used by most tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn spawn_default() -> std::io::Result<Self> {
        Self::builder()
            .product(sample_product(1, 17990), 3)
            .product(sample_product(2, 13990), 5)
            .product(sample_product(3, 9990), 0)
            .spawn()
            .await
    }

    /// Base URL, e.g. `http://127.0.0.1:41234`.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Storefront configuration pointing at this server.
    ///
    /// # Errors
    ///
    /// Returns an error if the generated URL is rejected.
    pub fn config(&self, storage_path: &Path) -> Result<StorefrontConfig, ConfigError> {
        let mut config = StorefrontConfig::for_api(&self.url())?;
        config.storage_path = storage_path.to_path_buf();
        Ok(config)
    }

    /// Requests served by `/products` and `/products/{id}`.
    #[must_use]
    pub fn product_requests(&self) -> usize {
        self.state.product_requests.load(Ordering::SeqCst)
    }

    /// Requests served by `/stock/{id}`.
    #[must_use]
    pub fn stock_requests(&self) -> usize {
        self.state.stock_requests.load(Ordering::SeqCst)
    }
}

impl Drop for StubApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A product named the way the storefront's seed data names them.
#[must_use]
pub fn sample_product(id: i32, cents: i64) -> Product {
    Product {
        id: ProductId::new(id),
        title: format!("Tênis de Caminhada {id}"),
        price: Price::from_cents(cents),
        image: format!("https://rocketseat-cdn.s3-sa-east-1.amazonaws.com/modulo-redux/tenis{id}.jpg"),
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn list_products(State(state): State<Arc<StubState>>) -> Json<Vec<Product>> {
    state.product_requests.fetch_add(1, Ordering::SeqCst);
    Json(state.products.clone())
}

async fn get_product(
    State(state): State<Arc<StubState>>,
    UrlPath(id): UrlPath<ProductId>,
) -> Response {
    state.product_requests.fetch_add(1, Ordering::SeqCst);
    if state.failing.contains(&id) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    match state.products.iter().find(|p| p.id == id) {
        Some(product) => Json(product.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, Json(serde_json::json!({}))).into_response(),
    }
}

async fn get_stock(
    State(state): State<Arc<StubState>>,
    UrlPath(id): UrlPath<ProductId>,
) -> Response {
    state.stock_requests.fetch_add(1, Ordering::SeqCst);
    if state.failing.contains(&id) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "stock service unavailable").into_response();
    }
    match state.stock.get(&id) {
        Some(&amount) => Json(Stock { id, amount }).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
