//! The cart store: single owner of the cart snapshot.
//!
//! Writers are serialized by an async mutex that is held for the whole
//! operation, network round-trips included. Each operation therefore reads the
//! latest committed cart and no two operations can interleave their
//! read-compute-commit steps. Readers never take that lock: they get the
//! current `Arc<Cart>` from a `watch` channel, which also lets views
//! re-render on change.
//!
//! A commit persists first and publishes second, so durable storage and
//! the in-memory snapshot never disagree after a failed write.

use std::sync::Arc;

use rocketshoes_core::{Cart, CartItem, ProductId, Stock};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument};

use crate::api::{ProductCatalog, StockChecker};
use crate::error::CartError;
use crate::storage::{CartPersistence, KeyValueStorage, StorageError};

/// Request to set a product's amount to an absolute value.
///
/// `amount` is signed: values `<= 0` are accepted and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateProductAmount {
    pub product_id: ProductId,
    pub amount: i64,
}

/// Handle to the cart. Clones share the same cart.
pub struct CartStore<A, S> {
    inner: Arc<CartStoreInner<A, S>>,
}

struct CartStoreInner<A, S> {
    api: A,
    persistence: CartPersistence<S>,
    writer: Mutex<()>,
    cart: watch::Sender<Arc<Cart>>,
}

impl<A, S> Clone for CartStore<A, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, S> CartStore<A, S>
where
    A: ProductCatalog + StockChecker,
    S: KeyValueStorage,
{
    /// Open the store, loading the cart persisted in `storage`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Corrupt` if the persisted cart cannot be
    /// decoded, or any error from reading the storage.
    pub fn open(api: A, storage: S) -> Result<Self, StorageError> {
        let persistence = CartPersistence::new(storage);
        let cart = persistence.load()?;
        info!(items = cart.len(), "Cart loaded from storage");

        let (cart, _) = watch::channel(Arc::new(cart));

        Ok(Self {
            inner: Arc::new(CartStoreInner {
                api,
                persistence,
                writer: Mutex::new(()),
                cart,
            }),
        })
    }

    /// The most recently committed cart.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Cart> {
        Arc::clone(&self.inner.cart.borrow())
    }

    /// Receiver that is notified after every commit.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<Cart>> {
        self.inner.cart.subscribe()
    }

    /// The catalog/stock client.
    #[must_use]
    pub fn api(&self) -> &A {
        &self.inner.api
    }

    /// The durable storage backing the cart.
    #[must_use]
    pub fn storage(&self) -> &S {
        self.inner.persistence.storage()
    }

    /// Add one unit of a product.
    ///
    /// A product already in the cart gets `amount + 1`; a new one is fetched
    /// from the catalog and appended with amount 1. Stock is checked first.
    ///
    /// # Errors
    ///
    /// - `CartError::StockUnavailable` if the new amount exceeds stock
    /// - `CartError::Api` if the stock or product lookup fails
    /// - `CartError::Storage` if the new cart cannot be persisted
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_product(&self, product_id: ProductId) -> Result<Arc<Cart>, CartError> {
        let _writer = self.inner.writer.lock().await;
        let current = self.snapshot();

        let current_amount = current.amount_of(product_id);

        let stock = self.inner.api.get_stock(product_id).await?;
        let requested = ensure_in_stock(product_id, u64::from(current_amount) + 1, &stock)?;

        let next = if current_amount > 0 {
            current.with_amount(product_id, requested)?
        } else {
            let product = self.inner.api.get_product(product_id).await?;
            current.with_item(CartItem::new(product, 1)?)?
        };

        debug!(amount = requested, "Product added");
        self.commit(&current, next)
    }

    /// Remove a product's line from the cart.
    ///
    /// # Errors
    ///
    /// - `CartError::ProductNotFound` if the product is not in the cart
    /// - `CartError::Storage` if the new cart cannot be persisted
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_product(&self, product_id: ProductId) -> Result<Arc<Cart>, CartError> {
        let _writer = self.inner.writer.lock().await;
        let current = self.snapshot();

        let next = current.without(product_id)?;

        debug!("Product removed");
        self.commit(&current, next)
    }

    /// Set a product's amount.
    ///
    /// Amounts `<= 0` are a no-op: no lookup, no persistence, the current cart
    /// is returned.
    ///
    /// # Errors
    ///
    /// - `CartError::StockUnavailable` if `amount` exceeds stock
    /// - `CartError::ProductNotFound` if the product is not in the cart
    /// - `CartError::Api` if the stock lookup fails
    /// - `CartError::Storage` if the new cart cannot be persisted
    #[instrument(skip(self), fields(product_id = %request.product_id, amount = request.amount))]
    pub async fn update_product_amount(
        &self,
        request: UpdateProductAmount,
    ) -> Result<Arc<Cart>, CartError> {
        let UpdateProductAmount { product_id, amount } = request;
        if amount <= 0 {
            debug!("Ignoring non-positive amount");
            return Ok(self.snapshot());
        }
        let _writer = self.inner.writer.lock().await;
        let current = self.snapshot();

        let stock = self.inner.api.get_stock(product_id).await?;
        let requested = ensure_in_stock(product_id, amount.unsigned_abs(), &stock)?;

        let next = current.with_amount(product_id, requested)?;

        debug!("Product amount updated");
        self.commit(&current, next)
    }

    /// Persist and publish `next` unless it equals `current`.
    ///
    /// Must be called with the writer lock held.
    fn commit(&self, current: &Arc<Cart>, next: Cart) -> Result<Arc<Cart>, CartError> {
        if next == **current {
            debug!("Cart unchanged, skipping persistence");
            return Ok(Arc::clone(current));
        }

        self.inner.persistence.save(&next)?;

        let next = Arc::new(next);
        self.inner.cart.send_replace(Arc::clone(&next));
        debug!(items = next.len(), "Cart committed");
        Ok(next)
    }
}

/// The requested amount as a cart amount, if stock covers it.
fn ensure_in_stock(product_id: ProductId, requested: u64, stock: &Stock) -> Result<u32, CartError> {
    match u32::try_from(requested) {
        Ok(amount) if stock.covers(amount) => return Ok(amount),
        _ => {}
    }
    info!(
        product_id = %product_id,
        requested,
        available = stock.amount,
        "Requested amount exceeds stock"
    );
    Err(CartError::StockUnavailable {
        product_id,
        requested,
        available: stock.amount,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use parking_lot::Mutex as SyncMutex;
    use rocketshoes_core::{Price, Product};

    use super::*;
    use crate::api::ApiError;
    use crate::storage::{CART_STORAGE_KEY, MemoryStorage};

    #[derive(Default)]
    struct MockApi {
        products: HashMap<ProductId, Product>,
        stock: SyncMutex<HashMap<ProductId, u32>>,
        fail_stock: AtomicBool,
        stock_delay: Option<Duration>,
        stock_calls: AtomicUsize,
        product_calls: AtomicUsize,
    }

    impl MockApi {
        fn with_products(entries: &[(i32, u32)]) -> Self {
            let mut api = Self::default();
            for &(id, stock) in entries {
                let id = ProductId::new(id);
                api.products.insert(
                    id,
                    Product {
                        id,
                        title: format!("Tênis {id}"),
                        price: Price::from_cents(17990),
                        image: format!("https://cdn.example.com/tenis{id}.jpg"),
                    },
                );
                api.stock.lock().insert(id, stock);
            }
            api
        }

        fn set_stock(&self, id: i32, amount: u32) {
            self.stock.lock().insert(ProductId::new(id), amount);
        }
    }

    impl ProductCatalog for MockApi {
        async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
            let mut products: Vec<Product> = self.products.values().cloned().collect();
            products.sort_by_key(|p| p.id);
            Ok(products)
        }

        async fn get_product(&self, id: ProductId) -> Result<Product, ApiError> {
            self.product_calls.fetch_add(1, Ordering::SeqCst);
            self.products
                .get(&id)
                .cloned()
                .ok_or_else(|| ApiError::NotFound(format!("products/{id}")))
        }
    }

    impl StockChecker for MockApi {
        async fn get_stock(&self, id: ProductId) -> Result<Stock, ApiError> {
            self.stock_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.stock_delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_stock.load(Ordering::SeqCst) {
                return Err(ApiError::Status {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            let amount = self
                .stock
                .lock()
                .get(&id)
                .copied()
                .ok_or_else(|| ApiError::NotFound(format!("stock/{id}")))?;
            Ok(Stock { id, amount })
        }
    }

    /// Memory storage that counts writes and can be made to fail.
    #[derive(Default)]
    struct CountingStorage {
        inner: MemoryStorage,
        writes: AtomicUsize,
        fail_writes: AtomicBool,
    }

    impl KeyValueStorage for CountingStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    type TestStore = CartStore<MockApi, CountingStorage>;

    fn store(entries: &[(i32, u32)]) -> TestStore {
        CartStore::open(MockApi::with_products(entries), CountingStorage::default()).unwrap()
    }

    fn writes(store: &TestStore) -> usize {
        store.storage().writes.load(Ordering::SeqCst)
    }

    fn id(n: i32) -> ProductId {
        ProductId::new(n)
    }

    fn update(n: i32, amount: i64) -> UpdateProductAmount {
        UpdateProductAmount {
            product_id: id(n),
            amount,
        }
    }

    #[tokio::test]
    async fn test_add_new_product_starts_at_one() {
        let store = store(&[(1, 3)]);

        let cart = store.add_product(id(1)).await.unwrap();

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].amount, 1);
        assert_eq!(cart.items()[0].title, "Tênis 1");
        assert_eq!(writes(&store), 1);
    }

    #[tokio::test]
    async fn test_add_existing_product_increments() {
        let store = store(&[(1, 3), (2, 3)]);
        store.add_product(id(1)).await.unwrap();
        store.add_product(id(2)).await.unwrap();

        let cart = store.add_product(id(1)).await.unwrap();

        assert_eq!(cart.len(), 2);
        assert_eq!(cart.amount_of(id(1)), 2);
        assert_eq!(cart.items()[0].id, id(1));
        // The product is only fetched the first time.
        assert_eq!(store.api().product_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_add_beyond_stock_leaves_cart_unchanged() {
        let store = store(&[(1, 1)]);
        store.add_product(id(1)).await.unwrap();
        let before = store.snapshot();

        let err = store.add_product(id(1)).await.unwrap_err();

        assert!(matches!(
            err,
            CartError::StockUnavailable {
                requested: 2,
                available: 1,
                ..
            }
        ));
        assert_eq!(*store.snapshot(), *before);
        assert_eq!(writes(&store), 1);
    }

    #[tokio::test]
    async fn test_add_with_zero_stock_never_fetches_product() {
        let store = store(&[(1, 0)]);

        let err = store.add_product(id(1)).await.unwrap_err();

        assert!(err.is_stock_unavailable());
        assert!(store.snapshot().is_empty());
        assert_eq!(store.api().product_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_add_network_failure_is_api_error() {
        let store = store(&[(1, 5)]);
        store.api().fail_stock.store(true, Ordering::SeqCst);

        let err = store.add_product(id(1)).await.unwrap_err();

        assert!(matches!(err, CartError::Api(ApiError::Status { status: 503, .. })));
        assert!(store.snapshot().is_empty());
        assert_eq!(writes(&store), 0);
    }

    #[tokio::test]
    async fn test_add_unknown_product_is_api_error() {
        let store = store(&[(1, 5)]);
        store.api().set_stock(9, 5);

        let err = store.add_product(id(9)).await.unwrap_err();

        assert!(matches!(err, CartError::Api(ApiError::NotFound(_))));
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_remove_present_product_preserves_order() {
        let store = store(&[(1, 5), (2, 5), (3, 5)]);
        for n in 1..=3 {
            store.add_product(id(n)).await.unwrap();
        }

        let cart = store.remove_product(id(2)).await.unwrap();

        let ids: Vec<ProductId> = cart.items().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![id(1), id(3)]);
        assert_eq!(writes(&store), 4);
    }

    #[tokio::test]
    async fn test_remove_absent_product_fails() {
        let store = store(&[(1, 5)]);
        store.add_product(id(1)).await.unwrap();

        let err = store.remove_product(id(7)).await.unwrap_err();

        assert!(matches!(err, CartError::ProductNotFound(p) if p == id(7)));
        assert_eq!(store.snapshot().len(), 1);
        assert_eq!(writes(&store), 1);
    }

    #[tokio::test]
    async fn test_update_non_positive_amount_is_noop() {
        let store = store(&[(1, 5)]);
        store.add_product(id(1)).await.unwrap();

        for amount in [0, -1, i64::MIN] {
            let cart = store.update_product_amount(update(1, amount)).await.unwrap();
            assert_eq!(cart.amount_of(id(1)), 1);
        }

        assert_eq!(store.api().stock_calls.load(Ordering::SeqCst), 1);
        assert_eq!(writes(&store), 1);
    }

    #[tokio::test]
    async fn test_update_beyond_stock_fails() {
        let store = store(&[(1, 3)]);
        store.add_product(id(1)).await.unwrap();

        let err = store.update_product_amount(update(1, 4)).await.unwrap_err();

        assert!(err.is_stock_unavailable());
        assert_eq!(store.snapshot().amount_of(id(1)), 1);
    }

    #[tokio::test]
    async fn test_update_huge_amount_exceeds_stock() {
        let store = store(&[(1, 3)]);
        store.add_product(id(1)).await.unwrap();

        let err = store
            .update_product_amount(update(1, i64::MAX))
            .await
            .unwrap_err();

        assert!(err.is_stock_unavailable());
    }

    #[tokio::test]
    async fn test_update_above_u32_range_is_rejected_even_with_max_stock() {
        let store = store(&[(1, u32::MAX)]);
        store.add_product(id(1)).await.unwrap();
        let requested = i64::from(u32::MAX) + 1;

        let err = store
            .update_product_amount(update(1, requested))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CartError::StockUnavailable {
                requested: 4_294_967_296,
                available: u32::MAX,
                ..
            }
        ));
        assert_eq!(store.snapshot().amount_of(id(1)), 1);
        assert_eq!(writes(&store), 1);
    }

    #[tokio::test]
    async fn test_update_sets_exact_amount_and_persists() {
        let store = store(&[(1, 10)]);
        store.add_product(id(1)).await.unwrap();

        let cart = store.update_product_amount(update(1, 7)).await.unwrap();

        assert_eq!(cart.amount_of(id(1)), 7);
        assert_eq!(writes(&store), 2);

        let raw = store.storage().get(CART_STORAGE_KEY).unwrap().unwrap();
        let persisted: Cart = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted, *cart);
    }

    #[tokio::test]
    async fn test_update_absent_product_fails() {
        let store = store(&[(1, 10)]);

        let err = store.update_product_amount(update(1, 2)).await.unwrap_err();

        assert!(matches!(err, CartError::ProductNotFound(_)));
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_update_to_same_amount_skips_persistence() {
        let store = store(&[(1, 10)]);
        let added = store.add_product(id(1)).await.unwrap();

        let cart = store.update_product_amount(update(1, 1)).await.unwrap();

        assert!(Arc::ptr_eq(&added, &cart));
        assert_eq!(writes(&store), 1);
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_previous_cart() {
        let store = store(&[(1, 10)]);
        store.add_product(id(1)).await.unwrap();
        store.storage().fail_writes.store(true, Ordering::SeqCst);

        let err = store.add_product(id(1)).await.unwrap_err();

        assert!(matches!(err, CartError::Storage(_)));
        assert_eq!(store.snapshot().amount_of(id(1)), 1);
    }

    #[tokio::test]
    async fn test_reopen_restores_persisted_cart() {
        let store = store(&[(1, 10), (2, 10)]);
        store.add_product(id(2)).await.unwrap();
        store.add_product(id(1)).await.unwrap();
        store.add_product(id(1)).await.unwrap();
        let expected = store.snapshot();

        let raw = store.storage().get(CART_STORAGE_KEY).unwrap().unwrap();
        let storage = CountingStorage::default();
        storage.set(CART_STORAGE_KEY, &raw).unwrap();

        let reopened = CartStore::open(MockApi::default(), storage).unwrap();
        assert_eq!(*reopened.snapshot(), *expected);
    }

    #[test]
    fn test_open_with_corrupt_storage_fails() {
        let storage = CountingStorage::default();
        storage.set(CART_STORAGE_KEY, "not json").unwrap();

        let result = CartStore::open(MockApi::default(), storage);
        assert!(matches!(result, Err(StorageError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_adds_do_not_lose_updates() {
        let mut api = MockApi::with_products(&[(1, 5), (2, 5)]);
        api.stock_delay = Some(Duration::from_millis(20));
        let store = CartStore::open(api, CountingStorage::default()).unwrap();

        let (a, b, c) = tokio::join!(
            store.add_product(id(1)),
            store.add_product(id(2)),
            store.add_product(id(1)),
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();

        let cart = store.snapshot();
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.amount_of(id(1)), 2);
        assert_eq!(cart.amount_of(id(2)), 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_commits() {
        let store = store(&[(1, 5)]);
        let mut rx = store.subscribe();

        let handle = store.clone();
        tokio::spawn(async move {
            handle.add_product(id(1)).await.unwrap();
        });

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().amount_of(id(1)), 1);
    }
}
