//! Notification adapter for front ends.
//!
//! Front ends call [`CartActions`] instead of the store directly. A failed
//! operation is logged with its cause, reported to the [`Notifier`] with a
//! fixed user-facing message, and resolves to `None`; the cause is not passed
//! on to the user.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rocketshoes_core::{Cart, ProductId};

use super::store::{CartStore, UpdateProductAmount};
use crate::api::{ProductCatalog, StockChecker};
use crate::error::CartError;
use crate::storage::KeyValueStorage;

/// Message shown when the requested amount exceeds stock.
pub const STOCK_UNAVAILABLE_MESSAGE: &str = "Quantidade solicitada fora de estoque";

/// The cart operation a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CartOperation {
    Add,
    Remove,
    Update,
}

impl CartOperation {
    /// Generic message for any failure other than a stock shortfall.
    #[must_use]
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::Add => "Erro na adição do produto",
            Self::Remove => "Erro na remoção do produto",
            Self::Update => "Erro na alteração de quantidade do produto",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for CartOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-facing error notification (a "toast").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub operation: CartOperation,
    pub message: &'static str,
}

impl Notification {
    /// The notification shown when `operation` fails with `error`.
    #[must_use]
    pub const fn for_failure(operation: CartOperation, error: &CartError) -> Self {
        let message = if error.is_stock_unavailable() {
            STOCK_UNAVAILABLE_MESSAGE
        } else {
            operation.failure_message()
        };
        Self { operation, message }
    }
}

/// Receives user-facing notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, notification: Notification) {
        (**self).notify(notification);
    }
}

/// Writes notifications to the log.
///
/// Logged at `info`: `CartActions` already reports the underlying failure
/// at its own level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        tracing::info!(
            operation = %notification.operation,
            "{}",
            notification.message
        );
    }
}

/// Keeps notifications in memory until taken.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return every notification received so far.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.notifications.lock())
    }

    /// Messages received so far, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<&'static str> {
        self.notifications.lock().iter().map(|n| n.message).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().push(notification);
    }
}

// =============================================================================
// CartActions
// =============================================================================

/// Cart operations as a front end sees them.
///
/// Each method returns the new cart on success and `None` after a failure,
/// which has already been logged and notified.
pub struct CartActions<A, S, N> {
    store: CartStore<A, S>,
    notifier: N,
}

impl<A, S, N> CartActions<A, S, N>
where
    A: ProductCatalog + StockChecker,
    S: KeyValueStorage,
    N: Notifier,
{
    pub const fn new(store: CartStore<A, S>, notifier: N) -> Self {
        Self { store, notifier }
    }

    #[must_use]
    pub const fn store(&self) -> &CartStore<A, S> {
        &self.store
    }

    #[must_use]
    pub const fn notifier(&self) -> &N {
        &self.notifier
    }

    pub async fn add_product(&self, product_id: ProductId) -> Option<Arc<Cart>> {
        let result = self.store.add_product(product_id).await;
        self.settle(CartOperation::Add, product_id, result)
    }

    pub async fn remove_product(&self, product_id: ProductId) -> Option<Arc<Cart>> {
        let result = self.store.remove_product(product_id).await;
        self.settle(CartOperation::Remove, product_id, result)
    }

    pub async fn update_product_amount(&self, request: UpdateProductAmount) -> Option<Arc<Cart>> {
        let result = self.store.update_product_amount(request).await;
        self.settle(CartOperation::Update, request.product_id, result)
    }

    fn settle(
        &self,
        operation: CartOperation,
        product_id: ProductId,
        result: Result<Arc<Cart>, CartError>,
    ) -> Option<Arc<Cart>> {
        match result {
            Ok(cart) => Some(cart),
            Err(e) => {
                if e.is_stock_unavailable() {
                    tracing::info!(%operation, %product_id, error = %e, "Cart operation rejected");
                } else {
                    tracing::warn!(%operation, %product_id, error = %e, "Cart operation failed");
                }
                self.notifier.notify(Notification::for_failure(operation, &e));
                None
            }
        }
    }
}
