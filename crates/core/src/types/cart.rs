//! Cart snapshot and line items.
//!
//! A [`Cart`] is an immutable-by-convention snapshot: every change produces a
//! new `Cart` and leaves the original untouched, so a store can publish
//! snapshots to readers and swap them atomically.
//!
//! Invariants held by every `Cart` value:
//! - at most one [`CartItem`] per product id
//! - every item has `amount >= 1`
//! - items keep the order in which they were first added

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::ProductId;
use super::price::Price;
use super::product::Product;

/// A change that would break a cart invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CartChangeError {
    #[error("amount for product {0} must be at least 1")]
    ZeroAmount(ProductId),
    #[error("product {0} is already in the cart")]
    DuplicateProduct(ProductId),
    #[error("product {0} is not in the cart")]
    NotInCart(ProductId),
}

/// A product in the cart together with the requested quantity.
///
/// Serialized flat: `{id, title, price, image, amount}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ProductId,
    pub title: String,
    pub price: Price,
    pub image: String,
    pub amount: u32,
}

impl CartItem {
    /// Create a line item for `product`.
    ///
    /// # Errors
    ///
    /// Returns `CartChangeError::ZeroAmount` if `amount` is 0.
    pub fn new(product: Product, amount: u32) -> Result<Self, CartChangeError> {
        if amount == 0 {
            return Err(CartChangeError::ZeroAmount(product.id));
        }
        Ok(Self {
            id: product.id,
            title: product.title,
            price: product.price,
            image: product.image,
            amount,
        })
    }

    /// Line price: unit price times amount.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.price.times(self.amount)
    }
}

/// Ordered cart contents.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<CartItem>", into = "Vec<CartItem>")]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Number of distinct products in the cart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find the line for a product.
    #[must_use]
    pub fn find(&self, id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.find(id).is_some()
    }

    /// Requested amount for a product, 0 if it is not in the cart.
    #[must_use]
    pub fn amount_of(&self, id: ProductId) -> u32 {
        self.find(id).map_or(0, |item| item.amount)
    }

    /// A new cart with `item` appended.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is already present or the amount is 0.
    pub fn with_item(&self, item: CartItem) -> Result<Self, CartChangeError> {
        if item.amount == 0 {
            return Err(CartChangeError::ZeroAmount(item.id));
        }
        if self.contains(item.id) {
            return Err(CartChangeError::DuplicateProduct(item.id));
        }
        let mut items = self.items.clone();
        items.push(item);
        Ok(Self { items })
    }

    /// A new cart with the amount for `id` replaced; position is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is absent or the amount is 0.
    pub fn with_amount(&self, id: ProductId, amount: u32) -> Result<Self, CartChangeError> {
        if amount == 0 {
            return Err(CartChangeError::ZeroAmount(id));
        }
        let index = self.position(id)?;
        let mut items = self.items.clone();
        if let Some(item) = items.get_mut(index) {
            item.amount = amount;
        }
        Ok(Self { items })
    }

    /// A new cart without the line for `id`; the other lines keep their order.
    ///
    /// # Errors
    ///
    /// Returns `CartChangeError::NotInCart` if the product is absent.
    pub fn without(&self, id: ProductId) -> Result<Self, CartChangeError> {
        let index = self.position(id)?;
        let mut items = self.items.clone();
        items.remove(index);
        Ok(Self { items })
    }

    /// Requested amount keyed by product id.
    #[must_use]
    pub fn amounts_by_product(&self) -> HashMap<ProductId, u32> {
        self.items.iter().map(|item| (item.id, item.amount)).collect()
    }

    /// Sum of every line's subtotal.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(CartItem::subtotal).sum()
    }

    /// Header label for the number of distinct products.
    #[must_use]
    pub fn size_label(&self) -> String {
        size_label(self.len())
    }

    fn position(&self, id: ProductId) -> Result<usize, CartChangeError> {
        self.items
            .iter()
            .position(|item| item.id == id)
            .ok_or(CartChangeError::NotInCart(id))
    }
}

/// `1 item` or `N itens`.
#[must_use]
pub fn size_label(count: usize) -> String {
    match count {
        1 => "1 item".to_string(),
        n => format!("{n} itens"),
    }
}

impl TryFrom<Vec<CartItem>> for Cart {
    type Error = CartChangeError;

    fn try_from(items: Vec<CartItem>) -> Result<Self, Self::Error> {
        items
            .into_iter()
            .try_fold(Self::new(), |cart, item| cart.with_item(item))
    }
}

impl From<Cart> for Vec<CartItem> {
    fn from(cart: Cart) -> Self {
        cart.items
    }
}
