//! View models derived from a cart snapshot.
//!
//! Everything here is a pure function of its inputs; front ends rebuild the
//! views from the latest snapshot whenever the store publishes one.

use rocketshoes_core::{Cart, ProductId, cart};

use crate::catalog::ProductListing;

/// Header badge: number of distinct products in the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderView {
    pub cart_size: usize,
}

impl HeaderView {
    #[must_use]
    pub fn from_cart(cart: &Cart) -> Self {
        Self {
            cart_size: cart.len(),
        }
    }

    #[must_use]
    pub fn label(&self) -> String {
        cart::size_label(self.cart_size)
    }
}

/// A product on the listing page with the amount already in the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRowView {
    pub id: ProductId,
    pub title: String,
    pub image: String,
    pub price_formatted: String,
    pub amount_in_cart: u32,
}

/// Listing rows in catalog order.
#[must_use]
pub fn product_rows(listings: &[ProductListing], cart: &Cart) -> Vec<ProductRowView> {
    let amounts = cart.amounts_by_product();
    listings
        .iter()
        .map(|listing| ProductRowView {
            id: listing.product.id,
            title: listing.product.title.clone(),
            image: listing.product.image.clone(),
            price_formatted: listing.price_formatted.clone(),
            amount_in_cart: amounts.get(&listing.product.id).copied().unwrap_or(0),
        })
        .collect()
}

/// One line of the cart page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLineView {
    pub id: ProductId,
    pub title: String,
    pub image: String,
    pub amount: u32,
    pub price_formatted: String,
    pub subtotal_formatted: String,
}

/// Cart page: lines plus the formatted total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartPageView {
    pub lines: Vec<CartLineView>,
    pub total_formatted: String,
}

impl CartPageView {
    #[must_use]
    pub fn from_cart(cart: &Cart) -> Self {
        Self {
            lines: cart
                .items()
                .iter()
                .map(|item| CartLineView {
                    id: item.id,
                    title: item.title.clone(),
                    image: item.image.clone(),
                    amount: item.amount,
                    price_formatted: item.price.display(),
                    subtotal_formatted: item.subtotal().display(),
                })
                .collect(),
            total_formatted: cart.total().display(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
