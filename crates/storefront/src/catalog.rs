//! Product catalog loading for the listing page.

use rocketshoes_core::Product;
use tracing::instrument;

use crate::api::{ApiError, ProductCatalog};

/// A catalog product with its display price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductListing {
    pub product: Product,
    pub price_formatted: String,
}

impl From<Product> for ProductListing {
    fn from(product: Product) -> Self {
        let price_formatted = product.price.display();
        Self {
            product,
            price_formatted,
        }
    }
}

/// Fetch every purchasable product and format its price.
///
/// # Errors
///
/// Returns an error if the catalog request fails.
#[instrument(skip(catalog))]
pub async fn load_catalog<C: ProductCatalog>(catalog: &C) -> Result<Vec<ProductListing>, ApiError> {
    let products = catalog.list_products().await?;
    tracing::debug!(count = products.len(), "Catalog loaded");
    Ok(products.into_iter().map(ProductListing::from).collect())
}
