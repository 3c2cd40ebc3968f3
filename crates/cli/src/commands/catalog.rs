//! Product listing.

use rocketshoes_storefront::catalog::load_catalog;
use rocketshoes_storefront::error::AppError;
use rocketshoes_storefront::views::{HeaderView, product_rows};

use super::Actions;

/// Print every product with the amount already in the cart.
///
/// # Errors
///
/// Returns an error if the catalog cannot be fetched.
#[allow(clippy::print_stdout)]
pub async fn list(actions: &Actions) -> Result<(), AppError> {
    let listings = load_catalog(actions.store().api()).await?;
    let cart = actions.store().snapshot();

    println!("RocketShoes  [{}]", HeaderView::from_cart(&cart).label());
    println!();

    if listings.is_empty() {
        println!("No products available.");
        return Ok(());
    }

    for row in product_rows(&listings, &cart) {
        println!(
            "{:>4}  {:<60} {:>14}  in cart: {}",
            row.id, row.title, row.price_formatted, row.amount_in_cart
        );
    }
    Ok(())
}
