//! Cart display and changes.

use rocketshoes_core::{Cart, ProductId};
use rocketshoes_storefront::UpdateProductAmount;
use rocketshoes_storefront::views::{CartPageView, HeaderView};

use super::Actions;

/// Print the current cart.
pub fn show(actions: &Actions) {
    print_cart(&actions.store().snapshot());
}

/// Add one unit of a product.
pub async fn add(actions: &Actions, product_id: ProductId) {
    if let Some(cart) = actions.add_product(product_id).await {
        print_cart(&cart);
    }
}

/// Remove a product's line.
pub async fn remove(actions: &Actions, product_id: ProductId) {
    if let Some(cart) = actions.remove_product(product_id).await {
        print_cart(&cart);
    }
}

/// Set a product's amount.
pub async fn update(actions: &Actions, product_id: ProductId, amount: i64) {
    let request = UpdateProductAmount { product_id, amount };
    if let Some(cart) = actions.update_product_amount(request).await {
        print_cart(&cart);
    }
}

#[allow(clippy::print_stdout)]
fn print_cart(cart: &Cart) {
    let header = HeaderView::from_cart(cart);
    let page = CartPageView::from_cart(cart);

    println!("Cart [{}]", header.label());
    if page.is_empty() {
        println!("  (empty)");
        return;
    }

    for line in &page.lines {
        println!(
            "{:>4}  {:<60} {:>3} x {:>14} = {:>14}",
            line.id, line.title, line.amount, line.price_formatted, line.subtotal_formatted
        );
    }
    println!("Total: {}", page.total_formatted);
}
