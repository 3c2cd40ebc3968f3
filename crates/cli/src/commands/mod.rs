//! CLI subcommands.

pub mod cart;
pub mod catalog;

use rocketshoes_storefront::cart::TracingNotifier;
use rocketshoes_storefront::error::AppError;
use rocketshoes_storefront::{ApiClient, CartActions, CartStore, LocalStorage, StorefrontConfig};

/// Cart actions wired to the HTTP API and the on-disk storage.
pub type Actions = CartActions<ApiClient, LocalStorage, TracingNotifier>;

/// Build the API client, open the storage file and restore the cart.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built or the stored cart
/// cannot be read.
pub fn open_actions(config: &StorefrontConfig) -> Result<Actions, AppError> {
    let api = ApiClient::new(config)?;
    let storage = LocalStorage::open(&config.storage_path)?;
    let store = CartStore::open(api, storage)?;

    tracing::debug!(
        api_url = %config.api_url,
        storage = %config.storage_path.display(),
        items = store.snapshot().len(),
        "Cart restored"
    );

    Ok(CartActions::new(store, TracingNotifier))
}
