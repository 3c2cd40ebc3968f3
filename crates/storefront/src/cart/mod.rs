//! Cart state management.
//!
//! - [`CartStore`] owns the cart and returns explicit results
//! - [`CartActions`] is the front-end adapter that turns failures into
//!   user-facing notifications

mod notify;
mod store;

pub use notify::{
    CartActions, CartOperation, Notification, Notifier, RecordingNotifier, STOCK_UNAVAILABLE_MESSAGE,
    TracingNotifier,
};
pub use store::{CartStore, UpdateProductAmount};
