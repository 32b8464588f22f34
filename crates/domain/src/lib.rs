//! Domain layer for the order service.
//!
//! The core is [`OrderPlacementService::place_order`]: inside one store
//! transaction it resolves the customer, reserves stock through the
//! [`InventoryLedger`], prices every line with the [`PricingResolver`],
//! persists the order through the [`OrderBuilder`] and appends a payment
//! record through the [`TransactionRecorder`]. Either all of it commits or
//! none of it is visible.

pub mod error;
pub mod placement;

pub use error::PlacementError;
pub use placement::{
    InventoryLedger, OrderBuilder, OrderPlacementService, PlaceOrder, PlaceOrderLine,
    PlacementReceipt, PricingResolver, TransactionRecorder,
};
