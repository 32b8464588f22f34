//! Domain error types.

use common::ProductId;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur while placing an order.
///
/// Every variant raised after the transaction opened means the transaction
/// was rolled back: no order, item, payment record or stock change survives.
#[derive(Debug, Error)]
pub enum PlacementError {
    /// The request was rejected before any transaction was opened.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No customer is registered under the given email.
    #[error("Customer not found: {email}")]
    CustomerNotFound { email: String },

    /// A requested product does not exist.
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: ProductId },

    /// A product exists but has less stock than requested.
    #[error("Insufficient stock for product {product_id}: requested {requested}")]
    InsufficientStock { product_id: ProductId, requested: u32 },

    /// The store failed underneath the placement.
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}

impl PlacementError {
    /// Short, stable label used for metrics and log fields.
    pub fn reason(&self) -> &'static str {
        match self {
            PlacementError::InvalidInput(_) => "invalid_input",
            PlacementError::CustomerNotFound { .. } => "customer_not_found",
            PlacementError::ProductNotFound { .. } => "product_not_found",
            PlacementError::InsufficientStock { .. } => "insufficient_stock",
            PlacementError::Persistence(_) => "persistence",
        }
    }
}
