//! Identifiers and value types shared by every layer of the order service.

pub mod money;
pub mod types;

pub use money::Money;
pub use types::{CustomerId, OrderId, ProductId};
