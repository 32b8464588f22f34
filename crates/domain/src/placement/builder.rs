//! Persists the order header and its items.

use common::{CustomerId, Money, OrderId};
use store::{OrderLine, StoreTransaction};

use crate::error::PlacementError;

/// Writes an order header carrying its final total, then one item per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderBuilder;

impl OrderBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Inserts the order and its items, returning the new order id.
    #[tracing::instrument(skip_all, fields(%customer_id, %total, lines = lines.len()))]
    pub async fn persist<T: StoreTransaction>(
        &self,
        tx: &mut T,
        customer_id: CustomerId,
        lines: &[OrderLine],
        total: Money,
    ) -> Result<OrderId, PlacementError> {
        if lines.is_empty() {
            return Err(PlacementError::InvalidInput(
                "order must contain at least one item".to_string(),
            ));
        }

        let order_id = tx.insert_order(customer_id, total).await?;
        tx.insert_order_items(order_id, lines).await?;
        tracing::debug!(%order_id, "order header and items written");

        Ok(order_id)
    }
}
