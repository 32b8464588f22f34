//! Unit price lookup at placement time.

use common::{Money, ProductId};
use store::{OrderLine, StoreTransaction};

use crate::error::PlacementError;

/// Reads current unit prices through the placement transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingResolver;

impl PricingResolver {
    pub fn new() -> Self {
        Self
    }

    /// Returns the current unit price of `product_id`.
    pub async fn unit_price<T: StoreTransaction>(
        &self,
        tx: &mut T,
        product_id: ProductId,
    ) -> Result<Money, PlacementError> {
        tx.product_price(product_id)
            .await?
            .ok_or(PlacementError::ProductNotFound { product_id })
    }

    /// Amount owed for one line: unit price times quantity.
    pub async fn line_amount<T: StoreTransaction>(
        &self,
        tx: &mut T,
        line: OrderLine,
    ) -> Result<Money, PlacementError> {
        let price = self.unit_price(tx, line.product_id).await?;
        price.checked_times(line.quantity).ok_or_else(|| {
            PlacementError::InvalidInput(format!(
                "amount for product {} overflows",
                line.product_id
            ))
        })
    }
}
