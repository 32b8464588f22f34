//! Inventory ledger: conditional per-product stock decrements.

use store::{OrderLine, StoreTransaction};

use crate::error::PlacementError;

/// Reserves stock by decrementing it inside the caller's transaction.
///
/// The check and the decrement are a single conditional update, so two
/// placements racing for the same product cannot both take the last units:
/// the store serializes them on the product row and the loser sees zero
/// rows affected.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryLedger;

impl InventoryLedger {
    pub fn new() -> Self {
        Self
    }

    /// Reserves every line, taking product rows in ascending id order.
    ///
    /// Each decrement holds its row lock until the transaction ends, so two
    /// carts naming the same products must lock them in the same order or
    /// they deadlock. Repeated products keep their relative input order.
    pub async fn reserve_all<T: StoreTransaction>(
        &self,
        tx: &mut T,
        lines: &[OrderLine],
    ) -> Result<(), PlacementError> {
        let mut lock_order = lines.to_vec();
        lock_order.sort_by_key(|line| line.product_id);

        for line in lock_order {
            self.reserve(tx, line).await?;
        }
        Ok(())
    }

    /// Decrements stock for `line`, or explains why it could not.
    ///
    /// The existence query runs only after a failed decrement, so the
    /// successful path costs one round trip.
    #[tracing::instrument(skip_all, fields(product_id = %line.product_id, quantity = line.quantity))]
    pub async fn reserve<T: StoreTransaction>(
        &self,
        tx: &mut T,
        line: OrderLine,
    ) -> Result<(), PlacementError> {
        if tx.decrement_stock(line.product_id, line.quantity).await? {
            return Ok(());
        }

        if tx.product_exists(line.product_id).await? {
            tracing::debug!("stock too low for requested quantity");
            Err(PlacementError::InsufficientStock {
                product_id: line.product_id,
                requested: line.quantity,
            })
        } else {
            Err(PlacementError::ProductNotFound {
                product_id: line.product_id,
            })
        }
    }
}
