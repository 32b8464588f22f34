//! The `PlaceOrder` command and its input validation.

use common::ProductId;
use store::OrderLine;

use crate::error::PlacementError;

/// One requested line as received from the caller, not yet validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceOrderLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl PlaceOrderLine {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Command to place an order for the customer registered under `customer_email`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrder {
    pub customer_email: String,
    pub lines: Vec<PlaceOrderLine>,
}

impl PlaceOrder {
    pub fn new(customer_email: impl Into<String>, lines: Vec<PlaceOrderLine>) -> Self {
        Self {
            customer_email: customer_email.into(),
            lines,
        }
    }

    /// Checks the preconditions and returns the typed order lines.
    ///
    /// Lines keep their input order; repeated products stay separate lines.
    pub fn validated_lines(&self) -> Result<Vec<OrderLine>, PlacementError> {
        if self.customer_email.trim().is_empty() {
            return Err(PlacementError::InvalidInput(
                "customer email is required".to_string(),
            ));
        }

        if self.lines.is_empty() {
            return Err(PlacementError::InvalidInput(
                "order must contain at least one item".to_string(),
            ));
        }

        self.lines
            .iter()
            .map(|line| {
                let quantity = u32::try_from(line.quantity)
                    .ok()
                    .filter(|q| *q > 0)
                    .ok_or_else(|| {
                        PlacementError::InvalidInput(format!(
                            "quantity for product {} must be between 1 and {}, got {}",
                            line.product_id,
                            u32::MAX,
                            line.quantity
                        ))
                    })?;
                Ok(OrderLine::new(line.product_id, quantity))
            })
            .collect()
    }
}
