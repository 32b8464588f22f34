//! Order placement orchestrator.

use common::{Money, OrderId};
use store::{OrderLine, Store, StoreTransaction, TransactionStatus};

use super::{InventoryLedger, OrderBuilder, PlaceOrder, PricingResolver, TransactionRecorder};
use crate::error::PlacementError;

/// Outcome of a committed placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementReceipt {
    pub order_id: OrderId,
    pub total: Money,
    pub status: TransactionStatus,
}

/// Places orders as single units of work.
///
/// Steps, all inside one store transaction:
/// 1. Resolve the customer by email
/// 2. Decrement stock for every line, in product id order
/// 3. Price every line and sum the total
/// 4. Write the order header and items
/// 5. Append the payment record
///
/// Any failure rolls the transaction back, so a failed placement leaves no
/// order, no items, no payment record and no stock change behind.
pub struct OrderPlacementService<S: Store> {
    store: S,
    ledger: InventoryLedger,
    pricing: PricingResolver,
    builder: OrderBuilder,
    recorder: TransactionRecorder,
}

impl<S: Store> OrderPlacementService<S> {
    /// Creates a service that records new orders as `pending`.
    pub fn new(store: S) -> Self {
        Self::with_recorder(store, TransactionRecorder::default())
    }

    /// Creates a service with a specific payment recorder.
    pub fn with_recorder(store: S, recorder: TransactionRecorder) -> Self {
        Self {
            store,
            ledger: InventoryLedger::new(),
            pricing: PricingResolver::new(),
            builder: OrderBuilder::new(),
            recorder,
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Places an order.
    ///
    /// Input is validated before the transaction opens; an invalid command
    /// never touches the store.
    #[tracing::instrument(
        skip_all,
        fields(customer_email = %cmd.customer_email, lines = cmd.lines.len())
    )]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<PlacementReceipt, PlacementError> {
        let started = std::time::Instant::now();

        let result = self.execute(&cmd).await;
        metrics::histogram!("order_placement_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(receipt) => {
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(
                    order_id = %receipt.order_id,
                    total = %receipt.total,
                    status = %receipt.status,
                    "order placed"
                );
            }
            Err(err) => {
                metrics::counter!("order_placement_failures_total", "reason" => err.reason())
                    .increment(1);
                tracing::warn!(reason = err.reason(), error = %err, "order placement failed");
            }
        }

        result
    }

    async fn execute(&self, cmd: &PlaceOrder) -> Result<PlacementReceipt, PlacementError> {
        let lines = cmd.validated_lines()?;

        let mut tx = self.store.begin().await?;
        match self.run_steps(&mut tx, &cmd.customer_email, &lines).await {
            Ok(receipt) => {
                tx.commit().await?;
                Ok(receipt)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    // Surface the step error, not the rollback error.
                    tracing::error!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn run_steps(
        &self,
        tx: &mut S::Transaction,
        customer_email: &str,
        lines: &[OrderLine],
    ) -> Result<PlacementReceipt, PlacementError> {
        let customer_id = tx.find_customer_id(customer_email).await?.ok_or_else(|| {
            PlacementError::CustomerNotFound {
                email: customer_email.to_string(),
            }
        })?;

        self.ledger.reserve_all(tx, lines).await?;

        let mut total = Money::zero();
        for line in lines {
            let amount = self.pricing.line_amount(tx, *line).await?;
            total = total.checked_add(amount).ok_or_else(|| {
                PlacementError::InvalidInput("order total overflows".to_string())
            })?;
        }

        let order_id = self.builder.persist(tx, customer_id, lines, total).await?;
        self.recorder.record(tx, order_id, total).await?;

        Ok(PlacementReceipt {
            order_id,
            total,
            status: self.recorder.status(),
        })
    }
}

impl<S: Store + Clone> Clone for OrderPlacementService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            ledger: self.ledger,
            pricing: self.pricing,
            builder: self.builder,
            recorder: self.recorder,
        }
    }
}
