//! Payment ledger entry for a placed order.

use common::{Money, OrderId};
use store::{StoreTransaction, TransactionStatus};

use crate::error::PlacementError;

/// Appends the single payment record of an order.
///
/// The status written is fixed per deployment; it defaults to `pending`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionRecorder {
    status: TransactionStatus,
}

impl TransactionRecorder {
    pub fn new(status: TransactionStatus) -> Self {
        Self { status }
    }

    /// The status this recorder writes.
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub async fn record<T: StoreTransaction>(
        &self,
        tx: &mut T,
        order_id: OrderId,
        total: Money,
    ) -> Result<(), PlacementError> {
        tx.insert_transaction_record(order_id, total, self.status)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use store::{FailPoint, InMemoryStore, NewCustomer, NewProduct, OrderLine, Store};

    use super::*;

    async fn open_order(store: &InMemoryStore) -> (store::InMemoryTransaction, OrderId) {
        let customer = store
            .create_customer(NewCustomer {
                name: "Cleo".to_string(),
                email: "cleo@x.com".to_string(),
            })
            .await
            .unwrap();
        let product = store
            .create_product(NewProduct {
                name: "Litter".to_string(),
                price: Money::from_cents(900),
                stock: 4,
            })
            .await
            .unwrap();
        let mut tx = store.begin().await.unwrap();
        let order_id = tx
            .insert_order(customer.id, Money::from_cents(900))
            .await
            .unwrap();
        tx.insert_order_items(order_id, &[OrderLine::new(product.id, 1)])
            .await
            .unwrap();
        (tx, order_id)
    }

    #[tokio::test]
    async fn test_records_configured_status() {
        let store = InMemoryStore::new();
        let (mut tx, order_id) = open_order(&store).await;

        let recorder = TransactionRecorder::new(TransactionStatus::Completed);
        recorder
            .record(&mut tx, order_id, Money::from_cents(900))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let record = store
            .get_order(order_id)
            .await
            .unwrap()
            .unwrap()
            .transaction
            .unwrap();
        assert_eq!(record.status, TransactionStatus::Completed);
        assert_eq!(record.amount, Money::from_cents(900));
    }

    #[tokio::test]
    async fn test_store_fault_is_persistence_error() {
        let store = InMemoryStore::new();
        store.fail_on(FailPoint::InsertTransactionRecord).await;
        let (mut tx, order_id) = open_order(&store).await;

        let result = TransactionRecorder::default()
            .record(&mut tx, order_id, Money::from_cents(900))
            .await;
        assert!(matches!(result, Err(PlacementError::Persistence(_))));
    }
}
