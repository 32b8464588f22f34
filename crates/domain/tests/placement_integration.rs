//! Integration tests for order placement.
//!
//! These tests drive `OrderPlacementService` against the in-memory store and
//! check both the returned outcome and what is left behind in the tables.

use common::{Money, ProductId};
use domain::{OrderPlacementService, PlaceOrder, PlaceOrderLine, PlacementError};
use store::{FailPoint, InMemoryStore, NewCustomer, NewProduct, Store, TransactionStatus};

const EMAIL: &str = "a@x.com";

/// Helper to create a service with one registered customer
async fn create_service() -> OrderPlacementService<InMemoryStore> {
    let store = InMemoryStore::new();
    store
        .create_customer(NewCustomer {
            name: "Alice".to_string(),
            email: EMAIL.to_string(),
        })
        .await
        .unwrap();
    OrderPlacementService::new(store)
}

async fn add_product(
    service: &OrderPlacementService<InMemoryStore>,
    name: &str,
    price_cents: i64,
    stock: i64,
) -> ProductId {
    service
        .store()
        .create_product(NewProduct {
            name: name.to_string(),
            price: Money::from_cents(price_cents),
            stock,
        })
        .await
        .unwrap()
        .id
}

async fn stock_of(service: &OrderPlacementService<InMemoryStore>, id: ProductId) -> i64 {
    service.store().get_product(id).await.unwrap().unwrap().stock
}

async fn assert_nothing_written(service: &OrderPlacementService<InMemoryStore>) {
    assert_eq!(service.store().order_count().await, 0);
    assert_eq!(service.store().order_item_count().await, 0);
    assert_eq!(service.store().transaction_count().await, 0);
}

fn order(lines: &[(ProductId, i64)]) -> PlaceOrder {
    PlaceOrder::new(
        EMAIL,
        lines
            .iter()
            .map(|(id, qty)| PlaceOrderLine::new(*id, *qty))
            .collect(),
    )
}

mod placement {
    use super::*;

    #[tokio::test]
    async fn successful_order_decrements_stock_and_records_total() {
        let service = create_service().await;
        let p1 = add_product(&service, "Dog bed", 1000, 5).await;

        let receipt = service.place_order(order(&[(p1, 2)])).await.unwrap();

        assert_eq!(receipt.total, Money::from_cents(2000));
        assert_eq!(stock_of(&service, p1).await, 3);

        let details = service
            .store()
            .get_order(receipt.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(details.order.total_price, Money::from_cents(2000));
        assert_eq!(details.items.len(), 1);
        assert_eq!(details.items[0].product_id, p1);
        assert_eq!(details.items[0].quantity, 2);

        let record = details.transaction.unwrap();
        assert_eq!(record.amount, Money::from_cents(2000));
        assert_eq!(record.status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn total_sums_every_line() {
        let service = create_service().await;
        let p1 = add_product(&service, "Leash", 1250, 10).await;
        let p2 = add_product(&service, "Collar", 399, 10).await;

        let receipt = service
            .place_order(order(&[(p1, 2), (p2, 3), (p1, 1)]))
            .await
            .unwrap();

        // 3 * 12.50 + 3 * 3.99
        assert_eq!(receipt.total, Money::from_cents(4947));
        assert_eq!(stock_of(&service, p1).await, 7);
        assert_eq!(stock_of(&service, p2).await, 7);

        let details = service
            .store()
            .get_order(receipt.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(details.items.len(), 3);
    }

    #[tokio::test]
    async fn order_shows_up_in_customer_history() {
        let service = create_service().await;
        let p1 = add_product(&service, "Catnip", 250, 4).await;

        let receipt = service.place_order(order(&[(p1, 4)])).await.unwrap();

        let history = service.store().order_history(EMAIL).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].order_id, receipt.order_id);
        assert_eq!(history[0].product_name, "Catnip");
        assert_eq!(history[0].status, Some(TransactionStatus::Pending));
        assert_eq!(stock_of(&service, p1).await, 0);
    }
}

mod error_handling {
    use super::*;

    #[tokio::test]
    async fn insufficient_stock_leaves_stock_untouched() {
        let service = create_service().await;
        let p1 = add_product(&service, "Aquarium", 5000, 1).await;

        let result = service.place_order(order(&[(p1, 5)])).await;

        assert!(matches!(
            result,
            Err(PlacementError::InsufficientStock { product_id, requested: 5 }) if product_id == p1
        ));
        assert_eq!(stock_of(&service, p1).await, 1);
        assert_nothing_written(&service).await;
    }

    #[tokio::test]
    async fn unknown_customer_fails_before_stock_changes() {
        let service = create_service().await;
        let p1 = add_product(&service, "Bird cage", 3000, 5).await;

        let result = service
            .place_order(PlaceOrder::new(
                "nobody@x.com",
                vec![PlaceOrderLine::new(p1, 1)],
            ))
            .await;

        assert!(matches!(
            result,
            Err(PlacementError::CustomerNotFound { ref email }) if email == "nobody@x.com"
        ));
        assert_eq!(stock_of(&service, p1).await, 5);
        assert_nothing_written(&service).await;
    }

    #[tokio::test]
    async fn unknown_product_rolls_back_earlier_decrements() {
        let service = create_service().await;
        let p1 = add_product(&service, "Scratching post", 2000, 5).await;
        let missing = ProductId::new(999);

        let result = service.place_order(order(&[(p1, 2), (missing, 1)])).await;

        assert!(matches!(
            result,
            Err(PlacementError::ProductNotFound { product_id }) if product_id == missing
        ));
        assert_eq!(stock_of(&service, p1).await, 5);
        assert_nothing_written(&service).await;
    }

    #[tokio::test]
    async fn empty_items_rejected_without_opening_a_transaction() {
        let service = create_service().await;
        // A commit failure would surface as Persistence if a transaction were used.
        service.store().fail_on(FailPoint::Commit).await;

        let result = service.place_order(order(&[])).await;

        assert!(matches!(result, Err(PlacementError::InvalidInput(_))));
        assert_nothing_written(&service).await;
    }

    #[tokio::test]
    async fn invalid_quantity_rejected() {
        let service = create_service().await;
        let p1 = add_product(&service, "Fish food", 300, 5).await;

        let result = service.place_order(order(&[(p1, 0)])).await;

        assert!(matches!(result, Err(PlacementError::InvalidInput(_))));
        assert_eq!(stock_of(&service, p1).await, 5);
    }

    #[tokio::test]
    async fn failure_at_any_write_step_rolls_everything_back() {
        for point in [
            FailPoint::InsertOrder,
            FailPoint::InsertOrderItems,
            FailPoint::InsertTransactionRecord,
            FailPoint::Commit,
        ] {
            let service = create_service().await;
            let p1 = add_product(&service, "Chew toy", 500, 5).await;
            service.store().fail_on(point).await;

            let result = service.place_order(order(&[(p1, 2)])).await;

            assert!(
                matches!(result, Err(PlacementError::Persistence(_))),
                "{point:?} should surface as a persistence error"
            );
            assert_eq!(stock_of(&service, p1).await, 5, "{point:?} leaked a decrement");
            assert_nothing_written(&service).await;
        }
    }

    #[tokio::test]
    async fn retry_after_transient_failure_succeeds_once() {
        let service = create_service().await;
        let p1 = add_product(&service, "Heat lamp", 4500, 3).await;
        service
            .store()
            .fail_on(FailPoint::InsertTransactionRecord)
            .await;

        assert!(service.place_order(order(&[(p1, 1)])).await.is_err());

        service.store().clear_fail_points().await;
        service.place_order(order(&[(p1, 1)])).await.unwrap();

        assert_eq!(stock_of(&service, p1).await, 2);
        assert_eq!(service.store().order_count().await, 1);
        assert_eq!(service.store().transaction_count().await, 1);
    }
}

mod concurrency {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_orders_never_oversell() {
        let service = create_service().await;
        let p1 = add_product(&service, "Last puppy bowl", 100, 3).await;

        let attempts = (0..10).map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.place_order(order(&[(p1, 1)])).await })
        });
        let results: Vec<_> = futures_util::future::join_all(attempts)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        let placed = results.iter().filter(|r| r.is_ok()).count();
        let short = results
            .iter()
            .filter(|r| matches!(r, Err(PlacementError::InsufficientStock { .. })))
            .count();

        assert_eq!(placed, 3);
        assert_eq!(short, 7);
        assert_eq!(stock_of(&service, p1).await, 0);
        assert_eq!(service.store().order_count().await, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_orders_on_different_products_all_succeed() {
        let service = create_service().await;
        let p1 = add_product(&service, "Hay", 150, 10).await;
        let p2 = add_product(&service, "Pellets", 275, 10).await;

        let (a, b) = tokio::join!(
            service.place_order(order(&[(p1, 4)])),
            service.place_order(order(&[(p2, 6), (p1, 1)])),
        );

        assert_eq!(a.unwrap().total, Money::from_cents(600));
        assert_eq!(b.unwrap().total, Money::from_cents(1800));
        assert_eq!(stock_of(&service, p1).await, 5);
        assert_eq!(stock_of(&service, p2).await, 4);
    }
}

mod observability {
    use super::*;

    #[tokio::test]
    async fn placement_runs_under_a_scoped_subscriber() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let service = create_service().await;
        let p1 = add_product(&service, "Terrarium", 8000, 1).await;

        service.place_order(order(&[(p1, 1)])).await.unwrap();
        let err = service.place_order(order(&[(p1, 1)])).await.unwrap_err();

        assert_eq!(err.reason(), "insufficient_stock");
    }
}
