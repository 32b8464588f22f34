use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{CustomerId, Money, OrderId, ProductId};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::{
    Customer, NewCustomer, NewProduct, Order, OrderDetails, OrderHistoryEntry, OrderItem,
    OrderLine, PopularProduct, Product, Result, StoreError, TransactionRecord, TransactionStatus,
    store::{Store, StoreTransaction},
};

/// A step at which the in-memory store can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    InsertOrder,
    InsertOrderItems,
    InsertTransactionRecord,
    Commit,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    customers: BTreeMap<CustomerId, Customer>,
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    order_items: Vec<OrderItem>,
    transactions: Vec<TransactionRecord>,
    last_customer_id: i64,
    last_product_id: i64,
    last_order_id: i64,
    last_item_id: i64,
    last_transaction_id: i64,
}

impl Tables {
    fn customer_by_email(&self, email: &str) -> Option<&Customer> {
        self.customers.values().find(|c| c.email == email)
    }

    fn orders_for(&self, email: &str) -> Vec<Order> {
        let Some(customer) = self.customer_by_email(email) else {
            return Vec::new();
        };
        let mut orders: Vec<Order> = self
            .orders
            .values()
            .filter(|o| o.customer_id == customer.id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        orders
    }

    fn transaction_for(&self, order_id: OrderId) -> Option<&TransactionRecord> {
        self.transactions.iter().find(|t| t.order_id == order_id)
    }
}

/// In-memory store implementation for testing and database-less runs.
///
/// A transaction takes exclusive ownership of the tables for its lifetime and
/// works on a private copy that is published only on commit. Transactions are
/// therefore fully serialized, and readers never observe uncommitted writes.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    fail_points: Arc<RwLock<HashSet<FailPoint>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every transaction begun from now on fail at `point`.
    pub async fn fail_on(&self, point: FailPoint) {
        self.fail_points.write().await.insert(point);
    }

    /// Removes all configured fail points.
    pub async fn clear_fail_points(&self) {
        self.fail_points.write().await.clear();
    }

    /// Returns the number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.tables.lock().await.orders.len()
    }

    /// Returns the number of committed order items.
    pub async fn order_item_count(&self) -> usize {
        self.tables.lock().await.order_items.len()
    }

    /// Returns the number of committed payment records.
    pub async fn transaction_count(&self) -> usize {
        self.tables.lock().await.transactions.len()
    }
}

/// Mirrors the `CHECK (price_cents >= 0)` and `CHECK (stock >= 0)` constraints.
fn check_product(product: &NewProduct) -> Result<()> {
    if product.price.is_negative() {
        return Err(StoreError::InvalidValue(format!(
            "price {} is negative",
            product.price
        )));
    }
    if product.stock < 0 {
        return Err(StoreError::InvalidValue(format!(
            "stock {} is negative",
            product.stock
        )));
    }
    Ok(())
}

#[async_trait]
impl Store for InMemoryStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        let fail_points = self.fail_points.read().await.clone();
        let committed = Arc::clone(&self.tables).lock_owned().await;
        let working = committed.clone();
        Ok(InMemoryTransaction {
            committed,
            working,
            fail_points,
        })
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.tables.lock().await.products.values().cloned().collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.tables.lock().await.products.get(&id).cloned())
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product> {
        check_product(&product)?;
        let mut tables = self.tables.lock().await;
        tables.last_product_id += 1;
        let product = Product {
            id: ProductId::new(tables.last_product_id),
            name: product.name,
            price: product.price,
            stock: product.stock,
        };
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: ProductId, product: NewProduct) -> Result<Option<Product>> {
        check_product(&product)?;
        let mut tables = self.tables.lock().await;
        let Some(existing) = tables.products.get_mut(&id) else {
            return Ok(None);
        };
        existing.name = product.name;
        existing.price = product.price;
        existing.stock = product.stock;
        Ok(Some(existing.clone()))
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if tables.order_items.iter().any(|i| i.product_id == id) {
            return Err(StoreError::Conflict(format!(
                "product {id} is referenced by order items"
            )));
        }
        Ok(tables.products.remove(&id).is_some())
    }

    async fn popular_products(&self, limit: usize) -> Result<Vec<PopularProduct>> {
        let tables = self.tables.lock().await;
        let mut sold: HashMap<ProductId, i64> = HashMap::new();
        for item in &tables.order_items {
            *sold.entry(item.product_id).or_default() += i64::from(item.quantity);
        }

        let mut popular: Vec<PopularProduct> = sold
            .into_iter()
            .filter_map(|(id, total_sold)| {
                tables.products.get(&id).map(|p| PopularProduct {
                    id,
                    name: p.name.clone(),
                    total_sold,
                })
            })
            .collect();
        popular.sort_by(|a, b| b.total_sold.cmp(&a.total_sold).then(a.id.cmp(&b.id)));
        popular.truncate(limit);
        Ok(popular)
    }

    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer> {
        let mut tables = self.tables.lock().await;
        if tables.customer_by_email(&customer.email).is_some() {
            return Err(StoreError::Conflict(format!(
                "email {} is already registered",
                customer.email
            )));
        }
        tables.last_customer_id += 1;
        let customer = Customer {
            id: CustomerId::new(tables.last_customer_id),
            name: customer.name,
            email: customer.email,
        };
        tables.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn get_customer_by_email(&self, email: &str) -> Result<Option<Customer>> {
        Ok(self.tables.lock().await.customer_by_email(email).cloned())
    }

    async fn list_customers(&self) -> Result<Vec<Customer>> {
        Ok(self.tables.lock().await.customers.values().cloned().collect())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderDetails>> {
        let tables = self.tables.lock().await;
        let Some(order) = tables.orders.get(&id).cloned() else {
            return Ok(None);
        };
        let items = tables
            .order_items
            .iter()
            .filter(|i| i.order_id == id)
            .cloned()
            .collect();
        let transaction = tables.transaction_for(id).cloned();
        Ok(Some(OrderDetails {
            order,
            items,
            transaction,
        }))
    }

    async fn orders_by_customer_email(&self, email: &str) -> Result<Vec<Order>> {
        Ok(self.tables.lock().await.orders_for(email))
    }

    async fn order_history(&self, email: &str) -> Result<Vec<OrderHistoryEntry>> {
        let tables = self.tables.lock().await;
        let mut history = Vec::new();
        for order in tables.orders_for(email) {
            let status = tables.transaction_for(order.id).map(|t| t.status);
            for item in tables.order_items.iter().filter(|i| i.order_id == order.id) {
                let Some(product) = tables.products.get(&item.product_id) else {
                    continue;
                };
                history.push(OrderHistoryEntry {
                    order_id: order.id,
                    created_at: order.created_at,
                    product_id: item.product_id,
                    product_name: product.name.clone(),
                    quantity: item.quantity,
                    total_price: order.total_price,
                    status,
                });
            }
        }
        Ok(history)
    }
}

/// An open in-memory transaction.
///
/// Dropping it without calling `commit` discards the working copy.
pub struct InMemoryTransaction {
    committed: OwnedMutexGuard<Tables>,
    working: Tables,
    fail_points: HashSet<FailPoint>,
}

impl InMemoryTransaction {
    fn check(&self, point: FailPoint) -> Result<()> {
        if self.fail_points.contains(&point) {
            return Err(StoreError::Unavailable(format!("injected failure at {point:?}")));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn find_customer_id(&mut self, email: &str) -> Result<Option<CustomerId>> {
        Ok(self.working.customer_by_email(email).map(|c| c.id))
    }

    async fn decrement_stock(&mut self, product_id: ProductId, quantity: u32) -> Result<bool> {
        match self.working.products.get_mut(&product_id) {
            Some(product) if product.stock >= i64::from(quantity) => {
                product.stock -= i64::from(quantity);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn product_exists(&mut self, product_id: ProductId) -> Result<bool> {
        Ok(self.working.products.contains_key(&product_id))
    }

    async fn product_price(&mut self, product_id: ProductId) -> Result<Option<Money>> {
        Ok(self.working.products.get(&product_id).map(|p| p.price))
    }

    async fn insert_order(&mut self, customer_id: CustomerId, total: Money) -> Result<OrderId> {
        self.check(FailPoint::InsertOrder)?;
        if !self.working.customers.contains_key(&customer_id) {
            return Err(StoreError::Conflict(format!(
                "customer {customer_id} does not exist"
            )));
        }
        self.working.last_order_id += 1;
        let id = OrderId::new(self.working.last_order_id);
        self.working.orders.insert(
            id,
            Order {
                id,
                customer_id,
                created_at: Utc::now(),
                total_price: total,
            },
        );
        Ok(id)
    }

    async fn insert_order_items(&mut self, order_id: OrderId, lines: &[OrderLine]) -> Result<()> {
        self.check(FailPoint::InsertOrderItems)?;
        for line in lines {
            if !self.working.products.contains_key(&line.product_id) {
                return Err(StoreError::Conflict(format!(
                    "product {} does not exist",
                    line.product_id
                )));
            }
            self.working.last_item_id += 1;
            let item = OrderItem {
                id: self.working.last_item_id,
                order_id,
                product_id: line.product_id,
                quantity: line.quantity,
            };
            self.working.order_items.push(item);
        }
        Ok(())
    }

    async fn insert_transaction_record(
        &mut self,
        order_id: OrderId,
        amount: Money,
        status: TransactionStatus,
    ) -> Result<()> {
        self.check(FailPoint::InsertTransactionRecord)?;
        if self.working.transaction_for(order_id).is_some() {
            return Err(StoreError::Conflict(format!(
                "order {order_id} already has a transaction record"
            )));
        }
        self.working.last_transaction_id += 1;
        let record = TransactionRecord {
            id: self.working.last_transaction_id,
            order_id,
            amount,
            status,
            created_at: Utc::now(),
        };
        self.working.transactions.push(record);
        Ok(())
    }

    async fn commit(mut self) -> Result<()> {
        self.check(FailPoint::Commit)?;
        *self.committed = self.working;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (InMemoryStore, CustomerId, ProductId) {
        let store = InMemoryStore::new();
        let customer = store
            .create_customer(NewCustomer {
                name: "Alice".to_string(),
                email: "a@x.com".to_string(),
            })
            .await
            .unwrap();
        let product = store
            .create_product(NewProduct {
                name: "Dog leash".to_string(),
                price: Money::from_cents(1000),
                stock: 5,
            })
            .await
            .unwrap();
        (store, customer.id, product.id)
    }

    #[tokio::test]
    async fn test_decrement_respects_stock() {
        let (store, _, product_id) = seeded().await;
        let mut tx = store.begin().await.unwrap();

        assert!(tx.decrement_stock(product_id, 3).await.unwrap());
        assert!(!tx.decrement_stock(product_id, 3).await.unwrap());
        assert!(tx.decrement_stock(product_id, 2).await.unwrap());
        assert!(!tx.decrement_stock(ProductId::new(999), 1).await.unwrap());
        tx.commit().await.unwrap();

        let product = store.get_product(product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 0);
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let (store, customer_id, product_id) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        let order_id = tx
            .insert_order(customer_id, Money::from_cents(2000))
            .await
            .unwrap();
        tx.insert_order_items(order_id, &[OrderLine::new(product_id, 2)])
            .await
            .unwrap();
        tx.insert_transaction_record(order_id, Money::from_cents(2000), TransactionStatus::Pending)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let details = store.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(details.order.total_price, Money::from_cents(2000));
        assert_eq!(details.items.len(), 1);
        assert_eq!(
            details.transaction.map(|t| t.status),
            Some(TransactionStatus::Pending)
        );
    }

    #[tokio::test]
    async fn test_rollback_and_drop_discard_writes() {
        let (store, customer_id, product_id) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        tx.decrement_stock(product_id, 1).await.unwrap();
        tx.insert_order(customer_id, Money::zero()).await.unwrap();
        tx.rollback().await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.decrement_stock(product_id, 4).await.unwrap();
        }

        assert_eq!(store.order_count().await, 0);
        let product = store.get_product(product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 5);
    }

    #[tokio::test]
    async fn test_fail_point_rejects_step() {
        let (store, customer_id, _) = seeded().await;
        store.fail_on(FailPoint::InsertOrder).await;

        let mut tx = store.begin().await.unwrap();
        let result = tx.insert_order(customer_id, Money::zero()).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));

        store.clear_fail_points().await;
        drop(tx);
        let mut tx = store.begin().await.unwrap();
        assert!(tx.insert_order(customer_id, Money::zero()).await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let (store, _, _) = seeded().await;
        let result = store
            .create_customer(NewCustomer {
                name: "Other".to_string(),
                email: "a@x.com".to_string(),
            })
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_delete_referenced_product_conflicts() {
        let (store, customer_id, product_id) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        let order_id = tx.insert_order(customer_id, Money::zero()).await.unwrap();
        tx.insert_order_items(order_id, &[OrderLine::new(product_id, 1)])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let result = store.delete_product(product_id).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert!(!store.delete_product(ProductId::new(404)).await.unwrap());
    }

    #[tokio::test]
    async fn test_popular_products_ranked_by_quantity() {
        let (store, customer_id, leash) = seeded().await;
        let bowl = store
            .create_product(NewProduct {
                name: "Bowl".to_string(),
                price: Money::from_cents(300),
                stock: 50,
            })
            .await
            .unwrap()
            .id;

        let mut tx = store.begin().await.unwrap();
        let order_id = tx.insert_order(customer_id, Money::zero()).await.unwrap();
        tx.insert_order_items(
            order_id,
            &[OrderLine::new(leash, 1), OrderLine::new(bowl, 4), OrderLine::new(leash, 1)],
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let popular = store.popular_products(10).await.unwrap();
        assert_eq!(popular.len(), 2);
        assert_eq!(popular[0].id, bowl);
        assert_eq!(popular[0].total_sold, 4);
        assert_eq!(popular[1].total_sold, 2);

        assert_eq!(store.popular_products(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_negative_price_or_stock_rejected() {
        let (store, _, product_id) = seeded().await;

        let result = store
            .create_product(NewProduct {
                name: "Bad price".to_string(),
                price: Money::from_cents(-1),
                stock: 1,
            })
            .await;
        assert!(matches!(result, Err(StoreError::InvalidValue(_))));

        let result = store
            .update_product(
                product_id,
                NewProduct {
                    name: "Dog leash".to_string(),
                    price: Money::from_cents(1000),
                    stock: -2,
                },
            )
            .await;
        assert!(matches!(result, Err(StoreError::InvalidValue(_))));

        let product = store.get_product(product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 5);
        assert_eq!(store.list_products().await.unwrap().len(), 1);
    }
}
