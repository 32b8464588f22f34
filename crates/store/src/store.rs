use async_trait::async_trait;
use common::{CustomerId, Money, OrderId, ProductId};

use crate::{
    Customer, NewCustomer, NewProduct, Order, OrderDetails, OrderHistoryEntry, OrderLine,
    PopularProduct, Product, Result, TransactionStatus,
};

/// Pool-level access to the shop tables.
///
/// Every method here runs as its own statement (or its own short read). Writes
/// that must land together go through [`Store::begin`] instead.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    /// The unit of work handed out by [`Store::begin`].
    type Transaction: StoreTransaction;

    /// Opens a transactional scope.
    ///
    /// Dropping the returned transaction without committing rolls it back.
    async fn begin(&self) -> Result<Self::Transaction>;

    /// Lists all products ordered by id.
    async fn list_products(&self) -> Result<Vec<Product>>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    async fn create_product(&self, product: NewProduct) -> Result<Product>;

    /// Replaces a product's writable fields.
    ///
    /// Returns None if the product doesn't exist.
    async fn update_product(&self, id: ProductId, product: NewProduct) -> Result<Option<Product>>;

    /// Deletes a product, returning false if it didn't exist.
    ///
    /// Fails with `Conflict` while order items still reference it.
    async fn delete_product(&self, id: ProductId) -> Result<bool>;

    /// Best sellers by total quantity ordered, highest first.
    async fn popular_products(&self, limit: usize) -> Result<Vec<PopularProduct>>;

    /// Inserts a customer. Fails with `Conflict` if the email is taken.
    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer>;

    async fn get_customer_by_email(&self, email: &str) -> Result<Option<Customer>>;

    async fn list_customers(&self) -> Result<Vec<Customer>>;

    /// Loads an order header with its items and ledger entry.
    async fn get_order(&self, id: OrderId) -> Result<Option<OrderDetails>>;

    /// Order headers of the customer with this email, newest first.
    async fn orders_by_customer_email(&self, email: &str) -> Result<Vec<Order>>;

    /// One row per ordered item across the customer's orders, newest first.
    async fn order_history(&self, email: &str) -> Result<Vec<OrderHistoryEntry>>;
}

/// A single transactional scope over the shop tables.
///
/// Nothing written through a transaction is visible to other readers until
/// [`StoreTransaction::commit`] succeeds.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Resolves a customer email to its id.
    async fn find_customer_id(&mut self, email: &str) -> Result<Option<CustomerId>>;

    /// Conditionally decrements stock: applies only if `stock >= quantity`.
    ///
    /// Returns false when no row was updated, meaning the product is missing
    /// or short on stock. The check and the write are one statement, so
    /// concurrent callers can never drive stock negative.
    async fn decrement_stock(&mut self, product_id: ProductId, quantity: u32) -> Result<bool>;

    async fn product_exists(&mut self, product_id: ProductId) -> Result<bool>;

    /// Current unit price of a product, or None if it doesn't exist.
    async fn product_price(&mut self, product_id: ProductId) -> Result<Option<Money>>;

    /// Inserts an order header and returns its assigned id.
    async fn insert_order(&mut self, customer_id: CustomerId, total: Money) -> Result<OrderId>;

    /// Inserts one item row per line, in line order.
    async fn insert_order_items(&mut self, order_id: OrderId, lines: &[OrderLine]) -> Result<()>;

    async fn insert_transaction_record(
        &mut self,
        order_id: OrderId,
        amount: Money,
        status: TransactionStatus,
    ) -> Result<()>;

    /// Makes every write of this scope durable and visible.
    async fn commit(self) -> Result<()>;

    /// Discards every write of this scope.
    async fn rollback(self) -> Result<()>;
}
