use async_trait::async_trait;
use common::{CustomerId, Money, OrderId, ProductId};
use sqlx::{PgPool, Postgres, Row, postgres::PgPoolOptions, postgres::PgRow};

use crate::{
    Customer, NewCustomer, NewProduct, Order, OrderDetails, OrderHistoryEntry, OrderItem,
    OrderLine, PopularProduct, Product, Result, StoreError, TransactionRecord, TransactionStatus,
    store::{Store, StoreTransaction},
};

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: row.try_get("stock")?,
        })
    }

    fn row_to_customer(row: PgRow) -> Result<Customer> {
        Ok(Customer {
            id: CustomerId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        Ok(Order {
            id: OrderId::new(row.try_get("id")?),
            customer_id: CustomerId::new(row.try_get("customer_id")?),
            created_at: row.try_get("created_at")?,
            total_price: Money::from_cents(row.try_get("total_price_cents")?),
        })
    }

    fn row_to_item(row: PgRow) -> Result<OrderItem> {
        Ok(OrderItem {
            id: row.try_get("id")?,
            order_id: OrderId::new(row.try_get("order_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            quantity: quantity_from_column(row.try_get("quantity")?)?,
        })
    }

    fn row_to_transaction(row: PgRow) -> Result<TransactionRecord> {
        Ok(TransactionRecord {
            id: row.try_get("id")?,
            order_id: OrderId::new(row.try_get("order_id")?),
            amount: Money::from_cents(row.try_get("amount_cents")?),
            status: status_from_column(row.try_get("status")?)?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_history(row: PgRow) -> Result<OrderHistoryEntry> {
        let status: Option<String> = row.try_get("status")?;
        Ok(OrderHistoryEntry {
            order_id: OrderId::new(row.try_get("order_id")?),
            created_at: row.try_get("created_at")?,
            product_id: ProductId::new(row.try_get("product_id")?),
            product_name: row.try_get("product_name")?,
            quantity: quantity_from_column(row.try_get("quantity")?)?,
            total_price: Money::from_cents(row.try_get("total_price_cents")?),
            status: status.map(status_from_column).transpose()?,
        })
    }
}

fn quantity_from_column(raw: i64) -> Result<u32> {
    u32::try_from(raw).map_err(|_| StoreError::InvalidValue(format!("quantity {raw} out of range")))
}

fn status_from_column(raw: String) -> Result<TransactionStatus> {
    raw.parse().map_err(StoreError::InvalidValue)
}

#[async_trait]
impl Store for PostgresStore {
    type Transaction = PostgresTransaction;

    async fn begin(&self) -> Result<PostgresTransaction> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTransaction { tx })
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query("SELECT id, name, price_cents, stock FROM products ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT id, name, price_cents, stock FROM products WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product> {
        let row = sqlx::query(
            r#"
            INSERT INTO products (name, price_cents, stock)
            VALUES ($1, $2, $3)
            RETURNING id, name, price_cents, stock
            "#,
        )
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(product.stock)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_product(row)
    }

    async fn update_product(&self, id: ProductId, product: NewProduct) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, price_cents = $3, stock = $4
            WHERE id = $1
            RETURNING id, name, price_cents, stock
            "#,
        )
        .bind(id.as_i64())
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(product.stock)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn popular_products(&self, limit: usize) -> Result<Vec<PopularProduct>> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.name, SUM(oi.quantity)::BIGINT AS total_sold
            FROM order_items oi
            JOIN products p ON oi.product_id = p.id
            GROUP BY p.id, p.name
            ORDER BY total_sold DESC, p.id ASC
            LIMIT $1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(PopularProduct {
                    id: ProductId::new(row.try_get("id")?),
                    name: row.try_get("name")?,
                    total_sold: row.try_get("total_sold")?,
                })
            })
            .collect()
    }

    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer> {
        let row = sqlx::query(
            "INSERT INTO customers (name, email) VALUES ($1, $2) RETURNING id, name, email",
        )
        .bind(&customer.name)
        .bind(&customer.email)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_customer(row)
    }

    async fn get_customer_by_email(&self, email: &str) -> Result<Option<Customer>> {
        let row = sqlx::query("SELECT id, name, email FROM customers WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_customer).transpose()
    }

    async fn list_customers(&self) -> Result<Vec<Customer>> {
        let rows = sqlx::query("SELECT id, name, email FROM customers ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_customer).collect()
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderDetails>> {
        let Some(row) = sqlx::query(
            "SELECT id, customer_id, created_at, total_price_cents FROM orders WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };
        let order = Self::row_to_order(row)?;

        let items = sqlx::query(
            r#"
            SELECT id, order_id, product_id, quantity
            FROM order_items
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(id.as_i64())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Self::row_to_item)
        .collect::<Result<Vec<_>>>()?;

        let transaction = sqlx::query(
            r#"
            SELECT id, order_id, amount_cents, status, created_at
            FROM transactions
            WHERE order_id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?
        .map(Self::row_to_transaction)
        .transpose()?;

        Ok(Some(OrderDetails {
            order,
            items,
            transaction,
        }))
    }

    async fn orders_by_customer_email(&self, email: &str) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT o.id, o.customer_id, o.created_at, o.total_price_cents
            FROM orders o
            JOIN customers c ON o.customer_id = c.id
            WHERE c.email = $1
            ORDER BY o.created_at DESC, o.id DESC
            "#,
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn order_history(&self, email: &str) -> Result<Vec<OrderHistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT
                o.id AS order_id,
                o.created_at,
                oi.product_id,
                p.name AS product_name,
                oi.quantity,
                o.total_price_cents,
                t.status
            FROM orders o
            JOIN customers c ON o.customer_id = c.id
            JOIN order_items oi ON oi.order_id = o.id
            JOIN products p ON p.id = oi.product_id
            LEFT JOIN transactions t ON t.order_id = o.id
            WHERE c.email = $1
            ORDER BY o.created_at DESC, o.id DESC, oi.id ASC
            "#,
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_history).collect()
    }
}

/// A live PostgreSQL transaction.
///
/// sqlx rolls the transaction back if this is dropped before `commit`, which
/// is what makes a caller-side timeout safe.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn find_customer_id(&mut self, email: &str) -> Result<Option<CustomerId>> {
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM customers WHERE email = $1")
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(id.map(CustomerId::new))
    }

    async fn decrement_stock(&mut self, product_id: ProductId, quantity: u32) -> Result<bool> {
        let result =
            sqlx::query("UPDATE products SET stock = stock - $1 WHERE id = $2 AND stock >= $1")
                .bind(i64::from(quantity))
                .bind(product_id.as_i64())
                .execute(&mut *self.tx)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn product_exists(&mut self, product_id: ProductId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
            .bind(product_id.as_i64())
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(exists)
    }

    async fn product_price(&mut self, product_id: ProductId) -> Result<Option<Money>> {
        let cents: Option<i64> = sqlx::query_scalar("SELECT price_cents FROM products WHERE id = $1")
            .bind(product_id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(cents.map(Money::from_cents))
    }

    async fn insert_order(&mut self, customer_id: CustomerId, total: Money) -> Result<OrderId> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO orders (customer_id, total_price_cents) VALUES ($1, $2) RETURNING id",
        )
        .bind(customer_id.as_i64())
        .bind(total.cents())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(OrderId::new(id))
    }

    async fn insert_order_items(&mut self, order_id: OrderId, lines: &[OrderLine]) -> Result<()> {
        let product_ids: Vec<i64> = lines.iter().map(|l| l.product_id.as_i64()).collect();
        let quantities: Vec<i64> = lines.iter().map(|l| i64::from(l.quantity)).collect();

        // One statement for the whole batch; ordinality keeps ids in line order.
        sqlx::query(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity)
            SELECT $1, line.product_id, line.quantity
            FROM UNNEST($2::BIGINT[], $3::BIGINT[]) WITH ORDINALITY
                AS line(product_id, quantity, position)
            ORDER BY line.position
            "#,
        )
        .bind(order_id.as_i64())
        .bind(product_ids)
        .bind(quantities)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_transaction_record(
        &mut self,
        order_id: OrderId,
        amount: Money,
        status: TransactionStatus,
    ) -> Result<()> {
        sqlx::query("INSERT INTO transactions (order_id, amount_cents, status) VALUES ($1, $2, $3)")
            .bind(order_id.as_i64())
            .bind(amount.cents())
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
