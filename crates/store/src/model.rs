//! Row types for the shop tables.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use common::{CustomerId, Money, OrderId, ProductId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
}

/// Fields of a customer that does not have an id yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(rename = "price_cents")]
    pub price: Money,
    pub stock: i64,
}

/// Writable product fields, used for both inserts and full updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(rename = "price_cents")]
    pub price: Money,
    pub stock: i64,
}

/// Order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "total_price_cents")]
    pub total_price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// One requested line of a placement: a product and a positive quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl OrderLine {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Status recorded on the payment ledger row of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Completed,
}

impl TransactionStatus {
    /// The value stored in the `transactions.status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            other => Err(format!("unknown transaction status '{other}'")),
        }
    }
}

/// Payment ledger entry, one per placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: i64,
    pub order_id: OrderId,
    #[serde(rename = "amount_cents")]
    pub amount: Money,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

/// An order together with its items and ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub transaction: Option<TransactionRecord>,
}

/// One flattened row of a customer's order history (one per order item).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHistoryEntry {
    pub order_id: OrderId,
    pub created_at: DateTime<Utc>,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    #[serde(rename = "total_price_cents")]
    pub total_price: Money,
    pub status: Option<TransactionStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularProduct {
    pub id: ProductId,
    pub name: String,
    pub total_sold: i64,
}
