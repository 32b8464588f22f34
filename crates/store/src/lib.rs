//! Relational storage for the order service.
//!
//! The [`Store`] trait is the pool-level capability (catalog CRUD, reports and
//! opening a unit of work); [`StoreTransaction`] is the unit of work the order
//! placement runs inside. Two implementations ship: [`PostgresStore`] backed
//! by sqlx, and [`InMemoryStore`] for tests and database-less runs.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{FailPoint, InMemoryStore, InMemoryTransaction};
pub use model::{
    Customer, NewCustomer, NewProduct, Order, OrderDetails, OrderHistoryEntry, OrderItem,
    OrderLine, PopularProduct, Product, TransactionRecord, TransactionStatus,
};
pub use postgres::{PostgresStore, PostgresTransaction};
pub use store::{Store, StoreTransaction};
