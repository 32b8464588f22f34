//! HTTP route handlers.

pub mod customers;
pub mod orders;
pub mod products;
pub mod system;
