//! The order-placement transaction and its steps.

mod builder;
mod command;
mod ledger;
mod orchestrator;
mod pricing;
mod recorder;

pub use builder::OrderBuilder;
pub use command::{PlaceOrder, PlaceOrderLine};
pub use ledger::InventoryLedger;
pub use orchestrator::{OrderPlacementService, PlacementReceipt};
pub use pricing::PricingResolver;
pub use recorder::TransactionRecorder;
