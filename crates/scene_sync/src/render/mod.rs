//! Render scene interface
//!
//! The render pipeline is consumed through an append-only queue of ordered
//! transactions. The producer never waits for the consumer.

mod scene;
mod transaction;

pub use scene::{RenderScene, TransactionReceiver};
pub use transaction::{RenderItemId, RenderItemPayload, RenderOp, Transaction};
