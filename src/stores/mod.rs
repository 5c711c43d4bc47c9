//! Per-session state containers.

pub mod auth;
pub mod cart;
pub mod event;
pub mod purchase;

pub use auth::{AuthSnapshot, AuthStore};
pub use cart::{CartSnapshot, CartStore};
pub use event::{EventState, EventStore};
pub use purchase::{PurchaseSnapshot, PurchaseStore};
