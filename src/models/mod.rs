//! # Order Models
//!
//! The `Order` aggregate and its value objects. Persistence row types live with the
//! store that owns them (`repository::postgres`).

pub mod order;

pub use order::{Delivery, Item, Order, Payment};
