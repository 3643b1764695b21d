//! # Service Lifecycle
//!
//! [`Dependencies`] builds the backend handles; [`OrdersService`] runs the pipeline
//! over them and shuts everything down in order.

pub mod bootstrap;
pub mod orders_service;

pub use bootstrap::Dependencies;
pub use orders_service::OrdersService;
