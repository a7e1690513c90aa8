pub mod error;
pub mod event_bus;
pub mod governor;
pub mod lifecycle;
pub mod metrics;
pub mod retry;
pub mod schema;
