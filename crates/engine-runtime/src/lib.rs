pub mod actor;
pub mod error;
pub mod execution;


pub use error::ReconError;
pub use execution::{
    executor::{KeySelection, ReconcileRequest, reconcile},
    strategy::ExecutionStrategy,
};
