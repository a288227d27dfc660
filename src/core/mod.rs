//! Domain types, pure engines and the persistence contract

pub mod config;
pub mod dates;
pub mod error;
pub mod finance;
pub mod goals;
pub mod log;
pub mod period;
pub mod records;
pub mod roles;
pub mod session;
pub mod store;

// Re-export main types for cleaner imports
pub use error::{ServiceError, StoreError};
pub use session::Session;
pub use store::{Filter, Query, Record, Store, Table};
