//! Fetch-then-compute flows and the writes behind every command.
//!
//! Services take the store and the caller's [`Session`](crate::core::Session)
//! explicitly and report failures as
//! [`ServiceError`](crate::core::ServiceError).

pub mod finance;
pub mod goals;
pub mod users;
