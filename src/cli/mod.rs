//! Terminal rendering and command handlers.

pub mod finance;
pub mod goals;
pub mod setup;
pub mod ui;
pub mod users;
