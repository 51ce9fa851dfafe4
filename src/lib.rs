//! Terminal frontend for the delve debugger.

pub mod client;
pub mod session;
pub mod ui;
