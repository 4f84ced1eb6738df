//! HTTP surface for scriptdeck: configuration, application state, the
//! router and middleware stack, and the listing/execution handlers.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod routes;
pub mod state;
