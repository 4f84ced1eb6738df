//! Domain logic for scriptdeck: script metadata and discovery, parameter
//! binding, child-process execution with live output streaming, and the
//! execution ledger.
//!
//! No HTTP lives here -- the `scriptdeck-api` crate owns the transport.

pub mod binder;
pub mod catalog;
pub mod exec;
pub mod ledger;
pub mod script;
