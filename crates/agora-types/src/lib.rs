//! Types shared between the store, the core and the HTTP layer.

pub mod api;
pub mod models;
