//! Domain entities and value objects, independent of persistence and transport.

pub mod auth;
pub mod category;
pub mod types;
