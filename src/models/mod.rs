//! Diesel row types and runtime configuration models.

pub mod category;
pub mod config;
