//! Applyflow Server Library
//!
//! Exposes server modules for integration testing.

pub mod config;
pub mod lifecycle;
pub mod logging;
pub mod middleware;
