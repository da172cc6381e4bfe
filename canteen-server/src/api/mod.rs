//! HTTP API modules
//!
//! Each resource ships its own router, nested under `/api/canteen` and
//! merged in [`core::server`](crate::core::server). Health stays at the
//! root so probes skip authentication.

pub mod health;
pub mod meals;
pub mod reservations;
