// src/services/mod.rs
//! Business logic and API: the lifecycle coordinator, the rate limiter,
//! and the HTTP surface.

pub mod api_server;
pub mod coordinator;
pub mod rate_limiter;
