// src/blockchain/mod.rs
//! Registry client: the typed interface over the external credential
//! registry and its zkSync-backed implementation.

pub mod evm_registry;
pub mod registry;
