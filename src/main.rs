// src/main.rs

//! # Document Credential Registry Service - Main Entry Point
//!
//! Initializes all core components and starts the API server.
//!
//! ## Architecture Overview
//! 1. **Blockchain Layer**: `EvmRegistry` for the on-chain credential registry
//! 2. **Services Layer**: lifecycle coordinator, rate limiter, and API endpoints
//! 3. **Storage Layer**: SQLite activity ledger and IPFS content store
//!
//! ## Environment Variables Required
//! - `DOCREG_REGISTRY__PRIVATE_KEY`: signer wallet private key
//! - `DOCREG_REGISTRY__CONTRACT_ADDRESS`: deployed CredentialRegistry address
//!
//! See [`config::Settings`] for the optional variables and their defaults.

use crate::blockchain::evm_registry::EvmRegistry;
use crate::config::Settings;
use crate::services::api_server::ApiServer;
use crate::services::coordinator::LifecycleCoordinator;
use crate::services::rate_limiter::{spawn_purge_task, RateLimiter};
use crate::storage::activity_ledger::ActivityLedger;
use crate::storage::content_store::ContentStore;
use anyhow::Context;
use dotenv::dotenv;
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;

// Module declarations (organized by functional domain)
mod blockchain; // registry client for the external credential registry
mod config; // environment-driven settings
mod error; // tagged error taxonomy
mod models; // data structures
mod services; // business logic and API
mod storage; // activity ledger and content store
mod utils; // helper functions

/// Main application entry point
///
/// # Initialization Sequence
/// 1. Load environment configuration
/// 2. Connect to the registry contract
/// 3. Open the activity ledger and start the rate limiter
/// 4. Start the API server
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::init();

    let settings = Settings::load().context("loading configuration")?;

    // Registry client for the on-chain CredentialRegistry contract
    let registry = EvmRegistry::connect(
        &settings.registry.rpc_url,
        &settings.registry.private_key,
        &settings.registry.contract_address,
        settings.registry.call_timeout(),
        settings.registry.read_retries,
    )
    .await
    .context("connecting to the credential registry")?;

    // Append-only activity ledger
    let ledger = ActivityLedger::open(&settings.ledger_path)
        .with_context(|| format!("opening activity ledger at {}", settings.ledger_path))?;

    // Per-actor rate limiter with its background purge loop
    let rate_limiter = Arc::new(RateLimiter::new(
        settings.rate_limit.quota,
        settings.rate_limit.window(),
    ));
    let purge_task = spawn_purge_task(rate_limiter.clone(), settings.rate_limit.purge_interval());

    // Lifecycle coordinator owns all registry and ledger access
    let coordinator = LifecycleCoordinator::new(Arc::new(registry), ledger, rate_limiter);

    let api_server = ApiServer::new(coordinator, ContentStore::new());

    let addr: SocketAddr = settings
        .bind_addr
        .parse()
        .with_context(|| format!("parsing bind address '{}'", settings.bind_addr))?;

    info!("API server starting at http://{}", addr);
    info!("Available endpoints:");
    info!("- POST /issue-credential");
    info!("- POST /verify-credential");
    info!("- POST /revoke-credential");
    info!("- GET  /activity");
    info!("- POST /store-document");
    info!("- GET  /retrieve-document/:content_ref");

    let result = api_server.run(addr).await;
    purge_task.abort();
    result
}
