// src/services/api_server.rs
//! HTTP surface for the credential lifecycle service.
//!
//! Exposes the three lifecycle operations (issue, verify, revoke), the
//! recent-activity view backed by the ledger, and the content-store
//! passthrough used to pin documents before issuance.
//!
//! Error responses carry the tagged classification from the coordinator;
//! rate-limit denials additionally surface `X-RateLimit-*` and
//! `Retry-After` headers so clients can schedule their retry.

use crate::blockchain::evm_registry::EvmRegistry;
use crate::error::{ContentStoreError, LifecycleError};
use crate::models::activity::{ActivityFilter, ActivityRecord, Operation};
use crate::services::coordinator::{
    IssueOutcome, LifecycleCoordinator, RevokeOutcome,
};
use crate::storage::content_store::ContentStore;
use crate::utils::crypto::fingerprint;
use axum::{
    extract::{Json, Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// The production coordinator wired against the on-chain registry.
pub type Coordinator = LifecycleCoordinator<EvmRegistry>;

// API request and response structures

/// Request payload for issuing a credential. The target document may be
/// given either as a precomputed fingerprint or as raw base64 bytes that
/// the server fingerprints; an explicit fingerprint wins when both are set.
#[derive(Serialize, Deserialize)]
struct IssueCredentialRequest {
    fingerprint: Option<String>,
    document_base64: Option<String>,
    actor: String,
    content_ref: Option<String>,
}

/// Response for credential issuance operation
#[derive(Serialize, Deserialize)]
struct IssueCredentialResponse {
    status: String,
    fingerprint: String,
    external_ref: Option<String>,
    confirmed_at: Option<DateTime<Utc>>,
}

/// Request payload for verifying a credential
#[derive(Serialize, Deserialize)]
struct VerifyCredentialRequest {
    fingerprint: Option<String>,
    document_base64: Option<String>,
}

/// Response for credential verification operation
#[derive(Serialize, Deserialize)]
struct VerifyCredentialResponse {
    found: bool,
    fingerprint: String,
    issuer: Option<String>,
    valid: Option<bool>,
    content_ref: Option<String>,
    issued_at: Option<DateTime<Utc>>,
}

/// Request payload for revoking a credential
#[derive(Serialize, Deserialize)]
struct RevokeCredentialRequest {
    fingerprint: String,
    actor: String,
}

/// Response for credential revocation operation
#[derive(Serialize, Deserialize)]
struct RevokeCredentialResponse {
    status: String,
    external_ref: Option<String>,
    confirmed_at: Option<DateTime<Utc>>,
}

/// Query parameters for the activity view
#[derive(Deserialize)]
struct ActivityQuery {
    actor: Option<String>,
    operation: Option<String>,
    limit: Option<u32>,
}

/// Response containing recent activity records
#[derive(Serialize)]
struct ActivityResponse {
    records: Vec<ActivityRecord>,
}

/// Request payload for pinning a document to the content store
#[derive(Serialize, Deserialize)]
struct StoreDocumentRequest {
    document: serde_json::Value,
}

/// Response containing the content reference of a pinned document
#[derive(Serialize, Deserialize)]
struct StoreDocumentResponse {
    content_ref: String,
}

/// Response containing a retrieved document
#[derive(Serialize, Deserialize)]
struct RetrieveDocumentResponse {
    document: serde_json::Value,
}

/// Caller-facing error envelope.
///
/// Carries the HTTP status, the human-actionable message, and any
/// rate-limit metadata to emit as headers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    rate_limit: Option<(u32, u32, DateTime<Utc>)>,
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        let status = match &err {
            LifecycleError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            LifecycleError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            LifecycleError::NotFound => StatusCode::NOT_FOUND,
            LifecycleError::Unauthorized => StatusCode::FORBIDDEN,
            LifecycleError::Transport { .. } | LifecycleError::External(_) => {
                StatusCode::BAD_GATEWAY
            }
            LifecycleError::LedgerWrite { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let rate_limit = match &err {
            LifecycleError::RateLimited {
                limit,
                remaining,
                reset_at,
            } => Some((*limit, *remaining, *reset_at)),
            _ => None,
        };
        let message = match err {
            LifecycleError::Transport {
                detail,
                outcome_unknown: true,
            } => format!(
                "{}; the outcome is unknown, re-verify credential state before retrying",
                detail
            ),
            LifecycleError::LedgerWrite {
                source,
                operation_error,
                external_ref,
            } => {
                let mut message = format!(
                    "operation outcome could not be recorded ({}); treat it as unverified",
                    source
                );
                if let Some(op_err) = operation_error {
                    message.push_str(&format!("; the operation itself failed: {}", op_err));
                }
                if let Some(tx) = external_ref {
                    message.push_str(&format!("; transaction {} was submitted", tx));
                }
                message
            }
            other => other.to_string(),
        };
        ApiError {
            status,
            message,
            rate_limit,
        }
    }
}

impl From<ContentStoreError> for ApiError {
    fn from(err: ContentStoreError) -> Self {
        ApiError {
            status: StatusCode::BAD_GATEWAY,
            message: err.to_string(),
            rate_limit: None,
        }
    }
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            rate_limit: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        if let Some((limit, remaining, reset_at)) = self.rate_limit {
            let reset_secs = (reset_at - Utc::now()).num_seconds().max(0);
            headers.insert("X-RateLimit-Limit", header_num(limit as i64));
            headers.insert("X-RateLimit-Remaining", header_num(remaining as i64));
            headers.insert("X-RateLimit-Reset", header_num(reset_secs));
            headers.insert("Retry-After", header_num(reset_secs));
        }
        let body = json!({
            "error": {
                "code": self.status.as_u16(),
                "message": self.message,
            }
        });
        (self.status, headers, Json(body)).into_response()
    }
}

fn header_num(value: i64) -> HeaderValue {
    HeaderValue::from_str(&value.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0"))
}

/// API server state containing all service dependencies
pub struct ApiServer {
    /// Lifecycle coordinator wired to the registry, limiter, and ledger
    coordinator: Arc<Coordinator>,

    /// Content store collaborator for document pinning
    content_store: Arc<ContentStore>,
}

impl Clone for ApiServer {
    fn clone(&self) -> Self {
        ApiServer {
            coordinator: self.coordinator.clone(),
            content_store: self.content_store.clone(),
        }
    }
}

impl ApiServer {
    /// Creates a new instance of the API server
    ///
    /// # Arguments
    /// * `coordinator` - Lifecycle coordinator for credential operations
    /// * `content_store` - Content store for document pinning
    pub fn new(coordinator: Coordinator, content_store: ContentStore) -> Self {
        ApiServer {
            coordinator: Arc::new(coordinator),
            content_store: Arc::new(content_store),
        }
    }

    /// Starts the API server and begins listening for requests
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "127.0.0.1:3000")
    pub async fn run(&self, addr: SocketAddr) -> anyhow::Result<()> {
        let app = Router::new()
            .route("/issue-credential", post(Self::issue_credential_handler))
            .route("/verify-credential", post(Self::verify_credential_handler))
            .route("/revoke-credential", post(Self::revoke_credential_handler))
            .route("/activity", get(Self::activity_handler))
            .route("/store-document", post(Self::store_document_handler))
            .route(
                "/retrieve-document/:content_ref",
                get(Self::retrieve_document_handler),
            )
            .layer(CorsLayer::permissive())
            .with_state(Arc::new(self.clone()));

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API server listening on {}", addr);
        axum::serve(listener, app).await?;
        Ok(())
    }

    // =====================
    // Credential Handlers
    // =====================

    /// Issues a credential for a document
    ///
    /// # Endpoint
    /// POST /issue-credential
    ///
    /// # Responses
    /// - 200 OK: issued (or already issued, idempotent no-op)
    /// - 400 Bad Request: malformed fingerprint, actor, or document
    /// - 429 Too Many Requests: actor quota exceeded
    /// - 502 Bad Gateway: registry unreachable or rejected the call
    async fn issue_credential_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<IssueCredentialRequest>,
    ) -> Result<Json<IssueCredentialResponse>, ApiError> {
        let fp = resolve_fingerprint(payload.fingerprint, payload.document_base64)?;

        let outcome = state
            .coordinator
            .issue(&fp, &payload.actor, payload.content_ref)
            .await?;

        let response = match outcome {
            IssueOutcome::Issued { receipt } => IssueCredentialResponse {
                status: "issued".into(),
                fingerprint: fp,
                external_ref: Some(receipt.external_ref),
                confirmed_at: Some(receipt.confirmed_at),
            },
            IssueOutcome::AlreadyIssued => IssueCredentialResponse {
                status: "already_issued".into(),
                fingerprint: fp,
                external_ref: None,
                confirmed_at: None,
            },
        };
        Ok(Json(response))
    }

    /// Verifies the credential state recorded for a document
    ///
    /// # Endpoint
    /// POST /verify-credential
    ///
    /// A document with no credential is reported as `found: false` with
    /// 200 OK; that is a legitimate outcome, not an error.
    async fn verify_credential_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<VerifyCredentialRequest>,
    ) -> Result<Json<VerifyCredentialResponse>, ApiError> {
        let fp = resolve_fingerprint(payload.fingerprint, payload.document_base64)?;

        let outcome = state.coordinator.verify(&fp).await?;

        let response = match outcome.credential {
            Some(credential) => VerifyCredentialResponse {
                found: true,
                fingerprint: fp,
                issuer: Some(format!("0x{:x}", credential.issuer)),
                valid: Some(credential.valid),
                content_ref: credential.content_ref,
                issued_at: Some(credential.issued_at),
            },
            None => VerifyCredentialResponse {
                found: false,
                fingerprint: fp,
                issuer: None,
                valid: None,
                content_ref: None,
                issued_at: None,
            },
        };
        Ok(Json(response))
    }

    /// Revokes the credential recorded for a document
    ///
    /// # Endpoint
    /// POST /revoke-credential
    ///
    /// # Responses
    /// - 200 OK: revoked (or already revoked, idempotent no-op)
    /// - 403 Forbidden: actor is not the recorded issuer
    /// - 404 Not Found: no credential exists for the fingerprint
    async fn revoke_credential_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<RevokeCredentialRequest>,
    ) -> Result<Json<RevokeCredentialResponse>, ApiError> {
        let outcome = state
            .coordinator
            .revoke(&payload.fingerprint, &payload.actor)
            .await?;

        let response = match outcome {
            RevokeOutcome::Revoked { receipt } => RevokeCredentialResponse {
                status: "revoked".into(),
                external_ref: Some(receipt.external_ref),
                confirmed_at: Some(receipt.confirmed_at),
            },
            RevokeOutcome::AlreadyRevoked => RevokeCredentialResponse {
                status: "already_revoked".into(),
                external_ref: None,
                confirmed_at: None,
            },
        };
        Ok(Json(response))
    }

    // =====================
    // Activity & Document Handlers
    // =====================

    /// Returns recent activity records, most-recent-first
    ///
    /// # Endpoint
    /// GET /activity?actor=&operation=&limit=
    async fn activity_handler(
        State(state): State<Arc<ApiServer>>,
        Query(query): Query<ActivityQuery>,
    ) -> Result<Json<ActivityResponse>, ApiError> {
        let operation = query
            .operation
            .map(|op| {
                op.parse::<Operation>()
                    .map_err(|e| ApiError::bad_request(e))
            })
            .transpose()?;

        let records = state
            .coordinator
            .ledger()
            .query(ActivityFilter {
                actor: query.actor,
                operation,
                limit: Some(query.limit.unwrap_or(50).min(500)),
                ..Default::default()
            })
            .await
            .map_err(|e| {
                error!("activity query failed: {}", e);
                ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "activity query failed".into(),
                    rate_limit: None,
                }
            })?;

        Ok(Json(ActivityResponse { records }))
    }

    /// Pins a JSON document to the content store and returns its reference
    ///
    /// # Endpoint
    /// POST /store-document
    async fn store_document_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<StoreDocumentRequest>,
    ) -> Result<Json<StoreDocumentResponse>, ApiError> {
        let content_ref = state.content_store.store_json(&payload.document).await?;
        Ok(Json(StoreDocumentResponse { content_ref }))
    }

    /// Retrieves a pinned document by its content reference
    ///
    /// # Endpoint
    /// GET /retrieve-document/:content_ref
    async fn retrieve_document_handler(
        Path(content_ref): Path<String>,
        State(state): State<Arc<ApiServer>>,
    ) -> Result<Json<RetrieveDocumentResponse>, ApiError> {
        let document = state.content_store.retrieve_json(&content_ref).await?;
        Ok(Json(RetrieveDocumentResponse { document }))
    }
}

/// Resolves the request's document reference to a fingerprint string.
///
/// An explicit fingerprint is passed through untouched (the coordinator
/// validates its format); otherwise the document bytes are decoded and
/// fingerprinted server-side.
fn resolve_fingerprint(
    fingerprint_hex: Option<String>,
    document_base64: Option<String>,
) -> Result<String, ApiError> {
    if let Some(fp) = fingerprint_hex {
        return Ok(fp);
    }
    if let Some(doc) = document_base64 {
        let bytes = base64::decode(&doc)
            .map_err(|_| ApiError::bad_request("document_base64 is not valid base64"))?;
        return Ok(fingerprint(&bytes).to_string());
    }
    Err(ApiError::bad_request(
        "either fingerprint or document_base64 is required",
    ))
}
