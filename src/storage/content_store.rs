// src/storage/content_store.rs
//! Content store collaborator backed by IPFS.
//!
//! Documents referenced by credentials live off-chain; the registry only
//! carries an opaque `content_ref`. This client pins document bytes to IPFS
//! and returns the CID used as that reference. The lifecycle core never
//! calls this directly; only the API layer does, to produce a
//! `content_ref` before issuing.
//!
//! # Security Considerations
//! - All stored data is public by default (IPFS is a public network)
//! - For private documents, encrypt before storage

use crate::error::ContentStoreError;
use crate::utils::serialization::{deserialize, serialize};
use bytes::BytesMut;
use futures::TryStreamExt;
use ipfs_api_backend_hyper::{IpfsApi, IpfsClient};
use serde::{de::DeserializeOwned, Serialize};
use std::io::Cursor;
use std::sync::Arc;

/// Thread-safe IPFS client wrapper with convenience methods.
#[derive(Clone)]
pub struct ContentStore {
    /// Shared IPFS client instance (thread-safe via Arc)
    client: Arc<IpfsClient>,
}

impl ContentStore {
    /// Creates a content store connected to the local IPFS node
    /// (`http://localhost:5001`). Connection errors surface on first use.
    pub fn new() -> Self {
        ContentStore {
            client: Arc::new(IpfsClient::default()),
        }
    }

    /// Pins raw document bytes and returns the CID to use as `content_ref`.
    pub async fn store_data(&self, data: &[u8]) -> Result<String, ContentStoreError> {
        let reader = Cursor::new(data.to_vec());
        let res = self.client.add(reader).await?;
        Ok(res.hash)
    }

    /// Retrieves document bytes by CID.
    pub async fn retrieve_data(&self, content_ref: &str) -> Result<Vec<u8>, ContentStoreError> {
        let data = self
            .client
            .cat(content_ref)
            .try_fold(BytesMut::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await?;
        Ok(data.to_vec())
    }

    /// Pins a JSON-serializable document and returns its CID.
    pub async fn store_json<T: Serialize>(&self, obj: &T) -> Result<String, ContentStoreError> {
        let json_str = serialize(obj)?;
        self.store_data(json_str.as_bytes()).await
    }

    /// Retrieves and deserializes a JSON document by CID.
    pub async fn retrieve_json<T: DeserializeOwned>(
        &self,
        content_ref: &str,
    ) -> Result<T, ContentStoreError> {
        let bytes = self.retrieve_data(content_ref).await?;
        let json_str = String::from_utf8(bytes)?;
        Ok(deserialize(&json_str)?)
    }
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}
