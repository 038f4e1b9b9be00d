//! Blob store interface

use crate::signing::StorageSigner;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tessera_core::{BlobId, ObjectHandle, Result, StorageConfig};

/// Per-write storage parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    /// Epochs the blob stays readable
    pub epochs: u32,
    /// Whether the registration may later be deleted
    pub deletable: bool,
}

impl From<&StorageConfig> for WriteOptions {
    fn from(config: &StorageConfig) -> Self {
        Self {
            epochs: config.epochs,
            deletable: config.deletable,
        }
    }
}

/// Result of a successful write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobReceipt {
    /// Content identifier
    pub blob_id: BlobId,
    /// Ledger registration of this write
    pub object_handle: ObjectHandle,
    /// First epoch at which the blob is no longer readable
    pub end_epoch: u64,
}

/// Content-addressed byte storage with epoch expiry.
///
/// Bytes returned by `read` are exactly the bytes given to `write`.
/// Identical bytes share a `blob_id`; every write may still register a new
/// `object_handle`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data`, signing the storage transaction with `signer`
    async fn write(
        &self,
        data: &[u8],
        options: WriteOptions,
        signer: &dyn StorageSigner,
    ) -> Result<BlobReceipt>;

    /// Fetch the bytes named by `blob_id`; `NotFound` when missing or expired
    async fn read(&self, blob_id: &BlobId) -> Result<Vec<u8>>;

    /// Delete a deletable registration owned by `signer`
    async fn delete(&self, object_handle: &ObjectHandle, signer: &dyn StorageSigner) -> Result<()>;
}
