//! In-memory blob store with a manually advanced epoch clock

use crate::signing::{verify_write, write_digest, StorageSigner};
use crate::store::{BlobReceipt, BlobStore, WriteOptions};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use subtle::ConstantTimeEq;
use tessera_core::hash::{self, Hasher};
use tessera_core::{BlobId, ObjectHandle, PrincipalId, Result, TesseraError};
use tracing::{debug, warn};

#[derive(Debug)]
struct Registration {
    blob_id: BlobId,
    owner: PrincipalId,
    deletable: bool,
    end_epoch: u64,
}

#[derive(Debug, Default)]
struct State {
    blobs: HashMap<BlobId, Vec<u8>>,
    objects: HashMap<ObjectHandle, Registration>,
    handles: HashMap<BlobId, HashSet<ObjectHandle>>,
}

impl State {
    /// Latest end epoch over registrations of `blob_id`
    fn end_epoch(&self, blob_id: &BlobId) -> Option<u64> {
        self.handles
            .get(blob_id)?
            .iter()
            .filter_map(|handle| self.objects.get(handle))
            .map(|r| r.end_epoch)
            .max()
    }

    fn register(&mut self, handle: ObjectHandle, registration: Registration) {
        self.handles
            .entry(registration.blob_id.clone())
            .or_default()
            .insert(handle);
        self.objects.insert(handle, registration);
    }

    /// Drop a registration; the bytes go with the last one
    fn unregister(&mut self, handle: &ObjectHandle) -> Option<Registration> {
        let registration = self.objects.remove(handle)?;
        let orphaned = match self.handles.get_mut(&registration.blob_id) {
            Some(handles) => {
                handles.remove(handle);
                handles.is_empty()
            }
            None => true,
        };
        if orphaned {
            self.handles.remove(&registration.blob_id);
            self.blobs.remove(&registration.blob_id);
        }
        Some(registration)
    }

    /// Remove registrations that ended at or before `epoch`
    fn prune(&mut self, epoch: u64) -> usize {
        let expired: Vec<ObjectHandle> = self
            .objects
            .iter()
            .filter(|(_, r)| r.end_epoch <= epoch)
            .map(|(handle, _)| *handle)
            .collect();
        for handle in &expired {
            self.unregister(handle);
        }
        expired.len()
    }
}

/// Storage network stand-in.
///
/// Blobs stay readable while at least one registration's end epoch is in
/// the future. Write and read failures can be injected to exercise the
/// caller's error paths.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    state: RwLock<State>,
    epoch: AtomicU64,
    next_object: AtomicU64,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryBlobStore {
    /// Create an empty store at epoch 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Current storage epoch
    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Advance the epoch clock by `epochs`
    pub fn advance_epochs(&self, epochs: u64) {
        let now = self.epoch.fetch_add(epochs, Ordering::SeqCst) + epochs;
        let pruned = self.state.write().prune(now);
        debug!(epoch = now, pruned, "storage epoch advanced");
    }

    /// Make subsequent writes fail with `StorageWriteFailed`
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent reads fail with `StorageReadFailed`
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of distinct blobs held
    pub fn blob_count(&self) -> usize {
        self.state.read().blobs.len()
    }

    /// Number of live object registrations
    pub fn object_count(&self) -> usize {
        self.state.read().objects.len()
    }

    /// Flip one byte of a stored blob, simulating storage-node corruption
    pub fn corrupt_blob(&self, blob_id: &BlobId) -> bool {
        match self.state.write().blobs.get_mut(blob_id) {
            Some(bytes) if !bytes.is_empty() => {
                bytes[0] ^= 0xff;
                true
            }
            _ => false,
        }
    }

    fn allocate_handle(&self, blob_id: &BlobId, owner: &PrincipalId) -> ObjectHandle {
        let sequence = self.next_object.fetch_add(1, Ordering::SeqCst);
        let mut hasher = Hasher::with_domain(b"tessera.storage.object");
        hasher
            .update_framed(blob_id.as_str().as_bytes())
            .update_framed(owner.as_bytes())
            .update_framed(&sequence.to_be_bytes());
        ObjectHandle::from_bytes(hasher.finalize())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn write(
        &self,
        data: &[u8],
        options: WriteOptions,
        signer: &dyn StorageSigner,
    ) -> Result<BlobReceipt> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TesseraError::storage_write("storage network rejected write"));
        }
        if options.epochs == 0 {
            return Err(TesseraError::invalid("blob must be stored for at least one epoch"));
        }

        let blob_id = BlobId::for_content(data);
        let digest = write_digest(&blob_id, options.epochs, options.deletable);
        let signature = signer.sign(&digest);
        verify_write(&signer.public_key(), &digest, &signature)?;

        let owner = signer.address();
        let object_handle = self.allocate_handle(&blob_id, &owner);
        let end_epoch = self.current_epoch() + u64::from(options.epochs);

        let mut state = self.state.write();
        state.prune(self.current_epoch());
        state
            .blobs
            .entry(blob_id.clone())
            .or_insert_with(|| data.to_vec());
        state.register(
            object_handle,
            Registration {
                blob_id: blob_id.clone(),
                owner,
                deletable: options.deletable,
                end_epoch,
            },
        );
        debug!(blob_id = %blob_id, object = %object_handle, end_epoch, "blob written");

        Ok(BlobReceipt {
            blob_id,
            object_handle,
            end_epoch,
        })
    }

    async fn read(&self, blob_id: &BlobId) -> Result<Vec<u8>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(TesseraError::storage_read("storage network unavailable"));
        }

        let state = self.state.read();
        let live = state
            .end_epoch(blob_id)
            .is_some_and(|end| self.current_epoch() < end);
        let bytes = match state.blobs.get(blob_id) {
            Some(bytes) if live => bytes.clone(),
            _ => return Err(TesseraError::not_found(format!("blob {blob_id}"))),
        };
        drop(state);

        let expected = blob_id.digest()?;
        if !bool::from(hash::hash(&bytes)[..].ct_eq(&expected[..])) {
            warn!(blob_id = %blob_id, "stored blob failed integrity check");
            return Err(TesseraError::storage_read(format!(
                "blob {blob_id} failed integrity check"
            )));
        }
        Ok(bytes)
    }

    async fn delete(&self, object_handle: &ObjectHandle, signer: &dyn StorageSigner) -> Result<()> {
        let mut state = self.state.write();
        let registration = state
            .objects
            .get(object_handle)
            .ok_or_else(|| TesseraError::not_found(format!("blob object {object_handle}")))?;
        if !registration.deletable {
            return Err(TesseraError::invalid(format!(
                "blob object {object_handle} is not deletable"
            )));
        }
        if registration.owner != signer.address() {
            return Err(TesseraError::access_denied(format!(
                "{} does not own blob object {object_handle}",
                signer.address()
            )));
        }

        let blob_id = registration.blob_id.clone();
        state.unregister(object_handle);
        debug!(blob_id = %blob_id, object = %object_handle, "blob object deleted");
        Ok(())
    }
}
