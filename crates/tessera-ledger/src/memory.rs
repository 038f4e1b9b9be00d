//! In-memory policy ledger

use crate::client::{Policy, PolicyLedgerClient};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tessera_core::hash::Hasher;
use tessera_core::{BlobId, PackageId, PolicyId, PrincipalId, Result, TesseraError};
use tracing::debug;

/// Ledger state held in process memory.
///
/// Transactions apply atomically under a write lock, so concurrent readers
/// (key servers simulating approvals) always see a consistent membership list.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    policies: RwLock<HashMap<PolicyId, Policy>>,
    next_object: AtomicU64,
}

impl MemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of policies on the ledger
    pub fn policy_count(&self) -> usize {
        self.policies.read().len()
    }

    fn with_owned_policy<T>(
        &self,
        sender: &PrincipalId,
        policy_id: &PolicyId,
        apply: impl FnOnce(&mut Policy) -> T,
    ) -> Result<T> {
        let mut policies = self.policies.write();
        let policy = policies
            .get_mut(policy_id)
            .ok_or_else(|| TesseraError::not_found(format!("policy {policy_id}")))?;
        if policy.owner != *sender {
            return Err(TesseraError::access_denied(format!(
                "{sender} does not own policy {policy_id}"
            )));
        }
        Ok(apply(policy))
    }
}

#[async_trait]
impl PolicyLedgerClient for MemoryLedger {
    async fn policy(&self, policy_id: &PolicyId) -> Result<Policy> {
        self.policies
            .read()
            .get(policy_id)
            .cloned()
            .ok_or_else(|| TesseraError::not_found(format!("policy {policy_id}")))
    }

    async fn create_policy(
        &self,
        owner: &PrincipalId,
        package_id: &PackageId,
        name: &str,
    ) -> Result<PolicyId> {
        let sequence = self.next_object.fetch_add(1, Ordering::SeqCst);
        let mut hasher = Hasher::with_domain(b"tessera.ledger.policy");
        hasher
            .update_framed(owner.as_bytes())
            .update_framed(package_id.as_bytes())
            .update_framed(name.as_bytes())
            .update_framed(&sequence.to_be_bytes());
        let id = PolicyId::from_bytes(hasher.finalize());

        let policy = Policy {
            id,
            package_id: *package_id,
            name: name.to_string(),
            owner: *owner,
            members: BTreeSet::from([*owner]),
            blobs: Vec::new(),
        };
        self.policies.write().insert(id, policy);
        debug!(policy_id = %id, owner = %owner, name, "policy created");
        Ok(id)
    }

    async fn add_member(
        &self,
        sender: &PrincipalId,
        policy_id: &PolicyId,
        member: &PrincipalId,
    ) -> Result<()> {
        self.with_owned_policy(sender, policy_id, |policy| {
            policy.members.insert(*member);
        })?;
        debug!(policy_id = %policy_id, member = %member, "member added");
        Ok(())
    }

    async fn remove_member(
        &self,
        sender: &PrincipalId,
        policy_id: &PolicyId,
        member: &PrincipalId,
    ) -> Result<()> {
        let removed = self.with_owned_policy(sender, policy_id, |policy| {
            policy.members.remove(member)
        })?;
        if !removed {
            return Err(TesseraError::not_found(format!(
                "{member} is not a member of policy {policy_id}"
            )));
        }
        debug!(policy_id = %policy_id, member = %member, "member removed");
        Ok(())
    }

    async fn publish_blob(
        &self,
        sender: &PrincipalId,
        policy_id: &PolicyId,
        blob_id: &BlobId,
    ) -> Result<()> {
        self.with_owned_policy(sender, policy_id, |policy| {
            if !policy.blobs.contains(blob_id) {
                policy.blobs.push(blob_id.clone());
            }
        })?;
        debug!(policy_id = %policy_id, blob_id = %blob_id, "blob published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ApprovalTransaction;
    use tessera_core::ErrorKind;
    use tessera_crypto::KeyIdentity;

    fn principal(name: &str) -> PrincipalId {
        PrincipalId::derive(name.as_bytes())
    }

    #[tokio::test]
    async fn test_owner_is_initial_member() {
        let ledger = MemoryLedger::new();
        let alice = principal("alice");
        let id = ledger
            .create_policy(&alice, &PackageId::derive(b"pkg"), "team")
            .await
            .unwrap();
        assert!(ledger.check_policy(&id, &alice).await.unwrap());
        assert!(!ledger.check_policy(&id, &principal("bob")).await.unwrap());
        assert_eq!(ledger.policy_count(), 1);
    }

    #[tokio::test]
    async fn test_policy_ids_are_unique_per_creation() {
        let ledger = MemoryLedger::new();
        let alice = principal("alice");
        let pkg = PackageId::derive(b"pkg");
        let a = ledger.create_policy(&alice, &pkg, "team").await.unwrap();
        let b = ledger.create_policy(&alice, &pkg, "team").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_non_owner_cannot_change_membership() {
        let ledger = MemoryLedger::new();
        let (alice, bob) = (principal("alice"), principal("bob"));
        let id = ledger
            .create_policy(&alice, &PackageId::derive(b"pkg"), "team")
            .await
            .unwrap();

        let err = ledger.add_member(&bob, &id, &bob).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);

        ledger.add_member(&alice, &id, &bob).await.unwrap();
        assert!(ledger.check_policy(&id, &bob).await.unwrap());
        ledger.remove_member(&alice, &id, &bob).await.unwrap();
        assert!(!ledger.check_policy(&id, &bob).await.unwrap());
        assert_eq!(
            ledger.remove_member(&alice, &id, &bob).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_simulate_approval() {
        let ledger = MemoryLedger::new();
        let alice = principal("alice");
        let pkg = PackageId::derive(b"pkg");
        let id = ledger.create_policy(&alice, &pkg, "team").await.unwrap();
        let tx = ApprovalTransaction::new(pkg, id, KeyIdentity::new(&id, [0u8; 8]));

        ledger.simulate_approval(&tx, &alice).await.unwrap();
        assert_eq!(
            ledger
                .simulate_approval(&tx, &principal("bob"))
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::AccessDenied
        );

        let foreign = ApprovalTransaction::new(
            pkg,
            id,
            KeyIdentity::new(&PolicyId::derive(b"other"), [0u8; 8]),
        );
        assert!(ledger.simulate_approval(&foreign, &alice).await.is_err());

        let wrong_pkg = ApprovalTransaction::new(PackageId::derive(b"x"), id, tx.key_identity.clone());
        assert!(ledger.simulate_approval(&wrong_pkg, &alice).await.is_err());
    }

    #[tokio::test]
    async fn test_publish_blob_is_idempotent() {
        let ledger = MemoryLedger::new();
        let alice = principal("alice");
        let id = ledger
            .create_policy(&alice, &PackageId::derive(b"pkg"), "team")
            .await
            .unwrap();
        let blob = BlobId::for_content(b"ct");
        ledger.publish_blob(&alice, &id, &blob).await.unwrap();
        ledger.publish_blob(&alice, &id, &blob).await.unwrap();
        assert_eq!(ledger.policy(&id).await.unwrap().blobs, vec![blob]);
    }
}
