//! Ledger client interface

use crate::transaction::ApprovalTransaction;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tessera_core::{BlobId, PackageId, PolicyId, PrincipalId, Result, TesseraError};

/// On-ledger access-control policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Ledger handle
    pub id: PolicyId,
    /// Package whose approval logic applies
    pub package_id: PackageId,
    /// Human-readable name
    pub name: String,
    /// Principal allowed to change membership
    pub owner: PrincipalId,
    /// Principals allowed to decrypt
    pub members: BTreeSet<PrincipalId>,
    /// Blobs published under this policy
    pub blobs: Vec<BlobId>,
}

impl Policy {
    /// Whether `principal` is on the membership list
    pub fn is_member(&self, principal: &PrincipalId) -> bool {
        self.members.contains(principal)
    }
}

/// Client for the external policy ledger.
///
/// Membership changes are ledger transactions sent by a principal; the ledger
/// rejects them with `AccessDenied` unless the sender owns the policy.
#[async_trait]
pub trait PolicyLedgerClient: Send + Sync {
    /// Read a policy object
    async fn policy(&self, policy_id: &PolicyId) -> Result<Policy>;

    /// Create a policy owned (and initially joined) by `owner`
    async fn create_policy(
        &self,
        owner: &PrincipalId,
        package_id: &PackageId,
        name: &str,
    ) -> Result<PolicyId>;

    /// Add `member` to the policy
    async fn add_member(
        &self,
        sender: &PrincipalId,
        policy_id: &PolicyId,
        member: &PrincipalId,
    ) -> Result<()>;

    /// Remove `member` from the policy
    async fn remove_member(
        &self,
        sender: &PrincipalId,
        policy_id: &PolicyId,
        member: &PrincipalId,
    ) -> Result<()>;

    /// Attach a blob reference to the policy
    async fn publish_blob(
        &self,
        sender: &PrincipalId,
        policy_id: &PolicyId,
        blob_id: &BlobId,
    ) -> Result<()>;

    /// Whether `principal` currently satisfies the policy
    async fn check_policy(&self, policy_id: &PolicyId, principal: &PrincipalId) -> Result<bool> {
        Ok(self.policy(policy_id).await?.is_member(principal))
    }

    /// Dry-run an approval transaction as `principal`.
    ///
    /// Succeeds only if the key identity is scoped to the policy, the policy
    /// belongs to the transaction's package, and the principal is a member.
    async fn simulate_approval(
        &self,
        tx: &ApprovalTransaction,
        principal: &PrincipalId,
    ) -> Result<()> {
        if !tx.key_identity.is_governed_by(&tx.policy_id) {
            return Err(TesseraError::access_denied(format!(
                "key identity {} is not scoped to policy {}",
                tx.key_identity, tx.policy_id
            )));
        }
        let policy = self.policy(&tx.policy_id).await?;
        if policy.package_id != tx.package_id {
            return Err(TesseraError::access_denied(format!(
                "policy {} belongs to package {}, not {}",
                policy.id, policy.package_id, tx.package_id
            )));
        }
        if !policy.is_member(principal) {
            return Err(TesseraError::access_denied(format!(
                "{principal} is not a member of policy {}",
                policy.id
            )));
        }
        Ok(())
    }
}
