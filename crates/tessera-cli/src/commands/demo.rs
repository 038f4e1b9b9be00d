//! End-to-end scenario against in-process collaborators
//!
//! Deals a fresh committee, starts one local key server per member over an
//! in-memory ledger and blob store, then has alice (a policy member) store
//! and read back a secret while bob (not a member) is refused.

use super::committee_entries;
use anyhow::{Context, Result};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;
use tessera_blob::{Ed25519StorageSigner, MemoryBlobStore};
use tessera_core::effects::{PhysicalTimeEffects, RandomEffects};
use tessera_core::{
    BlobId, PackageId, PolicyId, PrincipalId, SecretId, SigningConfig, TesseraConfig,
};
use tessera_effects::{RealRandomHandler, RealTimeHandler};
use tessera_keyserver::{generate_committee, KeyServer, LocalKeyServer};
use tessera_ledger::{MemoryLedger, PolicyLedgerClient};
use tessera_vault::ServiceBuilder;
use tracing::{info, warn};

const DEMO_SECRET: &[u8] = b"tessera demo secret";

/// What the scenario produced
#[derive(Debug)]
pub struct DemoReport {
    /// Policy governing the secret
    pub policy_id: PolicyId,
    /// External reference of the stored secret
    pub secret_id: SecretId,
    /// Content id of the ciphertext
    pub blob_id: BlobId,
    /// Hex key identity
    pub key_identity: String,
    /// Whether alice read back the original bytes
    pub member_decrypted: bool,
    /// Error kind bob received, if any
    pub outsider_error: Option<String>,
}

fn principal(key: &SigningKey) -> PrincipalId {
    PrincipalId::from_ed25519_public_key(key.verifying_key().as_bytes())
}

/// Run the scenario with `config`
pub async fn run(config: TesseraConfig) -> Result<DemoReport> {
    let time: Arc<dyn PhysicalTimeEffects> = Arc::new(RealTimeHandler::new());
    let random: Arc<dyn RandomEffects> = Arc::new(RealRandomHandler::new());
    let ledger = Arc::new(MemoryLedger::new());
    let blobs = Arc::new(MemoryBlobStore::new());

    let entries = committee_entries(&config.threshold);
    let (committee, secrets) =
        generate_committee(config.threshold.threshold, &entries, &mut OsRng)
            .context("dealing demo committee")?;

    let mut builder = ServiceBuilder::new()
        .with_committee(committee)
        .with_ledger(ledger.clone())
        .with_blob_store(blobs)
        .with_time(time.clone())
        .with_random(random.clone());
    for secret in &secrets {
        let server: Arc<dyn KeyServer> = Arc::new(LocalKeyServer::new(
            secret,
            ledger.clone(),
            time.clone(),
            random.clone(),
            &config.ledger,
        )?);
        builder = builder.with_key_server(server);
    }
    if matches!(config.storage.signing, SigningConfig::UserManaged) {
        let mut storage_secret = [0u8; 32];
        OsRng.fill_bytes(&mut storage_secret);
        builder = builder.with_user_signer(Arc::new(Ed25519StorageSigner::from_secret(
            &storage_secret,
        )));
    }
    let service = builder.with_config(config).build()?;

    let alice = SigningKey::generate(&mut OsRng);
    let bob = SigningKey::generate(&mut OsRng);
    let package = PackageId::derive(b"tessera-demo");
    let policy_id = ledger
        .create_policy(&principal(&alice), &package, "demo-policy")
        .await?;
    info!(policy_id = %policy_id, owner = %principal(&alice), "policy created");

    let stored = service.store(&policy_id, &package, DEMO_SECRET).await?;
    service
        .publish_blob(&principal(&alice), &policy_id, &stored.blob_id)
        .await?;

    let session = service.create_signed_session(&alice, package, None).await?;
    let plaintext = service
        .retrieve(&policy_id, &package, &stored.blob_id, &session)
        .await?;
    let member_decrypted = plaintext == DEMO_SECRET;
    info!(member_decrypted, "member retrieve finished");

    let session = service.create_signed_session(&bob, package, None).await?;
    let outsider_error = match service
        .retrieve(&policy_id, &package, &stored.blob_id, &session)
        .await
    {
        Ok(_) => {
            warn!("non-member decrypted the demo secret");
            None
        }
        Err(e) => {
            info!(error = %e, "non-member refused");
            Some(e.kind().to_string())
        }
    };

    Ok(DemoReport {
        policy_id,
        secret_id: stored.secret_id,
        blob_id: stored.blob_id,
        key_identity: stored.key_identity,
        member_decrypted,
        outsider_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_member_reads_outsider_refused() {
        let report = run(TesseraConfig::default()).await.unwrap();
        assert!(report.member_decrypted);
        assert_eq!(report.outsider_error.as_deref(), Some("access_denied"));
        assert!(report.key_identity.starts_with(&hex_of(&report.policy_id)));
    }

    fn hex_of(policy_id: &PolicyId) -> String {
        policy_id.to_string().trim_start_matches("0x").to_string()
    }
}
