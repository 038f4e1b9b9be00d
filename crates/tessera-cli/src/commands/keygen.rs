//! Deal a key-server committee and write it to disk

use super::committee_entries;
use anyhow::{Context, Result};
use rand::rngs::OsRng;
use std::path::{Path, PathBuf};
use tessera_core::ThresholdConfig;
use tessera_keyserver::generate_committee;
use tracing::info;

/// Public descriptor file name inside the output directory
pub const COMMITTEE_FILE: &str = "committee.json";

/// Files written by [`run`]
#[derive(Debug)]
pub struct KeygenOutput {
    /// Public committee descriptor
    pub committee: PathBuf,
    /// One secret file per key server, in committee order
    pub secrets: Vec<PathBuf>,
}

/// Deal a `threshold`-of-`servers` committee into `out`
pub fn run(threshold: u16, servers: u8, out: &Path) -> Result<KeygenOutput> {
    if servers == 0 {
        anyhow::bail!("at least one key server is required");
    }
    if u16::from(servers) < threshold {
        anyhow::bail!("threshold {threshold} cannot exceed server count {servers}");
    }

    let entries = committee_entries(&ThresholdConfig {
        threshold,
        committee_size: servers,
        key_servers: Vec::new(),
    });
    let (committee, secrets) = generate_committee(threshold, &entries, &mut OsRng)?;

    std::fs::create_dir_all(out)
        .with_context(|| format!("creating output directory {}", out.display()))?;
    let committee_path = out.join(COMMITTEE_FILE);
    std::fs::write(&committee_path, committee.to_json()?)
        .with_context(|| format!("writing {}", committee_path.display()))?;

    let mut secret_paths = Vec::with_capacity(secrets.len());
    for (position, secret) in secrets.iter().enumerate() {
        let path = out.join(format!("key-server-{position}.secret.json"));
        std::fs::write(&path, secret.to_json()?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(server = %secret.id, path = %path.display(), "key server secret written");
        secret_paths.push(path);
    }

    info!(
        threshold,
        servers,
        committee = %committee_path.display(),
        "committee dealt"
    );
    Ok(KeygenOutput {
        committee: committee_path,
        secrets: secret_paths,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_keyserver::{CommitteeDescriptor, KeyServerSecret};

    #[test]
    fn test_keygen_writes_loadable_committee() {
        let dir = tempfile::tempdir().unwrap();
        let output = run(2, 3, dir.path()).unwrap();

        let committee = CommitteeDescriptor::load(&output.committee).unwrap();
        assert_eq!(committee.threshold, 2);
        assert_eq!(committee.members.len(), 3);
        assert_eq!(output.secrets.len(), 3);

        let text = std::fs::read_to_string(&output.secrets[1]).unwrap();
        let secret = KeyServerSecret::from_json(&text).unwrap();
        assert_eq!(secret.id, committee.members[1].id);
    }

    #[test]
    fn test_keygen_rejects_impossible_threshold() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(4, 3, dir.path()).is_err());
        assert!(run(1, 0, dir.path()).is_err());
    }
}
