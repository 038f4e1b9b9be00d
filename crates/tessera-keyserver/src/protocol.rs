//! Share request and response messages

use tessera_core::{KeyServerId, Result, TesseraError};
use tessera_crypto::tdh::ENCAPSULATION_LEN;
use tessera_crypto::{DecryptionShare, Encapsulation};
use tessera_ledger::ApprovalTransaction;
use tessera_session::{SessionCertificate, SessionCredential};

/// Request for decryption shares of one ciphertext
#[derive(Debug, Clone)]
pub struct ShareRequest {
    /// Encoded [`ApprovalTransaction`] the server dry-runs
    pub tx_payload: Vec<u8>,
    /// Ciphertext header the shares answer
    pub encapsulation: [u8; ENCAPSULATION_LEN],
    /// Signed session the request is made under
    pub certificate: SessionCertificate,
    /// Session-key signature over [`ShareRequest::signing_payload`]
    pub request_signature: [u8; 64],
}

impl ShareRequest {
    /// Build and sign a request with a signed session credential
    pub fn new(
        tx: &ApprovalTransaction,
        encapsulation: &Encapsulation,
        session: &SessionCredential,
    ) -> Result<Self> {
        let tx_payload = tx.to_bytes()?;
        let encapsulation = encapsulation.to_bytes();
        let certificate = session.certificate()?;
        let request_signature =
            session.sign_request(&Self::payload_for(&tx_payload, &encapsulation));
        Ok(Self {
            tx_payload,
            encapsulation,
            certificate,
            request_signature,
        })
    }

    fn payload_for(tx_payload: &[u8], encapsulation: &[u8; ENCAPSULATION_LEN]) -> Vec<u8> {
        let mut payload = Vec::with_capacity(tx_payload.len() + ENCAPSULATION_LEN);
        payload.extend_from_slice(tx_payload);
        payload.extend_from_slice(encapsulation);
        payload
    }

    /// Bytes covered by the session-key signature
    pub fn signing_payload(&self) -> Vec<u8> {
        Self::payload_for(&self.tx_payload, &self.encapsulation)
    }

    /// Decode the approval transaction
    pub fn transaction(&self) -> Result<ApprovalTransaction> {
        ApprovalTransaction::from_bytes(&self.tx_payload)
    }

    /// Decode the ciphertext header
    pub fn decode_encapsulation(&self) -> Result<Encapsulation> {
        Encapsulation::from_bytes(&self.encapsulation)
    }
}

/// A key server's answer
#[derive(Debug, Clone)]
pub enum ShareOutcome {
    /// One share per held index
    Granted(Vec<DecryptionShare>),
    /// The server declined; the reason is informational
    Refused(String),
}

impl ShareOutcome {
    /// Refusal carrying an error's cause
    pub fn refused(error: &TesseraError) -> Self {
        Self::Refused(format!("{}: {}", error.kind(), error.message()))
    }
}

/// Per-server result recorded by the pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerResult {
    /// Shares arrived and verified
    Verified(usize),
    /// The server declined
    Refused(String),
    /// The server failed or did not answer in time
    Unreachable(String),
    /// At least one share failed verification
    Invalid,
}

/// Debug label for a server result in logs
pub(crate) fn describe(server: &KeyServerId, result: &ServerResult) -> String {
    match result {
        ServerResult::Verified(n) => format!("{server}: {n} share(s)"),
        ServerResult::Refused(reason) => format!("{server}: refused ({reason})"),
        ServerResult::Unreachable(reason) => format!("{server}: unreachable ({reason})"),
        ServerResult::Invalid => format!("{server}: invalid share"),
    }
}
