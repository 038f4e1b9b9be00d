//! Tessera session authority
//!
//! A principal signs one challenge per session instead of one per decryption.
//! The challenge names an ephemeral session key; share requests are then
//! signed with that key and key servers check the chain
//! principal → session key → request.
//!
//! Credential lifecycle: `Created (unsigned) → Signed → {Active, Expired}`.
//! There is no revocation; short TTLs stand in for it.

pub mod authority;
pub mod certificate;
pub mod credential;
pub mod directory;

pub use authority::SessionAuthority;
pub use certificate::SessionCertificate;
pub use credential::SessionCredential;
pub use directory::{MemoryPrincipalDirectory, PrincipalDirectory};
