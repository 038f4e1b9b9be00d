//! Ciphertext format and committee decryption tests

use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tessera_core::{ErrorKind, KeyServerId, PackageId, PolicyId};
use tessera_crypto::{
    deal, decrypt, encrypt, DecryptionShare, EncryptedObject, KeyIdentity, KeyServerRef,
    SealParams,
};

fn setup(threshold: u16, weights: &[u8], seed: u8) -> (SealParams, tessera_crypto::DealtKeys, ChaCha20Rng) {
    let mut rng = ChaCha20Rng::from_seed([seed; 32]);
    let dealt = deal(threshold, weights, &mut rng).unwrap();
    let key_servers = weights
        .iter()
        .enumerate()
        .map(|(i, w)| KeyServerRef {
            id: KeyServerId::derive(format!("server-{i}").as_bytes()),
            weight: *w,
        })
        .collect();
    let params = SealParams {
        package_id: PackageId::derive(b"pkg"),
        key_identity: KeyIdentity::new(&PolicyId::derive(b"policy"), [seed; 8]),
        threshold,
        key_servers,
        master: dealt.master,
    };
    (params, dealt, rng)
}

fn shares_from(
    dealt: &tessera_crypto::DealtKeys,
    servers: &[usize],
    object: &EncryptedObject,
    rng: &mut ChaCha20Rng,
) -> Vec<DecryptionShare> {
    servers
        .iter()
        .flat_map(|s| dealt.server_shares[*s].iter())
        .map(|k| k.decryption_share(&object.encapsulation, rng))
        .collect()
}

#[test]
fn encrypt_decrypt_through_wire_format() {
    let (params, dealt, mut rng) = setup(2, &[1, 1, 1], 1);
    let object = encrypt(&params, b"the secret", &mut rng).unwrap();

    let bytes = object.to_bytes().unwrap();
    assert_eq!(&bytes[..4], b"TSRA");
    let parsed = EncryptedObject::from_bytes(&bytes).unwrap();
    assert_eq!(parsed, object);
    assert!(parsed.encapsulation.verify(parsed.key_identity.as_bytes()));

    let shares = shares_from(&dealt, &[0, 2], &parsed, &mut rng);
    assert_eq!(decrypt(&parsed, &shares).unwrap(), b"the secret");
}

#[test]
fn below_threshold_is_access_denied() {
    let (params, dealt, mut rng) = setup(2, &[1, 1, 1], 2);
    let object = encrypt(&params, b"x", &mut rng).unwrap();
    let shares = shares_from(&dealt, &[1], &object, &mut rng);
    let err = decrypt(&object, &shares).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccessDenied);
}

#[test]
fn weighted_server_contributes_all_its_shares() {
    let (params, dealt, mut rng) = setup(3, &[2, 1, 1], 3);
    let object = encrypt(&params, b"weighted", &mut rng).unwrap();

    // Heavy server plus one light server reach t = 3
    let shares = shares_from(&dealt, &[0, 2], &object, &mut rng);
    assert_eq!(decrypt(&object, &shares).unwrap(), b"weighted");

    // Two light servers do not
    let shares = shares_from(&dealt, &[1, 2], &object, &mut rng);
    assert_eq!(decrypt(&object, &shares).unwrap_err().kind(), ErrorKind::AccessDenied);
}

#[test]
fn header_tamper_is_corrupt_ciphertext() {
    let (params, dealt, mut rng) = setup(1, &[1, 1], 4);
    let object = encrypt(&params, b"payload", &mut rng).unwrap();
    let mut tampered = object.clone();
    tampered.package_id = PackageId::derive(b"other");

    let shares = shares_from(&dealt, &[0], &tampered, &mut rng);
    let err = decrypt(&tampered, &shares).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptCiphertext);
}

#[test]
fn malformed_bytes_are_corrupt_ciphertext() {
    let (params, _dealt, mut rng) = setup(2, &[1, 1, 1], 5);
    let bytes = encrypt(&params, b"payload", &mut rng).unwrap().to_bytes().unwrap();

    for broken in [&bytes[..10], &bytes[..bytes.len() - 1], b"NOPE".as_slice()] {
        let err = EncryptedObject::from_bytes(broken).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptCiphertext);
    }

    let mut trailing = bytes.clone();
    trailing.push(0);
    assert!(EncryptedObject::from_bytes(&trailing).is_err());
}

#[test]
fn invalid_committee_rejected_at_encrypt() {
    let (mut params, _dealt, mut rng) = setup(2, &[1, 1, 1], 6);
    params.threshold = 4;
    assert_eq!(
        encrypt(&params, b"x", &mut rng).unwrap_err().kind(),
        ErrorKind::Encryption
    );
    params.threshold = 2;
    params.key_servers.clear();
    assert!(encrypt(&params, b"x", &mut rng).is_err());
}
