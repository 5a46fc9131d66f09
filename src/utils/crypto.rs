//! Conversion of the quote's raw fixed-width ECDSA material into `p256` types.
//!
//! Keys travel as `x || y` and signatures as `r || s`, each half a 32 byte big-endian
//! integer. Nothing else in the crate rebuilds points or scalars by hand.

use p256::{
    ecdsa::{signature::hazmat::PrehashVerifier, Signature, VerifyingKey},
    EncodedPoint, FieldBytes,
};
use x509_cert::Certificate;

use crate::constants::{ECDSA_PUBLIC_KEY_LEN, ECDSA_SIGNATURE_LEN};

/// Rebuilds an uncompressed P-256 point from raw coordinates.
///
/// Returns `None` if the point is not on the curve.
pub fn verifying_key_from_raw(raw: &[u8; ECDSA_PUBLIC_KEY_LEN]) -> Option<VerifyingKey> {
    let (x, y) = raw.split_at(ECDSA_PUBLIC_KEY_LEN / 2);
    let point =
        EncodedPoint::from_affine_coordinates(FieldBytes::from_slice(x), FieldBytes::from_slice(y), false);
    VerifyingKey::from_encoded_point(&point).ok()
}

/// Builds a signature from raw `r || s`.
///
/// Returns `None` if either scalar is zero or not below the curve order.
pub fn signature_from_raw(raw: &[u8; ECDSA_SIGNATURE_LEN]) -> Option<Signature> {
    let (r, s) = raw.split_at(ECDSA_SIGNATURE_LEN / 2);
    Signature::from_scalars(FieldBytes::clone_from_slice(r), FieldBytes::clone_from_slice(s)).ok()
}

/// The P-256 subject public key of a certificate.
pub fn verifying_key_from_certificate(cert: &Certificate) -> Option<VerifyingKey> {
    let key = cert
        .tbs_certificate
        .subject_public_key_info
        .subject_public_key
        .as_bytes()?;
    VerifyingKey::from_sec1_bytes(key).ok()
}

/// verify_p256_prehash verifies a raw `r || s` signature over a SHA-256 `digest`.
pub fn verify_p256_prehash(
    digest: &[u8; 32],
    signature: &[u8; ECDSA_SIGNATURE_LEN],
    key: &VerifyingKey,
) -> bool {
    match signature_from_raw(signature) {
        Some(signature) => key.verify_prehash(digest, &signature).is_ok(),
        None => false,
    }
}

/// verify_p256_signature_bytes verifies a raw signature under a raw `x || y` public key.
///
/// An off-curve key verifies nothing.
pub fn verify_p256_signature_bytes(
    digest: &[u8; 32],
    signature: &[u8; ECDSA_SIGNATURE_LEN],
    public_key: &[u8; ECDSA_PUBLIC_KEY_LEN],
) -> bool {
    match verifying_key_from_raw(public_key) {
        Some(key) => verify_p256_prehash(digest, signature, &key),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::hash::sha256sum;

    const QUOTE: &[u8] = include_bytes!("../../data/quote_tdx.bin");

    fn quote_signature() -> [u8; 64] {
        QUOTE[636..700].try_into().unwrap()
    }

    fn attestation_key() -> [u8; 64] {
        QUOTE[700..764].try_into().unwrap()
    }

    #[test]
    fn verifies_reference_quote_signature() {
        let digest = sha256sum(&QUOTE[..632]);
        assert!(verify_p256_signature_bytes(
            &digest,
            &quote_signature(),
            &attestation_key()
        ));

        let other = sha256sum(&QUOTE[..631]);
        assert!(!verify_p256_signature_bytes(
            &other,
            &quote_signature(),
            &attestation_key()
        ));
    }

    #[test]
    fn raw_key_keeps_coordinates() {
        let raw = attestation_key();
        let key = verifying_key_from_raw(&raw).unwrap();
        let point = key.to_encoded_point(false);
        assert_eq!(point.as_bytes()[0], 0x04);
        assert_eq!(&point.as_bytes()[1..], &raw[..]);
    }

    #[test]
    fn off_curve_keys_are_rejected() {
        assert!(verifying_key_from_raw(&[0u8; 64]).is_none());

        let mut raw = [0u8; 64];
        raw[31] = 1;
        raw[63] = 1;
        assert!(verifying_key_from_raw(&raw).is_none());

        let mut raw = attestation_key();
        raw[63] ^= 0x01;
        assert!(verifying_key_from_raw(&raw).is_none());
    }

    #[test]
    fn raw_signature_keeps_scalars() {
        let raw = quote_signature();
        let signature = signature_from_raw(&raw).unwrap();
        assert_eq!(&signature.to_bytes()[..], &raw[..]);
        let (r, s) = signature.split_bytes();
        assert_eq!(&r[..], &raw[..32]);
        assert_eq!(&s[..], &raw[32..]);
    }

    #[test]
    fn out_of_range_scalars_are_rejected() {
        let mut raw = quote_signature();
        raw[..32].fill(0);
        assert!(signature_from_raw(&raw).is_none());

        let mut raw = quote_signature();
        raw[32..].fill(0xff);
        assert!(signature_from_raw(&raw).is_none());

        let key = verifying_key_from_raw(&attestation_key()).unwrap();
        assert!(!verify_p256_prehash(&sha256sum(&QUOTE[..632]), &raw, &key));
    }
}
