pub mod constants;
pub mod error;
pub mod trust_store;
pub mod types;
pub mod utils;

use trust_store::{TrustStore, TrustedIdentity};
use types::{
    quote::{QeReportCertificationData, Quote},
    VerifiedOutput,
};
use utils::{crypto, hash};

pub use error::{
    CertificateChainError, MalformedQuote, Result, SignatureStep, VerificationError,
};

/// Decodes a raw TDX quote and verifies it against the anchors of `trust_store`.
pub fn verify_tdx_quote(trust_store: &TrustStore, raw_quote: &[u8]) -> Result<VerifiedOutput> {
    let quote = Quote::from_bytes(raw_quote)?;
    verify_quote(trust_store, quote)
}

/// Runs the signature chain over a decoded quote.
///
/// The checks run in a fixed order and the first failure is returned:
/// 1. The attestation key signed the quote header and TD report.
/// 2. The QE report data commits to the attestation key and QE auth data.
/// 3. A PCK certificate rooted in the trust store signed the QE report.
pub fn verify_quote(trust_store: &TrustStore, quote: Quote) -> Result<VerifiedOutput> {
    verify_quote_signature(&quote)?;

    let qe_report_cert_data = quote.signature.certification_data.as_qe_report()?;
    verify_attestation_key_binding(&quote.signature.attestation_pub_key, qe_report_cert_data)?;

    let pck = verify_qe_report_signature(trust_store, qe_report_cert_data)?;
    let pck_subject = pck.cert.tbs_certificate.subject.to_string();

    Ok(VerifiedOutput::new(quote, pck_subject))
}

/// Verify the attestation key signature over the quote header and TD report.
pub fn verify_quote_signature(quote: &Quote) -> Result<()> {
    let digest = hash::sha256sum(&quote.signed_bytes());

    if !crypto::verify_p256_signature_bytes(
        &digest,
        &quote.signature.quote_signature,
        &quote.signature.attestation_pub_key,
    ) {
        return Err(VerificationError::SignatureInvalid(SignatureStep::Quote));
    }

    Ok(())
}

/// Verify the QE report data starts with SHA256(attestation key || QE auth data).
///
/// The rest of the report data is not constrained.
pub fn verify_attestation_key_binding(
    attestation_pub_key: &[u8],
    qe_report_cert_data: &QeReportCertificationData,
) -> Result<()> {
    let expected = hash::sha256sum_concat(&[
        attestation_pub_key,
        &qe_report_cert_data.qe_auth_data,
    ]);

    if qe_report_cert_data.qe_report.user_report_data[..expected.len()] != expected {
        return Err(VerificationError::BindingMismatch);
    }

    Ok(())
}

/// Validate the PCK certificate chain and verify the QE report signature under its leaf key.
///
/// Returns the validated PCK leaf.
pub fn verify_qe_report_signature(
    trust_store: &TrustStore,
    qe_report_cert_data: &QeReportCertificationData,
) -> Result<TrustedIdentity> {
    let chain = qe_report_cert_data
        .certification_data
        .as_pck_cert_chain()?
        .certificates()?;

    let pck = trust_store.verify_chain_leaf(&chain)?;

    let pck_key = crypto::verifying_key_from_certificate(&pck.cert).ok_or_else(|| {
        CertificateChainError::UnsupportedPublicKey {
            subject: pck.cert.tbs_certificate.subject.to_string(),
        }
    })?;

    let digest = hash::sha256sum(&qe_report_cert_data.qe_report.to_bytes());
    if !crypto::verify_p256_prehash(&digest, &qe_report_cert_data.qe_report_signature, &pck_key) {
        return Err(VerificationError::SignatureInvalid(SignatureStep::QeReport));
    }

    Ok(pck)
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use chrono::{TimeZone, Utc};

    use super::*;

    const QUOTE: &[u8] = include_bytes!("../data/quote_tdx.bin");
    const INTEL_ROOT: &[u8] = include_bytes!("../data/intel_sgx_root_ca.pem");

    fn trust_store() -> TrustStore {
        let now: SystemTime = Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap().into();
        TrustStore::from_pem(now, INTEL_ROOT).unwrap()
    }

    #[test]
    fn verify_reference_quote() {
        let output = verify_tdx_quote(&trust_store(), QUOTE).unwrap();
        assert_eq!(output.quote_version, 4);
        assert_eq!(output.tee_type, 0x81);
        assert!(output.report_data.starts_with(b"Hello from Edgeless Systems!"));
        assert!(output.pck_subject.contains("Intel SGX PCK Certificate"));
        assert!(!output.is_debug());
    }

    #[test]
    fn each_step_passes_on_reference_quote() {
        let quote = Quote::from_bytes(QUOTE).unwrap();
        let qe = quote.signature.certification_data.as_qe_report().unwrap();

        verify_quote_signature(&quote).unwrap();
        verify_attestation_key_binding(&quote.signature.attestation_pub_key, qe).unwrap();
        verify_qe_report_signature(&trust_store(), qe).unwrap();
    }

    #[test]
    fn binding_ignores_upper_report_data() {
        let mut quote = Quote::from_bytes(QUOTE).unwrap();
        let signature = &mut quote.signature;
        let types::quote::CertificationData::QeReport(qe) = &mut signature.certification_data
        else {
            panic!("expected qe report certification data");
        };
        qe.qe_report.user_report_data[40] ^= 0xff;
        verify_attestation_key_binding(&signature.attestation_pub_key, qe).unwrap();

        qe.qe_report.user_report_data[0] ^= 0xff;
        assert!(matches!(
            verify_attestation_key_binding(&signature.attestation_pub_key, qe),
            Err(VerificationError::BindingMismatch)
        ));
    }

    #[test]
    fn off_curve_attestation_key_fails_quote_step() {
        let mut quote = Quote::from_bytes(QUOTE).unwrap();
        quote.signature.attestation_pub_key = [0; 64];
        assert!(matches!(
            verify_quote_signature(&quote),
            Err(VerificationError::SignatureInvalid(SignatureStep::Quote))
        ));
    }

    #[test]
    fn unsupported_certification_data_is_reported() {
        let mut raw = QUOTE.to_vec();
        raw[764..766].copy_from_slice(&4u16.to_le_bytes());
        assert!(matches!(
            verify_tdx_quote(&trust_store(), &raw),
            Err(VerificationError::UnsupportedCertificationDataType(4))
        ));
    }

    #[test]
    fn malformed_quote_is_reported() {
        assert!(matches!(
            verify_tdx_quote(&trust_store(), &QUOTE[..100]),
            Err(VerificationError::MalformedQuote(_))
        ));
    }
}
