use std::time::SystemTime;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use tdx_qvl::{
    trust_store::TrustStore,
    types::quote::Quote,
    verify_attestation_key_binding, verify_qe_report_signature, verify_quote_signature,
    verify_tdx_quote, CertificateChainError, SignatureStep, VerificationError,
};

const QUOTE: &[u8] = include_bytes!("../data/quote_tdx.bin");
const INTEL_ROOT: &[u8] = include_bytes!("../data/intel_sgx_root_ca.pem");
const UNRELATED_ROOT: &[u8] = include_bytes!("../data/unrelated_root_ca.pem");

const HEADER: usize = 0;
const TD_REPORT: usize = 48;
const QUOTE_SIGNATURE: usize = 636;
const ATTESTATION_KEY: usize = 700;
const QE_REPORT: usize = 770;
const QE_REPORT_DATA: usize = QE_REPORT + 320;
const QE_REPORT_SIGNATURE: usize = 1154;
const QE_AUTH_DATA: usize = 1220;

fn now() -> SystemTime {
    Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap().into()
}

fn intel_store() -> TrustStore {
    TrustStore::from_pem(now(), INTEL_ROOT).unwrap()
}

fn flipped(offset: usize) -> Vec<u8> {
    let mut raw = QUOTE.to_vec();
    raw[offset] ^= 0x01;
    raw
}

/// Outcome of each step run independently: quote signature, binding, QE report signature.
fn steps(raw: &[u8]) -> Result<[bool; 3]> {
    let store = intel_store();
    let quote = Quote::from_bytes(raw)?;
    let qe = quote.signature.certification_data.as_qe_report()?;
    Ok([
        verify_quote_signature(&quote).is_ok(),
        verify_attestation_key_binding(&quote.signature.attestation_pub_key, qe).is_ok(),
        verify_qe_report_signature(&store, qe).is_ok(),
    ])
}

#[test]
fn reference_quote_scenario() -> Result<()> {
    let quote = Quote::from_bytes(QUOTE)?;
    assert_eq!(quote.header.version.get(), 4);
    assert_eq!(&quote.body.to_bytes()[..], &QUOTE[TD_REPORT..TD_REPORT + 584]);

    let qe = quote.signature.certification_data.as_qe_report()?;
    assert_eq!(&qe.qe_report.to_bytes()[..], &QUOTE[QE_REPORT..QE_REPORT + 384]);
    assert_eq!(qe.qe_auth_data, (0u8..32).collect::<Vec<_>>());

    assert_eq!(steps(QUOTE)?, [true, true, true]);

    let output = verify_tdx_quote(&intel_store(), QUOTE)?;
    assert_eq!(output.quote.to_bytes(), QUOTE);
    Ok(())
}

#[test]
fn tampered_signed_region_fails_quote_step() -> Result<()> {
    for offset in [HEADER + 8, TD_REPORT, TD_REPORT + 583, QUOTE_SIGNATURE + 10, ATTESTATION_KEY + 63] {
        let raw = flipped(offset);
        match verify_tdx_quote(&intel_store(), &raw) {
            Err(VerificationError::SignatureInvalid(SignatureStep::Quote)) => {}
            other => panic!("offset {offset}: unexpected {:?}", other.err()),
        }
    }
    Ok(())
}

#[test]
fn tampered_attestation_key_also_breaks_binding() -> Result<()> {
    assert_eq!(steps(&flipped(ATTESTATION_KEY))?, [false, false, true]);
    Ok(())
}

#[test]
fn tampered_binding_is_detected_independently() -> Result<()> {
    for offset in [QE_AUTH_DATA, QE_AUTH_DATA + 31] {
        let raw = flipped(offset);
        assert_eq!(steps(&raw)?, [true, false, true]);
        assert!(matches!(
            verify_tdx_quote(&intel_store(), &raw),
            Err(VerificationError::BindingMismatch)
        ));
    }

    // Report data is covered by the QE report signature as well.
    assert_eq!(steps(&flipped(QE_REPORT_DATA))?, [true, false, false]);
    assert!(matches!(
        verify_tdx_quote(&intel_store(), &flipped(QE_REPORT_DATA)),
        Err(VerificationError::BindingMismatch)
    ));
    Ok(())
}

#[test]
fn tampered_qe_report_fails_qe_report_step() -> Result<()> {
    for offset in [QE_REPORT, QE_REPORT + 64, QE_REPORT_DATA + 40, QE_REPORT_SIGNATURE + 5] {
        let raw = flipped(offset);
        assert_eq!(steps(&raw)?, [true, true, false]);
        match verify_tdx_quote(&intel_store(), &raw) {
            Err(VerificationError::SignatureInvalid(SignatureStep::QeReport)) => {}
            other => panic!("offset {offset}: unexpected {:?}", other.err()),
        }
    }
    Ok(())
}

#[test]
fn chain_trust_boundary() -> Result<()> {
    assert!(verify_tdx_quote(&intel_store(), QUOTE).is_ok());

    let unrelated = TrustStore::from_pem(now(), UNRELATED_ROOT)?;
    assert!(matches!(
        verify_tdx_quote(&unrelated, QUOTE),
        Err(VerificationError::CertificateChainInvalid(
            CertificateChainError::UntrustedRoot { .. }
        ))
    ));
    Ok(())
}

#[test]
fn expired_chain_is_rejected() -> Result<()> {
    let later = Utc.with_ymd_and_hms(2034, 1, 1, 0, 0, 0).unwrap().into();
    let store = TrustStore::from_pem(later, INTEL_ROOT)?;
    assert!(matches!(
        verify_tdx_quote(&store, QUOTE),
        Err(VerificationError::CertificateChainInvalid(
            CertificateChainError::Expired { .. }
        ))
    ));
    Ok(())
}

#[test]
fn verified_output_serializes_to_hex() -> Result<()> {
    let output = verify_tdx_quote(&intel_store(), QUOTE)?;
    let json = serde_json::to_value(&output)?;

    assert_eq!(json["quote_version"], 4);
    assert_eq!(json["tee_type"], 0x81);
    assert_eq!(json["qe_vendor_id"], "939a7233f79c4ca9940a0db3957f0607");
    assert_eq!(json["mr_td"], hex::encode(output.mr_td));
    assert!(json["report_data"]
        .as_str()
        .unwrap_or_default()
        .starts_with(&hex::encode("Hello from Edgeless Systems!")));
    assert!(json.get("quote").is_none());
    Ok(())
}
