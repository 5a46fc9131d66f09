//! Error taxonomy for quote decoding and verification.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub type Result<T, E = VerificationError> = std::result::Result<T, E>;

/// The single failure returned by any decode or verification entry point.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// The quote bytes do not follow the v4 TDX layout.
    #[error("malformed quote: {0}")]
    MalformedQuote(#[from] MalformedQuote),

    /// A certification data variant required by a check is not the one present.
    #[error("unsupported certification data type {0}")]
    UnsupportedCertificationDataType(u16),

    /// ECDSA verification failed at the named step.
    #[error("{0} signature verification failed")]
    SignatureInvalid(SignatureStep),

    /// SHA256(attestation key || QE auth data) is not the prefix of the QE report data.
    #[error("attestation key is not bound to the QE report data")]
    BindingMismatch,

    /// The PCK certificate chain does not lead to a trusted root.
    #[error("certificate chain invalid: {0}")]
    CertificateChainInvalid(#[from] CertificateChainError),
}

/// The signature check that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureStep {
    /// Attestation key over header || TD report.
    Quote,
    /// PCK leaf key over the QE enclave report.
    QeReport,
}

impl fmt::Display for SignatureStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quote => f.write_str("quote"),
            Self::QeReport => f.write_str("qe_report"),
        }
    }
}

/// Structural decode failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedQuote {
    #[error("{field}: expected {expected} bytes, found {actual}")]
    Truncated {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{field}: declared length {declared} does not match the {remaining} remaining bytes")]
    LengthMismatch {
        field: &'static str,
        declared: usize,
        remaining: usize,
    },

    #[error("unsupported quote version {0}")]
    UnsupportedVersion(u16),

    #[error("unsupported tee type {0:#010x}")]
    UnsupportedTeeType(u32),

    #[error("unsupported attestation key type {0}")]
    UnsupportedAttestationKeyType(u16),

    #[error("quote is {size} bytes, limit is {max}")]
    TooLarge { size: usize, max: usize },

    #[error("pck certificate chain must end with a single NUL byte, found {trailing} trailing bytes")]
    InvalidChainTerminator { trailing: usize },

    #[error("quote is not valid base64")]
    InvalidBase64,
}

/// Reasons a PCK certificate chain is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CertificateChainError {
    #[error("malformed pem: {0}")]
    MalformedPem(String),

    #[error("certificate {index} could not be parsed: {reason}")]
    InvalidCertificate { index: usize, reason: String },

    #[error("certificate chain is empty")]
    EmptyChain,

    #[error("certificate chain has {len} certificates, at least a leaf and a root are required")]
    IncompleteChain { len: usize },

    #[error("leaf certificate {subject} is a certificate authority")]
    LeafIsCertificateAuthority { subject: String },

    #[error("certificate {subject} is not valid at this time (valid from {not_before} until {not_after})")]
    Expired {
        subject: String,
        not_before: DateTime<Utc>,
        not_after: DateTime<Utc>,
    },

    #[error("certificate {subject} is issued by {issuer}, but the next certificate is {expected}")]
    IssuerMismatch {
        subject: String,
        issuer: String,
        expected: String,
    },

    #[error("certificate {subject} is not a certificate authority")]
    NotCertificateAuthority { subject: String },

    #[error("certificate {subject} may not sign certificates")]
    MissingKeyCertSign { subject: String },

    #[error("certificate {subject} exceeds its path length constraint")]
    PathLengthExceeded { subject: String },

    #[error("signature of {subject} does not verify under its issuer key")]
    SignatureMismatch { subject: String },

    #[error("root certificate {subject} is not self issued")]
    RootNotSelfIssued { subject: String },

    #[error("root certificate {subject} does not match any trust anchor")]
    UntrustedRoot { subject: String },

    #[error("certificate {subject} does not carry a P-256 public key")]
    UnsupportedPublicKey { subject: String },

    #[error("invalid trust anchor: {0}")]
    InvalidTrustAnchor(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_step_names() {
        assert_eq!(SignatureStep::Quote.to_string(), "quote");
        assert_eq!(SignatureStep::QeReport.to_string(), "qe_report");
        assert_eq!(
            VerificationError::SignatureInvalid(SignatureStep::QeReport).to_string(),
            "qe_report signature verification failed"
        );
    }

    #[test]
    fn malformed_quote_names_field() {
        let err = VerificationError::from(MalformedQuote::Truncated {
            field: "quote header",
            expected: 48,
            actual: 12,
        });
        assert_eq!(
            err.to_string(),
            "malformed quote: quote header: expected 48 bytes, found 12"
        );
    }
}
