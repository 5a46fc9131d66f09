use std::{collections::BTreeMap, time::SystemTime};

use chrono::{DateTime, Utc};
use x509_cert::{
    der::{
        oid::{AssociatedOid, ObjectIdentifier},
        Decode, Encode,
    },
    ext::{
        pkix::{BasicConstraints, KeyUsage},
        Extension,
    },
    Certificate,
};
use x509_verify::VerifyingKey;

use crate::{
    constants::PCK_CHAIN_TERMINATOR,
    error::{CertificateChainError, MalformedQuote, Result},
    utils::Expireable,
};

const PEM_BEGIN: &[u8] = b"-----BEGIN CERTIFICATE-----";
const PEM_END: &[u8] = b"-----END CERTIFICATE-----";

/// TrustStore is a minimal PKI (Public Key Infrastructure) for TDX quote verification. It
/// holds the caller's trust anchors and the reference time, and validates PCK certificate
/// chains presented in quotes against them.
///
/// Revocation is not checked here; it is a policy decision layered on top of a valid chain.
pub struct TrustStore {
    /// Trusted CAs (Certificate Authorities), grouped by subject.
    ///
    /// A subject may carry several keys, e.g. a rolled over root next to the current one.
    pub trusted: BTreeMap<String, Vec<TrustedIdentity>>,
    /// Current time for validity checks
    pub current_time: SystemTime,
}

/// Wrapper for pre-parse trusted identity for verification.
pub struct TrustedIdentity {
    pub cert: Certificate,
    pub pk: VerifyingKey,
}

impl TrustStore {
    /// Creates a new trust store with the given root certificates
    ///
    /// # Parameters
    /// * `current_time` - Time reference for validity checks
    /// * `trusted_certs` - Trust anchors, e.g. the Intel SGX Root CA
    ///
    /// # Security Considerations
    /// * The provided roots establish the foundation of trust
    /// * Current_time must come from a secure source on production systems
    pub fn new(
        current_time: SystemTime,
        trusted_certs: Vec<Certificate>,
    ) -> Result<Self, CertificateChainError> {
        let mut trusted: BTreeMap<String, Vec<TrustedIdentity>> = BTreeMap::new();

        for cert in trusted_certs {
            let pk: VerifyingKey = (&cert).try_into().map_err(|e| {
                CertificateChainError::InvalidTrustAnchor(format!(
                    "failed to decode key from certificate: {}",
                    e
                ))
            })?;

            let subject = cert.tbs_certificate.subject.to_string();
            let key = spki_der(&cert).ok_or_else(|| {
                CertificateChainError::InvalidTrustAnchor(format!(
                    "failed to encode public key of {subject}"
                ))
            })?;

            let anchors = trusted.entry(subject).or_default();
            if anchors
                .iter()
                .any(|anchor| spki_der(&anchor.cert).as_ref() == Some(&key))
            {
                return Err(CertificateChainError::InvalidTrustAnchor(format!(
                    "duplicate trust anchor {}",
                    cert.tbs_certificate.subject
                )));
            }
            anchors.push(TrustedIdentity { cert, pk });
        }

        if trusted.is_empty() {
            return Err(CertificateChainError::InvalidTrustAnchor(
                "no trust anchors given".to_string(),
            ));
        }

        Ok(Self {
            trusted,
            current_time,
        })
    }

    /// Creates a trust store from one or more PEM encoded anchor certificates.
    pub fn from_pem(current_time: SystemTime, pem: &[u8]) -> Result<Self, CertificateChainError> {
        let blocks = pem::parse_many(pem)
            .map_err(|e| CertificateChainError::InvalidTrustAnchor(e.to_string()))?;

        let certs = blocks
            .iter()
            .filter(|block| block.tag() == "CERTIFICATE")
            .map(|block| Certificate::from_der(block.contents()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CertificateChainError::InvalidTrustAnchor(e.to_string()))?;

        Self::new(current_time, certs)
    }

    /// Verify the leaf node in a certificate chain is rooted in the trust store.
    ///
    /// # Parameters
    /// * `chain` - The certificate chain to verify, leaf first and root last.
    ///
    pub fn verify_chain_leaf(
        &self,
        chain: &[Certificate],
    ) -> Result<TrustedIdentity, CertificateChainError> {
        let (root, _) = chain.split_last().ok_or(CertificateChainError::EmptyChain)?;
        if chain.len() < 2 {
            return Err(CertificateChainError::IncompleteChain { len: chain.len() });
        }

        for cert in chain {
            check_validity(cert, self.current_time)?;
        }

        // The root must be self issued and match an anchor by name and key.
        let root_subject = root.tbs_certificate.subject.to_string();
        if root.tbs_certificate.issuer != root.tbs_certificate.subject {
            return Err(CertificateChainError::RootNotSelfIssued {
                subject: root_subject,
            });
        }
        let anchor = self.find_anchor(root)?;
        anchor
            .pk
            .verify_strict(root)
            .map_err(|_| CertificateChainError::SignatureMismatch {
                subject: root_subject,
            })?;

        // Work through the certificate chain from the root (last) certificate.
        let mut issuer = TrustedIdentity {
            cert: root.clone(),
            pk: decode_key(root)?,
        };
        for (depth, cert) in chain.iter().rev().skip(1).enumerate() {
            let subject = cert.tbs_certificate.subject.to_string();

            if cert.tbs_certificate.issuer != issuer.cert.tbs_certificate.subject {
                return Err(CertificateChainError::IssuerMismatch {
                    subject,
                    issuer: cert.tbs_certificate.issuer.to_string(),
                    expected: issuer.cert.tbs_certificate.subject.to_string(),
                });
            }

            // Certificates between this one and the leaf.
            let below = chain.len() - depth - 2;
            check_ca(&issuer.cert, below)?;

            // Validate issuer signature.
            issuer
                .pk
                .verify_strict(cert)
                .map_err(|_| CertificateChainError::SignatureMismatch {
                    subject: subject.clone(),
                })?;

            issuer = TrustedIdentity {
                cert: cert.clone(),
                pk: decode_key(cert)?,
            };
        }

        // Only an end entity may vouch for the quoting enclave.
        if basic_constraints(&issuer.cert).is_some_and(|constraints| constraints.ca) {
            return Err(CertificateChainError::LeafIsCertificateAuthority {
                subject: issuer.cert.tbs_certificate.subject.to_string(),
            });
        }

        Ok(issuer)
    }

    /// Find the anchor with the root's subject and public key.
    fn find_anchor(&self, root: &Certificate) -> Result<&TrustedIdentity, CertificateChainError> {
        let subject = root.tbs_certificate.subject.to_string();
        let untrusted = || CertificateChainError::UntrustedRoot {
            subject: subject.clone(),
        };

        let root_key = spki_der(root).ok_or_else(untrusted)?;
        self.trusted
            .get(&subject)
            .into_iter()
            .flatten()
            .find(|anchor| spki_der(&anchor.cert).as_ref() == Some(&root_key))
            .ok_or_else(untrusted)
    }
}

/// Splits a NUL terminated concatenation of PEM certificates and parses each one.
///
/// Anything after the last block other than the single terminator is a malformed quote;
/// a block that is not a well formed PEM certificate is an invalid chain.
pub fn load_pem_chain(data: &[u8]) -> Result<Vec<Certificate>> {
    let blocks = split_pem_chain(data)?;
    if blocks.is_empty() {
        return Err(CertificateChainError::EmptyChain.into());
    }

    let mut certs = Vec::with_capacity(blocks.len());
    for (index, block) in blocks.into_iter().enumerate() {
        let start = block
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(block.len());
        if !block[start..].starts_with(PEM_BEGIN) {
            return Err(CertificateChainError::MalformedPem(format!(
                "block {index} does not start with a certificate header"
            ))
            .into());
        }

        let pem = pem::parse(block)
            .map_err(|e| CertificateChainError::MalformedPem(format!("block {index}: {e}")))?;
        let cert = Certificate::from_der(pem.contents()).map_err(|e| {
            CertificateChainError::InvalidCertificate {
                index,
                reason: e.to_string(),
            }
        })?;
        certs.push(cert);
    }

    Ok(certs)
}

fn split_pem_chain(data: &[u8]) -> Result<Vec<&[u8]>> {
    let mut blocks = Vec::new();
    let mut rest = data;

    while let Some(end) = rest.windows(PEM_END.len()).position(|w| w == PEM_END) {
        let mut split = end + PEM_END.len();
        // The line break after the footer belongs to the block.
        if rest[split..].starts_with(b"\r\n") {
            split += 2;
        } else if rest[split..].starts_with(b"\n") {
            split += 1;
        }
        let (block, tail) = rest.split_at(split);
        blocks.push(block);
        rest = tail;
    }

    if rest != [PCK_CHAIN_TERMINATOR] {
        if contains(rest, PEM_BEGIN) {
            return Err(CertificateChainError::MalformedPem(format!(
                "block {} has no certificate footer",
                blocks.len()
            ))
            .into());
        }
        return Err(MalformedQuote::InvalidChainTerminator {
            trailing: rest.len(),
        }
        .into());
    }

    Ok(blocks)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn spki_der(cert: &Certificate) -> Option<Vec<u8>> {
    cert.tbs_certificate.subject_public_key_info.to_der().ok()
}

fn decode_key(cert: &Certificate) -> Result<VerifyingKey, CertificateChainError> {
    cert.try_into()
        .map_err(|_| CertificateChainError::UnsupportedPublicKey {
            subject: cert.tbs_certificate.subject.to_string(),
        })
}

fn check_validity(cert: &Certificate, now: SystemTime) -> Result<(), CertificateChainError> {
    if cert.valid_at(now) {
        return Ok(());
    }

    let validity = &cert.tbs_certificate.validity;
    Err(CertificateChainError::Expired {
        subject: cert.tbs_certificate.subject.to_string(),
        not_before: DateTime::<Utc>::from(validity.not_before.to_system_time()),
        not_after: DateTime::<Utc>::from(validity.not_after.to_system_time()),
    })
}

fn find_extension(cert: &Certificate, oid: ObjectIdentifier) -> Option<&Extension> {
    cert.tbs_certificate
        .extensions
        .as_ref()?
        .iter()
        .find(|ext| ext.extn_id == oid)
}

fn basic_constraints(cert: &Certificate) -> Option<BasicConstraints> {
    let ext = find_extension(cert, BasicConstraints::OID)?;
    BasicConstraints::from_der(ext.extn_value.as_bytes()).ok()
}

/// An issuer must be a CA whose path length allows `below` more CAs under it.
///
/// When the issuer restricts its key usage, certificate signing must be among them.
fn check_ca(issuer: &Certificate, below: usize) -> Result<(), CertificateChainError> {
    let subject = issuer.tbs_certificate.subject.to_string();

    let constraints = match basic_constraints(issuer) {
        Some(constraints) if constraints.ca => constraints,
        _ => return Err(CertificateChainError::NotCertificateAuthority { subject }),
    };

    if let Some(ext) = find_extension(issuer, KeyUsage::OID) {
        let may_sign = KeyUsage::from_der(ext.extn_value.as_bytes())
            .is_ok_and(|usage| usage.key_cert_sign());
        if !may_sign {
            return Err(CertificateChainError::MissingKeyCertSign { subject });
        }
    }

    match constraints.path_len_constraint {
        Some(limit) if below > limit as usize => {
            Err(CertificateChainError::PathLengthExceeded { subject })
        }
        _ => Ok(()),
    }
}
