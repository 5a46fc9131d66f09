//! Certification data: a type-tagged, length-prefixed block.
//!
//! The same numeric tag means different things depending on where the block sits, so each
//! nesting level has its own closed set of variants:
//!
//! * [`CertificationData`] closes the quote signature data. Tag 6 selects
//!   [`QeReportCertificationData`].
//! * [`QeCertificationData`] closes the QE report certification data. Tag 5 selects the
//!   PEM encoded [`PckCertChain`].
//!
//! Tags follow Intel's DCAP quote format (see [`CertificationDataType`]). Any other tag is
//! kept as an opaque payload so a caller that does not need it is not blocked.

use x509_cert::Certificate;
use zerocopy::little_endian;

use crate::{
    constants::ECDSA_SIGNATURE_LEN,
    error::{MalformedQuote, Result, VerificationError},
    trust_store,
    types::report::EnclaveReportBody,
    utils,
};

/// Certification data type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum CertificationDataType {
    PpidCleartext = 1,
    PpidRsa2048Encrypted = 2,
    PpidRsa3072Encrypted = 3,
    PckCleartext = 4,
    PckCertChain = 5,
    QeReportCertificationData = 6,
    PlatformManifest = 7,
}

impl CertificationDataType {
    pub fn from_tag(tag: u16) -> Option<Self> {
        match tag {
            1 => Some(Self::PpidCleartext),
            2 => Some(Self::PpidRsa2048Encrypted),
            3 => Some(Self::PpidRsa3072Encrypted),
            4 => Some(Self::PckCleartext),
            5 => Some(Self::PckCertChain),
            6 => Some(Self::QeReportCertificationData),
            7 => Some(Self::PlatformManifest),
            _ => None,
        }
    }
}

/// A certification data block whose variant is not decoded at its nesting level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueCertificationData {
    pub cert_data_type: u16,
    pub data: Vec<u8>,
}

impl OpaqueCertificationData {
    pub fn known_type(&self) -> Option<CertificationDataType> {
        CertificationDataType::from_tag(self.cert_data_type)
    }
}

/// Certification data closing the quote signature data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificationData {
    /// Tag 6.
    QeReport(Box<QeReportCertificationData>),
    Unsupported(OpaqueCertificationData),
}

impl CertificationData {
    pub fn read(bytes: &mut &[u8]) -> Result<Self, MalformedQuote> {
        let (cert_data_type, mut data) = read_tagged(bytes, "certification data")?;

        if cert_data_type == CertificationDataType::QeReportCertificationData as u16 {
            let qe_report_cert_data = QeReportCertificationData::read(&mut data)?;
            return Ok(Self::QeReport(Box::new(qe_report_cert_data)));
        }

        Ok(Self::Unsupported(OpaqueCertificationData {
            cert_data_type,
            data: data.to_vec(),
        }))
    }

    pub fn cert_data_type(&self) -> u16 {
        match self {
            Self::QeReport(_) => CertificationDataType::QeReportCertificationData as u16,
            Self::Unsupported(opaque) => opaque.cert_data_type,
        }
    }

    pub fn as_qe_report(&self) -> Result<&QeReportCertificationData> {
        match self {
            Self::QeReport(qe_report_cert_data) => Ok(&**qe_report_cert_data),
            Self::Unsupported(opaque) => Err(VerificationError::UnsupportedCertificationDataType(
                opaque.cert_data_type,
            )),
        }
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        match self {
            Self::QeReport(qe_report_cert_data) => {
                let mut payload = Vec::new();
                qe_report_cert_data.write(&mut payload);
                write_tagged(out, self.cert_data_type(), &payload);
            }
            Self::Unsupported(opaque) => write_tagged(out, opaque.cert_data_type, &opaque.data),
        }
    }
}

/// QE report certification data.
///
/// In the intel docs, this is A 3.11: "QE Report Certification Data".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QeReportCertificationData {
    /// Report of the quoting enclave.
    pub qe_report: EnclaveReportBody,

    /// Raw `r || s` signature of the QE report by the PCK leaf key.
    pub qe_report_signature: [u8; ECDSA_SIGNATURE_LEN],

    /// Bound into the QE report data together with the attestation key.
    pub qe_auth_data: Vec<u8>,

    pub certification_data: QeCertificationData,
}

impl QeReportCertificationData {
    pub fn read(bytes: &mut &[u8]) -> Result<Self, MalformedQuote> {
        let qe_report = utils::read_from_bytes::<EnclaveReportBody>(bytes, "qe report")?;

        let qe_report_signature =
            utils::read_from_bytes::<[u8; ECDSA_SIGNATURE_LEN]>(bytes, "qe report signature")?;

        let auth_data_size =
            utils::read_from_bytes::<little_endian::U16>(bytes, "qe auth data size")?.get();
        let qe_auth_data = utils::read_bytes(bytes, auth_data_size as usize, "qe auth data")?;

        let certification_data = QeCertificationData::read(bytes)?;

        Ok(Self {
            qe_report,
            qe_report_signature,
            qe_auth_data: qe_auth_data.to_vec(),
            certification_data,
        })
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.qe_report.to_bytes());
        out.extend_from_slice(&self.qe_report_signature);
        out.extend_from_slice(&(self.qe_auth_data.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.qe_auth_data);
        self.certification_data.write(out);
    }
}

/// Certification data closing the QE report certification data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QeCertificationData {
    /// Tag 5.
    PckCertChain(PckCertChain),
    Unsupported(OpaqueCertificationData),
}

impl QeCertificationData {
    pub fn read(bytes: &mut &[u8]) -> Result<Self, MalformedQuote> {
        let (cert_data_type, data) = read_tagged(bytes, "qe certification data")?;

        if cert_data_type == CertificationDataType::PckCertChain as u16 {
            return Ok(Self::PckCertChain(PckCertChain { pem: data.to_vec() }));
        }

        Ok(Self::Unsupported(OpaqueCertificationData {
            cert_data_type,
            data: data.to_vec(),
        }))
    }

    pub fn cert_data_type(&self) -> u16 {
        match self {
            Self::PckCertChain(_) => CertificationDataType::PckCertChain as u16,
            Self::Unsupported(opaque) => opaque.cert_data_type,
        }
    }

    pub fn as_pck_cert_chain(&self) -> Result<&PckCertChain> {
        match self {
            Self::PckCertChain(chain) => Ok(chain),
            Self::Unsupported(opaque) => Err(VerificationError::UnsupportedCertificationDataType(
                opaque.cert_data_type,
            )),
        }
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        match self {
            Self::PckCertChain(chain) => write_tagged(out, self.cert_data_type(), &chain.pem),
            Self::Unsupported(opaque) => write_tagged(out, opaque.cert_data_type, &opaque.data),
        }
    }
}

/// PEM encoded PCK leaf, intermediate and root certificates followed by a NUL byte.
///
/// Kept as the raw payload; [`PckCertChain::certificates`] does the framing and parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PckCertChain {
    pub pem: Vec<u8>,
}

impl PckCertChain {
    /// Leaf first, root last.
    pub fn certificates(&self) -> Result<Vec<Certificate>> {
        trust_store::load_pem_chain(&self.pem)
    }
}

fn read_tagged<'a>(
    bytes: &mut &'a [u8],
    field: &'static str,
) -> Result<(u16, &'a [u8]), MalformedQuote> {
    let cert_data_type =
        utils::read_from_bytes::<little_endian::U16>(bytes, "certification data type")?.get();
    let cert_data_size =
        utils::read_from_bytes::<little_endian::U32>(bytes, "certification data size")?.get();
    let cert_data = utils::read_remaining(bytes, cert_data_size as usize, field)?;
    Ok((cert_data_type, cert_data))
}

fn write_tagged(out: &mut Vec<u8>, cert_data_type: u16, payload: &[u8]) {
    out.extend_from_slice(&cert_data_type.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
}
