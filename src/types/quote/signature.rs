use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::{
    constants::{ECDSA_PUBLIC_KEY_LEN, ECDSA_SIGNATURE_LEN},
    error::MalformedQuote,
    utils,
};

use super::CertificationData;

/// Signature data for v4 TDX Quotes
///
/// In the intel docs, this is A 3.8: "Quote Signature Data Structure"
///
/// This can be used to validate that the quoting enclave itself is valid, and then that
/// the quoting enclave has vouched for the attestation key that signed the TD report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteSignatureData {
    /// Raw `r || s` signature of the quote header + TD report by the attestation key.
    pub quote_signature: [u8; ECDSA_SIGNATURE_LEN],

    /// Raw `x || y` attestation public key used to generate the quote_signature.
    pub attestation_pub_key: [u8; ECDSA_PUBLIC_KEY_LEN],

    pub certification_data: CertificationData,
}

impl QuoteSignatureData {
    /// Reads the signature data, which must span the whole of `bytes`.
    pub fn read(bytes: &mut &[u8]) -> Result<Self, MalformedQuote> {
        let signature_header: EcdsaSignatureHeader =
            utils::read_from_bytes(bytes, "quote signature header")?;

        let certification_data = CertificationData::read(bytes)?;

        Ok(QuoteSignatureData {
            quote_signature: signature_header.quote_signature,
            attestation_pub_key: signature_header.attestation_pub_key,
            certification_data,
        })
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        let signature_header = EcdsaSignatureHeader {
            quote_signature: self.quote_signature,
            attestation_pub_key: self.attestation_pub_key,
        };
        out.extend_from_slice(signature_header.as_bytes());
        self.certification_data.write(out);
    }
}

#[derive(Debug, FromBytes, FromZeroes, AsBytes)]
#[repr(C)]
pub struct EcdsaSignatureHeader {
    pub quote_signature: [u8; ECDSA_SIGNATURE_LEN],
    pub attestation_pub_key: [u8; ECDSA_PUBLIC_KEY_LEN],
}
