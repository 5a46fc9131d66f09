mod cert_data;
mod header;
mod signature;

use base64ct::{Base64, Encoding};
use zerocopy::little_endian;

pub use cert_data::*;
pub use header::*;
pub use signature::*;

use crate::{
    constants::{
        ECDSA_256_WITH_P256_CURVE, MAX_QUOTE_SIZE, QUOTE_V4, SIGNATURE_LEN_OFFSET, TDX_TEE_TYPE,
    },
    error::MalformedQuote,
    utils,
};

use super::report::Td10ReportBody;

/// A v4 TDX quote, used for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// Header of the TDX Quote data structure.
    pub header: QuoteHeader,

    /// TD report of the attested trust domain.
    pub body: Td10ReportBody,

    /// Signature of the quote header and body, with the data vouching for the signing key.
    pub signature: QuoteSignatureData,
}

impl Quote {
    /// Decodes a quote that must span the whole of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MalformedQuote> {
        Self::from_bytes_with_limit(bytes, MAX_QUOTE_SIZE)
    }

    pub fn from_bytes_with_limit(bytes: &[u8], max: usize) -> Result<Self, MalformedQuote> {
        if bytes.len() > max {
            return Err(MalformedQuote::TooLarge {
                size: bytes.len(),
                max,
            });
        }

        let mut bytes = bytes;
        Self::read(&mut bytes)
    }

    /// Decodes standard base64 text carrying a quote.
    pub fn from_base64(text: &str) -> Result<Self, MalformedQuote> {
        let bytes = Base64::decode_vec(text.trim()).map_err(|_| MalformedQuote::InvalidBase64)?;
        Self::from_bytes(&bytes)
    }

    pub fn read(bytes: &mut &[u8]) -> Result<Self, MalformedQuote> {
        // Read the quote header
        let header = utils::read_from_bytes::<QuoteHeader>(bytes, "quote header")?;

        if header.version.get() != QUOTE_V4 {
            return Err(MalformedQuote::UnsupportedVersion(header.version.get()));
        }
        if header.tee_type.get() != TDX_TEE_TYPE {
            return Err(MalformedQuote::UnsupportedTeeType(header.tee_type.get()));
        }
        if header.att_key_type.get() != ECDSA_256_WITH_P256_CURVE {
            return Err(MalformedQuote::UnsupportedAttestationKeyType(
                header.att_key_type.get(),
            ));
        }

        // Read the quote body and signature
        let body = utils::read_from_bytes::<Td10ReportBody>(bytes, "td report")?;

        let signature_len =
            utils::read_from_bytes::<little_endian::U32>(bytes, "signature data length")?.get();
        let mut signature_data =
            utils::read_remaining(bytes, signature_len as usize, "signature data")?;
        let signature = QuoteSignatureData::read(&mut signature_data)?;

        Ok(Quote {
            header,
            body,
            signature,
        })
    }

    /// Re-encodes the quote to the bytes it was decoded from.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut signature_data = Vec::new();
        self.signature.write(&mut signature_data);

        let mut out = self.signed_bytes();
        out.extend_from_slice(&(signature_data.len() as u32).to_le_bytes());
        out.extend_from_slice(&signature_data);
        out
    }

    /// Header followed by TD report, the message signed by the attestation key.
    pub fn signed_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SIGNATURE_LEN_OFFSET);
        out.extend_from_slice(&self.header.to_bytes());
        out.extend_from_slice(&self.body.to_bytes());
        out
    }
}
