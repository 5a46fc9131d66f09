use zerocopy::{little_endian, AsBytes, FromBytes, FromZeroes};

use crate::{
    constants::{HEADER_LEN, INTEL_QE_VENDOR_ID},
    error::MalformedQuote,
};

/// Header of the TDX Quote data structure.
///
/// In the intel docs, this is A 3.1: "Quote Header".
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, FromZeroes, AsBytes)]
#[repr(C)]
pub struct QuoteHeader {
    /// Version of the quote data structure - 4
    pub version: little_endian::U16,

    /// Type of the Attestation Key used by the Quoting Enclave -
    /// 2 (ECDSA-256-with-P-256 curve)
    pub att_key_type: little_endian::U16,

    /// TEE for this Attestation
    /// 0x00000081: TDX
    pub tee_type: little_endian::U32,

    /// Reserved for TDX, QE SVN for SGX.
    pub reserved_1: [u8; 2],

    /// Reserved for TDX, PCE SVN for SGX.
    pub reserved_2: [u8; 2],

    /// Unique identifier of the QE Vendor.
    /// Value: 939A7233F79C4CA9940A0DB3957F0607 (Intel® SGX QE Vendor)
    pub qe_vendor_id: [u8; 16],

    /// Custom user-defined data. For the Intel® SGX and TDX DCAP Quote Generation Libraries,
    /// the first 16 bytes contain a Platform Identifier that is used to link a PCK Certificate to an Enc(PPID).
    pub user_data: [u8; 20],
}

const _: () = assert!(std::mem::size_of::<QuoteHeader>() == HEADER_LEN);

impl QuoteHeader {
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut raw_bytes = [0; HEADER_LEN];
        raw_bytes.copy_from_slice(self.as_bytes());
        raw_bytes
    }

    pub fn is_intel_qe(&self) -> bool {
        self.qe_vendor_id == INTEL_QE_VENDOR_ID
    }
}

impl TryFrom<&[u8]> for QuoteHeader {
    type Error = MalformedQuote;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Self::read_from(value).ok_or(MalformedQuote::Truncated {
            field: "quote header",
            expected: HEADER_LEN,
            actual: value.len(),
        })
    }
}
