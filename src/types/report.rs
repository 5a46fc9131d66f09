use zerocopy::{little_endian, AsBytes, FromBytes, FromZeroes};

use crate::{
    constants::{ENCLAVE_REPORT_LEN, TD10_REPORT_LEN},
    error::MalformedQuote,
};

/// SGX enclave report, as produced by the quoting enclave.
///
/// In the intel docs, this is A 3.1: "Enclave Report Body".
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, FromZeroes, AsBytes)]
#[repr(C)]
pub struct EnclaveReportBody {
    /// Security Version of the CPU (raw value)
    pub cpu_svn: [u8; 16],

    /// SSA Frame extended feature set.
    pub misc_select: little_endian::U32,

    pub reserved_1: [u8; 28],

    /// Set of flags describing attributes of the enclave.
    pub sgx_attributes: [u8; 16],

    /// Measurement of the enclave.
    pub mr_enclave: [u8; 32],

    pub reserved_2: [u8; 32],

    /// Measurement of the enclave signer.
    pub mr_signer: [u8; 32],

    pub reserved_3: [u8; 96],

    pub isv_prod_id: little_endian::U16,

    /// Security Version of the enclave.
    pub isv_svn: little_endian::U16,

    pub reserved_4: [u8; 60],

    /// For the quoting enclave this holds
    /// SHA256(attestation key || QE authentication data) || 32 bytes.
    pub user_report_data: [u8; 64],
}

const _: () = assert!(std::mem::size_of::<EnclaveReportBody>() == ENCLAVE_REPORT_LEN);

impl EnclaveReportBody {
    pub fn to_bytes(&self) -> [u8; ENCLAVE_REPORT_LEN] {
        let mut raw_bytes = [0; ENCLAVE_REPORT_LEN];
        raw_bytes.copy_from_slice(self.as_bytes());
        raw_bytes
    }
}

impl TryFrom<&[u8]> for EnclaveReportBody {
    type Error = MalformedQuote;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Self::read_from(value).ok_or(MalformedQuote::Truncated {
            field: "enclave report",
            expected: ENCLAVE_REPORT_LEN,
            actual: value.len(),
        })
    }
}

/// TDX 1.0 TD report, the body of a v4 TDX quote.
///
/// In the intel docs, this is A 3.2: "TD Quote Body".
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, FromZeroes, AsBytes)]
#[repr(C)]
pub struct Td10ReportBody {
    /// Describes the TCB of TDX.
    pub tee_tcb_svn: [u8; 16],

    /// Measurement of the TDX Module.
    pub mr_seam: [u8; 48],

    /// Zero for Intel TDX Module
    pub mr_signer_seam: [u8; 48],

    /// Must be zero for TDX 1.0
    pub seam_attributes: little_endian::U64,

    /// Bit 0 set means the TD runs in debug mode and is untrusted.
    pub td_attributes: little_endian::U64,

    /// eXtended Features Available Mask, same format as XCR0.
    pub xfam: little_endian::U64,

    /// (SHA384) Measurement of the initial contents of the TD.
    pub mr_td: [u8; 48],

    /// Software-defined ID for non-owner-defined configuration of the TD.
    pub mr_config_id: [u8; 48],

    /// Software-defined ID for the TD's owner
    pub mr_owner: [u8; 48],

    /// Software-defined ID for owner-defined configuration of the TD.
    pub mr_owner_config: [u8; 48],

    /// Runtime measurement registers.
    pub rtmr0: [u8; 48],
    pub rtmr1: [u8; 48],
    pub rtmr2: [u8; 48],
    pub rtmr3: [u8; 48],

    /// Additional report data.
    /// Covered by the quote signature, so the TD can bind up to 64 bytes of its own data.
    pub report_data: [u8; 64],
}

const _: () = assert!(std::mem::size_of::<Td10ReportBody>() == TD10_REPORT_LEN);

impl Td10ReportBody {
    pub fn to_bytes(&self) -> [u8; TD10_REPORT_LEN] {
        let mut raw_bytes = [0; TD10_REPORT_LEN];
        raw_bytes.copy_from_slice(self.as_bytes());
        raw_bytes
    }

    pub fn rtmrs(&self) -> [&[u8; 48]; 4] {
        [&self.rtmr0, &self.rtmr1, &self.rtmr2, &self.rtmr3]
    }

    pub fn is_debug(&self) -> bool {
        self.td_attributes.get() & 1 == 1
    }
}

impl TryFrom<&[u8]> for Td10ReportBody {
    type Error = MalformedQuote;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Self::read_from(value).ok_or(MalformedQuote::Truncated {
            field: "td report",
            expected: TD10_REPORT_LEN,
            actual: value.len(),
        })
    }
}
