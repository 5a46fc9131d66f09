use serde::Serialize;

use self::quote::Quote;

pub mod quote;
pub mod report;

/// The attested TD identity, released once every check on a quote has passed.
#[derive(Debug, Clone, Serialize)]
pub struct VerifiedOutput {
    pub quote_version: u16,
    pub tee_type: u32,
    #[serde(serialize_with = "hex::serialize")]
    pub qe_vendor_id: [u8; 16],
    #[serde(serialize_with = "hex::serialize")]
    pub tee_tcb_svn: [u8; 16],
    #[serde(serialize_with = "hex::serialize")]
    pub mr_seam: [u8; 48],
    #[serde(serialize_with = "hex::serialize")]
    pub mr_td: [u8; 48],
    #[serde(serialize_with = "hex::serialize")]
    pub mr_config_id: [u8; 48],
    #[serde(serialize_with = "hex::serialize")]
    pub mr_owner: [u8; 48],
    #[serde(serialize_with = "hex::serialize")]
    pub mr_owner_config: [u8; 48],
    #[serde(serialize_with = "hex::serialize")]
    pub rtmr0: [u8; 48],
    #[serde(serialize_with = "hex::serialize")]
    pub rtmr1: [u8; 48],
    #[serde(serialize_with = "hex::serialize")]
    pub rtmr2: [u8; 48],
    #[serde(serialize_with = "hex::serialize")]
    pub rtmr3: [u8; 48],
    #[serde(serialize_with = "hex::serialize")]
    pub report_data: [u8; 64],
    pub td_attributes: u64,
    pub xfam: u64,
    /// Subject of the PCK leaf certificate that vouched for the quoting enclave.
    pub pck_subject: String,

    #[serde(skip)]
    pub quote: Quote,
}

impl VerifiedOutput {
    pub fn new(quote: Quote, pck_subject: String) -> Self {
        let header = &quote.header;
        let body = &quote.body;
        Self {
            quote_version: header.version.get(),
            tee_type: header.tee_type.get(),
            qe_vendor_id: header.qe_vendor_id,
            tee_tcb_svn: body.tee_tcb_svn,
            mr_seam: body.mr_seam,
            mr_td: body.mr_td,
            mr_config_id: body.mr_config_id,
            mr_owner: body.mr_owner,
            mr_owner_config: body.mr_owner_config,
            rtmr0: body.rtmr0,
            rtmr1: body.rtmr1,
            rtmr2: body.rtmr2,
            rtmr3: body.rtmr3,
            report_data: body.report_data,
            td_attributes: body.td_attributes.get(),
            xfam: body.xfam.get(),
            pck_subject,
            quote,
        }
    }

    /// Whether the TD runs in debug mode, where its measurements cannot be trusted.
    pub fn is_debug(&self) -> bool {
        self.quote.body.is_debug()
    }
}
