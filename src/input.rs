//! Request shapes accepted from callers and their conversion to reconciler input

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Acknowledgement request as submitted by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcknowledgementRequest {
    #[serde(alias = "loading_advance_id", alias = "voucherId", alias = "loadingAdvanceId")]
    pub voucher_id: VoucherId,
    #[serde(default, alias = "invoices")]
    pub lines: Vec<AcknowledgementLineRequest>,
}

/// One invoice row of an [`AcknowledgementRequest`]
///
/// Clients send the invoice reference under either of two names; both land
/// in `invoice_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcknowledgementLineRequest {
    #[serde(
        alias = "loading_advance_invoice_id",
        alias = "invoiceId",
        alias = "loadingAdvanceInvoiceId"
    )]
    pub invoice_id: InvoiceId,
    pub status: String,
    #[serde(default, alias = "returnedAmount")]
    pub returned_amount: Option<BigDecimal>,
}

impl From<AcknowledgementLineRequest> for AcknowledgementLineInput {
    fn from(line: AcknowledgementLineRequest) -> Self {
        AcknowledgementLineInput {
            invoice_id: line.invoice_id,
            status: line.status,
            returned_amount: line.returned_amount.unwrap_or_else(|| BigDecimal::from(0)),
        }
    }
}

impl AcknowledgementRequest {
    /// Split the request into the voucher and its normalised lines
    pub fn into_parts(self) -> (VoucherId, Vec<AcknowledgementLineInput>) {
        let lines = self.lines.into_iter().map(Into::into).collect();
        (self.voucher_id, lines)
    }
}
