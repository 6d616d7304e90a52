//! Batch validation and aggregation for voucher acknowledgements
//!
//! Everything here is a pure function of the voucher, its invoices and the
//! submitted lines; nothing touches storage.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::traits::LineValidator;
use crate::types::*;
use crate::utils::validation::parse_invoice_status;

/// An input line that passed validation, resolved against its invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedLine {
    pub invoice: Invoice,
    pub status: InvoiceStatus,
    pub returned_amount: BigDecimal,
}

/// Outcome of validating a batch, ready to be persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationPlan {
    pub voucher: Voucher,
    /// Lines in submission order
    pub lines: Vec<ValidatedLine>,
    pub total_returned: BigDecimal,
    pub pending_amount: BigDecimal,
    pub voucher_status: VoucherStatus,
}

impl ReconciliationPlan {
    /// Build the acknowledgement and line records for this plan
    pub fn to_records(&self) -> (Acknowledgement, Vec<AcknowledgementInvoiceLine>) {
        let acknowledgement = Acknowledgement {
            id: Uuid::new_v4(),
            voucher_id: self.voucher.id,
            voucher_number: self.voucher.voucher_number.clone(),
            voucher_status: self.voucher_status,
            pending_amount: self.pending_amount.clone(),
            created_at: chrono::Utc::now().naive_utc(),
        };

        let lines = self
            .lines
            .iter()
            .map(|line| AcknowledgementInvoiceLine {
                id: Uuid::new_v4(),
                acknowledgement_id: acknowledgement.id,
                invoice_id: line.invoice.id,
                invoice_number: line.invoice.invoice_number.clone(),
                place: line.invoice.place.clone(),
                quantity: line.invoice.quantity.clone(),
                ifa_amount: line.invoice.ifa_amount.clone(),
                status: line.status,
                returned_amount: line.returned_amount.clone(),
            })
            .collect();

        (acknowledgement, lines)
    }
}

/// Validate a batch of acknowledgement lines for a voucher and compute
/// its pending balance and overall status
///
/// Checks run in a fixed order and stop at the first violation: invoices
/// present, batch non-empty, then per line (reference, duplicate, status,
/// amount), then completeness, then the trip balance.
pub fn plan_acknowledgement(
    voucher: &Voucher,
    invoices: &[Invoice],
    inputs: &[AcknowledgementLineInput],
    validator: &dyn LineValidator,
) -> AckResult<ReconciliationPlan> {
    if invoices.is_empty() {
        return Err(AckError::NoInvoices(voucher.id));
    }

    if inputs.is_empty() {
        return Err(AckError::EmptyBatch);
    }

    let by_id: HashMap<InvoiceId, &Invoice> =
        invoices.iter().map(|invoice| (invoice.id, invoice)).collect();
    let mut seen = HashSet::with_capacity(inputs.len());
    let mut lines = Vec::with_capacity(inputs.len());

    for input in inputs {
        let invoice = by_id.get(&input.invoice_id).copied().ok_or(
            AckError::InvalidInvoiceReference {
                voucher_id: voucher.id,
                invoice_id: input.invoice_id,
            },
        )?;

        if !seen.insert(invoice.id) {
            return Err(AckError::DuplicateInvoiceInBatch {
                invoice_number: invoice.invoice_number.clone(),
            });
        }

        let status = parse_invoice_status(invoice, &input.status)?;
        validator.validate_line(invoice, status, &input.returned_amount)?;

        tracing::debug!(
            invoice_number = %invoice.invoice_number,
            status = %status,
            returned_amount = %input.returned_amount,
            "Line validated"
        );

        lines.push(ValidatedLine {
            invoice: invoice.clone(),
            status,
            returned_amount: input.returned_amount.clone(),
        });
    }

    // References are resolved and unique, so equal sizes mean equal sets
    if seen.len() != invoices.len() {
        let missing = invoices
            .iter()
            .filter(|invoice| !seen.contains(&invoice.id))
            .map(|invoice| invoice.invoice_number.clone())
            .collect();
        return Err(AckError::IncompleteBatch { missing });
    }

    let total_returned: BigDecimal = lines.iter().map(|line| &line.returned_amount).sum();
    let pending_amount = &voucher.trip_balance - &total_returned;

    if pending_amount < -acknowledged_overshoot(&lines) {
        return Err(AckError::ExceedsTripBalance {
            trip_balance: voucher.trip_balance.clone(),
            total_returned,
        });
    }

    let voucher_status = if lines
        .iter()
        .all(|line| line.status == InvoiceStatus::Acknowledged)
    {
        VoucherStatus::Settled
    } else {
        VoucherStatus::Pending
    };

    Ok(ReconciliationPlan {
        voucher: voucher.clone(),
        lines,
        total_returned,
        pending_amount,
        voucher_status,
    })
}

/// Amount by which fully acknowledged lines exceed their invoices
///
/// An acknowledged amount accepted within tolerance above its IFA amount may
/// push the total past the trip balance by at most this much.
fn acknowledged_overshoot(lines: &[ValidatedLine]) -> BigDecimal {
    let zero = BigDecimal::from(0);
    lines
        .iter()
        .filter(|line| line.status == InvoiceStatus::Acknowledged)
        .map(|line| &line.returned_amount - &line.invoice.ifa_amount)
        .filter(|excess| *excess > zero)
        .sum()
}
