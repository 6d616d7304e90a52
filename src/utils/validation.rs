//! Validation utilities

use bigdecimal::{BigDecimal, Zero};

use crate::traits::*;
use crate::types::*;

/// Check whether two amounts differ by at most `tolerance`
pub fn within_tolerance(amount: &BigDecimal, expected: &BigDecimal, tolerance: &BigDecimal) -> bool {
    (amount - expected).abs() <= *tolerance
}

/// Check whether an amount is exactly zero, whatever its scale
pub fn is_zero(amount: &BigDecimal) -> bool {
    amount.is_zero()
}

/// Validate that an invoice status label is one of the known statuses
pub fn parse_invoice_status(invoice: &Invoice, label: &str) -> AckResult<InvoiceStatus> {
    label.parse().map_err(|_| AckError::InvalidStatus {
        invoice_number: invoice.invoice_number.clone(),
        status: label.to_string(),
    })
}

/// Amount rules with exact decimal equality for full acknowledgements
///
/// Suitable when amounts reach the reconciler as decimals rather than
/// converted floating point values, where no tolerance is needed.
pub struct StrictLineValidator;

impl LineValidator for StrictLineValidator {
    fn validate_line(
        &self,
        invoice: &Invoice,
        status: InvoiceStatus,
        returned_amount: &BigDecimal,
    ) -> AckResult<()> {
        if status == InvoiceStatus::Acknowledged && *returned_amount != invoice.ifa_amount {
            return Err(amount_mismatch(
                invoice,
                status,
                returned_amount,
                "acknowledged amount must equal the IFA amount",
            ));
        }

        // Shortage and pending rules carry no tolerance
        DefaultLineValidator::new(BigDecimal::zero()).validate_line(invoice, status, returned_amount)
    }
}
