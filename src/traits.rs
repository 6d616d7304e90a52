//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::types::*;
use crate::utils::validation::{is_zero, within_tolerance};

/// Read access to loading-advance vouchers
#[async_trait]
pub trait VoucherStore: Send + Sync {
    /// Get a voucher by ID
    async fn get_voucher(&self, voucher_id: VoucherId) -> AckResult<Option<Voucher>>;
}

/// Read access to the invoices raised under a voucher
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// List a voucher's invoices in a stable order (empty if none)
    async fn list_invoices(&self, voucher_id: VoucherId) -> AckResult<Vec<Invoice>>;
}

/// Storage for acknowledgements and their invoice lines
///
/// Implementations must reject a second acknowledgement for the same
/// voucher with [`AckError::DuplicateAcknowledgement`], independently of
/// any check done by the caller beforehand.
#[async_trait]
pub trait AcknowledgementStore: Send + Sync {
    /// Check whether the voucher already has an acknowledgement
    async fn exists_for_voucher(&self, voucher_id: VoucherId) -> AckResult<bool>;

    /// Write the acknowledgement and all its lines as a single unit
    ///
    /// Either everything is stored or nothing is. Write failures are
    /// reported as [`AckError::PersistenceFailure`].
    async fn insert_atomic(
        &self,
        acknowledgement: &Acknowledgement,
        lines: &[AcknowledgementInvoiceLine],
    ) -> AckResult<Acknowledgement>;

    /// Get the acknowledgement recorded for a voucher
    async fn find_for_voucher(&self, voucher_id: VoucherId) -> AckResult<Option<Acknowledgement>>;

    /// List the invoice lines of an acknowledgement
    async fn list_lines(&self, acknowledgement_id: Uuid) -> AckResult<Vec<AcknowledgementInvoiceLine>>;
}

/// Everything the reconciler needs from a storage backend
pub trait ReconciliationStorage: VoucherStore + InvoiceStore + AcknowledgementStore {}

impl<T: VoucherStore + InvoiceStore + AcknowledgementStore> ReconciliationStorage for T {}

/// Trait for implementing the amount rule applied to each acknowledged invoice
pub trait LineValidator: Send + Sync {
    /// Check the returned amount against the invoice for the given status
    fn validate_line(
        &self,
        invoice: &Invoice,
        status: InvoiceStatus,
        returned_amount: &BigDecimal,
    ) -> AckResult<()>;
}

/// Default amount rules with an absolute tolerance for full acknowledgements
pub struct DefaultLineValidator {
    tolerance: BigDecimal,
}

impl DefaultLineValidator {
    pub fn new(tolerance: BigDecimal) -> Self {
        Self { tolerance }
    }
}

impl Default for DefaultLineValidator {
    fn default() -> Self {
        Self::new(crate::config::default_amount_tolerance())
    }
}

impl LineValidator for DefaultLineValidator {
    fn validate_line(
        &self,
        invoice: &Invoice,
        status: InvoiceStatus,
        returned_amount: &BigDecimal,
    ) -> AckResult<()> {
        let zero = BigDecimal::from(0);
        let violation = match status {
            InvoiceStatus::Acknowledged => {
                if within_tolerance(returned_amount, &invoice.ifa_amount, &self.tolerance) {
                    None
                } else {
                    Some("acknowledged amount must equal the IFA amount")
                }
            }
            InvoiceStatus::Shortage => {
                if *returned_amount > zero && *returned_amount < invoice.ifa_amount {
                    None
                } else {
                    Some("shortage amount must be greater than zero and less than the IFA amount")
                }
            }
            InvoiceStatus::Pending => {
                if is_zero(returned_amount) {
                    None
                } else {
                    Some("pending invoices cannot have a returned amount")
                }
            }
        };

        match violation {
            None => Ok(()),
            Some(reason) => Err(amount_mismatch(invoice, status, returned_amount, reason)),
        }
    }
}

pub(crate) fn amount_mismatch(
    invoice: &Invoice,
    status: InvoiceStatus,
    returned_amount: &BigDecimal,
    reason: &'static str,
) -> AckError {
    AckError::AmountMismatch {
        invoice_number: invoice.invoice_number.clone(),
        status,
        ifa_amount: invoice.ifa_amount.clone(),
        returned_amount: returned_amount.clone(),
        reason,
    }
}
