//! Core types and data structures for voucher acknowledgements

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a loading-advance voucher
pub type VoucherId = i64;

/// Identifier of an invoice raised under a voucher
pub type InvoiceId = i64;

/// Settlement state of a single invoice within an acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceStatus {
    /// The full IFA amount came back
    Acknowledged,
    /// Part of the IFA amount came back
    Shortage,
    /// Nothing has come back yet
    Pending,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Acknowledged => "Acknowledged",
            InvoiceStatus::Shortage => "Shortage",
            InvoiceStatus::Pending => "Pending",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = ();

    /// Labels are matched case-insensitively, surrounding whitespace ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        if label.eq_ignore_ascii_case("acknowledged") {
            Ok(InvoiceStatus::Acknowledged)
        } else if label.eq_ignore_ascii_case("shortage") {
            Ok(InvoiceStatus::Shortage)
        } else if label.eq_ignore_ascii_case("pending") {
            Ok(InvoiceStatus::Pending)
        } else {
            Err(())
        }
    }
}

/// Overall settlement state of a voucher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoucherStatus {
    /// Every invoice was acknowledged in full
    Settled,
    /// At least one invoice is short or outstanding
    Pending,
}

impl VoucherStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoucherStatus::Settled => "Settled",
            VoucherStatus::Pending => "Pending",
        }
    }
}

impl fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for VoucherStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Settled" => Ok(VoucherStatus::Settled),
            "Pending" => Ok(VoucherStatus::Pending),
            _ => Err(()),
        }
    }
}

/// Loading-advance voucher for a single trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: VoucherId,
    pub voucher_number: String,
    /// Total amount advanced for the trip, recoverable through invoices
    pub trip_balance: BigDecimal,
}

impl Voucher {
    pub fn new(id: VoucherId, voucher_number: impl Into<String>, trip_balance: BigDecimal) -> Self {
        Self {
            id,
            voucher_number: voucher_number.into(),
            trip_balance,
        }
    }
}

/// Invoice delivered under a voucher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub voucher_id: VoucherId,
    pub invoice_number: String,
    /// Destination place of the delivery
    pub place: String,
    pub quantity: BigDecimal,
    /// Amount expected to be returned for this invoice
    pub ifa_amount: BigDecimal,
}

impl Invoice {
    pub fn new(
        id: InvoiceId,
        voucher_id: VoucherId,
        invoice_number: impl Into<String>,
        place: impl Into<String>,
        quantity: BigDecimal,
        ifa_amount: BigDecimal,
    ) -> Self {
        Self {
            id,
            voucher_id,
            invoice_number: invoice_number.into(),
            place: place.into(),
            quantity,
            ifa_amount,
        }
    }
}

/// Caller-supplied acknowledgement for one invoice
///
/// The status is kept as the caller's label and parsed during validation,
/// so an unknown label is reported against the line it arrived on.
#[derive(Debug, Clone, PartialEq)]
pub struct AcknowledgementLineInput {
    pub invoice_id: InvoiceId,
    pub status: String,
    pub returned_amount: BigDecimal,
}

impl AcknowledgementLineInput {
    pub fn new(invoice_id: InvoiceId, status: impl Into<String>, returned_amount: BigDecimal) -> Self {
        Self {
            invoice_id,
            status: status.into(),
            returned_amount,
        }
    }

    /// Full return of the invoice amount
    pub fn acknowledged(invoice_id: InvoiceId, returned_amount: BigDecimal) -> Self {
        Self::new(invoice_id, InvoiceStatus::Acknowledged.as_str(), returned_amount)
    }

    /// Partial return of the invoice amount
    pub fn shortage(invoice_id: InvoiceId, returned_amount: BigDecimal) -> Self {
        Self::new(invoice_id, InvoiceStatus::Shortage.as_str(), returned_amount)
    }

    /// Nothing returned yet
    pub fn pending(invoice_id: InvoiceId) -> Self {
        Self::new(invoice_id, InvoiceStatus::Pending.as_str(), BigDecimal::from(0))
    }
}

/// Persisted acknowledgement of a voucher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub id: Uuid,
    pub voucher_id: VoucherId,
    /// Voucher number at the time of acknowledgement
    pub voucher_number: String,
    pub voucher_status: VoucherStatus,
    /// Trip balance less everything returned
    pub pending_amount: BigDecimal,
    pub created_at: NaiveDateTime,
}

/// Persisted acknowledgement row for one invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcknowledgementInvoiceLine {
    pub id: Uuid,
    pub acknowledgement_id: Uuid,
    pub invoice_id: InvoiceId,
    pub invoice_number: String,
    pub place: String,
    pub quantity: BigDecimal,
    pub ifa_amount: BigDecimal,
    pub status: InvoiceStatus,
    pub returned_amount: BigDecimal,
}

/// An acknowledgement together with its invoice lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcknowledgementDetail {
    pub acknowledgement: Acknowledgement,
    pub lines: Vec<AcknowledgementInvoiceLine>,
}

/// Errors that can occur while reconciling an acknowledgement
#[derive(Debug, thiserror::Error)]
pub enum AckError {
    #[error("Voucher not found: {0}")]
    InvalidReference(VoucherId),
    #[error("Voucher {0} has no invoices")]
    NoInvoices(VoucherId),
    #[error("Acknowledgement already exists for voucher {0}")]
    DuplicateAcknowledgement(VoucherId),
    #[error("At least one invoice acknowledgement is required")]
    EmptyBatch,
    #[error("Invoice {invoice_id} does not belong to voucher {voucher_id}")]
    InvalidInvoiceReference {
        voucher_id: VoucherId,
        invoice_id: InvoiceId,
    },
    #[error("Invoice {invoice_number} appears more than once in the batch")]
    DuplicateInvoiceInBatch { invoice_number: String },
    #[error("Invalid status '{status}' for invoice {invoice_number}")]
    InvalidStatus {
        invoice_number: String,
        status: String,
    },
    #[error("Invoice {invoice_number}: {reason} (IFA amount {ifa_amount}, returned {returned_amount})")]
    AmountMismatch {
        invoice_number: String,
        status: InvoiceStatus,
        ifa_amount: BigDecimal,
        returned_amount: BigDecimal,
        reason: &'static str,
    },
    #[error("Every invoice of the voucher must be acknowledged; missing: {}", .missing.join(", "))]
    IncompleteBatch { missing: Vec<String> },
    #[error("Total returned {total_returned} exceeds trip balance {trip_balance}")]
    ExceedsTripBalance {
        trip_balance: BigDecimal,
        total_returned: BigDecimal,
    },
    #[error("Failed to persist acknowledgement: {0}")]
    PersistenceFailure(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AckError {
    /// Stable machine-readable code for adapters
    pub fn code(&self) -> &'static str {
        match self {
            AckError::InvalidReference(_) => "invalid_reference",
            AckError::NoInvoices(_) => "no_invoices",
            AckError::DuplicateAcknowledgement(_) => "duplicate_acknowledgement",
            AckError::EmptyBatch => "empty_batch",
            AckError::InvalidInvoiceReference { .. } => "invalid_invoice_reference",
            AckError::DuplicateInvoiceInBatch { .. } => "duplicate_invoice_in_batch",
            AckError::InvalidStatus { .. } => "invalid_status",
            AckError::AmountMismatch { .. } => "amount_mismatch",
            AckError::IncompleteBatch { .. } => "incomplete_batch",
            AckError::ExceedsTripBalance { .. } => "exceeds_trip_balance",
            AckError::PersistenceFailure(_) => "persistence_failure",
            AckError::Storage(_) => "storage",
            AckError::Configuration(_) => "configuration",
        }
    }

    /// Whether retrying with the same input may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, AckError::PersistenceFailure(_) | AckError::Storage(_))
    }
}

/// Result type for acknowledgement operations
pub type AckResult<T> = Result<T, AckError>;
