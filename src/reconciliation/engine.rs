//! Acknowledgement reconciler orchestrating validation and persistence

use tracing::{info, instrument, warn};

use crate::config::ReconcilerConfig;
use crate::reconciliation::rules::{plan_acknowledgement, ReconciliationPlan};
use crate::traits::*;
use crate::types::*;

/// Reconciles invoice acknowledgements against a loading-advance voucher
pub struct AcknowledgementReconciler<S: ReconciliationStorage> {
    storage: S,
    config: ReconcilerConfig,
    validator: Box<dyn LineValidator>,
}

impl<S: ReconciliationStorage> AcknowledgementReconciler<S> {
    /// Create a new reconciler with the given storage backend
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, ReconcilerConfig::default())
    }

    /// Create a new reconciler with custom configuration
    pub fn with_config(storage: S, config: ReconcilerConfig) -> Self {
        let validator = Box::new(DefaultLineValidator::new(config.amount_tolerance.clone()));
        Self {
            storage,
            config,
            validator,
        }
    }

    /// Create a new reconciler with a custom line validator
    pub fn with_validator(
        storage: S,
        config: ReconcilerConfig,
        validator: Box<dyn LineValidator>,
    ) -> Self {
        Self {
            storage,
            config,
            validator,
        }
    }

    /// The storage backend this reconciler writes to
    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Validate a batch and record the voucher's acknowledgement
    ///
    /// All validation happens before anything is written. The
    /// acknowledgement and its lines are then stored as one unit; the
    /// stored acknowledgement is returned.
    #[instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn reconcile(
        &self,
        voucher_id: VoucherId,
        lines: &[AcknowledgementLineInput],
    ) -> AckResult<Acknowledgement> {
        let plan = self.preview(voucher_id, lines).await?;
        let (acknowledgement, records) = plan.to_records();

        let stored = self
            .storage
            .insert_atomic(&acknowledgement, &records)
            .await
            .inspect_err(|e| warn!(code = e.code(), error = %e, "Acknowledgement not stored"))?;

        info!(
            acknowledgement_id = %stored.id,
            voucher_number = %stored.voucher_number,
            voucher_status = %stored.voucher_status,
            pending_amount = %stored.pending_amount,
            "Acknowledgement recorded"
        );

        Ok(stored)
    }

    /// Run every check `reconcile` runs and return the computed plan
    /// without writing anything
    #[instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn preview(
        &self,
        voucher_id: VoucherId,
        lines: &[AcknowledgementLineInput],
    ) -> AckResult<ReconciliationPlan> {
        self.prepare(voucher_id, lines)
            .await
            .inspect_err(|e| warn!(code = e.code(), error = %e, "Acknowledgement rejected"))
    }

    async fn prepare(
        &self,
        voucher_id: VoucherId,
        lines: &[AcknowledgementLineInput],
    ) -> AckResult<ReconciliationPlan> {
        let voucher = self
            .storage
            .get_voucher(voucher_id)
            .await?
            .ok_or(AckError::InvalidReference(voucher_id))?;

        if self.storage.exists_for_voucher(voucher_id).await? {
            return Err(AckError::DuplicateAcknowledgement(voucher_id));
        }

        let invoices = self.storage.list_invoices(voucher_id).await?;

        plan_acknowledgement(&voucher, &invoices, lines, self.validator.as_ref())
    }

    /// Get the acknowledgement recorded for a voucher with its invoice lines
    #[instrument(skip(self))]
    pub async fn acknowledgement_for_voucher(
        &self,
        voucher_id: VoucherId,
    ) -> AckResult<Option<AcknowledgementDetail>> {
        let Some(acknowledgement) = self.storage.find_for_voucher(voucher_id).await? else {
            return Ok(None);
        };

        let lines = self.storage.list_lines(acknowledgement.id).await?;

        Ok(Some(AcknowledgementDetail {
            acknowledgement,
            lines,
        }))
    }
}
