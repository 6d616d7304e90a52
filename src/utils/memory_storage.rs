//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;

#[derive(Debug, Clone, Default, PartialEq)]
struct Tables {
    vouchers: BTreeMap<VoucherId, Voucher>,
    invoices: BTreeMap<InvoiceId, Invoice>,
    acknowledgements: Vec<Acknowledgement>,
    lines: Vec<AcknowledgementInvoiceLine>,
}

/// Point-in-time copy of everything held by a [`MemoryStorage`]
#[derive(Debug, Clone, PartialEq)]
pub struct MemorySnapshot {
    pub vouchers: Vec<Voucher>,
    pub invoices: Vec<Invoice>,
    pub acknowledgements: Vec<Acknowledgement>,
    pub lines: Vec<AcknowledgementInvoiceLine>,
}

/// In-memory storage implementation for testing and development
///
/// Clones share the same tables. Writes go to a staged copy that replaces
/// the tables only once every record has been applied.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    tables: Arc<RwLock<Tables>>,
    fail_next_write: Arc<AtomicBool>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AckResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| AckError::Storage("memory storage lock poisoned".to_string()))
    }

    fn write(&self) -> AckResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| AckError::Storage("memory storage lock poisoned".to_string()))
    }

    /// Add a voucher
    pub fn add_voucher(&self, voucher: Voucher) -> AckResult<()> {
        self.write()?.vouchers.insert(voucher.id, voucher);
        Ok(())
    }

    /// Add an invoice under an existing voucher
    pub fn add_invoice(&self, invoice: Invoice) -> AckResult<()> {
        let mut tables = self.write()?;
        if !tables.vouchers.contains_key(&invoice.voucher_id) {
            return Err(AckError::InvalidReference(invoice.voucher_id));
        }
        tables.invoices.insert(invoice.id, invoice);
        Ok(())
    }

    /// Make the next `insert_atomic` that stages a line fail
    ///
    /// The failure is raised once the first line has been staged, so nothing
    /// is committed. A call with no lines leaves it armed.
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    /// Copy out the current contents
    pub fn snapshot(&self) -> AckResult<MemorySnapshot> {
        let tables = self.read()?;
        Ok(MemorySnapshot {
            vouchers: tables.vouchers.values().cloned().collect(),
            invoices: tables.invoices.values().cloned().collect(),
            acknowledgements: tables.acknowledgements.clone(),
            lines: tables.lines.clone(),
        })
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> AckResult<()> {
        *self.write()? = Tables::default();
        Ok(())
    }
}

#[async_trait]
impl VoucherStore for MemoryStorage {
    async fn get_voucher(&self, voucher_id: VoucherId) -> AckResult<Option<Voucher>> {
        Ok(self.read()?.vouchers.get(&voucher_id).cloned())
    }
}

#[async_trait]
impl InvoiceStore for MemoryStorage {
    async fn list_invoices(&self, voucher_id: VoucherId) -> AckResult<Vec<Invoice>> {
        Ok(self
            .read()?
            .invoices
            .values()
            .filter(|invoice| invoice.voucher_id == voucher_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AcknowledgementStore for MemoryStorage {
    async fn exists_for_voucher(&self, voucher_id: VoucherId) -> AckResult<bool> {
        Ok(self
            .read()?
            .acknowledgements
            .iter()
            .any(|ack| ack.voucher_id == voucher_id))
    }

    async fn insert_atomic(
        &self,
        acknowledgement: &Acknowledgement,
        lines: &[AcknowledgementInvoiceLine],
    ) -> AckResult<Acknowledgement> {
        let mut tables = self.write()?;

        // Unique voucher reference, checked under the write lock
        if tables
            .acknowledgements
            .iter()
            .any(|ack| ack.voucher_id == acknowledgement.voucher_id)
        {
            return Err(AckError::DuplicateAcknowledgement(acknowledgement.voucher_id));
        }

        let mut staged = tables.clone();
        staged.acknowledgements.push(acknowledgement.clone());

        for line in lines {
            if line.acknowledgement_id != acknowledgement.id {
                return Err(AckError::PersistenceFailure(format!(
                    "line {} does not belong to acknowledgement {}",
                    line.id, acknowledgement.id
                )));
            }
            staged.lines.push(line.clone());

            if self.fail_next_write.swap(false, Ordering::SeqCst) {
                return Err(AckError::PersistenceFailure(
                    "simulated write failure".to_string(),
                ));
            }
        }

        *tables = staged;
        Ok(acknowledgement.clone())
    }

    async fn find_for_voucher(&self, voucher_id: VoucherId) -> AckResult<Option<Acknowledgement>> {
        Ok(self
            .read()?
            .acknowledgements
            .iter()
            .find(|ack| ack.voucher_id == voucher_id)
            .cloned())
    }

    async fn list_lines(&self, acknowledgement_id: Uuid) -> AckResult<Vec<AcknowledgementInvoiceLine>> {
        Ok(self
            .read()?
            .lines
            .iter()
            .filter(|line| line.acknowledgement_id == acknowledgement_id)
            .cloned()
            .collect())
    }
}
