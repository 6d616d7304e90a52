//! PostgreSQL storage implementation

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::traits::*;
use crate::types::*;

const ACKNOWLEDGEMENT_UNIQUE_VOUCHER: &str = "acknowledgements_loading_advance_id_key";

/// PostgreSQL-backed storage for vouchers, invoices and acknowledgements
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Connect a new pool using the given settings
    #[instrument(skip(config))]
    pub async fn connect(config: &DatabaseConfig) -> AckResult<Self> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.url)
            .await
            .map_err(|e| AckError::Storage(format!("Failed to connect: {e}")))?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> AckResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AckError::Storage(format!("Migration failed: {e}")))?;
        info!("Database migrations completed");
        Ok(())
    }
}

fn storage_error(context: &str, e: sqlx::Error) -> AckError {
    AckError::Storage(format!("{context}: {e}"))
}

fn decode_error(column: &str, value: &str) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: format!("unexpected value '{value}'").into(),
    }
}

fn acknowledgement_from_row(row: &PgRow) -> Result<Acknowledgement, sqlx::Error> {
    let status: String = row.try_get("voucher_status")?;
    Ok(Acknowledgement {
        id: row.try_get("id")?,
        voucher_id: row.try_get("loading_advance_id")?,
        voucher_number: row.try_get("voucher_number")?,
        voucher_status: status
            .parse()
            .map_err(|_| decode_error("voucher_status", &status))?,
        pending_amount: row.try_get("voucher_pending_amount")?,
        created_at: row.try_get("created_at")?,
    })
}

fn line_from_row(row: &PgRow) -> Result<AcknowledgementInvoiceLine, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(AcknowledgementInvoiceLine {
        id: row.try_get("id")?,
        acknowledgement_id: row.try_get("acknowledgement_id")?,
        invoice_id: row.try_get("loading_advance_invoice_id")?,
        invoice_number: row.try_get("invoice_number")?,
        place: row.try_get("place")?,
        quantity: row.try_get("quantity")?,
        ifa_amount: row.try_get("ifa_amount")?,
        status: status.parse().map_err(|_| decode_error("status", &status))?,
        returned_amount: row.try_get("returned_amount")?,
    })
}

#[async_trait]
impl VoucherStore for PgStorage {
    #[instrument(skip(self))]
    async fn get_voucher(&self, voucher_id: VoucherId) -> AckResult<Option<Voucher>> {
        let row = sqlx::query(
            "SELECT id, voucher_number, trip_balance FROM loading_advances WHERE id = $1",
        )
        .bind(voucher_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to get voucher", e))?;

        row.map(|row| {
            Ok::<_, sqlx::Error>(Voucher {
                id: row.try_get("id")?,
                voucher_number: row.try_get("voucher_number")?,
                trip_balance: row.try_get("trip_balance")?,
            })
        })
        .transpose()
        .map_err(|e| storage_error("Failed to decode voucher", e))
    }
}

#[async_trait]
impl InvoiceStore for PgStorage {
    #[instrument(skip(self))]
    async fn list_invoices(&self, voucher_id: VoucherId) -> AckResult<Vec<Invoice>> {
        let rows = sqlx::query(
            r#"
            SELECT id, loading_advance_id, invoice_number, place, quantity, ifa_amount
            FROM loading_advance_invoices
            WHERE loading_advance_id = $1
            ORDER BY id
            "#,
        )
        .bind(voucher_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to list invoices", e))?;

        rows.iter()
            .map(|row| {
                Ok::<_, sqlx::Error>(Invoice {
                    id: row.try_get("id")?,
                    voucher_id: row.try_get("loading_advance_id")?,
                    invoice_number: row.try_get("invoice_number")?,
                    place: row.try_get("place")?,
                    quantity: row.try_get("quantity")?,
                    ifa_amount: row.try_get("ifa_amount")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| storage_error("Failed to decode invoice", e))
    }
}

#[async_trait]
impl AcknowledgementStore for PgStorage {
    #[instrument(skip(self))]
    async fn exists_for_voucher(&self, voucher_id: VoucherId) -> AckResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM acknowledgements WHERE loading_advance_id = $1)",
        )
        .bind(voucher_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to check acknowledgement", e))
    }

    #[instrument(skip_all, fields(voucher_id = acknowledgement.voucher_id, line_count = lines.len()))]
    async fn insert_atomic(
        &self,
        acknowledgement: &Acknowledgement,
        lines: &[AcknowledgementInvoiceLine],
    ) -> AckResult<Acknowledgement> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AckError::PersistenceFailure(format!("Failed to begin transaction: {e}"))
        })?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO acknowledgements (id, loading_advance_id, voucher_number, voucher_status, voucher_pending_amount, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, loading_advance_id, voucher_number, voucher_status, voucher_pending_amount, created_at
            "#,
        )
        .bind(acknowledgement.id)
        .bind(acknowledgement.voucher_id)
        .bind(&acknowledgement.voucher_number)
        .bind(acknowledgement.voucher_status.as_str())
        .bind(&acknowledgement.pending_amount)
        .bind(acknowledgement.created_at)
        .fetch_one(&mut *tx)
        .await;

        let stored = match inserted {
            Ok(row) => acknowledgement_from_row(&row),
            Err(sqlx::Error::Database(ref db_err))
                if db_err.is_unique_violation()
                    && db_err.constraint() == Some(ACKNOWLEDGEMENT_UNIQUE_VOUCHER) =>
            {
                // Another request acknowledged this voucher after our pre-check
                tx.rollback().await.ok();
                return Err(AckError::DuplicateAcknowledgement(acknowledgement.voucher_id));
            }
            Err(e) => Err(e),
        };

        let stored = match stored {
            Ok(stored) => stored,
            Err(e) => {
                tx.rollback().await.ok();
                return Err(AckError::PersistenceFailure(format!(
                    "Failed to insert acknowledgement: {e}"
                )));
            }
        };

        for line in lines {
            let result = sqlx::query(
                r#"
                INSERT INTO acknowledgement_invoices (id, acknowledgement_id, loading_advance_invoice_id, invoice_number, place, quantity, ifa_amount, status, returned_amount)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(line.id)
            .bind(line.acknowledgement_id)
            .bind(line.invoice_id)
            .bind(&line.invoice_number)
            .bind(&line.place)
            .bind(&line.quantity)
            .bind(&line.ifa_amount)
            .bind(line.status.as_str())
            .bind(&line.returned_amount)
            .execute(&mut *tx)
            .await;

            if let Err(e) = result {
                tx.rollback().await.ok();
                return Err(AckError::PersistenceFailure(format!(
                    "Failed to insert invoice {}: {e}",
                    line.invoice_number
                )));
            }
        }

        tx.commit().await.map_err(|e| {
            AckError::PersistenceFailure(format!("Failed to commit transaction: {e}"))
        })?;

        info!(acknowledgement_id = %stored.id, "Acknowledgement persisted");

        Ok(stored)
    }

    #[instrument(skip(self))]
    async fn find_for_voucher(&self, voucher_id: VoucherId) -> AckResult<Option<Acknowledgement>> {
        let row = sqlx::query(
            r#"
            SELECT id, loading_advance_id, voucher_number, voucher_status, voucher_pending_amount, created_at
            FROM acknowledgements
            WHERE loading_advance_id = $1
            "#,
        )
        .bind(voucher_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to get acknowledgement", e))?;

        row.as_ref()
            .map(acknowledgement_from_row)
            .transpose()
            .map_err(|e| storage_error("Failed to decode acknowledgement", e))
    }

    #[instrument(skip(self))]
    async fn list_lines(&self, acknowledgement_id: Uuid) -> AckResult<Vec<AcknowledgementInvoiceLine>> {
        let rows = sqlx::query(
            r#"
            SELECT id, acknowledgement_id, loading_advance_invoice_id, invoice_number, place, quantity, ifa_amount, status, returned_amount
            FROM acknowledgement_invoices
            WHERE acknowledgement_id = $1
            ORDER BY position
            "#,
        )
        .bind(acknowledgement_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to list acknowledgement lines", e))?;

        rows.iter()
            .map(line_from_row)
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| storage_error("Failed to decode acknowledgement line", e))
    }
}
