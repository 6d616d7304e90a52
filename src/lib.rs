//! # Acknowledgement Core
//!
//! Acknowledgement reconciliation for loading-advance vouchers in a
//! transport back office.
//!
//! ## Features
//!
//! - **Per-invoice validation**: status-dependent rules on returned amounts
//! - **Batch completeness**: every invoice of a voucher is acknowledged exactly once
//! - **Pending balance**: trip balance netted against everything returned
//! - **Voucher status**: `Settled` only when every invoice is fully acknowledged
//! - **Atomic persistence**: the acknowledgement and its lines are stored together or not at all
//! - **Storage abstraction**: trait-based stores, with in-memory and PostgreSQL (`postgres` feature) backends
//!
//! ## Quick Start
//!
//! ```rust
//! use acknowledgement_core::{
//!     utils::MemoryStorage, AcknowledgementLineInput, AcknowledgementReconciler, Invoice,
//!     Voucher, VoucherStatus,
//! };
//! use bigdecimal::BigDecimal;
//!
//! # tokio_test_block(async {
//! let storage = MemoryStorage::new();
//! storage.add_voucher(Voucher::new(1, "LA-001", BigDecimal::from(1000))).unwrap();
//! storage
//!     .add_invoice(Invoice::new(10, 1, "INV-10", "Salem", BigDecimal::from(2), BigDecimal::from(1000)))
//!     .unwrap();
//!
//! let reconciler = AcknowledgementReconciler::new(storage);
//! let ack = reconciler
//!     .reconcile(1, &[AcknowledgementLineInput::acknowledged(10, BigDecimal::from(1000))])
//!     .await
//!     .unwrap();
//!
//! assert_eq!(ack.voucher_status, VoucherStatus::Settled);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

pub mod config;
pub mod input;
pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use input::*;
pub use reconciliation::*;
pub use traits::*;
pub use types::*;
