//! Integration tests for acknowledgement-core

use acknowledgement_core::{
    utils::MemoryStorage, AckError, AcknowledgementLineInput, AcknowledgementReconciler,
    AcknowledgementRequest, AcknowledgementStore, Invoice, InvoiceStatus, ReconcilerConfig,
    Voucher, VoucherStatus,
};
use bigdecimal::BigDecimal;
use std::collections::HashSet;
use std::str::FromStr;

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

/// Storage holding one voucher with invoices given as (id, ifa amount)
fn storage_with(voucher_id: i64, trip_balance: &str, invoices: &[(i64, &str)]) -> MemoryStorage {
    let storage = MemoryStorage::new();
    storage
        .add_voucher(Voucher::new(
            voucher_id,
            format!("LA-{voucher_id:04}"),
            dec(trip_balance),
        ))
        .unwrap();
    for (id, ifa) in invoices {
        storage
            .add_invoice(Invoice::new(
                *id,
                voucher_id,
                format!("INV-{id}"),
                "Chennai Port",
                dec("1"),
                dec(ifa),
            ))
            .unwrap();
    }
    storage
}

#[tokio::test]
async fn test_single_invoice_fully_acknowledged_settles_voucher() {
    let storage = storage_with(1, "1000", &[(100, "1000")]);
    let reconciler = AcknowledgementReconciler::new(storage.clone());

    let ack = reconciler
        .reconcile(1, &[AcknowledgementLineInput::acknowledged(100, dec("1000"))])
        .await
        .unwrap();

    assert_eq!(ack.voucher_status, VoucherStatus::Settled);
    assert_eq!(ack.pending_amount, dec("0"));
    assert_eq!(ack.voucher_number, "LA-0001");

    let snapshot = storage.snapshot().unwrap();
    assert_eq!(snapshot.acknowledgements, vec![ack]);
    assert_eq!(snapshot.lines.len(), 1);
}

#[tokio::test]
async fn test_shortage_and_pending_leave_balance_outstanding() {
    let storage = storage_with(2, "1000", &[(201, "600"), (202, "400")]);
    let reconciler = AcknowledgementReconciler::new(storage);

    let ack = reconciler
        .reconcile(
            2,
            &[
                AcknowledgementLineInput::shortage(201, dec("300")),
                AcknowledgementLineInput::pending(202),
            ],
        )
        .await
        .unwrap();

    assert_eq!(ack.voucher_status, VoucherStatus::Pending);
    assert_eq!(ack.pending_amount, dec("700"));
}

#[tokio::test]
async fn test_partial_amount_cannot_be_acknowledged() {
    let storage = storage_with(2, "1000", &[(201, "600"), (202, "400")]);
    let reconciler = AcknowledgementReconciler::new(storage);

    let result = reconciler
        .reconcile(
            2,
            &[
                AcknowledgementLineInput::acknowledged(201, dec("300")),
                AcknowledgementLineInput::pending(202),
            ],
        )
        .await;

    match result {
        Err(AckError::AmountMismatch {
            invoice_number,
            status,
            ..
        }) => {
            assert_eq!(invoice_number, "INV-201");
            assert_eq!(status, InvoiceStatus::Acknowledged);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_every_invoice_must_be_acknowledged() {
    let storage = storage_with(3, "1000", &[(301, "600"), (302, "400")]);
    let reconciler = AcknowledgementReconciler::new(storage);

    let result = reconciler
        .reconcile(3, &[AcknowledgementLineInput::acknowledged(301, dec("600"))])
        .await;

    assert!(matches!(result, Err(AckError::IncompleteBatch { .. })));
}

#[tokio::test]
async fn test_acknowledged_amount_tolerance() {
    let within = AcknowledgementReconciler::new(storage_with(4, "500", &[(401, "500")]));
    let ack = within
        .reconcile(4, &[AcknowledgementLineInput::acknowledged(401, dec("500.005"))])
        .await
        .unwrap();
    assert_eq!(ack.voucher_status, VoucherStatus::Settled);

    let beyond = AcknowledgementReconciler::new(storage_with(4, "500", &[(401, "500")]));
    let result = beyond
        .reconcile(4, &[AcknowledgementLineInput::acknowledged(401, dec("500.02"))])
        .await;
    assert!(matches!(result, Err(AckError::AmountMismatch { .. })));
}

#[tokio::test]
async fn test_returned_total_cannot_exceed_trip_balance() {
    let storage = storage_with(5, "100", &[(501, "150")]);
    let reconciler = AcknowledgementReconciler::new(storage.clone());

    let result = reconciler
        .reconcile(5, &[AcknowledgementLineInput::shortage(501, dec("120"))])
        .await;

    assert!(matches!(result, Err(AckError::ExceedsTripBalance { .. })));

    // Amount tolerance only covers acknowledged lines, not shortages
    let result = reconciler
        .reconcile(5, &[AcknowledgementLineInput::shortage(501, dec("100.005"))])
        .await;

    assert!(matches!(result, Err(AckError::ExceedsTripBalance { .. })));
    assert!(storage.snapshot().unwrap().acknowledgements.is_empty());
}

#[tokio::test]
async fn test_balance_identity_and_status_rule() {
    let storage = storage_with(
        6,
        "2500.75",
        &[(601, "1000"), (602, "800.50"), (603, "500"), (604, "200.25")],
    );
    let reconciler = AcknowledgementReconciler::new(storage);

    let ack = reconciler
        .reconcile(
            6,
            &[
                AcknowledgementLineInput::acknowledged(601, dec("1000")),
                AcknowledgementLineInput::shortage(602, dec("650.10")),
                AcknowledgementLineInput::acknowledged(603, dec("499.995")),
                AcknowledgementLineInput::pending(604),
            ],
        )
        .await
        .unwrap();

    let detail = reconciler
        .acknowledgement_for_voucher(6)
        .await
        .unwrap()
        .unwrap();
    let returned: BigDecimal = detail.lines.iter().map(|line| &line.returned_amount).sum();

    assert_eq!(&returned + &ack.pending_amount, dec("2500.75"));
    assert_eq!(ack.pending_amount, dec("350.655"));
    assert_eq!(ack.voucher_status, VoucherStatus::Pending);

    let invoice_ids: HashSet<i64> = detail.lines.iter().map(|line| line.invoice_id).collect();
    assert_eq!(invoice_ids, HashSet::from([601, 602, 603, 604]));
    assert_eq!(detail.lines.len(), 4);
}

#[tokio::test]
async fn test_second_acknowledgement_is_rejected_without_writes() {
    let storage = storage_with(7, "1000", &[(701, "1000")]);
    let reconciler = AcknowledgementReconciler::new(storage.clone());
    let lines = [AcknowledgementLineInput::acknowledged(701, dec("1000"))];

    reconciler.reconcile(7, &lines).await.unwrap();
    let before = storage.snapshot().unwrap();

    let result = reconciler.reconcile(7, &lines).await;

    assert!(matches!(result, Err(AckError::DuplicateAcknowledgement(7))));
    assert_eq!(storage.snapshot().unwrap(), before);
}

#[tokio::test]
async fn test_storage_rejects_duplicate_that_slipped_past_pre_check() {
    let storage = storage_with(8, "1000", &[(801, "1000")]);
    let reconciler = AcknowledgementReconciler::new(storage.clone());
    let lines = [AcknowledgementLineInput::acknowledged(801, dec("1000"))];

    // Two requests validated before either has written
    let first = reconciler.preview(8, &lines).await.unwrap();
    let second = reconciler.preview(8, &lines).await.unwrap();

    let (ack, records) = first.to_records();
    storage.insert_atomic(&ack, &records).await.unwrap();

    let (ack, records) = second.to_records();
    let result = storage.insert_atomic(&ack, &records).await;

    assert!(matches!(result, Err(AckError::DuplicateAcknowledgement(8))));
    assert_eq!(storage.snapshot().unwrap().acknowledgements.len(), 1);
}

#[tokio::test]
async fn test_invalid_batches_never_mutate_storage() {
    let storage = storage_with(9, "1000", &[(901, "600"), (902, "400")]);
    let reconciler = AcknowledgementReconciler::new(storage.clone());
    let before = storage.snapshot().unwrap();

    let batches: Vec<Vec<AcknowledgementLineInput>> = vec![
        vec![],
        vec![AcknowledgementLineInput::pending(999)],
        vec![
            AcknowledgementLineInput::pending(901),
            AcknowledgementLineInput::pending(901),
        ],
        vec![
            AcknowledgementLineInput::new(901, "Delivered", dec("600")),
            AcknowledgementLineInput::pending(902),
        ],
        vec![
            AcknowledgementLineInput::shortage(901, dec("600")),
            AcknowledgementLineInput::pending(902),
        ],
        vec![
            AcknowledgementLineInput::pending(901),
            AcknowledgementLineInput::new(902, "Pending", dec("5")),
        ],
        vec![AcknowledgementLineInput::pending(902)],
    ];

    for batch in &batches {
        assert!(reconciler.reconcile(9, batch).await.is_err());
        assert_eq!(storage.snapshot().unwrap(), before);
    }
}

#[tokio::test]
async fn test_voucher_preconditions() {
    let storage = storage_with(10, "1000", &[]);
    let reconciler = AcknowledgementReconciler::new(storage);

    let missing = reconciler
        .reconcile(11, &[AcknowledgementLineInput::pending(1)])
        .await;
    assert!(matches!(missing, Err(AckError::InvalidReference(11))));

    let no_invoices = reconciler
        .reconcile(10, &[AcknowledgementLineInput::pending(1)])
        .await;
    assert!(matches!(no_invoices, Err(AckError::NoInvoices(10))));
}

#[tokio::test]
async fn test_write_failure_rolls_back_and_can_be_retried() {
    let storage = storage_with(12, "1000", &[(1201, "600"), (1202, "400")]);
    let reconciler = AcknowledgementReconciler::new(storage.clone());
    let lines = [
        AcknowledgementLineInput::acknowledged(1201, dec("600")),
        AcknowledgementLineInput::acknowledged(1202, dec("400")),
    ];
    let before = storage.snapshot().unwrap();

    storage.fail_next_write();
    let err = reconciler.reconcile(12, &lines).await.unwrap_err();

    assert!(matches!(err, AckError::PersistenceFailure(_)));
    assert!(err.is_retryable());
    assert_eq!(storage.snapshot().unwrap(), before);

    let ack = reconciler.reconcile(12, &lines).await.unwrap();
    assert_eq!(ack.voucher_status, VoucherStatus::Settled);
    assert_eq!(storage.snapshot().unwrap().lines.len(), 2);
}

#[tokio::test]
async fn test_reconcile_from_client_request() {
    let storage = storage_with(13, "1000", &[(1301, "600"), (1302, "400")]);
    let reconciler = AcknowledgementReconciler::new(storage);

    let request: AcknowledgementRequest = serde_json::from_str(
        r#"{
            "loading_advance_id": 13,
            "invoices": [
                {"loading_advance_invoice_id": 1301, "status": "Shortage", "returned_amount": "550.50"},
                {"invoice_id": 1302, "status": "pending"}
            ]
        }"#,
    )
    .unwrap();
    let (voucher_id, lines) = request.into_parts();

    let ack = reconciler.reconcile(voucher_id, &lines).await.unwrap();

    assert_eq!(ack.pending_amount, dec("449.50"));
    assert_eq!(ack.voucher_status, VoucherStatus::Pending);
}

#[tokio::test]
async fn test_custom_tolerance_configuration() {
    let storage = storage_with(14, "500", &[(1401, "500")]);
    let config = ReconcilerConfig::default().with_tolerance_str("0.5").unwrap();
    let reconciler = AcknowledgementReconciler::with_config(storage, config);

    let ack = reconciler
        .reconcile(14, &[AcknowledgementLineInput::acknowledged(1401, dec("499.6"))])
        .await
        .unwrap();

    assert_eq!(ack.pending_amount, dec("0.4"));
    assert_eq!(ack.voucher_status, VoucherStatus::Settled);
}

#[test]
fn test_only_write_failures_are_retryable() {
    assert!(AckError::PersistenceFailure("timeout".to_string()).is_retryable());
    assert!(!AckError::EmptyBatch.is_retryable());
    assert!(!AckError::DuplicateAcknowledgement(1).is_retryable());
    assert_eq!(AckError::EmptyBatch.code(), "empty_batch");
    assert_eq!(
        AckError::IncompleteBatch {
            missing: vec!["INV-1".to_string(), "INV-2".to_string()]
        }
        .to_string(),
        "Every invoice of the voucher must be acknowledged; missing: INV-1, INV-2"
    );
}
