//! Walk through acknowledging a loading-advance voucher
//!
//! Run with `RUST_LOG=debug` to see each validated line.

use acknowledgement_core::{
    utils::MemoryStorage, AckResult, AcknowledgementLineInput, AcknowledgementReconciler,
    Invoice, ReconcilerConfig, Voucher,
};
use bigdecimal::BigDecimal;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

fn amount(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).expect("valid decimal literal")
}

#[tokio::main]
async fn main() -> AckResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Voucher Acknowledgement Example ===\n");

    let storage = MemoryStorage::new();
    storage.add_voucher(Voucher::new(1, "LA-2024-0001", amount("15000")))?;
    storage.add_invoice(Invoice::new(
        101,
        1,
        "INV-7781",
        "Coimbatore",
        amount("12.5"),
        amount("9000"),
    ))?;
    storage.add_invoice(Invoice::new(
        102,
        1,
        "INV-7782",
        "Tiruppur",
        amount("6"),
        amount("4500"),
    ))?;
    storage.add_invoice(Invoice::new(
        103,
        1,
        "INV-7783",
        "Palladam",
        amount("2"),
        amount("1500"),
    ))?;

    let reconciler = AcknowledgementReconciler::with_config(storage, ReconcilerConfig::from_env()?);

    let lines = vec![
        AcknowledgementLineInput::acknowledged(101, amount("9000")),
        AcknowledgementLineInput::shortage(102, amount("4200")),
        AcknowledgementLineInput::pending(103),
    ];

    // An incomplete batch is rejected before anything is written
    if let Err(e) = reconciler.preview(1, &lines[..2]).await {
        println!("Rejected partial batch: {e}\n");
    }

    let plan = reconciler.preview(1, &lines).await?;
    println!("Preview:");
    println!("  Total returned: ₹{}", plan.total_returned);
    println!("  Pending amount: ₹{}", plan.pending_amount);
    println!("  Voucher status: {}\n", plan.voucher_status);

    let ack = reconciler.reconcile(1, &lines).await?;
    println!("Recorded acknowledgement {} for {}", ack.id, ack.voucher_number);

    if let Some(detail) = reconciler.acknowledgement_for_voucher(1).await? {
        for line in &detail.lines {
            println!(
                "  {:<10} {:<12} {:<13} IFA ₹{:<8} returned ₹{}",
                line.invoice_number, line.place, line.status, line.ifa_amount, line.returned_amount
            );
        }
    }

    match reconciler.reconcile(1, &lines).await {
        Err(e) => println!("\nSecond attempt: {e}"),
        Ok(_) => println!("\nSecond attempt unexpectedly succeeded"),
    }

    Ok(())
}
