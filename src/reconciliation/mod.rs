//! Reconciliation of invoice acknowledgements against loading-advance vouchers

pub mod engine;
pub mod rules;

pub use engine::*;
pub use rules::*;
