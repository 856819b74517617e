//! Service layer

pub mod ledger;

pub use ledger::RequestLedger;
