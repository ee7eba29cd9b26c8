//! Application layer containing the core business logic orchestration.
//!
//! `TransactionEngine` owns the transaction lifecycle state machine,
//! `MerchantDirectory` the administrative operations and the read-time charge totals,
//! and `PurgeScheduler` the periodic age-based cleanup. All of them reach storage only
//! through the ports in [`crate::domain::ports`].

pub mod directory;
pub mod engine;
pub mod purge;
