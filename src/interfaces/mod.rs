//! Batch adapters: CSV readers for inbound rows, a runner that feeds them to the
//! application layer, and a JSON report of the resulting state.

pub mod batch;
pub mod csv;
pub mod report;
