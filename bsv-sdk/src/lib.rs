#![deny(missing_docs)]

//! BSV Blockchain SDK - Transaction fee toolkit.
//!
//! Re-exports the script, transaction and fee-building components for
//! convenient single-crate usage.

pub use bsv_primitives as primitives;
pub use bsv_script as script;
pub use bsv_transaction as transaction;
pub use bsv_txbuilder as txbuilder;
