/// BSV Blockchain SDK - Transaction container and serialization.
///
/// Provides the Transaction type with inputs, outputs, output removal and
/// binary/hex serialization used by fee estimation.

pub mod transaction;
pub mod input;
pub mod output;

mod error;
pub use error::TransactionError;
pub use transaction::Transaction;
pub use input::TransactionInput;
pub use output::TransactionOutput;

#[cfg(test)]
mod tests;
