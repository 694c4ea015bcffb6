/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The transaction structure is invalid (e.g. an output index out of
    /// range).
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
}
