use std::fmt;

use bsv_script::Script;

/// Error types for declaration encoding and decoding.
#[derive(Debug, thiserror::Error)]
pub enum DeclarationError {
    /// A matched protocol's body has too few items.
    #[error("malformed message: {0}")]
    MalformedMessage(String),
    /// A matched protocol's body has a version this codec does not read.
    #[error("unsupported version: {0}")]
    UnsupportedVersion(i64),
    /// The script is not an envelope container.
    #[error("not an envelope: {0}")]
    NotEnvelope(String),
    /// A payload item failed to decode as a script number.
    #[error("script error: {0}")]
    Script(#[from] bsv_script::ScriptError),
}

/// Why the reconciler could not take the requested fee from change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shortfall {
    /// The transaction has no change output.
    NoChange,
    /// The change output holds less than the fee increase.
    NotEnoughChange,
    /// The reduced change would be dust and the caller added it.
    ChangeBelowDust,
}

impl fmt::Display for Shortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shortfall::NoChange => write!(f, "no existing change for tx fee"),
            Shortfall::NotEnoughChange => write!(f, "not enough change for tx fee"),
            Shortfall::ChangeBelowDust => {
                write!(f, "change below dust and not added by fee adjustment")
            }
        }
    }
}

/// Error types for fee estimation and reconciliation.
#[derive(Debug, thiserror::Error)]
pub enum TxBuilderError {
    /// The locking script matches no template with a known unlocking size.
    #[error("unrecognized script template: {script}")]
    UnrecognizedTemplate {
        /// The script that failed to classify.
        script: Script,
    },

    /// An input's spent output is unknown and no usable declaration exists.
    #[error("missing unlocking data for input {input}: {detail}")]
    MissingDeclaration {
        /// Index of the input.
        input: usize,
        /// What was missing or malformed.
        detail: String,
    },

    /// The fee cannot be taken from change without breaking dust or
    /// provenance rules.
    #[error("insufficient value: {reason} (change {change}, required {required})")]
    InsufficientValue {
        /// Which rule failed.
        reason: Shortfall,
        /// Value of the change output, 0 when there is none.
        change: u64,
        /// Amount the reconciler needed.
        required: u64,
    },

    /// Change must be created but no change script is configured.
    #[error("change address needed: {remaining} remaining")]
    ChangeAddressNeeded {
        /// Value that would have gone to change.
        remaining: u64,
    },

    /// A size or value sum does not fit its integer type.
    #[error("arithmetic overflow: {0}")]
    Overflow(String),

    /// Fee configuration is out of range or unparseable.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A declaration could not be written.
    #[error("declaration error: {0}")]
    Declaration(#[from] DeclarationError),

    /// An underlying transaction error (forwarded from `bsv-transaction`).
    #[error("transaction error: {0}")]
    Transaction(#[from] bsv_transaction::TransactionError),

    /// An underlying script error (forwarded from `bsv-script`).
    #[error("script error: {0}")]
    Script(#[from] bsv_script::ScriptError),
}
