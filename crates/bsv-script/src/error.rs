/// Error types for script operations.
///
/// Covers hex decoding, push-data encoding/decoding and script-number
/// problems.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Generic invalid script error.
    #[error("invalid script: {0}")]
    InvalidScript(String),

    /// Attempted to use append_opcodes for a push data opcode.
    #[error("use append_push_data for push data opcode 0x{0:02x}")]
    InvalidOpcodeType(u8),

    /// Invalid hex string.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Not enough data in script to complete a push operation.
    #[error("not enough data")]
    DataTooSmall,

    /// Push data exceeds maximum allowed size.
    #[error("data too big")]
    DataTooBig,

    /// A chunk expected to carry a number is not a push.
    #[error("not a number push (opcode 0x{0:02x})")]
    NotANumber(u8),

    /// The encoded number is wider than the target integer type.
    #[error("number too big: {0} bytes")]
    NumberTooBig(usize),

    /// The number was not encoded in its shortest form.
    #[error("number not minimally encoded")]
    NonMinimalNumber,

    /// A negative number was found where an unsigned value is required.
    #[error("negative number where unsigned expected")]
    NegativeNumber,
}
