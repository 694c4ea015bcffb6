/// BSV Blockchain SDK - Script parsing, number encoding, and template
/// classification.
///
/// Provides the Bitcoin Script type, opcode definitions, script chunk parsing,
/// minimally-encoded script numbers, and recognition of the locking script
/// templates whose unlocking size can be estimated.

pub mod script;
pub mod opcodes;
pub mod chunk;
pub mod scriptnum;
pub mod template;

mod error;
pub use error::ScriptError;
pub use script::Script;
pub use chunk::ScriptChunk;
pub use template::ScriptTemplate;
