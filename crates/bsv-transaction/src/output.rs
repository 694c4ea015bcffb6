//! Transaction output with satoshi value and locking script.
//!
//! Defines the spending conditions for the output's value and the
//! local-only flags the fee reconciler relies on.

use bsv_primitives::util::{BsvWriter, VarInt};
use bsv_script::Script;

/// A single output in a BSV transaction.
///
/// Each output specifies a satoshi value and a `locking_script`
/// (scriptPubKey). The `change` and `added_by_reconciler` flags are
/// local-only annotations used during fee calculation; neither is
/// serialized.
///
/// # Wire format
///
/// | Field            | Size           |
/// |------------------|----------------|
/// | satoshis         | 8 bytes (LE)   |
/// | script length    | VarInt         |
/// | locking_script   | variable       |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionOutput {
    /// The number of satoshis locked by this output.
    pub satoshis: u64,

    /// The locking script (scriptPubKey) that defines spending conditions.
    pub locking_script: Script,

    /// Marks this output as change: it may absorb surplus value or give up
    /// value to pay the fee.
    pub change: bool,

    /// Set when the fee reconciler appended this output itself.
    pub added_by_reconciler: bool,
}

impl TransactionOutput {
    /// Create a new `TransactionOutput` with zero satoshis and an empty script.
    pub fn new() -> Self {
        TransactionOutput {
            satoshis: 0,
            locking_script: Script::new(),
            change: false,
            added_by_reconciler: false,
        }
    }

    /// Create an output paying `satoshis` to `locking_script`.
    ///
    /// # Arguments
    /// * `locking_script` - The script locking the output.
    /// * `satoshis` - The output value.
    /// * `change` - Whether the output is a change output.
    pub fn with_script(locking_script: Script, satoshis: u64, change: bool) -> Self {
        TransactionOutput {
            satoshis,
            locking_script,
            change,
            added_by_reconciler: false,
        }
    }

    /// Serialized size in bytes: 8 value bytes, the script length varint
    /// and the script itself.
    pub fn serialize_size(&self) -> u64 {
        let script_len = self.locking_script.len() as u64;
        8 + VarInt::serialize_size(script_len) as u64 + script_len
    }

    /// Serialize this `TransactionOutput` into a `BsvWriter`.
    ///
    /// # Arguments
    /// * `writer` - The writer to append serialized bytes to.
    pub fn write_to(&self, writer: &mut BsvWriter) {
        writer.write_u64_le(self.satoshis);
        writer.write_var_bytes(self.locking_script.to_bytes());
    }

    /// Serialize this output to a byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BsvWriter::new();
        self.write_to(&mut writer);
        writer.into_bytes()
    }

}

impl Default for TransactionOutput {
    fn default() -> Self {
        Self::new()
    }
}
