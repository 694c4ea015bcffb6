/// Bitcoin Script type - a sequence of opcodes and data pushes.
///
/// Scripts are used in transaction inputs (unlocking) and outputs (locking)
/// to define spending conditions. The Script wraps a `Vec<u8>` and provides
/// methods for construction, classification and serialization.

use std::fmt;

use crate::chunk::{decode_script, encode_chunks, push_data_prefix, ScriptChunk};
use crate::opcodes::*;
use crate::scriptnum;
use crate::ScriptError;

/// Number of chunks in one signer slot of a multi-PKH script.
const MULTI_PKH_SLOT_LEN: usize = 10;

/// A Bitcoin script, represented as a byte vector newtype.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Script(Vec<u8>);

impl Script {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// Create a new empty script.
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string (e.g. "76a914...88ac").
    ///
    /// # Returns
    /// A `Script` wrapping the decoded bytes, or an error if the hex is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| ScriptError::InvalidHex(e.to_string()))?;
        Ok(Script(bytes))
    }

    /// Create a script from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Create a script by encoding a sequence of chunks.
    pub fn from_chunks(chunks: &[ScriptChunk]) -> Result<Self, ScriptError> {
        Ok(Script(encode_chunks(chunks)?))
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Encode the script as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Return a reference to the underlying bytes.
    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Return the length of the script in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the script is empty (zero bytes).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse the script into a vector of decoded chunks.
    pub fn chunks(&self) -> Result<Vec<ScriptChunk>, ScriptError> {
        decode_script(&self.0)
    }

    // -----------------------------------------------------------------------
    // Script classification
    // -----------------------------------------------------------------------

    /// Check if this is a Pay-to-Public-Key-Hash (P2PKH) output script.
    ///
    /// Pattern: OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG
    pub fn is_p2pkh(&self) -> bool {
        is_p2pkh_bytes(&self.0)
    }

    /// Check if this is a Pay-to-Public-Key (P2PK) output script.
    ///
    /// Pattern: <pubkey> OP_CHECKSIG (pubkey is 33 or 65 bytes with valid prefix).
    pub fn is_p2pk(&self) -> bool {
        let parts = match self.chunks() {
            Ok(p) => p,
            Err(_) => return false,
        };
        if parts.len() != 2 || parts[1].op != OP_CHECKSIG {
            return false;
        }
        match parts[0].data.as_deref() {
            Some(pubkey) if pubkey.len() == 33 => pubkey[0] == 0x02 || pubkey[0] == 0x03,
            Some(pubkey) if pubkey.len() == 65 => matches!(pubkey[0], 0x04 | 0x06 | 0x07),
            _ => false,
        }
    }

    /// Check if this is an OP_FALSE OP_RETURN data script.
    ///
    /// Placeholder unlocking scripts of counterparty inputs take this form.
    pub fn is_false_op_return(&self) -> bool {
        self.0.len() > 1 && self.0[0] == OP_FALSE && self.0[1] == OP_RETURN
    }

    /// Return `(required, total)` signer counts if this is a multi-PKH script.
    ///
    /// Pattern:
    /// `OP_0 OP_TOALTSTACK`, then per signer
    /// `OP_IF OP_DUP OP_HASH160 <pkh> OP_EQUALVERIFY OP_CHECKSIGVERIFY
    ///  OP_FROMALTSTACK OP_1ADD OP_TOALTSTACK OP_ENDIF`,
    /// then `<required> OP_FROMALTSTACK OP_LESSTHANOREQUAL`.
    pub fn multi_pkh_counts(&self) -> Option<(u32, u32)> {
        let parts = self.chunks().ok()?;
        if parts.len() < 2 + MULTI_PKH_SLOT_LEN + 3 {
            return None;
        }
        if parts[0].op != OP_0 || parts[1].op != OP_TOALTSTACK {
            return None;
        }

        let tail = &parts[parts.len() - 3..];
        if tail[1].op != OP_FROMALTSTACK || tail[2].op != OP_LESSTHANOREQUAL {
            return None;
        }

        let slots = &parts[2..parts.len() - 3];
        if slots.len() % MULTI_PKH_SLOT_LEN != 0 {
            return None;
        }
        for slot in slots.chunks(MULTI_PKH_SLOT_LEN) {
            let shape = [
                OP_IF, OP_DUP, OP_HASH160, OP_DATA_20, OP_EQUALVERIFY, OP_CHECKSIGVERIFY,
                OP_FROMALTSTACK, OP_1ADD, OP_TOALTSTACK, OP_ENDIF,
            ];
            if slot.iter().zip(shape.iter()).any(|(c, &op)| c.op != op) {
                return None;
            }
        }

        let total = (slots.len() / MULTI_PKH_SLOT_LEN) as u32;
        let required = u32::try_from(scriptnum::chunk_unsigned(&tail[0]).ok()?).ok()?;
        if required == 0 || required > total {
            return None;
        }
        Some((required, total))
    }

    /// Split an agent-wrapped script into its inner script and approver hash.
    ///
    /// An agent-wrapped script is an inner locking script whose final check
    /// has been made hard-verifying, followed by a P2PKH approval layer:
    /// `<inner, ending in a *VERIFY opcode> OP_DUP OP_HASH160 <approver>
    /// OP_EQUALVERIFY OP_CHECKSIG`. The returned inner script still carries
    /// its hard-verify clause; see [`Script::remove_hard_verify`].
    pub fn agent_parts(&self) -> Option<(Script, [u8; 20])> {
        const APPROVAL_LEN: usize = 25;
        if self.0.len() <= APPROVAL_LEN {
            return None;
        }
        let split = self.0.len() - APPROVAL_LEN;
        let (inner, approval) = self.0.split_at(split);
        if !is_p2pkh_bytes(approval) {
            return None;
        }

        let inner_chunks = decode_script(inner).ok()?;
        let last = inner_chunks.last()?;
        if last.data.is_some() || !is_hard_verify_op(last.op) {
            return None;
        }

        let mut approver = [0u8; 20];
        approver.copy_from_slice(&approval[3..23]);
        Some((Script::from_bytes(inner), approver))
    }

    /// Return a copy of this script with its trailing hard-verify removed.
    ///
    /// `OP_CHECKSIGVERIFY`, `OP_CHECKMULTISIGVERIFY`, `OP_EQUALVERIFY` and
    /// `OP_NUMEQUALVERIFY` revert to their non-verify forms and a bare
    /// trailing `OP_VERIFY` is dropped. Other scripts are returned unchanged.
    pub fn remove_hard_verify(&self) -> Script {
        let Ok(mut parts) = self.chunks() else {
            return self.clone();
        };
        match parts.last().filter(|c| c.data.is_none()).map(|c| c.op) {
            Some(OP_VERIFY) => {
                parts.pop();
            }
            Some(op) if is_hard_verify_op(op) => {
                if let Some(last) = parts.last_mut() {
                    last.op = op - 1;
                }
            }
            _ => return self.clone(),
        }
        Script::from_chunks(&parts).unwrap_or_else(|_| self.clone())
    }

    /// Return a copy of this script with its final check made hard-verifying.
    ///
    /// The inverse of [`Script::remove_hard_verify`]: a trailing check opcode
    /// takes its `*VERIFY` form, anything else gets `OP_VERIFY` appended.
    pub fn with_hard_verify(&self) -> Script {
        let mut bytes = self.0.clone();
        let last_op = self
            .chunks()
            .ok()
            .and_then(|parts| parts.last().filter(|c| c.data.is_none()).map(|c| c.op));
        match last_op {
            Some(op @ (OP_CHECKSIG | OP_CHECKMULTISIG | OP_EQUAL | OP_NUMEQUAL)) => {
                if let Some(last) = bytes.last_mut() {
                    *last = op + 1;
                }
            }
            _ => bytes.push(OP_VERIFY),
        }
        Script(bytes)
    }

    // -----------------------------------------------------------------------
    // Mutation / building
    // -----------------------------------------------------------------------

    /// Append data bytes to the script with the minimal PUSHDATA prefix.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        let prefix = push_data_prefix(data.len())?;
        self.0.extend_from_slice(&prefix);
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Append raw opcodes to the script.
    ///
    /// Rejects push data opcodes (OP_DATA_1..OP_PUSHDATA4); use
    /// `append_push_data` for those.
    pub fn append_opcodes(&mut self, opcodes: &[u8]) -> Result<(), ScriptError> {
        if let Some(&op) = opcodes.iter().find(|&&op| (OP_DATA_1..=OP_PUSHDATA4).contains(&op)) {
            return Err(ScriptError::InvalidOpcodeType(op));
        }
        self.0.extend_from_slice(opcodes);
        Ok(())
    }

    /// Append a minimally-encoded unsigned number push.
    pub fn append_unsigned(&mut self, val: u64) -> Result<(), ScriptError> {
        self.append_chunk(&scriptnum::push_unsigned(val))
    }

    /// Append a minimally-encoded signed number push.
    pub fn append_number(&mut self, val: i64) -> Result<(), ScriptError> {
        self.append_chunk(&scriptnum::push_number(val))
    }

    /// Append an already-built chunk.
    pub fn append_chunk(&mut self, chunk: &ScriptChunk) -> Result<(), ScriptError> {
        self.0.extend_from_slice(&chunk.to_bytes()?);
        Ok(())
    }
}

fn is_p2pkh_bytes(b: &[u8]) -> bool {
    b.len() == 25
        && b[0] == OP_DUP
        && b[1] == OP_HASH160
        && b[2] == OP_DATA_20
        && b[23] == OP_EQUALVERIFY
        && b[24] == OP_CHECKSIG
}

fn is_hard_verify_op(op: u8) -> bool {
    matches!(
        op,
        OP_VERIFY | OP_CHECKSIGVERIFY | OP_CHECKMULTISIGVERIFY | OP_EQUALVERIFY | OP_NUMEQUALVERIFY
    )
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Script {
    /// Display the script as a lowercase hex string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl serde::Serialize for Script {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
