//! Script chunk parsing and encoding.
//!
//! A script chunk is either an opcode or a data push with its associated bytes.
//! Template classification and the envelope codec both walk scripts chunk by
//! chunk, so decoding must be exact about push boundaries.

use crate::opcodes::*;
use crate::ScriptError;

/// A single parsed element of a Bitcoin script.
///
/// Each chunk is either a standalone opcode (like OP_DUP) or a data push
/// that carries the opcode byte and the pushed data bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptChunk {
    /// The opcode byte. For direct pushes (1-75 bytes), this is the length.
    pub op: u8,
    /// The data payload, if this chunk is a push operation.
    pub data: Option<Vec<u8>>,
}

impl ScriptChunk {
    /// Build an opcode-only chunk.
    pub fn opcode(op: u8) -> Self {
        ScriptChunk { op, data: None }
    }

    /// Whether this chunk pushes bytes (including the small-int pushes).
    pub fn is_push(&self) -> bool {
        self.data.is_some() || is_small_int_op(self.op) || self.op == OP_1NEGATE
    }

    /// Re-encode this chunk to raw script bytes.
    ///
    /// OP_RETURN chunks that swallowed the tail of a script are written back
    /// verbatim, since their data already includes the opcode byte.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ScriptError> {
        match (&self.data, self.op) {
            (Some(data), OP_RETURN) => Ok(data.clone()),
            (Some(data), _) => {
                let mut out = push_data_prefix(data.len())?;
                out.extend_from_slice(data);
                Ok(out)
            }
            (None, op) => Ok(vec![op]),
        }
    }
}

/// Decode raw script bytes into a vector of `ScriptChunk` values.
///
/// Handles OP_DATA_1..OP_DATA_75 (direct push), OP_PUSHDATA1/2/4
/// (extended push), and OP_RETURN (consumes remaining bytes as data
/// unless inside a conditional block).
///
/// # Arguments
/// * `bytes` - The raw script bytes to decode.
///
/// # Returns
/// A vector of parsed chunks, or a `ScriptError` if a push is truncated.
pub fn decode_script(bytes: &[u8]) -> Result<Vec<ScriptChunk>, ScriptError> {
    let mut chunks = Vec::new();
    let mut pos = 0;
    let mut conditional_depth: i32 = 0;

    while pos < bytes.len() {
        let op = bytes[pos];
        match op {
            OP_IF | OP_NOTIF | OP_VERIF | OP_VERNOTIF => {
                conditional_depth += 1;
                chunks.push(ScriptChunk::opcode(op));
                pos += 1;
            }
            OP_ENDIF => {
                conditional_depth -= 1;
                chunks.push(ScriptChunk::opcode(op));
                pos += 1;
            }
            OP_RETURN if conditional_depth <= 0 => {
                chunks.push(ScriptChunk { op, data: Some(bytes[pos..].to_vec()) });
                pos = bytes.len();
            }
            OP_DATA_1..=OP_DATA_75 => {
                let data = read_push(bytes, pos + 1, op as usize)?;
                pos += 1 + data.len();
                chunks.push(ScriptChunk { op, data: Some(data) });
            }
            OP_PUSHDATA1 | OP_PUSHDATA2 | OP_PUSHDATA4 => {
                let width = match op {
                    OP_PUSHDATA1 => 1,
                    OP_PUSHDATA2 => 2,
                    _ => 4,
                };
                let len_bytes = bytes
                    .get(pos + 1..pos + 1 + width)
                    .ok_or(ScriptError::DataTooSmall)?;
                let mut le = [0u8; 4];
                le[..width].copy_from_slice(len_bytes);
                let length = u32::from_le_bytes(le) as usize;

                let data = read_push(bytes, pos + 1 + width, length)?;
                pos += 1 + width + length;
                chunks.push(ScriptChunk { op, data: Some(data) });
            }
            _ => {
                chunks.push(ScriptChunk::opcode(op));
                pos += 1;
            }
        }
    }

    Ok(chunks)
}

fn read_push(bytes: &[u8], start: usize, length: usize) -> Result<Vec<u8>, ScriptError> {
    bytes
        .get(start..start + length)
        .map(|d| d.to_vec())
        .ok_or(ScriptError::DataTooSmall)
}

/// Compute the OP_PUSHDATA prefix bytes for a data payload of the given length.
///
/// # Arguments
/// * `data_len` - The length of the data to be pushed.
///
/// # Returns
/// The prefix to prepend to the data, or `DataTooBig` when the length does
/// not fit in OP_PUSHDATA4.
pub fn push_data_prefix(data_len: usize) -> Result<Vec<u8>, ScriptError> {
    if data_len <= OP_DATA_75 as usize {
        Ok(vec![data_len as u8])
    } else if data_len <= 0xFF {
        Ok(vec![OP_PUSHDATA1, data_len as u8])
    } else if data_len <= 0xFFFF {
        let mut buf = vec![OP_PUSHDATA2];
        buf.extend_from_slice(&(data_len as u16).to_le_bytes());
        Ok(buf)
    } else if data_len as u64 <= 0xFFFF_FFFF {
        let mut buf = vec![OP_PUSHDATA4];
        buf.extend_from_slice(&(data_len as u32).to_le_bytes());
        Ok(buf)
    } else {
        Err(ScriptError::DataTooBig)
    }
}

/// Encode a sequence of chunks back into raw script bytes.
pub fn encode_chunks(chunks: &[ScriptChunk]) -> Result<Vec<u8>, ScriptError> {
    let mut out = Vec::new();
    for chunk in chunks {
        out.extend_from_slice(&chunk.to_bytes()?);
    }
    Ok(out)
}
