//! Minimally-encoded script numbers.
//!
//! Numbers on the script stack are little-endian byte arrays. Signed numbers
//! carry their sign in the most significant bit of the last byte; unsigned
//! numbers use every bit for magnitude. Values 0 through 16 are pushed with
//! the dedicated small-int opcodes rather than as data.

use crate::chunk::ScriptChunk;
use crate::opcodes::*;
use crate::ScriptError;

/// Widest signed encoding: 8 magnitude bytes plus a sign byte.
const MAX_SIGNED_LEN: usize = 9;
const MAX_UNSIGNED_LEN: usize = 8;

/// Encode a signed value as minimal little-endian bytes with a sign bit.
///
/// Zero encodes as an empty byte vector.
pub fn signed_bytes(val: i64) -> Vec<u8> {
    let mut result = unsigned_bytes(val.unsigned_abs());
    if let Some(last) = result.last_mut() {
        if *last & 0x80 != 0 {
            result.push(if val < 0 { 0x80 } else { 0x00 });
        } else if val < 0 {
            *last |= 0x80;
        }
    }
    result
}

/// Encode an unsigned value as minimal little-endian bytes.
///
/// Zero encodes as an empty byte vector.
pub fn unsigned_bytes(val: u64) -> Vec<u8> {
    let bytes = val.to_le_bytes();
    let used = 8 - (val.leading_zeros() as usize / 8);
    bytes[..used].to_vec()
}

/// Build the push chunk for a signed number.
pub fn push_number(val: i64) -> ScriptChunk {
    if val == -1 {
        return ScriptChunk::opcode(OP_1NEGATE);
    }
    if let Some(op) = u8::try_from(val).ok().and_then(small_int_op) {
        return ScriptChunk::opcode(op);
    }
    data_push(signed_bytes(val))
}

/// Build the push chunk for an unsigned number.
pub fn push_unsigned(val: u64) -> ScriptChunk {
    if let Some(op) = u8::try_from(val).ok().and_then(small_int_op) {
        return ScriptChunk::opcode(op);
    }
    data_push(unsigned_bytes(val))
}

fn data_push(data: Vec<u8>) -> ScriptChunk {
    // Number encodings are at most 9 bytes, always a direct push.
    ScriptChunk { op: data.len() as u8, data: Some(data) }
}

/// Read a signed number from a push chunk.
pub fn chunk_number(chunk: &ScriptChunk) -> Result<i64, ScriptError> {
    if chunk.op == OP_1NEGATE {
        return Ok(-1);
    }
    if let Some(n) = small_int_value(chunk.op) {
        return Ok(n as i64);
    }
    let data = chunk.data.as_deref().ok_or(ScriptError::NotANumber(chunk.op))?;
    if data.len() > MAX_SIGNED_LEN {
        return Err(ScriptError::NumberTooBig(data.len()));
    }
    if let Some(&last) = data.last() {
        // A final 0x00/0x80 byte is only allowed when it carries the sign.
        if last & 0x7f == 0 && (data.len() == 1 || data[data.len() - 2] & 0x80 == 0) {
            return Err(ScriptError::NonMinimalNumber);
        }
    }

    let mut magnitude: i128 = 0;
    for (i, &b) in data.iter().enumerate() {
        let b = if i == data.len() - 1 { b & 0x7f } else { b };
        magnitude |= (b as i128) << (8 * i);
    }
    let negative = data.last().map_or(false, |&b| b & 0x80 != 0);
    let value = if negative { -magnitude } else { magnitude };

    i64::try_from(value).map_err(|_| ScriptError::NumberTooBig(data.len()))
}

/// Read an unsigned number from a push chunk.
pub fn chunk_unsigned(chunk: &ScriptChunk) -> Result<u64, ScriptError> {
    if chunk.op == OP_1NEGATE {
        return Err(ScriptError::NegativeNumber);
    }
    if let Some(n) = small_int_value(chunk.op) {
        return Ok(n as u64);
    }
    let data = chunk.data.as_deref().ok_or(ScriptError::NotANumber(chunk.op))?;
    if data.len() > MAX_UNSIGNED_LEN {
        return Err(ScriptError::NumberTooBig(data.len()));
    }
    if data.last() == Some(&0) {
        return Err(ScriptError::NonMinimalNumber);
    }

    let mut le = [0u8; 8];
    le[..data.len()].copy_from_slice(data);
    Ok(u64::from_le_bytes(le))
}
