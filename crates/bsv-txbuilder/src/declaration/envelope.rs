//! Envelope container carried by placeholder unlocking scripts.
//!
//! Wire form:
//!
//! ```text
//! OP_FALSE OP_RETURN <0xbd 0x00> <id count> <protocol id>... <item count> <item>...
//! ```
//!
//! Counts are minimally-encoded script numbers. Payload items are raw
//! chunks so each protocol decides how to read its own fields.

use bsv_script::chunk::{decode_script, ScriptChunk};
use bsv_script::opcodes::{OP_FALSE, OP_RETURN};
use bsv_script::scriptnum::{chunk_unsigned, push_unsigned};
use bsv_script::Script;

use crate::DeclarationError;

/// Marker push identifying an envelope, followed by its format version.
pub const ENVELOPE_MARKER: [u8; 2] = [0xbd, 0x00];

/// Protocol identifiers and payload items decoded from a placeholder script.
///
/// Parsers consume identifiers and items from the front and hand the rest
/// on, so one envelope can carry several protocols' messages in sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Envelope {
    /// Protocol identifiers, in the order their messages appear.
    pub protocol_ids: Vec<Vec<u8>>,
    /// Payload items of all protocols, concatenated.
    pub payload: Vec<ScriptChunk>,
}

impl Envelope {
    /// Decode an envelope from a placeholder script.
    ///
    /// # Returns
    /// The envelope, `NotEnvelope` when the script is not an envelope, or
    /// `MalformedMessage` when the counts disagree with the content.
    pub fn from_script(script: &Script) -> Result<Self, DeclarationError> {
        let bytes = script.to_bytes();
        if bytes.len() < 2 || bytes[0] != OP_FALSE || bytes[1] != OP_RETURN {
            return Err(DeclarationError::NotEnvelope("missing OP_FALSE OP_RETURN".into()));
        }

        let chunks = decode_script(&bytes[2..])
            .map_err(|e| DeclarationError::NotEnvelope(e.to_string()))?;
        let mut iter = chunks.into_iter();

        match iter.next() {
            Some(ScriptChunk { data: Some(marker), .. }) if marker == ENVELOPE_MARKER => {}
            _ => return Err(DeclarationError::NotEnvelope("missing envelope marker".into())),
        }

        let id_count = read_count(iter.next(), "protocol id count")?;
        let mut protocol_ids = Vec::new();
        for i in 0..id_count {
            match iter.next() {
                Some(ScriptChunk { data: Some(id), .. }) => protocol_ids.push(id),
                _ => {
                    return Err(DeclarationError::MalformedMessage(format!(
                        "protocol id {} of {} missing",
                        i, id_count
                    )))
                }
            }
        }

        let item_count = read_count(iter.next(), "payload count")?;
        let payload: Vec<ScriptChunk> = iter.collect();
        if payload.len() as u64 != item_count {
            return Err(DeclarationError::MalformedMessage(format!(
                "payload count {} but {} items present",
                item_count,
                payload.len()
            )));
        }

        Ok(Envelope { protocol_ids, payload })
    }

    /// Encode this envelope as a placeholder script.
    pub fn to_script(&self) -> Result<Script, DeclarationError> {
        let mut script = Script::from_bytes(&[OP_FALSE, OP_RETURN]);
        script.append_push_data(&ENVELOPE_MARKER)?;

        script.append_chunk(&push_unsigned(self.protocol_ids.len() as u64))?;
        for id in &self.protocol_ids {
            script.append_push_data(id)?;
        }

        script.append_chunk(&push_unsigned(self.payload.len() as u64))?;
        for item in &self.payload {
            script.append_chunk(item)?;
        }
        Ok(script)
    }

    /// Append another envelope's identifiers and items after this one's.
    pub fn extend(&mut self, other: Envelope) {
        self.protocol_ids.extend(other.protocol_ids);
        self.payload.extend(other.payload);
    }

    /// Whether no protocol identifiers remain.
    pub fn is_empty(&self) -> bool {
        self.protocol_ids.is_empty()
    }
}

fn read_count(chunk: Option<ScriptChunk>, what: &str) -> Result<u64, DeclarationError> {
    let chunk = chunk.ok_or_else(|| DeclarationError::MalformedMessage(format!("{} missing", what)))?;
    chunk_unsigned(&chunk)
        .map_err(|e| DeclarationError::MalformedMessage(format!("{}: {}", what, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsv_script::opcodes::OP_DUP;

    fn sample() -> Envelope {
        Envelope {
            protocol_ids: vec![b"UL".to_vec(), b"XX".to_vec()],
            payload: vec![push_unsigned(0), push_unsigned(300), push_unsigned(7)],
        }
    }

    #[test]
    fn test_envelope_roundtrip() {
        let env = sample();
        let script = env.to_script().expect("should encode");
        assert!(script.is_false_op_return());
        assert_eq!(Envelope::from_script(&script).expect("should decode"), env);
    }

    #[test]
    fn test_envelope_wire_form() {
        let env = Envelope {
            protocol_ids: vec![b"UL".to_vec()],
            payload: vec![push_unsigned(0), push_unsigned(5)],
        };
        let script = env.to_script().unwrap();
        // OP_FALSE OP_RETURN <bd00> OP_1 <"UL"> OP_2 OP_0 OP_5
        assert_eq!(script.to_hex(), "006a02bd005102554c520055");
    }

    #[test]
    fn test_not_envelope() {
        let p2pkh = Script::from_bytes(&[OP_DUP]);
        assert!(matches!(Envelope::from_script(&p2pkh), Err(DeclarationError::NotEnvelope(_))));

        let other_data = Script::from_bytes(&[OP_FALSE, OP_RETURN, 0x02, 0xaa, 0xbb]);
        assert!(matches!(
            Envelope::from_script(&other_data),
            Err(DeclarationError::NotEnvelope(_))
        ));
    }

    #[test]
    fn test_payload_count_mismatch() {
        let mut script = sample().to_script().unwrap();
        script.append_chunk(&push_unsigned(99)).unwrap();
        assert!(matches!(
            Envelope::from_script(&script),
            Err(DeclarationError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_truncated_ids() {
        let mut script = Script::from_bytes(&[OP_FALSE, OP_RETURN]);
        script.append_push_data(&ENVELOPE_MARKER).unwrap();
        script.append_unsigned(2).unwrap();
        script.append_push_data(b"UL").unwrap();
        assert!(matches!(
            Envelope::from_script(&script),
            Err(DeclarationError::MalformedMessage(_))
        ));
    }
}
