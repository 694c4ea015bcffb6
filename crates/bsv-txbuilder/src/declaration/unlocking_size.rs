//! `UL_S` protocol: declared unlocking size of an input, without its value.

use bsv_script::scriptnum::{chunk_number, chunk_unsigned, push_number, push_unsigned};

use super::envelope::Envelope;
use super::{Declaration, Protocol};
use crate::DeclarationError;

/// Protocol identifier of unlocking size messages.
pub const PROTOCOL_ID: &[u8] = b"UL_S";

/// Message version written and accepted.
pub const VERSION: i64 = 0;

/// Size of the unlocking script an input will carry once signed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UnlockingSize {
    /// Unlocking script size in bytes. Zero means not declared.
    pub size: u64,
}

impl UnlockingSize {
    /// Encode as an envelope holding only this message.
    pub fn write(&self) -> Envelope {
        Envelope {
            protocol_ids: vec![PROTOCOL_ID.to_vec()],
            payload: vec![push_number(VERSION), push_unsigned(self.size)],
        }
    }
}

/// Parser for [`UnlockingSize`].
#[derive(Clone, Copy, Debug, Default)]
pub struct UnlockingSizeProtocol;

impl Protocol for UnlockingSizeProtocol {
    fn protocol_id(&self) -> &'static [u8] {
        PROTOCOL_ID
    }

    fn parse(
        &self,
        mut envelope: Envelope,
    ) -> Result<(Option<Declaration>, Envelope), DeclarationError> {
        if envelope.protocol_ids.first().map(Vec::as_slice) != Some(PROTOCOL_ID) {
            return Ok((None, envelope));
        }
        envelope.protocol_ids.remove(0);

        if envelope.payload.len() < 2 {
            return Err(DeclarationError::MalformedMessage(format!(
                "unlocking size needs 2 items, got {}",
                envelope.payload.len()
            )));
        }

        let version = chunk_number(&envelope.payload[0])?;
        if version != VERSION {
            return Err(DeclarationError::UnsupportedVersion(version));
        }
        let size = chunk_unsigned(&envelope.payload[1])?;
        envelope.payload.drain(..2);

        Ok((Some(Declaration::UnlockingSize(UnlockingSize { size })), envelope))
    }
}
