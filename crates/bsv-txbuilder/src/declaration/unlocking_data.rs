//! `UL` protocol: declared unlocking size and spent value of an input.

use bsv_script::scriptnum::{chunk_number, chunk_unsigned, push_number, push_unsigned};

use super::envelope::Envelope;
use super::{Declaration, Protocol};
use crate::DeclarationError;

/// Protocol identifier of unlocking data messages.
pub const PROTOCOL_ID: &[u8] = b"UL";

/// Message version written and accepted.
pub const VERSION: i64 = 0;

/// Size of the unlocking script and value of the output an input spends,
/// declared by the party that will sign it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UnlockingData {
    /// Unlocking script size in bytes. Zero means not declared.
    pub size: u64,
    /// Value of the spent output in satoshis. Zero means not declared.
    pub value: u64,
    /// Identifier of the party that will sign the input.
    ///
    /// Only read back when `UL` is the last protocol in its envelope.
    pub party: Option<u64>,
}

impl UnlockingData {
    /// Encode as an envelope holding only this message.
    pub fn write(&self) -> Envelope {
        let mut payload = vec![
            push_number(VERSION),
            push_unsigned(self.size),
            push_unsigned(self.value),
        ];
        if let Some(party) = self.party {
            payload.push(push_unsigned(party));
        }
        Envelope {
            protocol_ids: vec![PROTOCOL_ID.to_vec()],
            payload,
        }
    }
}

/// Parser for [`UnlockingData`].
#[derive(Clone, Copy, Debug, Default)]
pub struct UnlockingDataProtocol;

impl Protocol for UnlockingDataProtocol {
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

        let items = &envelope.payload;
        if items.len() < 3 {
            return Err(DeclarationError::MalformedMessage(format!(
                "unlocking data needs 3 items, got {}",
                items.len()
            )));
        }

        let version = chunk_number(&items[0])?;
        if version != VERSION {
            return Err(DeclarationError::UnsupportedVersion(version));
        }
        let size = chunk_unsigned(&items[1])?;
        let value = chunk_unsigned(&items[2])?;

        let party = if envelope.protocol_ids.is_empty() && items.len() >= 4 {
            Some(chunk_unsigned(&items[3])?)
        } else {
            None
        };

        let consumed = if party.is_some() { 4 } else { 3 };
        envelope.payload.drain(..consumed);

        Ok((
            Some(Declaration::UnlockingData(UnlockingData { size, value, party })),
            envelope,
        ))
    }
}
