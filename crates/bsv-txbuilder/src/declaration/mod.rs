//! Declarations embedded in placeholder unlocking scripts.
//!
//! When an input will be signed by a counterparty, its spent output may not
//! be known locally. The counterparty instead places an envelope in the
//! input's unlocking script declaring the final unlocking size and, for
//! `UL` messages, the value being spent.

pub mod envelope;
pub mod unlocking_data;
pub mod unlocking_size;

use std::fmt;

use bsv_script::Script;

use crate::DeclarationError;
pub use envelope::Envelope;
pub use unlocking_data::{UnlockingData, UnlockingDataProtocol};
pub use unlocking_size::{UnlockingSize, UnlockingSizeProtocol};

/// A decoded declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Declaration {
    /// Declared unlocking size and spent value.
    UnlockingData(UnlockingData),
    /// Declared unlocking size only.
    UnlockingSize(UnlockingSize),
}

impl Declaration {
    /// Declared unlocking size, zero when not declared.
    pub fn size(&self) -> u64 {
        match self {
            Declaration::UnlockingData(d) => d.size,
            Declaration::UnlockingSize(d) => d.size,
        }
    }

    /// Declared spent value, if this kind of declaration carries one.
    pub fn value(&self) -> Option<u64> {
        match self {
            Declaration::UnlockingData(d) => Some(d.value),
            Declaration::UnlockingSize(_) => None,
        }
    }

    /// Encode as an envelope holding only this message.
    pub fn write(&self) -> Envelope {
        match self {
            Declaration::UnlockingData(d) => d.write(),
            Declaration::UnlockingSize(d) => d.write(),
        }
    }
}

/// A parser for one envelope protocol.
pub trait Protocol {
    /// Identifier this parser consumes.
    fn protocol_id(&self) -> &'static [u8];

    /// Parse this protocol's message from the front of `envelope`.
    ///
    /// # Returns
    /// `(None, envelope)` unchanged when the leading identifier is not this
    /// protocol's, otherwise the declaration and the envelope with its
    /// identifier and items removed. A matching identifier with a bad body
    /// is an error.
    fn parse(&self, envelope: Envelope)
        -> Result<(Option<Declaration>, Envelope), DeclarationError>;
}

/// An ordered list of protocol parsers tried in sequence.
pub struct Protocols {
    parsers: Vec<Box<dyn Protocol + Send + Sync>>,
}

impl Protocols {
    /// Create an empty list.
    pub fn new() -> Self {
        Protocols { parsers: Vec::new() }
    }

    /// The `UL` and `UL_S` parsers, in that order.
    pub fn standard() -> Self {
        Protocols::new()
            .with(UnlockingDataProtocol)
            .with(UnlockingSizeProtocol)
    }

    /// Append a parser, consuming and returning the list.
    pub fn with<P: Protocol + Send + Sync + 'static>(mut self, parser: P) -> Self {
        self.parsers.push(Box::new(parser));
        self
    }

    /// Identifiers of the registered parsers, in order.
    pub fn protocol_ids(&self) -> Vec<&'static [u8]> {
        self.parsers.iter().map(|p| p.protocol_id()).collect()
    }

    /// Parse the leading message of `envelope` with the first parser that
    /// accepts it.
    pub fn parse(
        &self,
        mut envelope: Envelope,
    ) -> Result<(Option<Declaration>, Envelope), DeclarationError> {
        for parser in &self.parsers {
            let (declaration, rest) = parser.parse(envelope)?;
            if declaration.is_some() {
                return Ok((declaration, rest));
            }
            envelope = rest;
        }
        Ok((None, envelope))
    }

    /// Parse messages from the front of `envelope` until one is not
    /// recognized or none remain.
    pub fn parse_all(&self, mut envelope: Envelope) -> Result<Vec<Declaration>, DeclarationError> {
        let mut found = Vec::new();
        while !envelope.is_empty() {
            match self.parse(envelope)? {
                (Some(declaration), rest) => {
                    found.push(declaration);
                    envelope = rest;
                }
                (None, _) => break,
            }
        }
        Ok(found)
    }

    /// Decode a placeholder script and parse every declaration in it.
    pub fn parse_script(&self, script: &Script) -> Result<Vec<Declaration>, DeclarationError> {
        self.parse_all(Envelope::from_script(script)?)
    }
}

impl Default for Protocols {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for Protocols {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self
            .protocol_ids()
            .iter()
            .map(|id| String::from_utf8_lossy(id).into_owned())
            .collect();
        f.debug_struct("Protocols").field("parsers", &ids).finish()
    }
}

/// Build a placeholder unlocking script carrying `declarations` in order.
///
/// An `UnlockingData` with a party must come last, since the party is only
/// read back from the final message.
pub fn placeholder_script(declarations: &[Declaration]) -> Result<Script, DeclarationError> {
    let mut envelope = Envelope::default();
    for (i, declaration) in declarations.iter().enumerate() {
        if let Declaration::UnlockingData(UnlockingData { party: Some(_), .. }) = declaration {
            if i + 1 != declarations.len() {
                return Err(DeclarationError::MalformedMessage(
                    "unlocking data with a party must be the last declaration".into(),
                ));
            }
        }
        envelope.extend(declaration.write());
    }
    envelope.to_script()
}
