//! Serialized size estimation for inputs and outputs.
//!
//! An input's final size is only known once it is signed. Before that the
//! size is predicted from the template of the locking script it spends,
//! assuming maximum-length signatures so the estimate never falls short.

use bsv_primitives::VarInt;
use bsv_script::{Script, ScriptTemplate};

use crate::TxBuilderError;

/// Version (4 bytes) plus lock time (4 bytes).
pub const BASE_TX_SIZE: u64 = 8;

/// Outpoint (32-byte txid + 4-byte index) plus 4-byte sequence.
pub const INPUT_BASE_SIZE: u64 = 32 + 4 + 4;

/// The 8-byte value of an output.
pub const OUTPUT_BASE_SIZE: u64 = 8;

/// 72-byte DER signature plus the sighash type byte.
pub const MAX_SIGNATURE_SIZE: u64 = 73;

/// Push opcode plus a maximum-length signature.
pub const MAX_SIGNATURE_PUSH_SIZE: u64 = 1 + MAX_SIGNATURE_SIZE;

/// Push opcode plus a 33-byte compressed public key.
pub const PUBLIC_KEY_PUSH_SIZE: u64 = 34;

/// Push opcode plus a 20-byte public key hash.
pub const PUBLIC_KEY_HASH_PUSH_SIZE: u64 = 21;

/// Signature push plus public key push.
pub const MAX_P2PKH_UNLOCKING_SIZE: u64 = MAX_SIGNATURE_PUSH_SIZE + PUBLIC_KEY_PUSH_SIZE;

/// Largest serialized P2PKH input (149 bytes).
pub const MAX_P2PKH_INPUT_SIZE: u64 = INPUT_BASE_SIZE + 1 + MAX_P2PKH_UNLOCKING_SIZE;

/// OP_DUP OP_HASH160 <pkh push> OP_EQUALVERIFY OP_CHECKSIG.
pub const P2PKH_OUTPUT_SCRIPT_SIZE: u64 = PUBLIC_KEY_HASH_PUSH_SIZE + 4;

/// Serialized P2PKH output (34 bytes).
pub const P2PKH_OUTPUT_SIZE: u64 = OUTPUT_BASE_SIZE + 1 + P2PKH_OUTPUT_SCRIPT_SIZE;

/// Input size assumed for every locking script when computing dust.
pub const DUST_INPUT_SIZE: u64 = 148;

// ---------------------------------------------------------------------------
// Unlocking size
// ---------------------------------------------------------------------------

/// Compute the maximum unlocking script size for a classified template.
///
/// # Arguments
/// * `template` - The template of the locking script being spent.
///
/// # Returns
/// The size in bytes, or `UnrecognizedTemplate` carrying the script.
pub fn unlocking_size(template: &ScriptTemplate) -> Result<u64, TxBuilderError> {
    match template {
        ScriptTemplate::PayToKey => Ok(MAX_SIGNATURE_PUSH_SIZE),
        ScriptTemplate::PayToKeyHash => Ok(MAX_P2PKH_UNLOCKING_SIZE),
        ScriptTemplate::ThresholdKeyHash { required, total } => {
            // A false marker for each skipped slot, and a true marker with
            // signature and public key for each signing slot.
            let skipped = u64::from(total.saturating_sub(*required));
            Ok(skipped + u64::from(*required) * (MAX_P2PKH_UNLOCKING_SIZE + 1))
        }
        ScriptTemplate::AgentWrapped { inner } => {
            Ok(approve_unlocking_size(unlocking_size(inner)?))
        }
        ScriptTemplate::Unrecognized(script) => Err(TxBuilderError::UnrecognizedTemplate {
            script: script.clone(),
        }),
    }
}

/// Unlocking size of an agent-approved spend whose inner unlocking script
/// is `inner_size` bytes: the agent's signature and public key precede it.
pub fn approve_unlocking_size(inner_size: u64) -> u64 {
    inner_size + MAX_SIGNATURE_PUSH_SIZE + PUBLIC_KEY_PUSH_SIZE
}

/// Serialized input size for an unlocking script of `unlocking_size` bytes.
///
/// # Returns
/// `Overflow` when a declared size is too large to add the input fields to.
pub fn input_size_for_unlocking_size(unlocking_size: u64) -> Result<u64, TxBuilderError> {
    prefixed_size(INPUT_BASE_SIZE, unlocking_size).ok_or_else(|| {
        TxBuilderError::Overflow(format!("input with a {}-byte unlocking script", unlocking_size))
    })
}

/// Serialized output size for a locking script of `script_size` bytes.
pub fn output_size_for_locking_script_size(script_size: u64) -> Result<u64, TxBuilderError> {
    prefixed_size(OUTPUT_BASE_SIZE, script_size).ok_or_else(|| {
        TxBuilderError::Overflow(format!("output with a {}-byte locking script", script_size))
    })
}

/// Serialized size of an output holding `locking_script`.
pub fn output_size(locking_script: &Script) -> u64 {
    // An in-memory script is far below the overflow bound.
    let len = locking_script.len() as u64;
    OUTPUT_BASE_SIZE + VarInt::serialize_size(len) as u64 + len
}

fn prefixed_size(base: u64, len: u64) -> Option<u64> {
    base.checked_add(VarInt::serialize_size(len) as u64)?
        .checked_add(len)
}

// ---------------------------------------------------------------------------
// Sizers
// ---------------------------------------------------------------------------

/// Predicts the unlocking script size for a locking script.
///
/// The aggregator and reconciler only see sizes through this trait, so a
/// caller with extra knowledge of its own scripts can supply its own.
pub trait TemplateSizer {
    /// Maximum size in bytes of the script that will unlock `locking_script`.
    fn unlocking_size(&self, locking_script: &Script) -> Result<u64, TxBuilderError>;

    /// Serialized size of an input spending `locking_script`.
    fn input_size(&self, locking_script: &Script) -> Result<u64, TxBuilderError> {
        input_size_for_unlocking_size(self.unlocking_size(locking_script)?)
    }
}

/// Sizer backed by [`ScriptTemplate::classify`].
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardSizer;

impl TemplateSizer for StandardSizer {
    fn unlocking_size(&self, locking_script: &Script) -> Result<u64, TxBuilderError> {
        unlocking_size(&ScriptTemplate::classify(locking_script))
    }
}

impl<T: TemplateSizer + ?Sized> TemplateSizer for &T {
    fn unlocking_size(&self, locking_script: &Script) -> Result<u64, TxBuilderError> {
        (**self).unlocking_size(locking_script)
    }
}
