//! Locking script template recognition.
//!
//! Fee estimation needs to know how large the unlocking script of an input
//! will be before it is signed. That depends only on the shape of the locking
//! script being spent, which this module classifies.

use std::fmt;

use crate::opcodes::*;
use crate::{Script, ScriptError};

/// The locking script shapes whose unlocking size is known in advance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptTemplate {
    /// `<pubkey> OP_CHECKSIG`.
    PayToKey,
    /// `OP_DUP OP_HASH160 <pkh> OP_EQUALVERIFY OP_CHECKSIG`.
    PayToKeyHash,
    /// Any `required` of `total` key hashes must sign.
    ThresholdKeyHash {
        /// Signatures needed to unlock.
        required: u32,
        /// Number of signer slots.
        total: u32,
    },
    /// An inner template that must also be approved by an agent key.
    AgentWrapped {
        /// Template of the wrapped script, hard-verify removed.
        inner: Box<ScriptTemplate>,
    },
    /// A script that matches none of the known shapes.
    Unrecognized(Script),
}

impl ScriptTemplate {
    /// Classify a locking script.
    ///
    /// Shapes are tried in order: pay-to-key, pay-to-key-hash, threshold
    /// key hash, then agent-wrapped. An agent-wrapped script has its inner
    /// script classified recursively after the hard-verify is removed.
    pub fn classify(script: &Script) -> Self {
        if script.is_p2pk() {
            return ScriptTemplate::PayToKey;
        }
        if script.is_p2pkh() {
            return ScriptTemplate::PayToKeyHash;
        }
        if let Some((required, total)) = script.multi_pkh_counts() {
            return ScriptTemplate::ThresholdKeyHash { required, total };
        }
        if let Some((inner, _approver)) = script.agent_parts() {
            return match ScriptTemplate::classify(&inner.remove_hard_verify()) {
                ScriptTemplate::Unrecognized(_) => ScriptTemplate::Unrecognized(script.clone()),
                inner => ScriptTemplate::AgentWrapped { inner: Box::new(inner) },
            };
        }
        ScriptTemplate::Unrecognized(script.clone())
    }

    /// Whether the script matched a known shape.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, ScriptTemplate::Unrecognized(_))
    }
}

impl fmt::Display for ScriptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptTemplate::PayToKey => write!(f, "P2PK"),
            ScriptTemplate::PayToKeyHash => write!(f, "P2PKH"),
            ScriptTemplate::ThresholdKeyHash { required, total } => {
                write!(f, "multi-PKH {}-of-{}", required, total)
            }
            ScriptTemplate::AgentWrapped { inner } => write!(f, "agent({})", inner),
            ScriptTemplate::Unrecognized(_) => write!(f, "unrecognized"),
        }
    }
}

// ---------------------------------------------------------------------------
// Locking script builders
// ---------------------------------------------------------------------------

/// Build a P2PKH locking script for a 20-byte public key hash.
pub fn p2pkh_lock(pkh: &[u8; 20]) -> Script {
    let mut bytes = Vec::with_capacity(25);
    bytes.extend_from_slice(&[OP_DUP, OP_HASH160, OP_DATA_20]);
    bytes.extend_from_slice(pkh);
    bytes.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    Script::from_bytes(&bytes)
}

/// Build a P2PK locking script.
///
/// # Arguments
/// * `pubkey` - A 33-byte compressed or 65-byte uncompressed public key.
pub fn p2pk_lock(pubkey: &[u8]) -> Result<Script, ScriptError> {
    if pubkey.len() != 33 && pubkey.len() != 65 {
        return Err(ScriptError::InvalidScript(format!(
            "public key must be 33 or 65 bytes, got {}",
            pubkey.len()
        )));
    }
    let mut script = Script::new();
    script.append_push_data(pubkey)?;
    script.append_opcodes(&[OP_CHECKSIG])?;
    Ok(script)
}

/// Build a multi-PKH locking script requiring `required` of the given hashes.
///
/// Each signer slot is guarded by `OP_IF`; the unlocking script selects a
/// slot with a true value followed by signature and public key, or skips it
/// with a false value. A counter on the alt stack tracks valid signatures.
pub fn multi_pkh_lock(required: u32, pkhs: &[[u8; 20]]) -> Result<Script, ScriptError> {
    if required == 0 || required as usize > pkhs.len() {
        return Err(ScriptError::InvalidScript(format!(
            "required signers {} out of range for {} keys",
            required,
            pkhs.len()
        )));
    }

    let mut script = Script::new();
    script.append_opcodes(&[OP_0, OP_TOALTSTACK])?;
    for pkh in pkhs {
        script.append_opcodes(&[OP_IF, OP_DUP, OP_HASH160])?;
        script.append_push_data(pkh)?;
        script.append_opcodes(&[
            OP_EQUALVERIFY,
            OP_CHECKSIGVERIFY,
            OP_FROMALTSTACK,
            OP_1ADD,
            OP_TOALTSTACK,
            OP_ENDIF,
        ])?;
    }
    script.append_unsigned(required as u64)?;
    script.append_opcodes(&[OP_FROMALTSTACK, OP_LESSTHANOREQUAL])?;
    Ok(script)
}

/// Wrap a locking script so that an agent must also approve the spend.
///
/// The inner script's final check is made hard-verifying and a P2PKH check
/// against the agent's key hash is appended.
pub fn agent_lock(inner: &Script, agent_pkh: &[u8; 20]) -> Script {
    let mut bytes = inner.with_hard_verify().to_bytes().to_vec();
    bytes.extend_from_slice(p2pkh_lock(agent_pkh).to_bytes());
    Script::from_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBKEY: [u8; 33] = [0x02; 33];

    #[test]
    fn test_classify_p2pkh() {
        assert_eq!(
            ScriptTemplate::classify(&p2pkh_lock(&[0xab; 20])),
            ScriptTemplate::PayToKeyHash
        );
    }

    #[test]
    fn test_classify_p2pk() {
        let script = p2pk_lock(&PUBKEY).expect("build");
        assert_eq!(script.len(), 35);
        assert_eq!(ScriptTemplate::classify(&script), ScriptTemplate::PayToKey);
    }

    #[test]
    fn test_classify_multi_pkh() {
        let script = multi_pkh_lock(2, &[[1; 20], [2; 20], [3; 20]]).expect("build");
        assert_eq!(
            ScriptTemplate::classify(&script),
            ScriptTemplate::ThresholdKeyHash { required: 2, total: 3 }
        );
    }

    #[test]
    fn test_multi_pkh_lock_rejects_bad_threshold() {
        assert!(multi_pkh_lock(0, &[[1; 20]]).is_err());
        assert!(multi_pkh_lock(3, &[[1; 20], [2; 20]]).is_err());
    }

    #[test]
    fn test_classify_agent_wrapped_p2pkh() {
        let script = agent_lock(&p2pkh_lock(&[1; 20]), &[2; 20]);
        assert_eq!(script.len(), 50);
        assert_eq!(
            ScriptTemplate::classify(&script),
            ScriptTemplate::AgentWrapped { inner: Box::new(ScriptTemplate::PayToKeyHash) }
        );
    }

    #[test]
    fn test_classify_agent_wrapped_multi_pkh() {
        let inner = multi_pkh_lock(1, &[[1; 20], [2; 20]]).expect("build");
        let script = agent_lock(&inner, &[9; 20]);
        assert_eq!(
            ScriptTemplate::classify(&script),
            ScriptTemplate::AgentWrapped {
                inner: Box::new(ScriptTemplate::ThresholdKeyHash { required: 1, total: 2 })
            }
        );
    }

    #[test]
    fn test_classify_nested_agent() {
        let once = agent_lock(&p2pk_lock(&PUBKEY).unwrap(), &[1; 20]);
        let twice = agent_lock(&once, &[2; 20]);
        let expected = ScriptTemplate::AgentWrapped {
            inner: Box::new(ScriptTemplate::AgentWrapped {
                inner: Box::new(ScriptTemplate::PayToKey),
            }),
        };
        assert_eq!(ScriptTemplate::classify(&twice), expected);
    }

    #[test]
    fn test_classify_agent_with_unknown_inner_is_unrecognized() {
        let inner = Script::from_bytes(&[OP_1, OP_1, OP_EQUAL]);
        let script = agent_lock(&inner, &[2; 20]);
        assert!(!ScriptTemplate::classify(&script).is_recognized());
    }

    #[test]
    fn test_classify_unrecognized() {
        let script = Script::from_bytes(&[OP_FALSE, OP_RETURN, 0x01, 0x02]);
        assert_eq!(
            ScriptTemplate::classify(&script),
            ScriptTemplate::Unrecognized(script.clone())
        );
        assert!(!ScriptTemplate::classify(&Script::new()).is_recognized());
    }

    #[test]
    fn test_display() {
        let t = ScriptTemplate::AgentWrapped {
            inner: Box::new(ScriptTemplate::ThresholdKeyHash { required: 2, total: 3 }),
        };
        assert_eq!(t.to_string(), "agent(multi-PKH 2-of-3)");
    }
}
