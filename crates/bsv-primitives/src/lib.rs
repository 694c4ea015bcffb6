/// BSV Blockchain SDK - Wire-level building blocks.
///
/// This crate provides the variable-length integer rules and the byte writer
/// that every size computation and serialization in the SDK is built on.

pub mod util;

pub use util::{BsvWriter, VarInt};
