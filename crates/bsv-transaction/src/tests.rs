//! Tests for the bsv-transaction crate.
//!
//! Covers wire serialization against a known mainnet transaction, the
//! computed serialized size and output removal.

use crate::input::{TransactionInput, DEFAULT_SEQUENCE_NUMBER};
use crate::output::TransactionOutput;
use crate::transaction::Transaction;
use crate::TransactionError;
use bsv_script::Script;

// -----------------------------------------------------------------------
// Raw transaction test vector
// -----------------------------------------------------------------------

/// A standard one-input, two-output transaction.
const SOURCE_RAW_TX: &str = "010000000138c7c61c14ffb063c3bb2664041a3e29ea6ea0412a0c18ff725ba4e9e12afae2030000006a47304402203e9ab8e4c14addf3b4741540b556cfb0e0efb67dc1a7b5ce84c3ac56b3fd447802203c9f49f7bd893ebd7060176dfc36bcaff9d2c443d9a0dd6cd2d59b372c024d20412102798913bc057b344de675dac34faafe3dc2f312c758cd9068209f810877306d66ffffffff02dc050000000000002076a914eb0bd5edba389198e73f8efabddfc61666969ff788ac6a0568656c6c6faa0d0000000000001976a914eb0bd5edba389198e73f8efabddfc61666969ff788ac00000000";

const SOURCE_TXID_INTERNAL: &str =
    "38c7c61c14ffb063c3bb2664041a3e29ea6ea0412a0c18ff725ba4e9e12afae2";

const SOURCE_UNLOCKING: &str = "47304402203e9ab8e4c14addf3b4741540b556cfb0e0efb67dc1a7b5ce84c3ac56b3fd447802203c9f49f7bd893ebd7060176dfc36bcaff9d2c443d9a0dd6cd2d59b372c024d20412102798913bc057b344de675dac34faafe3dc2f312c758cd9068209f810877306d66";

const P2PKH_HEX: &str = "76a914eb0bd5edba389198e73f8efabddfc61666969ff788ac";

/// Rebuild the test vector field by field.
fn source_tx() -> Transaction {
    let mut input = TransactionInput::new();
    input
        .source_txid
        .copy_from_slice(&hex::decode(SOURCE_TXID_INTERNAL).unwrap());
    input.source_tx_out_index = 3;
    input.unlocking_script = Some(Script::from_hex(SOURCE_UNLOCKING).unwrap());

    let mut tx = Transaction::new();
    tx.add_input(input);
    tx.add_output(TransactionOutput::with_script(
        Script::from_hex(&format!("{}6a0568656c6c6f", P2PKH_HEX)).unwrap(),
        1500,
        false,
    ));
    tx.add_output(TransactionOutput::with_script(
        Script::from_hex(P2PKH_HEX).unwrap(),
        3498,
        true,
    ));
    tx
}

// -----------------------------------------------------------------------
// Serialization
// -----------------------------------------------------------------------

/// Building the vector from its parts must reproduce the exact wire bytes.
#[test]
fn test_to_hex_matches_vector() {
    let tx = source_tx();
    assert_eq!(tx.to_hex(), SOURCE_RAW_TX, "serialization should match vector");
}

/// The computed size must agree with the serialized length.
#[test]
fn test_serialize_size_matches_bytes() {
    let tx = source_tx();
    assert_eq!(tx.to_bytes().len(), 232, "vector is 232 bytes");
    assert_eq!(tx.serialize_size(), 232, "computed size should match");

    let input = &tx.inputs[0];
    assert_eq!(input.serialize_size(), 40 + 1 + 106, "input size");
    assert_eq!(input.serialize_size() as usize, input.to_bytes().len());
    for output in &tx.outputs {
        assert_eq!(output.serialize_size() as usize, output.to_bytes().len());
    }
}

/// Local-only flags never reach the wire.
#[test]
fn test_change_flags_not_serialized() {
    let mut a = TransactionOutput::with_script(Script::from_hex(P2PKH_HEX).unwrap(), 10, false);
    let b = a.clone();
    a.change = true;
    a.added_by_reconciler = true;
    assert_eq!(a.to_bytes(), b.to_bytes());
}

/// Test serialization of an empty (no inputs, no outputs) transaction.
#[test]
fn test_empty_transaction_serialization() {
    let tx = Transaction::new();
    // version(4) + varint(0 inputs)(1) + varint(0 outputs)(1) + locktime(4) = 10 bytes
    assert_eq!(tx.to_bytes().len(), 10, "empty tx should be 10 bytes");
    assert_eq!(tx.serialize_size(), 10);
}

/// An input with no unlocking script still writes a zero length.
#[test]
fn test_unsigned_input_size() {
    let input = TransactionInput::new();
    assert_eq!(input.serialize_size(), 41);
    assert_eq!(input.to_bytes().len(), 41);
}

/// Test the Display impl outputs hex.
#[test]
fn test_transaction_display() {
    let tx = source_tx();
    assert_eq!(format!("{}", tx), SOURCE_RAW_TX, "Display should output hex");
}

// -----------------------------------------------------------------------
// Transaction building
// -----------------------------------------------------------------------

/// Test creating a new transaction and adding inputs/outputs.
#[test]
fn test_new_transaction() {
    let mut tx = Transaction::new();
    assert_eq!(tx.version, 1, "default version should be 1");
    assert_eq!(tx.lock_time, 0, "default lock_time should be 0");
    assert_eq!(tx.input_count(), 0, "new tx should have 0 inputs");
    assert_eq!(tx.output_count(), 0, "new tx should have 0 outputs");

    let mut input = TransactionInput::new();
    input.source_txid = [0xab; 32];
    tx.add_input(input);
    assert_eq!(tx.input_count(), 1, "should have 1 input after add");
    assert_eq!(tx.inputs[0].sequence_number, DEFAULT_SEQUENCE_NUMBER);

    tx.add_output(TransactionOutput::with_script(Script::from_hex(P2PKH_HEX).unwrap(), 50000, false));
    assert_eq!(tx.output_count(), 1, "should have 1 output after add");
}

#[test]
fn test_remove_output() {
    let mut tx = source_tx();
    let removed = tx.remove_output(0).expect("index 0 exists");
    assert_eq!(removed.satoshis, 1500);
    assert_eq!(tx.output_count(), 1);
    assert_eq!(tx.outputs[0].satoshis, 3498, "later outputs shift down");

    assert!(matches!(
        tx.remove_output(5),
        Err(TransactionError::InvalidTransaction(_))
    ), "out of range should fail");
}
