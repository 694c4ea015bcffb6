//! Read and write access to a transaction under construction.
//!
//! Estimation and reconciliation work through these traits rather than a
//! concrete type, so the same arithmetic serves a builder that owns its
//! transaction and a caller that only holds one.

use bsv_script::Script;
use bsv_transaction::{Transaction, TransactionOutput};

/// Read access to the inputs and outputs of a transaction.
pub trait TransactionAccess {
    /// Number of inputs.
    fn input_count(&self) -> usize;

    /// Number of outputs.
    fn output_count(&self) -> usize;

    /// The output spent by input `index`, if known locally.
    fn spent_output(&self, index: usize) -> Option<&TransactionOutput>;

    /// The unlocking script (or placeholder) of input `index`.
    fn unlocking_script(&self, index: usize) -> Option<&Script>;

    /// Output `index`.
    fn output(&self, index: usize) -> Option<&TransactionOutput>;

    /// Index of the first output flagged as change.
    fn change_index(&self) -> Option<usize> {
        (0..self.output_count()).find(|&i| self.output(i).map_or(false, |o| o.change))
    }
}

/// Mutable access to the outputs of a transaction.
pub trait TransactionAccessMut: TransactionAccess {
    /// Output `index`, mutably.
    fn output_mut(&mut self, index: usize) -> Option<&mut TransactionOutput>;

    /// Remove output `index`, shifting later outputs down.
    fn remove_output(&mut self, index: usize) -> Option<TransactionOutput>;

    /// Append an output.
    fn push_output(&mut self, output: TransactionOutput);
}

impl TransactionAccess for Transaction {
    fn input_count(&self) -> usize {
        self.inputs.len()
    }

    fn output_count(&self) -> usize {
        self.outputs.len()
    }

    fn spent_output(&self, index: usize) -> Option<&TransactionOutput> {
        self.inputs.get(index).and_then(|input| input.source_tx_output())
    }

    fn unlocking_script(&self, index: usize) -> Option<&Script> {
        self.inputs.get(index).and_then(|input| input.unlocking_script.as_ref())
    }

    fn output(&self, index: usize) -> Option<&TransactionOutput> {
        self.outputs.get(index)
    }
}

impl TransactionAccessMut for Transaction {
    fn output_mut(&mut self, index: usize) -> Option<&mut TransactionOutput> {
        self.outputs.get_mut(index)
    }

    fn remove_output(&mut self, index: usize) -> Option<TransactionOutput> {
        Transaction::remove_output(self, index).ok()
    }

    fn push_output(&mut self, output: TransactionOutput) {
        self.add_output(output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsv_transaction::TransactionInput;

    #[test]
    fn test_change_index_is_first_flagged() {
        let mut tx = Transaction::new();
        tx.add_output(TransactionOutput::with_script(Script::new(), 1, false));
        tx.add_output(TransactionOutput::with_script(Script::new(), 2, true));
        tx.add_output(TransactionOutput::with_script(Script::new(), 3, true));
        assert_eq!(tx.change_index(), Some(1));

        tx.outputs[1].change = false;
        assert_eq!(tx.change_index(), Some(2));
    }

    #[test]
    fn test_input_lookups() {
        let mut tx = Transaction::new();
        let mut input = TransactionInput::new();
        input.set_source_output(Some(TransactionOutput::with_script(Script::new(), 42, false)));
        tx.add_input(input);
        tx.add_input(TransactionInput::new());

        assert_eq!(TransactionAccess::input_count(&tx), 2);
        assert_eq!(tx.spent_output(0).map(|o| o.satoshis), Some(42));
        assert!(tx.spent_output(1).is_none());
        assert!(tx.spent_output(2).is_none());
        assert!(tx.unlocking_script(0).is_none());
    }

    #[test]
    fn test_remove_output_out_of_range() {
        let mut tx = Transaction::new();
        assert!(TransactionAccessMut::remove_output(&mut tx, 0).is_none());
        tx.push_output(TransactionOutput::new());
        assert!(TransactionAccessMut::remove_output(&mut tx, 0).is_some());
    }
}
