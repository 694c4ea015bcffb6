//! Change reconciliation.
//!
//! After signing, a transaction's real fee rarely matches the estimate. The
//! reconciler moves the difference into or out of a single change output:
//! the first output flagged as change. It only deletes change it created
//! itself, and only creates change when the value is worth more than the
//! cost of the output and of later spending it.

use bsv_script::Script;
use bsv_transaction::TransactionOutput;
use tracing::debug;

use crate::access::TransactionAccessMut;
use crate::error::Shortfall;
use crate::estimate::{checked_add, Estimator};
use crate::fee::fee_for_size;
use crate::size::{output_size, StandardSizer, TemplateSizer, MAX_P2PKH_INPUT_SIZE, P2PKH_OUTPUT_SIZE};
use crate::TxBuilderError;

/// The change made by one reconciliation step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeeAdjustment {
    /// The fee already matched.
    Unchanged,
    /// Value moved from the change output into the fee.
    ChangeReduced {
        /// Index of the change output.
        index: usize,
        /// Its new value.
        value: u64,
    },
    /// The change output fell below its own cost and was removed.
    ChangeRemoved {
        /// Index the output had.
        index: usize,
        /// Value it would have kept, now paid as fee.
        value: u64,
    },
    /// Surplus moved into the existing change output.
    ChangeIncreased {
        /// Index of the change output.
        index: usize,
        /// Its new value.
        value: u64,
    },
    /// A new change output was appended for the surplus.
    ChangeAdded {
        /// Index of the new output.
        index: usize,
        /// Its value.
        value: u64,
    },
    /// The surplus was too small to be worth an output and stays as fee.
    LeftAsFee {
        /// Surplus left to the fee.
        amount: u64,
    },
}

impl FeeAdjustment {
    /// Whether the fee is final.
    ///
    /// Adding or growing change is worth another estimate round. Reducing
    /// change in place only ever pays the fee already estimated, so it is
    /// final, as are removal and leaving a surplus as fee.
    pub fn is_settled(&self) -> bool {
        !matches!(
            self,
            FeeAdjustment::ChangeAdded { .. } | FeeAdjustment::ChangeIncreased { .. }
        )
    }
}

/// Moves a fee difference into or out of change.
pub struct ChangeReconciler<'a, S = StandardSizer> {
    estimator: &'a Estimator<S>,
    fee_rate: f64,
    change_script: Option<&'a Script>,
}

impl<'a, S: TemplateSizer> ChangeReconciler<'a, S> {
    /// Create a reconciler.
    ///
    /// # Arguments
    /// * `estimator` - Sizes inputs and prices change outputs.
    /// * `fee_rate` - Satoshis per byte.
    /// * `change_script` - Locking script for change the reconciler creates.
    pub fn new(estimator: &'a Estimator<S>, fee_rate: f64, change_script: Option<&'a Script>) -> Self {
        ChangeReconciler {
            estimator,
            fee_rate,
            change_script,
        }
    }

    /// Change the transaction's fee by `delta` satoshis.
    ///
    /// A positive `delta` raises the fee by taking value from change; a
    /// negative one lowers it by giving value to change. On error the
    /// transaction is left as it was.
    pub fn adjust_fee<T: TransactionAccessMut + ?Sized>(
        &self,
        tx: &mut T,
        delta: i64,
    ) -> Result<FeeAdjustment, TxBuilderError> {
        if delta == 0 {
            return Ok(FeeAdjustment::Unchanged);
        }
        if delta > 0 {
            self.take_from_change(tx, delta.unsigned_abs())
        } else {
            self.give_to_change(tx, delta.unsigned_abs())
        }
    }

    fn take_from_change<T: TransactionAccessMut + ?Sized>(
        &self,
        tx: &mut T,
        amount: u64,
    ) -> Result<FeeAdjustment, TxBuilderError> {
        let shortfall = |reason, change| TxBuilderError::InsufficientValue {
            reason,
            change,
            required: amount,
        };

        let index = tx.change_index().ok_or_else(|| shortfall(Shortfall::NoChange, 0))?;
        let change = tx.output(index).ok_or_else(|| shortfall(Shortfall::NoChange, 0))?;
        let (value, owned) = (change.satoshis, change.added_by_reconciler);
        if value < amount {
            return Err(shortfall(Shortfall::NotEnoughChange, value));
        }

        let remaining = value - amount;
        let (output_fee, input_fee) =
            self.estimator.output_total_cost(&change.locking_script, self.fee_rate)?;

        if remaining < output_fee.saturating_add(input_fee) {
            if !owned {
                return Err(shortfall(Shortfall::ChangeBelowDust, value));
            }
            tx.remove_output(index);
            debug!(index, forfeited = remaining, "removed change output below its cost");
            return Ok(FeeAdjustment::ChangeRemoved { index, value: remaining });
        }

        if let Some(output) = tx.output_mut(index) {
            output.satoshis = remaining;
        }
        debug!(index, value = remaining, taken = amount, "reduced change");
        Ok(FeeAdjustment::ChangeReduced { index, value: remaining })
    }

    fn give_to_change<T: TransactionAccessMut + ?Sized>(
        &self,
        tx: &mut T,
        amount: u64,
    ) -> Result<FeeAdjustment, TxBuilderError> {
        if let Some(index) = tx.change_index() {
            if let Some(output) = tx.output_mut(index) {
                let value = checked_add(output.satoshis, amount, "change value")?;
                output.satoshis = value;
                debug!(index, value, given = amount, "increased change");
                return Ok(FeeAdjustment::ChangeIncreased { index, value });
            }
        }

        // Without a change script, price the output as P2PKH so a negligible
        // surplus is left as fee instead of failing.
        let current_size = self.estimator.estimated_size(tx)?;
        let added_size = self.change_script.map_or(P2PKH_OUTPUT_SIZE, output_size);
        let grown_size = checked_add(current_size, added_size, "estimated size")?;
        let induced = fee_for_size(grown_size, self.fee_rate)
            - fee_for_size(current_size, self.fee_rate);

        if induced > amount {
            debug!(amount, induced, "surplus below cost of a change output");
            return Ok(FeeAdjustment::LeftAsFee { amount });
        }
        let adjustment = amount - induced;

        let (output_fee, input_fee) = match self.change_script {
            Some(script) => self.estimator.output_total_cost(script, self.fee_rate)?,
            None => (
                fee_for_size(P2PKH_OUTPUT_SIZE * 2, self.fee_rate),
                fee_for_size(MAX_P2PKH_INPUT_SIZE * 2, self.fee_rate),
            ),
        };

        if adjustment <= output_fee.saturating_add(input_fee) {
            debug!(amount, adjustment, "surplus not worth a change output");
            return Ok(FeeAdjustment::LeftAsFee { amount });
        }

        let script = self
            .change_script
            .ok_or(TxBuilderError::ChangeAddressNeeded { remaining: amount })?;
        let mut output = TransactionOutput::with_script(script.clone(), adjustment, true);
        output.added_by_reconciler = true;
        tx.push_output(output);

        let index = tx.output_count() - 1;
        debug!(index, value = adjustment, induced, "added change output");
        Ok(FeeAdjustment::ChangeAdded { index, value: adjustment })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsv_script::template::p2pkh_lock;
    use bsv_transaction::Transaction;

    fn change_output(value: u64, owned: bool) -> TransactionOutput {
        let mut output = TransactionOutput::with_script(p2pkh_lock(&[9; 20]), value, true);
        output.added_by_reconciler = owned;
        output
    }

    #[test]
    fn test_settled_mapping() {
        assert!(FeeAdjustment::Unchanged.is_settled());
        assert!(FeeAdjustment::ChangeReduced { index: 0, value: 1 }.is_settled());
        assert!(FeeAdjustment::ChangeRemoved { index: 0, value: 1 }.is_settled());
        assert!(FeeAdjustment::LeftAsFee { amount: 1 }.is_settled());
        assert!(!FeeAdjustment::ChangeIncreased { index: 0, value: 1 }.is_settled());
        assert!(!FeeAdjustment::ChangeAdded { index: 0, value: 1 }.is_settled());
    }

    #[test]
    fn test_increase_past_max_value_leaves_tx_unchanged() {
        let est = Estimator::default();
        let mut tx = Transaction::new();
        tx.add_output(change_output(u64::MAX, false));

        let err = ChangeReconciler::new(&est, 0.05, None).adjust_fee(&mut tx, -1).unwrap_err();
        assert!(matches!(err, TxBuilderError::Overflow(_)));
        assert_eq!(tx.outputs[0].satoshis, u64::MAX, "change value untouched");
    }

    #[test]
    fn test_zero_delta_is_noop() {
        let est = Estimator::default();
        let mut tx = Transaction::new();
        let result = ChangeReconciler::new(&est, 0.05, None).adjust_fee(&mut tx, 0).unwrap();
        assert_eq!(result, FeeAdjustment::Unchanged);
    }

    #[test]
    fn test_first_change_output_is_targeted() {
        let est = Estimator::default();
        let mut tx = Transaction::new();
        tx.add_output(change_output(1000, false));
        tx.add_output(change_output(5000, false));

        let result = ChangeReconciler::new(&est, 0.05, None).adjust_fee(&mut tx, 100).unwrap();
        assert_eq!(result, FeeAdjustment::ChangeReduced { index: 0, value: 900 });
        assert_eq!(tx.outputs[1].satoshis, 5000, "second change untouched");
    }

    #[test]
    fn test_not_enough_change_leaves_tx_unchanged() {
        let est = Estimator::default();
        let mut tx = Transaction::new();
        tx.add_output(change_output(50, true));

        let err = ChangeReconciler::new(&est, 0.05, None).adjust_fee(&mut tx, 51).unwrap_err();
        assert!(matches!(
            err,
            TxBuilderError::InsufficientValue {
                reason: Shortfall::NotEnoughChange,
                change: 50,
                required: 51
            }
        ));
        assert_eq!(tx.outputs[0].satoshis, 50);
    }

    #[test]
    fn test_caller_change_below_cost_is_kept() {
        let est = Estimator::default();
        let mut tx = Transaction::new();
        tx.add_output(change_output(50, false));

        let err = ChangeReconciler::new(&est, 0.05, None).adjust_fee(&mut tx, 45).unwrap_err();
        assert!(matches!(
            err,
            TxBuilderError::InsufficientValue { reason: Shortfall::ChangeBelowDust, .. }
        ));
        assert_eq!(tx.output_count(), 1, "caller's change is never deleted");
        assert_eq!(tx.outputs[0].satoshis, 50, "value restored");
    }

    #[test]
    fn test_no_change_needs_value() {
        let est = Estimator::default();
        let mut tx = Transaction::new();
        let err = ChangeReconciler::new(&est, 0.05, None).adjust_fee(&mut tx, 1).unwrap_err();
        assert!(matches!(
            err,
            TxBuilderError::InsufficientValue { reason: Shortfall::NoChange, change: 0, required: 1 }
        ));
    }

    #[test]
    fn test_small_surplus_without_change_script_left_as_fee() {
        let est = Estimator::default();
        let mut tx = Transaction::new();
        // At 0.05 sat/byte the doubled P2PKH cost is ceil(3.4) + ceil(14.9) = 19.
        let result = ChangeReconciler::new(&est, 0.05, None).adjust_fee(&mut tx, -15).unwrap();
        assert_eq!(result, FeeAdjustment::LeftAsFee { amount: 15 });
        assert_eq!(tx.output_count(), 0);
    }

    #[test]
    fn test_surplus_below_induced_cost_left_as_fee() {
        let est = Estimator::default();
        let script = p2pkh_lock(&[1; 20]);
        let mut tx = Transaction::new();
        // Empty tx is 10 bytes; a P2PKH output adds 34, costing 34 sat at 1 sat/byte.
        let result = ChangeReconciler::new(&est, 1.0, Some(&script)).adjust_fee(&mut tx, -30).unwrap();
        assert_eq!(result, FeeAdjustment::LeftAsFee { amount: 30 });
    }
}
