//! Transaction size, value and fee aggregation.
//!
//! Sizes are estimates of the transaction once every input is signed. An
//! input whose spent output is known is sized from the output's locking
//! script; an input signed by a counterparty is sized from the declaration
//! in its placeholder unlocking script.

use bsv_primitives::VarInt;
use bsv_script::Script;
use tracing::{debug, warn};

use crate::access::TransactionAccess;
use crate::config::TemplatePolicy;
use crate::declaration::{Declaration, Protocols};
use crate::fee::{fee_for_size, value_for_size_floored};
use crate::size::{
    input_size_for_unlocking_size, output_size, StandardSizer, TemplateSizer, BASE_TX_SIZE,
    MAX_P2PKH_INPUT_SIZE, MAX_P2PKH_UNLOCKING_SIZE,
};
use crate::TxBuilderError;

/// Computes sizes, values and fees over any [`TransactionAccess`].
#[derive(Debug)]
pub struct Estimator<S = StandardSizer> {
    sizer: S,
    protocols: Protocols,
    policy: TemplatePolicy,
}

impl Estimator<StandardSizer> {
    /// Estimator using template classification and the standard protocols.
    pub fn new(policy: TemplatePolicy) -> Self {
        Estimator::with_sizer(StandardSizer, policy)
    }
}

impl Default for Estimator<StandardSizer> {
    fn default() -> Self {
        Estimator::new(TemplatePolicy::default())
    }
}

impl<S: TemplateSizer> Estimator<S> {
    /// Estimator using a caller-supplied sizer and the standard protocols.
    pub fn with_sizer(sizer: S, policy: TemplatePolicy) -> Self {
        Estimator {
            sizer,
            protocols: Protocols::standard(),
            policy,
        }
    }

    /// Replace the declaration parsers.
    pub fn with_protocols(mut self, protocols: Protocols) -> Self {
        self.protocols = protocols;
        self
    }

    /// The policy applied to unrecognized locking scripts.
    pub fn policy(&self) -> TemplatePolicy {
        self.policy
    }

    // -----------------------------------------------------------------------
    // Per-script sizing
    // -----------------------------------------------------------------------

    /// Unlocking size for `locking_script`, applying the template policy.
    pub fn unlocking_size(&self, locking_script: &Script) -> Result<u64, TxBuilderError> {
        match self.sizer.unlocking_size(locking_script) {
            Err(TxBuilderError::UnrecognizedTemplate { script })
                if self.policy == TemplatePolicy::AssumeP2pkh =>
            {
                warn!(script = %script, "unrecognized locking script, assuming P2PKH");
                Ok(MAX_P2PKH_UNLOCKING_SIZE)
            }
            other => other,
        }
    }

    /// Serialized size of an input spending `locking_script`.
    pub fn input_size_for_script(&self, locking_script: &Script) -> Result<u64, TxBuilderError> {
        input_size_for_unlocking_size(self.unlocking_size(locking_script)?)
    }

    /// Cost of holding value in an output locked by `locking_script`.
    ///
    /// # Returns
    /// `(output_fee, input_fee)` at `rate`.
    pub fn output_total_cost(
        &self,
        locking_script: &Script,
        rate: f64,
    ) -> Result<(u64, u64), TxBuilderError> {
        let input_size = self.input_size_for_script(locking_script)?;
        Ok((
            fee_for_size(output_size(locking_script), rate),
            fee_for_size(input_size, rate),
        ))
    }

    // -----------------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------------

    /// Declarations in the placeholder unlocking script of input `index`.
    ///
    /// Inputs without a placeholder have none. A placeholder that is not a
    /// well-formed envelope is reported as a missing declaration.
    pub fn declarations<T: TransactionAccess + ?Sized>(
        &self,
        tx: &T,
        index: usize,
    ) -> Result<Vec<Declaration>, TxBuilderError> {
        let script = match tx.unlocking_script(index) {
            Some(script) if script.is_false_op_return() => script,
            _ => return Ok(Vec::new()),
        };
        self.protocols.parse_script(script).map_err(|e| {
            warn!(input = index, error = %e, "unreadable unlocking declaration");
            TxBuilderError::MissingDeclaration {
                input: index,
                detail: e.to_string(),
            }
        })
    }

    // -----------------------------------------------------------------------
    // Inputs
    // -----------------------------------------------------------------------

    /// Estimated serialized size of input `index` once signed.
    pub fn input_size<T: TransactionAccess + ?Sized>(
        &self,
        tx: &T,
        index: usize,
    ) -> Result<u64, TxBuilderError> {
        if let Some(spent) = tx.spent_output(index) {
            if !spent.locking_script.is_empty() {
                return self.input_size_for_script(&spent.locking_script);
            }
        }

        let declared = self
            .declarations(tx, index)?
            .iter()
            .map(Declaration::size)
            .find(|&size| size != 0);
        match declared {
            Some(size) => input_size_for_unlocking_size(size).map_err(|_| {
                TxBuilderError::Overflow(format!(
                    "input {} declares a {}-byte unlocking script",
                    index, size
                ))
            }),
            None => Err(TxBuilderError::MissingDeclaration {
                input: index,
                detail: "spent output unknown and no unlocking size declared".into(),
            }),
        }
    }

    /// Value spent by input `index`.
    ///
    /// A known non-zero value wins, then a declared value; a known spent
    /// output of zero value counts as zero.
    pub fn input_value<T: TransactionAccess + ?Sized>(
        &self,
        tx: &T,
        index: usize,
    ) -> Result<u64, TxBuilderError> {
        let spent = tx.spent_output(index);
        if let Some(out) = spent {
            if out.satoshis != 0 {
                return Ok(out.satoshis);
            }
        }

        let declared = self
            .declarations(tx, index)?
            .iter()
            .filter_map(Declaration::value)
            .find(|&value| value != 0);
        match (declared, spent) {
            (Some(value), _) => Ok(value),
            (None, Some(_)) => Ok(0),
            (None, None) => Err(TxBuilderError::MissingDeclaration {
                input: index,
                detail: "spent output unknown and no value declared".into(),
            }),
        }
    }

    /// Sum of all input values.
    pub fn inputs_value<T: TransactionAccess + ?Sized>(&self, tx: &T) -> Result<u64, TxBuilderError> {
        let mut total = 0u64;
        for index in 0..tx.input_count() {
            total = checked_add(total, self.input_value(tx, index)?, "inputs value")?;
        }
        Ok(total)
    }

    // -----------------------------------------------------------------------
    // Whole transaction
    // -----------------------------------------------------------------------

    /// Estimated serialized size of the transaction once signed.
    pub fn estimated_size<T: TransactionAccess + ?Sized>(&self, tx: &T) -> Result<u64, TxBuilderError> {
        let mut size = BASE_TX_SIZE
            + VarInt::serialize_size(tx.input_count() as u64) as u64
            + VarInt::serialize_size(tx.output_count() as u64) as u64;

        for index in 0..tx.input_count() {
            size = checked_add(size, self.input_size(tx, index)?, "estimated size")?;
        }
        for index in 0..tx.output_count() {
            if let Some(output) = tx.output(index) {
                size = checked_add(size, output_size(&output.locking_script), "estimated size")?;
            }
        }

        debug!(size, inputs = tx.input_count(), outputs = tx.output_count(), "estimated tx size");
        Ok(size)
    }

    /// Fee for the estimated size at `rate`, rounded up.
    pub fn estimated_fee<T: TransactionAccess + ?Sized>(
        &self,
        tx: &T,
        rate: f64,
    ) -> Result<u64, TxBuilderError> {
        Ok(fee_for_size(self.estimated_size(tx)?, rate))
    }

    /// Inputs value minus outputs value. Negative when outputs exceed inputs.
    ///
    /// Both totals must fit in an `i64`; their difference then always does.
    pub fn actual_fee<T: TransactionAccess + ?Sized>(&self, tx: &T) -> Result<i64, TxBuilderError> {
        let inputs = signed(self.inputs_value(tx)?, "inputs value")?;
        let outputs = signed(outputs_value(tx, true)?, "outputs value")?;
        Ok(inputs - outputs)
    }

    /// Inputs value minus outputs value, floored at zero.
    pub fn fee<T: TransactionAccess + ?Sized>(&self, tx: &T) -> Result<u64, TxBuilderError> {
        let inputs = self.inputs_value(tx)?;
        Ok(inputs.saturating_sub(outputs_value(tx, true)?))
    }
}

/// Sum of output values, leaving out change outputs unless `include_change`.
pub fn outputs_value<T: TransactionAccess + ?Sized>(
    tx: &T,
    include_change: bool,
) -> Result<u64, TxBuilderError> {
    (0..tx.output_count())
        .filter_map(|i| tx.output(i))
        .filter(|o| include_change || !o.change)
        .try_fold(0u64, |total, o| checked_add(total, o.satoshis, "outputs value"))
}

/// Sum of change output values.
pub fn change_value<T: TransactionAccess + ?Sized>(tx: &T) -> Result<u64, TxBuilderError> {
    (0..tx.output_count())
        .filter_map(|i| tx.output(i))
        .filter(|o| o.change)
        .try_fold(0u64, |total, o| checked_add(total, o.satoshis, "change value"))
}

/// Value recovered by removing every change output: its value plus the fee
/// its bytes no longer cost, rounded down.
pub fn remainder<T: TransactionAccess + ?Sized>(tx: &T, rate: f64) -> Result<u64, TxBuilderError> {
    (0..tx.output_count())
        .filter_map(|i| tx.output(i))
        .filter(|o| o.change)
        .try_fold(0u64, |total, o| {
            let saved = value_for_size_floored(output_size(&o.locking_script), rate);
            checked_add(total, checked_add(o.satoshis, saved, "remainder")?, "remainder")
        })
}

pub(crate) fn checked_add(total: u64, amount: u64, what: &str) -> Result<u64, TxBuilderError> {
    total
        .checked_add(amount)
        .ok_or_else(|| TxBuilderError::Overflow(format!("{} exceeds {}", what, u64::MAX)))
}

fn signed(value: u64, what: &str) -> Result<i64, TxBuilderError> {
    i64::try_from(value)
        .map_err(|_| TxBuilderError::Overflow(format!("{} {} exceeds {}", what, value, i64::MAX)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::{placeholder_script, UnlockingData, UnlockingSize};
    use bsv_script::template::{agent_lock, p2pkh_lock};
    use bsv_transaction::{Transaction, TransactionInput, TransactionOutput};

    fn known_input(script: Script, value: u64) -> TransactionInput {
        let mut input = TransactionInput::new();
        input.set_source_output(Some(TransactionOutput::with_script(script, value, false)));
        input
    }

    fn declared_input(declarations: &[Declaration]) -> TransactionInput {
        let mut input = TransactionInput::new();
        input.unlocking_script = Some(placeholder_script(declarations).unwrap());
        input
    }

    #[test]
    fn test_estimated_size_p2pkh() {
        let mut tx = Transaction::new();
        tx.add_input(known_input(p2pkh_lock(&[1; 20]), 1000));
        tx.add_output(TransactionOutput::with_script(p2pkh_lock(&[2; 20]), 900, false));

        let est = Estimator::default();
        assert_eq!(est.estimated_size(&tx).unwrap(), 8 + 1 + 1 + 149 + 34);
    }

    #[test]
    fn test_estimated_size_declared() {
        let mut tx = Transaction::new();
        tx.add_input(declared_input(&[Declaration::UnlockingSize(UnlockingSize { size: 300 })]));

        let est = Estimator::default();
        assert_eq!(est.input_size(&tx, 0).unwrap(), 40 + 3 + 300);
    }

    #[test]
    fn test_missing_declaration() {
        let mut tx = Transaction::new();
        tx.add_input(TransactionInput::new());

        let est = Estimator::default();
        assert!(matches!(
            est.input_size(&tx, 0),
            Err(TxBuilderError::MissingDeclaration { input: 0, .. })
        ));
        assert!(matches!(
            est.input_value(&tx, 0),
            Err(TxBuilderError::MissingDeclaration { input: 0, .. })
        ));
    }

    #[test]
    fn test_zero_declared_size_is_missing() {
        let mut tx = Transaction::new();
        tx.add_input(declared_input(&[Declaration::UnlockingData(UnlockingData {
            size: 0,
            value: 10,
            party: None,
        })]));
        let est = Estimator::default();
        assert!(matches!(
            est.input_size(&tx, 0),
            Err(TxBuilderError::MissingDeclaration { .. })
        ));
        assert_eq!(est.input_value(&tx, 0).unwrap(), 10);
    }

    #[test]
    fn test_input_value_precedence() {
        let mut tx = Transaction::new();
        // Known zero-value output with a declared value: the declaration wins.
        let mut input = known_input(p2pkh_lock(&[1; 20]), 0);
        input.unlocking_script = Some(
            placeholder_script(&[Declaration::UnlockingData(UnlockingData {
                size: 108,
                value: 777,
                party: None,
            })])
            .unwrap(),
        );
        tx.add_input(input);
        // Known zero-value output without a declaration counts as zero.
        tx.add_input(known_input(p2pkh_lock(&[2; 20]), 0));

        let est = Estimator::default();
        assert_eq!(est.input_value(&tx, 0).unwrap(), 777);
        assert_eq!(est.input_value(&tx, 1).unwrap(), 0);
        assert_eq!(est.inputs_value(&tx).unwrap(), 777);
    }

    #[test]
    fn test_unrecognized_template_policy() {
        let mut tx = Transaction::new();
        tx.add_input(known_input(Script::from_bytes(&[0x51]), 10));

        let lenient = Estimator::new(TemplatePolicy::AssumeP2pkh);
        assert_eq!(lenient.input_size(&tx, 0).unwrap(), MAX_P2PKH_INPUT_SIZE);

        let strict = Estimator::new(TemplatePolicy::Strict);
        assert!(matches!(
            strict.input_size(&tx, 0),
            Err(TxBuilderError::UnrecognizedTemplate { .. })
        ));
        assert!(strict.output_total_cost(&Script::from_bytes(&[0x51]), 1.0).is_err());
        assert_eq!(
            lenient.output_total_cost(&Script::from_bytes(&[0x51]), 1.0).unwrap(),
            (10, 149)
        );
    }

    #[test]
    fn test_agent_input_size() {
        let mut tx = Transaction::new();
        tx.add_input(known_input(agent_lock(&p2pkh_lock(&[1; 20]), &[2; 20]), 10));
        let est = Estimator::new(TemplatePolicy::Strict);
        assert_eq!(est.input_size(&tx, 0).unwrap(), 40 + 1 + 216);
    }

    #[test]
    fn test_fee_signed_and_floored() {
        let mut tx = Transaction::new();
        tx.add_input(known_input(p2pkh_lock(&[1; 20]), 100));
        tx.add_output(TransactionOutput::with_script(p2pkh_lock(&[2; 20]), 150, false));

        let est = Estimator::default();
        assert_eq!(est.actual_fee(&tx).unwrap(), -50);
        assert_eq!(est.fee(&tx).unwrap(), 0);
    }

    #[test]
    fn test_outputs_value_and_remainder() {
        let mut tx = Transaction::new();
        tx.add_output(TransactionOutput::with_script(p2pkh_lock(&[1; 20]), 500, false));
        tx.add_output(TransactionOutput::with_script(p2pkh_lock(&[2; 20]), 300, true));

        assert_eq!(outputs_value(&tx, true).unwrap(), 800);
        assert_eq!(outputs_value(&tx, false).unwrap(), 500);
        assert_eq!(change_value(&tx).unwrap(), 300);
        // floor(34 * 0.05) = 1
        assert_eq!(remainder(&tx, 0.05).unwrap(), 301);
    }

    #[test]
    fn test_output_total_cost_p2pkh() {
        let (output_fee, input_fee) =
            Estimator::default().output_total_cost(&p2pkh_lock(&[0; 20]), 0.05).unwrap();
        assert_eq!(output_fee, 2, "ceil(34 * 0.05)");
        assert_eq!(input_fee, 8, "ceil(149 * 0.05)");
    }

    #[test]
    fn test_declared_size_overflow() {
        let mut tx = Transaction::new();
        tx.add_input(declared_input(&[Declaration::UnlockingSize(UnlockingSize { size: u64::MAX })]));

        let est = Estimator::default();
        assert!(matches!(est.input_size(&tx, 0), Err(TxBuilderError::Overflow(_))));
        assert!(matches!(est.estimated_size(&tx), Err(TxBuilderError::Overflow(_))));
    }

    #[test]
    fn test_estimated_size_sum_overflow() {
        // Each input fits on its own; two of them do not.
        let size = u64::MAX / 2;
        let mut tx = Transaction::new();
        for _ in 0..2 {
            tx.add_input(declared_input(&[Declaration::UnlockingSize(UnlockingSize { size })]));
        }
        let est = Estimator::default();
        assert!(est.input_size(&tx, 0).is_ok());
        assert!(matches!(est.estimated_size(&tx), Err(TxBuilderError::Overflow(_))));
    }

    #[test]
    fn test_declared_value_overflow() {
        let value = u64::MAX / 2 + 1;
        let mut tx = Transaction::new();
        for _ in 0..2 {
            tx.add_input(declared_input(&[Declaration::UnlockingData(UnlockingData {
                size: 108,
                value,
                party: None,
            })]));
        }
        let est = Estimator::default();
        assert!(matches!(est.inputs_value(&tx), Err(TxBuilderError::Overflow(_))));
        assert!(matches!(est.actual_fee(&tx), Err(TxBuilderError::Overflow(_))));
    }

    #[test]
    fn test_actual_fee_beyond_i64() {
        let mut tx = Transaction::new();
        tx.add_input(known_input(p2pkh_lock(&[1; 20]), u64::MAX));

        let est = Estimator::default();
        assert_eq!(est.inputs_value(&tx).unwrap(), u64::MAX);
        assert!(matches!(est.actual_fee(&tx), Err(TxBuilderError::Overflow(_))));
        assert_eq!(est.fee(&tx).unwrap(), u64::MAX, "unsigned fee still fits");
    }

    #[test]
    fn test_output_sums_overflow() {
        let mut tx = Transaction::new();
        tx.add_output(TransactionOutput::with_script(p2pkh_lock(&[1; 20]), u64::MAX, true));
        tx.add_output(TransactionOutput::with_script(p2pkh_lock(&[2; 20]), 1, true));

        assert!(matches!(outputs_value(&tx, true), Err(TxBuilderError::Overflow(_))));
        assert!(matches!(change_value(&tx), Err(TxBuilderError::Overflow(_))));

        tx.outputs.pop();
        assert_eq!(change_value(&tx).unwrap(), u64::MAX);
        assert!(
            matches!(remainder(&tx, 1.0), Err(TxBuilderError::Overflow(_))),
            "saved output bytes push the remainder past u64::MAX"
        );
    }

}
