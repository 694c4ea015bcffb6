//! Transaction builder with fee estimation and change reconciliation.
//!
//! `TxBuilder` owns a transaction under construction together with its
//! fee configuration and change script, and exposes the estimator and
//! reconciler over it.

use bsv_script::Script;
use bsv_transaction::{Transaction, TransactionError, TransactionInput, TransactionOutput};
use tracing::{debug, info};

use crate::config::FeeConfig;
use crate::declaration::{placeholder_script, Declaration};
use crate::estimate::{self, Estimator};
use crate::fee::dust_limit_for_locking_script;
use crate::reconcile::{ChangeReconciler, FeeAdjustment};
use crate::size::{StandardSizer, TemplateSizer};
use crate::TxBuilderError;

/// A transaction under construction.
#[derive(Debug)]
pub struct TxBuilder<S = StandardSizer> {
    tx: Transaction,
    config: FeeConfig,
    change_script: Option<Script>,
    estimator: Estimator<S>,
}

impl TxBuilder<StandardSizer> {
    /// Create an empty builder with template-based sizing.
    pub fn new(config: FeeConfig) -> Result<Self, TxBuilderError> {
        TxBuilder::with_sizer(config, StandardSizer)
    }

    /// Wrap an existing transaction.
    pub fn from_transaction(tx: Transaction, config: FeeConfig) -> Result<Self, TxBuilderError> {
        let mut builder = TxBuilder::new(config)?;
        builder.tx = tx;
        Ok(builder)
    }
}

impl<S: TemplateSizer> TxBuilder<S> {
    /// Create an empty builder that sizes known inputs with `sizer`.
    pub fn with_sizer(config: FeeConfig, sizer: S) -> Result<Self, TxBuilderError> {
        config.validate()?;
        Ok(TxBuilder {
            tx: Transaction::new(),
            config,
            change_script: None,
            estimator: Estimator::with_sizer(sizer, config.unrecognized_template),
        })
    }

    /// The transaction built so far.
    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    /// The transaction, mutably, for signing inputs in place.
    pub fn transaction_mut(&mut self) -> &mut Transaction {
        &mut self.tx
    }

    /// Consume the builder, returning the transaction.
    pub fn into_transaction(self) -> Transaction {
        self.tx
    }

    /// The fee configuration.
    pub fn config(&self) -> &FeeConfig {
        &self.config
    }

    /// The estimator used for sizing.
    pub fn estimator(&self) -> &Estimator<S> {
        &self.estimator
    }

    /// The locking script used for change the builder creates.
    pub fn change_script(&self) -> Option<&Script> {
        self.change_script.as_ref()
    }

    /// Set the locking script used for change the builder creates.
    pub fn set_change_script(&mut self, script: Script) {
        self.change_script = Some(script);
    }

    // -----------------------------------------------------------------------
    // Inputs and outputs
    // -----------------------------------------------------------------------

    /// Add an input whose spent output is known.
    ///
    /// # Arguments
    /// * `source_txid` - Spent transaction id in internal byte order.
    /// * `vout` - Index of the spent output.
    /// * `locking_script` - The spent output's locking script.
    /// * `value` - The spent output's value in satoshis.
    pub fn add_input(&mut self, source_txid: [u8; 32], vout: u32, locking_script: Script, value: u64) {
        let mut input = TransactionInput::new();
        input.source_txid = source_txid;
        input.source_tx_out_index = vout;
        input.set_source_output(Some(TransactionOutput::with_script(locking_script, value, false)));
        self.tx.add_input(input);
    }

    /// Add an input that a counterparty will sign, described by
    /// declarations in a placeholder unlocking script.
    pub fn add_declared_input(
        &mut self,
        source_txid: [u8; 32],
        vout: u32,
        declarations: &[Declaration],
    ) -> Result<(), TxBuilderError> {
        let mut input = TransactionInput::new();
        input.source_txid = source_txid;
        input.source_tx_out_index = vout;
        input.unlocking_script = Some(placeholder_script(declarations)?);
        self.tx.add_input(input);
        Ok(())
    }

    /// Append an output.
    pub fn add_output(&mut self, locking_script: Script, value: u64, is_change: bool) {
        self.tx
            .add_output(TransactionOutput::with_script(locking_script, value, is_change));
    }

    // -----------------------------------------------------------------------
    // Size and value
    // -----------------------------------------------------------------------

    /// Estimated serialized size once signed.
    pub fn estimated_size(&self) -> Result<u64, TxBuilderError> {
        self.estimator.estimated_size(&self.tx)
    }

    /// Fee for the estimated size at the configured rate.
    pub fn estimated_fee(&self) -> Result<u64, TxBuilderError> {
        self.estimator.estimated_fee(&self.tx, self.config.fee_rate)
    }

    /// Inputs value minus outputs value.
    pub fn actual_fee(&self) -> Result<i64, TxBuilderError> {
        self.estimator.actual_fee(&self.tx)
    }

    /// Inputs value minus outputs value, floored at zero.
    pub fn fee(&self) -> Result<u64, TxBuilderError> {
        self.estimator.fee(&self.tx)
    }

    /// Sum of input values.
    pub fn inputs_value(&self) -> Result<u64, TxBuilderError> {
        self.estimator.inputs_value(&self.tx)
    }

    /// Sum of output values, leaving out change unless `include_change`.
    pub fn outputs_value(&self, include_change: bool) -> Result<u64, TxBuilderError> {
        estimate::outputs_value(&self.tx, include_change)
    }

    /// Sum of change output values.
    pub fn change_value(&self) -> Result<u64, TxBuilderError> {
        estimate::change_value(&self.tx)
    }

    /// Value recovered by dropping all change outputs.
    pub fn remainder(&self) -> Result<u64, TxBuilderError> {
        estimate::remainder(&self.tx, self.config.fee_rate)
    }

    // -----------------------------------------------------------------------
    // Fees
    // -----------------------------------------------------------------------

    /// Raise the fee by `delta` satoshis, or lower it when negative, through
    /// the change output.
    pub fn adjust_fee(&mut self, delta: i64) -> Result<FeeAdjustment, TxBuilderError> {
        ChangeReconciler::new(&self.estimator, self.config.fee_rate, self.change_script.as_ref())
            .adjust_fee(&mut self.tx, delta)
    }

    /// Move the fee to the estimated fee.
    pub fn calculate_fee(&mut self) -> Result<FeeAdjustment, TxBuilderError> {
        let (estimated, actual) = (self.estimated_fee()?, self.actual_fee()?);
        let delta = i64::try_from(estimated)
            .ok()
            .and_then(|estimated| estimated.checked_sub(actual))
            .ok_or_else(|| {
                TxBuilderError::Overflow(format!("fee delta {} - {}", estimated, actual))
            })?;
        debug!(delta, "calculating fee");
        self.adjust_fee(delta)
    }

    /// Move the whole fee into change.
    pub fn zeroize_fee(&mut self) -> Result<FeeAdjustment, TxBuilderError> {
        let delta = -self.actual_fee()?;
        self.adjust_fee(delta)
    }

    /// Repeat [`calculate_fee`](Self::calculate_fee) until settled or
    /// `max_rounds` rounds have run.
    ///
    /// # Returns
    /// The last adjustment made, `Unchanged` when `max_rounds` is zero.
    pub fn settle_fee(&mut self, max_rounds: usize) -> Result<FeeAdjustment, TxBuilderError> {
        let mut last = FeeAdjustment::Unchanged;
        for round in 0..max_rounds {
            last = self.calculate_fee()?;
            if last.is_settled() {
                info!(round, fee = self.fee()?, "fee settled");
                break;
            }
        }
        Ok(last)
    }

    // -----------------------------------------------------------------------
    // Dust
    // -----------------------------------------------------------------------

    /// Dust limit of output `index` at the configured dust rate.
    pub fn dust_limit_for_output(&self, index: usize) -> Result<u64, TxBuilderError> {
        let output = self.tx.outputs.get(index).ok_or_else(|| {
            TransactionError::InvalidTransaction(format!(
                "output index {} out of range ({} outputs)",
                index,
                self.tx.outputs.len()
            ))
        })?;
        Ok(dust_limit_for_locking_script(&output.locking_script, self.config.dust_fee_rate))
    }

    /// Whether output `index` holds less than its dust limit.
    pub fn is_dust(&self, index: usize) -> Result<bool, TxBuilderError> {
        let limit = self.dust_limit_for_output(index)?;
        Ok(self.tx.outputs[index].satoshis < limit)
    }
}
