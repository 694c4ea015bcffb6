//! Fee and dust arithmetic.
//!
//! Rates are satoshis per byte. Fees owed round up so a transaction is
//! never underpaid; value handed back rounds down so it is never overstated.

use bsv_script::Script;

use crate::size::{output_size, output_size_for_locking_script_size, DUST_INPUT_SIZE};
use crate::TxBuilderError;

/// Fee for `size` bytes at `rate`, rounded up.
pub fn fee_for_size(size: u64, rate: f64) -> u64 {
    (size as f64 * rate).ceil() as u64
}

/// Value of `size` bytes at `rate`, rounded down.
pub fn value_for_size_floored(size: u64, rate: f64) -> u64 {
    (size as f64 * rate).floor() as u64
}

/// Minimum value for an output of `output_size` bytes to not be dust.
///
/// An output is dust when three times the cost of creating it and later
/// spending it with a `DUST_INPUT_SIZE` input exceeds its value. A zero
/// dust rate yields 1; the result is never below 1.
pub fn dust_limit(output_size: u64, dust_rate: f64) -> u64 {
    if dust_rate == 0.0 {
        return 1;
    }
    let spend_cycle = output_size.saturating_add(DUST_INPUT_SIZE).saturating_mul(3);
    fee_for_size(spend_cycle, dust_rate).max(1)
}

/// Dust limit of an output holding `locking_script`.
pub fn dust_limit_for_locking_script(locking_script: &Script, dust_rate: f64) -> u64 {
    dust_limit(output_size(locking_script), dust_rate)
}

/// Dust limit of an output whose locking script is `script_size` bytes.
pub fn dust_limit_for_locking_script_size(
    script_size: u64,
    dust_rate: f64,
) -> Result<u64, TxBuilderError> {
    Ok(dust_limit(output_size_for_locking_script_size(script_size)?, dust_rate))
}

/// Fee to include an output holding `locking_script`.
pub fn output_fee_for_locking_script(locking_script: &Script, rate: f64) -> u64 {
    fee_for_size(output_size(locking_script), rate)
}

/// Fee to include an output holding `locking_script`, and its dust limit.
///
/// # Returns
/// `(fee, dust_limit)`.
pub fn output_fee_and_dust_for_locking_script(
    locking_script: &Script,
    dust_rate: f64,
    rate: f64,
) -> (u64, u64) {
    let size = output_size(locking_script);
    (fee_for_size(size, rate), dust_limit(size, dust_rate))
}

/// Serialized size of an output holding `locking_script`, and its dust limit.
///
/// # Returns
/// `(size, dust_limit)`.
pub fn output_size_and_dust_for_locking_script(locking_script: &Script, dust_rate: f64) -> (u64, u64) {
    let size = output_size(locking_script);
    (size, dust_limit(size, dust_rate))
}
