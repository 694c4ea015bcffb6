/// BSV Blockchain SDK - Fee estimation and change reconciliation.
///
/// Predicts the size of a transaction once every input is signed, prices
/// it at a configured rate, and moves the difference between the estimated
/// and actual fee into or out of a change output. Inputs signed by a
/// counterparty are sized from declarations carried in placeholder
/// unlocking scripts.

pub mod access;
pub mod builder;
pub mod config;
pub mod declaration;
pub mod estimate;
pub mod fee;
pub mod reconcile;
pub mod size;

mod error;
pub use access::{TransactionAccess, TransactionAccessMut};
pub use builder::TxBuilder;
pub use config::{FeeConfig, TemplatePolicy};
pub use declaration::{Declaration, Protocols};
pub use error::{DeclarationError, Shortfall, TxBuilderError};
pub use estimate::Estimator;
pub use reconcile::{ChangeReconciler, FeeAdjustment};
pub use size::{StandardSizer, TemplateSizer};
