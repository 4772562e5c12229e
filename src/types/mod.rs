//! Type definitions for the fraud scoring pipeline

pub mod alert;
pub mod prediction;
pub mod transaction;

pub use alert::FraudAlert;
pub use prediction::Prediction;
pub use transaction::Transaction;
