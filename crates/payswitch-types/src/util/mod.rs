//! Utility types and functions for payswitch.
//!
//! - [`b64`] - Base64 carrier for pending-request metadata
//! - [`money_amount`] - Human-readable currency amount parsing

pub mod b64;
pub mod money_amount;

pub use b64::*;
pub use money_amount::MoneyAmount;
