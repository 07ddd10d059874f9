//! Leaf types shared by the dbfixture crates
//!
//! - [`RunId`] ties together the log events of one provisioning run
//! - [`Sensitive`] keeps credentials out of formatted output
//! - [`schema`] names the fields and operations in structured logs

pub mod correlation;
pub mod schema;
pub mod sensitive;

pub use correlation::RunId;
pub use sensitive::Sensitive;
