//! Domain types for caseflow
//!
//! A repair case is one engagement between one customer, one vehicle and
//! one shop. It moves through a strictly ordered lifecycle: verification,
//! install-window negotiation, decision lock, parts procurement, shipping,
//! install, post-confirmation. Every step is gated; nothing is skipped.
//!
//! # Key Concepts
//!
//! - **Case**: the aggregate root. Its `state` is a closed enum — the
//!   sixteen main-path states plus the `EXCEPTION_<TYPE>` pseudo-states.
//! - **DecisionLock / DecisionReceipt**: immutable, SHA-256-hashed audit
//!   records that freeze verified facts, risks and timing at the moment
//!   the customer commits to proceed.
//! - **CaseException**: an append-only out-of-band event (vendor delay,
//!   backorder, carrier exception, ...) that parks the case in an
//!   absorbing exception pseudo-state.
//!
//! # Design Principles
//!
//! 1. States are types, not strings. An unrecognized state cannot exist.
//! 2. Child records belong to exactly one case; there is no sharing.
//! 3. Decision locks are write-once. No update operation exists.

#![deny(unsafe_code)]

mod aggregate;
mod case;
mod errors;
mod exception;
mod fulfillment;
mod ids;
mod lock;
mod shipment;
mod window;

pub use aggregate::*;
pub use case::*;
pub use errors::*;
pub use exception::*;
pub use fulfillment::*;
pub use ids::*;
pub use lock::*;
pub use shipment::*;
pub use window::*;
