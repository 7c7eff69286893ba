//! Caseflow lifecycle engine
//!
//! The engine is the only code allowed to move a case through its
//! lifecycle. It is split the way the workflow reads:
//!
//! - [`state_graph`]: the static transition table — pure data and pure
//!   functions, exhaustively matched over [`caseflow_types::CaseState`].
//! - [`gate_evaluator`]: cross-entity preconditions that must hold in
//!   addition to the raw graph edge, each failure carrying a
//!   human-actionable reason.
//! - [`decision_lock`]: builds and hashes the immutable decision-lock
//!   and decision-receipt audit records.
//! - [`orchestrator`]: one operation per lifecycle action — load the
//!   aggregate, gate-check, mutate, commit atomically.
//! - [`exception`]: the side channel that records out-of-band
//!   disruptions from any state, bypassing all gates.

#![deny(unsafe_code)]

pub mod decision_lock;
pub mod exception;
pub mod gate_evaluator;
pub mod orchestrator;
pub mod state_graph;

pub use decision_lock::{ConsentInput, DecisionLockRequest, DecisionLockService};
pub use exception::ExceptionSideChannel;
pub use gate_evaluator::{GateEvaluator, GateResult};
pub use orchestrator::{
    CaseOrchestrator, CustodyRequest, ShipmentRef, ShipmentRequest, ShipmentUpdate,
    VendorConfirmRequest, VerifyRequest,
};
