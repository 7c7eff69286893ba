//! Decision locks and decision receipts: the legal audit artifacts.
//!
//! A decision lock freezes the verified facts, remaining risks, consent
//! and timing plan at the moment the customer commits to proceed. It is
//! written at most once per case and never updated. Its `audit_hash` is a
//! SHA-256 commitment over the canonical JSON of the locked fields, so
//! any later tampering is detectable by recomputation.
//!
//! The decision receipt is the customer-facing derivative: a summary of
//! what was agreed, independently hashed (its payload includes the lock's
//! id, so the two hashes always differ).

use crate::{CaseId, DecisionLockId, DecisionReceiptId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default parts custody strategy when the caller does not name one.
pub const DEFAULT_PARTS_STRATEGY: &str = "STATE_A_SUPPLIER_CUSTODY";

/// The immutable, hashed record of facts, risks and consent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionLock {
    /// Unique lock id
    pub id: DecisionLockId,
    /// The case this lock belongs to (at most one lock per case)
    pub case_id: CaseId,
    /// Facts verified during the diagnostic
    pub verified_facts: Vec<String>,
    /// Facts that could not be verified
    pub unknowns: Vec<String>,
    /// Risks the customer accepts by proceeding
    pub remaining_risks: Vec<String>,
    /// Start of the accepted install window
    pub install_window_start: DateTime<Utc>,
    /// End of the accepted install window
    pub install_window_end: DateTime<Utc>,
    /// Consent record, normalized to an object (a bare boolean is wrapped
    /// as `{"accepted": bool}`)
    pub consent_data: serde_json::Value,
    /// Parts custody strategy, defaults to [`DEFAULT_PARTS_STRATEGY`]
    pub parts_strategy: String,
    /// Client IP at the moment of consent, if captured
    pub client_ip: Option<String>,
    /// Device info at the moment of consent, if captured
    pub device_info: Option<String>,
    /// Consent-form version shown to the customer, if captured
    pub version: Option<String>,
    /// SHA-256 hex digest of the canonical JSON of the fields above
    pub audit_hash: String,
    /// When the lock was written
    pub created_at: DateTime<Utc>,
}

/// The timing plan carried on a decision receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingPlan {
    /// Start of the agreed install window
    pub install_window_start: DateTime<Utc>,
    /// End of the agreed install window
    pub install_window_end: DateTime<Utc>,
}

/// The customer-facing summary of a decision lock.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionReceipt {
    /// Unique receipt id
    pub id: DecisionReceiptId,
    /// The case this receipt belongs to
    pub case_id: CaseId,
    /// The decision lock this receipt summarizes
    pub decision_lock_id: DecisionLockId,
    /// Facts verified during the diagnostic
    pub verified_facts: Vec<String>,
    /// Risks the customer accepted (the lock's remaining risks)
    pub risks_accepted: Vec<String>,
    /// Facts that could not be verified
    pub unknowns: Vec<String>,
    /// The agreed timing plan
    pub timing_plan: TimingPlan,
    /// Legal references shown to the customer, if any
    pub legal_refs: Option<serde_json::Value>,
    /// SHA-256 hex digest over the receipt payload plus the lock id
    pub audit_hash: String,
    /// When the receipt was written
    pub created_at: DateTime<Utc>,
}
