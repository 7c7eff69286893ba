//! Decision-lock service: builds and hashes the audit record pair.
//!
//! The lock's `audit_hash` is a SHA-256 hex digest over the canonical
//! JSON of the locked fields, serialized in declaration order. The hash
//! is a verifiable commitment, not a secret: identical input yields a
//! byte-identical digest, and any field change yields a different one.
//! The receipt payload includes the lock's id, so the two hashes always
//! differ.

use caseflow_types::{
    CaseId, CaseflowError, CaseflowResult, DecisionLock, DecisionLockId, DecisionReceipt,
    DecisionReceiptId, TimingPlan, DEFAULT_PARTS_STRATEGY,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Input payload for creating a decision lock.
///
/// The fact/risk arrays are required; empty arrays are syntactically
/// valid and the caller's responsibility.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionLockRequest {
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
    /// Consent as captured at the boundary (object or bare boolean)
    pub consent: ConsentInput,
    /// Parts custody strategy; defaults to `STATE_A_SUPPLIER_CUSTODY`
    #[serde(default)]
    pub parts_strategy: Option<String>,
    /// Client IP at consent time
    #[serde(default)]
    pub client_ip: Option<String>,
    /// Device info at consent time
    #[serde(default)]
    pub device_info: Option<String>,
    /// Consent-form version
    #[serde(default)]
    pub version: Option<String>,
    /// Legal references to carry onto the receipt
    #[serde(default)]
    pub legal_refs: Option<serde_json::Value>,
}

/// Consent as the boundary captures it: either a structured record or a
/// bare flag, which is normalized into `{"accepted": bool}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConsentInput {
    /// A bare accept/decline flag
    Flag(bool),
    /// A structured consent record
    Data(serde_json::Map<String, serde_json::Value>),
}

impl ConsentInput {
    /// Normalize into the stored object form.
    pub fn normalize(self) -> serde_json::Value {
        match self {
            Self::Flag(accepted) => serde_json::json!({ "accepted": accepted }),
            Self::Data(map) => serde_json::Value::Object(map),
        }
    }
}

/// The hashed portion of a decision lock, in canonical field order.
#[derive(Serialize)]
struct LockHashPayload<'a> {
    verified_facts: &'a [String],
    unknowns: &'a [String],
    remaining_risks: &'a [String],
    install_window_start: &'a DateTime<Utc>,
    install_window_end: &'a DateTime<Utc>,
    consent_data: &'a serde_json::Value,
    parts_strategy: &'a str,
    client_ip: &'a Option<String>,
    device_info: &'a Option<String>,
    version: &'a Option<String>,
}

/// The hashed portion of a decision receipt. Includes the lock id so the
/// receipt hash can never collide with the lock hash.
#[derive(Serialize)]
struct ReceiptHashPayload<'a> {
    verified_facts: &'a [String],
    risks_accepted: &'a [String],
    unknowns: &'a [String],
    timing_plan: &'a TimingPlan,
    legal_refs: &'a Option<serde_json::Value>,
    decision_lock_id: &'a DecisionLockId,
}

/// Builds the immutable decision-lock / decision-receipt pair
#[derive(Clone, Debug, Default)]
pub struct DecisionLockService;

impl DecisionLockService {
    pub fn new() -> Self {
        Self
    }

    /// Build the lock and its matching receipt for a case.
    ///
    /// Pure with respect to storage: the orchestrator persists both
    /// records together with the state change in one commit.
    pub fn build(
        &self,
        case_id: &CaseId,
        request: DecisionLockRequest,
    ) -> CaseflowResult<(DecisionLock, DecisionReceipt)> {
        let consent_data = request.consent.normalize();
        let parts_strategy = request
            .parts_strategy
            .unwrap_or_else(|| DEFAULT_PARTS_STRATEGY.to_string());

        let lock_hash = sha256_hex(&canonical_json(&LockHashPayload {
            verified_facts: &request.verified_facts,
            unknowns: &request.unknowns,
            remaining_risks: &request.remaining_risks,
            install_window_start: &request.install_window_start,
            install_window_end: &request.install_window_end,
            consent_data: &consent_data,
            parts_strategy: &parts_strategy,
            client_ip: &request.client_ip,
            device_info: &request.device_info,
            version: &request.version,
        })?);

        let lock = DecisionLock {
            id: DecisionLockId::generate(),
            case_id: case_id.clone(),
            verified_facts: request.verified_facts.clone(),
            unknowns: request.unknowns.clone(),
            remaining_risks: request.remaining_risks.clone(),
            install_window_start: request.install_window_start,
            install_window_end: request.install_window_end,
            consent_data,
            parts_strategy,
            client_ip: request.client_ip,
            device_info: request.device_info,
            version: request.version,
            audit_hash: lock_hash,
            created_at: Utc::now(),
        };

        let timing_plan = TimingPlan {
            install_window_start: request.install_window_start,
            install_window_end: request.install_window_end,
        };
        let receipt_hash = sha256_hex(&canonical_json(&ReceiptHashPayload {
            verified_facts: &lock.verified_facts,
            risks_accepted: &lock.remaining_risks,
            unknowns: &lock.unknowns,
            timing_plan: &timing_plan,
            legal_refs: &request.legal_refs,
            decision_lock_id: &lock.id,
        })?);

        let receipt = DecisionReceipt {
            id: DecisionReceiptId::generate(),
            case_id: case_id.clone(),
            decision_lock_id: lock.id.clone(),
            verified_facts: lock.verified_facts.clone(),
            risks_accepted: lock.remaining_risks.clone(),
            unknowns: lock.unknowns.clone(),
            timing_plan,
            legal_refs: request.legal_refs,
            audit_hash: receipt_hash,
            created_at: Utc::now(),
        };

        Ok((lock, receipt))
    }

    /// Recompute a lock's hash from its stored fields and compare.
    pub fn verify_lock(&self, lock: &DecisionLock) -> CaseflowResult<bool> {
        let recomputed = sha256_hex(&canonical_json(&LockHashPayload {
            verified_facts: &lock.verified_facts,
            unknowns: &lock.unknowns,
            remaining_risks: &lock.remaining_risks,
            install_window_start: &lock.install_window_start,
            install_window_end: &lock.install_window_end,
            consent_data: &lock.consent_data,
            parts_strategy: &lock.parts_strategy,
            client_ip: &lock.client_ip,
            device_info: &lock.device_info,
            version: &lock.version,
        })?);
        Ok(recomputed == lock.audit_hash)
    }

    /// Recompute a receipt's hash from its stored fields and compare.
    pub fn verify_receipt(&self, receipt: &DecisionReceipt) -> CaseflowResult<bool> {
        let recomputed = sha256_hex(&canonical_json(&ReceiptHashPayload {
            verified_facts: &receipt.verified_facts,
            risks_accepted: &receipt.risks_accepted,
            unknowns: &receipt.unknowns,
            timing_plan: &receipt.timing_plan,
            legal_refs: &receipt.legal_refs,
            decision_lock_id: &receipt.decision_lock_id,
        })?);
        Ok(recomputed == receipt.audit_hash)
    }
}

fn canonical_json<T: Serialize>(payload: &T) -> CaseflowResult<String> {
    serde_json::to_string(payload)
        .map_err(|e| CaseflowError::Validation(format!("unserializable audit payload: {e}")))
}

fn sha256_hex(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_request() -> DecisionLockRequest {
        DecisionLockRequest {
            verified_facts: vec!["brake pads worn".into()],
            unknowns: vec![],
            remaining_risks: vec!["possible rotor wear".into()],
            install_window_start: "2025-01-10T09:00:00Z".parse().unwrap(),
            install_window_end: "2025-01-10T12:00:00Z".parse().unwrap(),
            consent: ConsentInput::Flag(true),
            parts_strategy: None,
            client_ip: Some("203.0.113.9".into()),
            device_info: Some("test-agent".into()),
            version: Some("v3".into()),
            legal_refs: None,
        }
    }

    #[test]
    fn hash_is_deterministic_for_identical_input() {
        let service = DecisionLockService::new();
        let case_id = CaseId::new("case-1");
        let (lock_a, _) = service.build(&case_id, make_request()).unwrap();
        let (lock_b, _) = service.build(&case_id, make_request()).unwrap();
        assert_eq!(lock_a.audit_hash, lock_b.audit_hash);
        assert_eq!(lock_a.audit_hash.len(), 64);
    }

    #[test]
    fn changing_one_field_changes_the_hash() {
        let service = DecisionLockService::new();
        let case_id = CaseId::new("case-1");
        let (baseline, _) = service.build(&case_id, make_request()).unwrap();

        let mut tweaked = make_request();
        tweaked.remaining_risks = vec!["possible rotor wear (severe)".into()];
        let (changed, _) = service.build(&case_id, tweaked).unwrap();
        assert_ne!(baseline.audit_hash, changed.audit_hash);
    }

    #[test]
    fn lock_and_receipt_hashes_differ() {
        let service = DecisionLockService::new();
        let (lock, receipt) = service.build(&CaseId::new("case-1"), make_request()).unwrap();
        assert_ne!(lock.audit_hash, receipt.audit_hash);
        assert_eq!(receipt.decision_lock_id, lock.id);
        assert_eq!(receipt.risks_accepted, lock.remaining_risks);
    }

    #[test]
    fn stored_records_verify_and_tampering_is_detected() {
        let service = DecisionLockService::new();
        let (mut lock, receipt) = service.build(&CaseId::new("case-1"), make_request()).unwrap();

        assert!(service.verify_lock(&lock).unwrap());
        assert!(service.verify_receipt(&receipt).unwrap());

        lock.verified_facts.push("invented after the fact".into());
        assert!(!service.verify_lock(&lock).unwrap());
    }

    #[test]
    fn bare_boolean_consent_is_wrapped() {
        let service = DecisionLockService::new();
        let (lock, _) = service.build(&CaseId::new("case-1"), make_request()).unwrap();
        assert_eq!(lock.consent_data, serde_json::json!({"accepted": true}));
    }

    #[test]
    fn structured_consent_is_kept_and_hashed() {
        let service = DecisionLockService::new();
        let mut request = make_request();
        let consent: serde_json::Map<String, serde_json::Value> =
            serde_json::json!({"accepted": true, "channel": "app"})
                .as_object()
                .cloned()
                .unwrap();
        request.consent = ConsentInput::Data(consent);

        let (lock, _) = service.build(&CaseId::new("case-1"), request).unwrap();
        assert_eq!(lock.consent_data["channel"], "app");

        let (flag_lock, _) = service.build(&CaseId::new("case-1"), make_request()).unwrap();
        assert_ne!(lock.audit_hash, flag_lock.audit_hash);
    }

    #[test]
    fn default_parts_strategy_applies() {
        let service = DecisionLockService::new();
        let (lock, _) = service.build(&CaseId::new("case-1"), make_request()).unwrap();
        assert_eq!(lock.parts_strategy, DEFAULT_PARTS_STRATEGY);
    }
}
