//! Gate evaluator: cross-entity preconditions on top of the state graph.
//!
//! Four transitions need evidence beyond the raw graph edge — a decision
//! lock needs an accepted window, an appointment lock needs the full
//! paper trail, a shipment trigger needs its alerting prerequisites, and
//! an install start needs every shipment delivered. The evaluator
//! examines the loaded aggregate and returns a result; it does NOT
//! produce side effects.
//!
//! Every failure reason names the current state and the next action to
//! run. Callers surface these verbatim — they are the only sequencing
//! guidance the user gets.

use caseflow_types::{
    CaseAggregate, CaseState, CaseflowError, CaseflowResult, Shipment, ShipmentState,
};

/// Evaluates transition gates against a loaded case aggregate
#[derive(Clone, Debug, Default)]
pub struct GateEvaluator;

impl GateEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Gate: decision lock only after an install window was accepted.
    pub fn can_create_decision_lock(&self, agg: &CaseAggregate) -> GateResult {
        if agg.case.state != CaseState::InstallWindowAccepted {
            return GateResult::NotSatisfied {
                reason: format!(
                    "You must accept the install window before locking the decision. \
                     Your case is currently in \"{}\". Run \"Accept install window\" first.",
                    agg.case.state
                ),
            };
        }
        if agg.accepted_window().is_none() {
            return GateResult::NotSatisfied {
                reason: "No accepted install window found on this case. \
                         Run \"Accept install window\" first."
                    .into(),
            };
        }
        GateResult::Satisfied
    }

    /// Gate: appointment lock needs shop window confirmed plus the full
    /// paper trail — decision lock, vendor commitment, accepted window.
    pub fn can_lock_appointment(&self, agg: &CaseAggregate) -> GateResult {
        if agg.case.state != CaseState::ShopWindowConfirmed {
            return GateResult::NotSatisfied {
                reason: format!(
                    "Appointment lock is only allowed after the shop confirms its window. \
                     Your case is currently in \"{}\". Run \"Shop window confirm\" first.",
                    agg.case.state
                ),
            };
        }
        if agg.decision_lock().is_none() {
            return GateResult::NotSatisfied {
                reason: "Appointment lock not allowed: this case has no decision lock. \
                         Run \"Create decision lock\" first."
                    .into(),
            };
        }
        if !agg.has_vendor_commitment() {
            return GateResult::NotSatisfied {
                reason: "Appointment lock not allowed: no vendor availability confirmation \
                         on this case. Run \"Vendor availability confirm\" first."
                    .into(),
            };
        }
        if agg.accepted_window().is_none() {
            return GateResult::NotSatisfied {
                reason: "Appointment lock not allowed: no accepted install window on this \
                         case. Run \"Accept install window\" first."
                    .into(),
            };
        }
        GateResult::Satisfied
    }

    /// Gate: a shipment triggers only from draft, with alerts enabled, a
    /// tracking number set and the carrier webhook registered.
    pub fn can_trigger_shipment(&self, shipment: &Shipment) -> GateResult {
        if shipment.state != ShipmentState::Draft {
            return GateResult::NotSatisfied {
                reason: format!(
                    "Only a draft shipment can be triggered; this shipment is in \"{}\".",
                    shipment.state
                ),
            };
        }
        if !shipment.alerts_enabled {
            return GateResult::NotSatisfied {
                reason: "Cannot trigger: delivery alerts are not enabled on the shipment. \
                         Enable alerts first."
                    .into(),
            };
        }
        if shipment
            .tracking_number
            .as_deref()
            .map(str::is_empty)
            .unwrap_or(true)
        {
            return GateResult::NotSatisfied {
                reason: "Cannot trigger: the shipment has no tracking number. \
                         Set a tracking number first."
                    .into(),
            };
        }
        if !shipment.carrier_webhook_registered {
            return GateResult::NotSatisfied {
                reason: "Cannot trigger: the carrier exception webhook is not registered. \
                         Register the carrier webhook first."
                    .into(),
            };
        }
        GateResult::Satisfied
    }

    /// Gate: install starts only once the case is delivered and every
    /// shipment on the case is delivered (recomputed by scanning, an
    /// empty shipment list passes).
    pub fn can_start_install(&self, agg: &CaseAggregate) -> GateResult {
        if agg.case.state != CaseState::Delivered {
            return GateResult::NotSatisfied {
                reason: format!(
                    "Parts must be delivered to the shop before install can start. \
                     Your case is currently in \"{}\". Run \"Shipment delivered\" first.",
                    agg.case.state
                ),
            };
        }
        if !agg.all_shipments_delivered() {
            return GateResult::NotSatisfied {
                reason: "All parts shipments must be marked as delivered before the shop \
                         can start the install."
                    .into(),
            };
        }
        GateResult::Satisfied
    }
}

/// Result of evaluating a gate
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateResult {
    /// The gate is satisfied — the transition can proceed
    Satisfied,
    /// The gate is not satisfied
    NotSatisfied { reason: String },
}

impl GateResult {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied)
    }

    /// Turn an unsatisfied gate into a `GateViolation` for a case in
    /// `current_state`; satisfied gates pass through.
    pub fn check(self, current_state: CaseState) -> CaseflowResult<()> {
        match self {
            Self::Satisfied => Ok(()),
            Self::NotSatisfied { reason } => Err(CaseflowError::gate(current_state, reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseflow_types::{Case, CaseId, CustomerId, InstallWindow, ShopId, VehicleId};
    use chrono::Utc;

    fn aggregate_in(state: CaseState) -> CaseAggregate {
        let mut case = Case::new(
            CustomerId::new("cust-1"),
            VehicleId::new("veh-1"),
            ShopId::new("shop-1"),
        );
        case.state = state;
        CaseAggregate::new(case)
    }

    fn accepted_window(case_id: &CaseId) -> InstallWindow {
        let mut w = InstallWindow::propose(case_id.clone(), Utc::now(), Utc::now());
        w.accept();
        w
    }

    #[test]
    fn decision_lock_gate_wrong_state() {
        let agg = aggregate_in(CaseState::Verifying);
        let result = GateEvaluator::new().can_create_decision_lock(&agg);
        let GateResult::NotSatisfied { reason } = result else {
            panic!("gate must fail from VERIFYING");
        };
        assert!(reason.contains("VERIFYING"));
        assert!(reason.contains("Accept install window"));
    }

    #[test]
    fn decision_lock_gate_needs_accepted_window() {
        let mut agg = aggregate_in(CaseState::InstallWindowAccepted);
        let gates = GateEvaluator::new();
        assert!(!gates.can_create_decision_lock(&agg).is_satisfied());

        let window = accepted_window(&agg.case.id);
        agg.install_windows.push(window);
        assert!(gates.can_create_decision_lock(&agg).is_satisfied());
    }

    #[test]
    fn appointment_gate_reports_each_missing_prerequisite() {
        let gates = GateEvaluator::new();

        let mut agg = aggregate_in(CaseState::ShopWindowConfirmed);
        let GateResult::NotSatisfied { reason } = gates.can_lock_appointment(&agg) else {
            panic!("gate must fail without a decision lock");
        };
        assert!(reason.contains("no decision lock"));
        assert!(reason.contains("Create decision lock"));

        // Add the lock; the next missing prerequisite is named instead.
        let now = Utc::now();
        agg.decision_locks.push(caseflow_types::DecisionLock {
            id: caseflow_types::DecisionLockId::generate(),
            case_id: agg.case.id.clone(),
            verified_facts: vec!["fact".into()],
            unknowns: vec![],
            remaining_risks: vec![],
            install_window_start: now,
            install_window_end: now,
            consent_data: serde_json::json!({"accepted": true}),
            parts_strategy: caseflow_types::DEFAULT_PARTS_STRATEGY.into(),
            client_ip: None,
            device_info: None,
            version: None,
            audit_hash: "00".into(),
            created_at: now,
        });
        let GateResult::NotSatisfied { reason } = gates.can_lock_appointment(&agg) else {
            panic!("gate must fail without a vendor commitment");
        };
        assert!(reason.contains("vendor availability"));
    }

    #[test]
    fn appointment_gate_wrong_state_names_state() {
        let agg = aggregate_in(CaseState::DecisionLocked);
        let GateResult::NotSatisfied { reason } =
            GateEvaluator::new().can_lock_appointment(&agg)
        else {
            panic!("gate must fail from DECISION_LOCKED");
        };
        assert!(reason.contains("DECISION_LOCKED"));
        assert!(reason.contains("Shop window confirm"));
    }

    #[test]
    fn shipment_trigger_gate_flips_with_prerequisites() {
        let gates = GateEvaluator::new();
        let case_id = CaseId::new("case-1");

        let bare = Shipment::draft(case_id.clone());
        let GateResult::NotSatisfied { reason } = gates.can_trigger_shipment(&bare) else {
            panic!("bare draft must not be triggerable");
        };
        assert!(reason.contains("alerts"));

        let ready = Shipment::draft(case_id)
            .with_alerts_enabled(true)
            .with_tracking_number("1Z999")
            .with_carrier_webhook_registered(true);
        assert!(gates.can_trigger_shipment(&ready).is_satisfied());
    }

    #[test]
    fn shipment_trigger_gate_rejects_non_draft() {
        let mut shipment = Shipment::draft(CaseId::new("case-1"))
            .with_alerts_enabled(true)
            .with_tracking_number("1Z999")
            .with_carrier_webhook_registered(true);
        shipment.set_state(ShipmentState::ShipTriggered);

        let GateResult::NotSatisfied { reason } =
            GateEvaluator::new().can_trigger_shipment(&shipment)
        else {
            panic!("non-draft must not be triggerable");
        };
        assert!(reason.contains("SHIP_TRIGGERED"));
    }

    #[test]
    fn empty_tracking_number_is_not_enough() {
        let shipment = Shipment::draft(CaseId::new("case-1"))
            .with_alerts_enabled(true)
            .with_tracking_number("")
            .with_carrier_webhook_registered(true);
        assert!(!GateEvaluator::new().can_trigger_shipment(&shipment).is_satisfied());
    }

    #[test]
    fn start_install_gate_scans_all_shipments() {
        let gates = GateEvaluator::new();
        let mut agg = aggregate_in(CaseState::Delivered);

        // No shipments at all: pass.
        assert!(gates.can_start_install(&agg).is_satisfied());

        let mut delivered = Shipment::draft(agg.case.id.clone());
        delivered.set_state(ShipmentState::Delivered);
        agg.shipments.push(delivered);
        assert!(gates.can_start_install(&agg).is_satisfied());

        let mut straggler = Shipment::draft(agg.case.id.clone());
        straggler.set_state(ShipmentState::InTransit);
        agg.shipments.push(straggler);
        let GateResult::NotSatisfied { reason } = gates.can_start_install(&agg) else {
            panic!("undelivered shipment must block install");
        };
        assert!(reason.contains("delivered"));
    }

    #[test]
    fn gate_check_maps_to_gate_violation() {
        let agg = aggregate_in(CaseState::InTransit);
        let err = GateEvaluator::new()
            .can_start_install(&agg)
            .check(agg.case.state)
            .unwrap_err();
        assert_eq!(err.kind(), caseflow_types::ErrorKind::GateViolation);
        assert_eq!(err.current_state(), Some(CaseState::InTransit));
        assert!(err.to_string().contains("IN_TRANSIT"));
    }
}
