//! The case orchestrator: one operation per lifecycle action.
//!
//! Every operation follows the same shape: load the aggregate, check the
//! graph edge and any cross-entity gate, mutate in memory, then commit
//! the case row and its new children in one store transaction. Nothing
//! is persisted when a check fails.
//!
//! Refusals carry the current state and the next required action in the
//! message; callers surface them verbatim.

use caseflow_store::{CaseCommit, CaseStore, ChildWrite};
use caseflow_types::{
    Appointment, Case, CaseAggregate, CaseId, CaseState, CaseflowError, CaseflowResult,
    CommitmentId, Custody, CustodyEvent, CustodyEventId, CustomerId, ExceptionType, InstallWindow,
    InstallWindowId, Shipment, ShipmentId, ShipmentState, ShopId, VehicleId,
    VendorFulfillmentCommitment, VendorId,
};
use chrono::{DateTime, Utc};

use crate::decision_lock::{DecisionLockRequest, DecisionLockService};
use crate::exception::ExceptionSideChannel;
use crate::gate_evaluator::GateEvaluator;

/// Input for the two verification steps.
///
/// `verified: false` starts the diagnostic; `verified: true` completes
/// it and records the findings.
#[derive(Clone, Debug, Default)]
pub struct VerifyRequest {
    pub verified: bool,
    pub diagnostic_summary: Option<String>,
    pub recommended_parts: Option<String>,
    pub labor_estimate_hours: Option<f64>,
}

impl VerifyRequest {
    /// Start the diagnostic.
    pub fn start() -> Self {
        Self::default()
    }

    /// Complete the diagnostic with the shop's findings.
    pub fn done(
        diagnostic_summary: impl Into<String>,
        recommended_parts: impl Into<String>,
        labor_estimate_hours: f64,
    ) -> Self {
        Self {
            verified: true,
            diagnostic_summary: Some(diagnostic_summary.into()),
            recommended_parts: Some(recommended_parts.into()),
            labor_estimate_hours: Some(labor_estimate_hours),
        }
    }
}

/// Input for a vendor availability confirmation.
#[derive(Clone, Debug)]
pub struct VendorConfirmRequest {
    pub vendor_id: VendorId,
    pub sku: String,
    pub quantity: u32,
    pub available: bool,
    pub lead_time_min_days: Option<u32>,
    pub lead_time_max_days: Option<u32>,
    pub service_level: Option<String>,
    pub cutoff_time: Option<DateTime<Utc>>,
    pub backorder_risk: bool,
    pub valid_until: DateTime<Utc>,
    pub confirmation_ref: Option<String>,
}

/// Input for creating a draft shipment.
#[derive(Clone, Debug, Default)]
pub struct ShipmentRequest {
    pub tracking_number: Option<String>,
    pub alerts_enabled: bool,
    pub carrier_webhook_registered: bool,
}

/// Partial update of a draft shipment; `None` fields are left alone.
#[derive(Clone, Debug, Default)]
pub struct ShipmentUpdate {
    pub tracking_number: Option<String>,
    pub alerts_enabled: Option<bool>,
    pub carrier_webhook_registered: Option<bool>,
}

/// Input for recording a chain-of-custody handoff.
#[derive(Clone, Debug)]
pub struct CustodyRequest {
    pub shipment_id: ShipmentId,
    pub custody: Custody,
    pub proof_ref: Option<String>,
    pub declared_value: Option<f64>,
    pub insurance_ref: Option<String>,
}

/// How carrier-side callers identify a shipment.
#[derive(Clone, Debug)]
pub enum ShipmentRef {
    Id(ShipmentId),
    Tracking(String),
}

/// Drives cases through the lifecycle against a [`CaseStore`].
pub struct CaseOrchestrator<S: CaseStore> {
    store: S,
    gates: GateEvaluator,
    locks: DecisionLockService,
    exceptions: ExceptionSideChannel,
}

impl<S: CaseStore> CaseOrchestrator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            gates: GateEvaluator::new(),
            locks: DecisionLockService::new(),
            exceptions: ExceptionSideChannel::new(),
        }
    }

    /// Open a new case in `CASE_CREATED`.
    pub fn create_case(
        &self,
        customer_id: CustomerId,
        vehicle_id: VehicleId,
        shop_id: ShopId,
    ) -> CaseflowResult<Case> {
        let case = Case::new(customer_id, vehicle_id, shop_id);
        self.store.create_case(case.clone())?;
        tracing::info!(case_id = %case.id, "case created");
        Ok(case)
    }

    /// Load a case aggregate, scoped to the owning customer. A case that
    /// exists but belongs to someone else is reported as not found.
    pub fn load_owned(
        &self,
        actor: &CustomerId,
        case_id: &CaseId,
    ) -> CaseflowResult<CaseAggregate> {
        let agg = self.store.get_aggregate(case_id)?;
        if agg.case.customer_id != *actor {
            return Err(CaseflowError::not_found("case", case_id));
        }
        Ok(agg)
    }

    /// Begin the optional cooling-off pause before verification.
    pub fn start_decision_pause(
        &self,
        actor: &CustomerId,
        case_id: &CaseId,
    ) -> CaseflowResult<CaseAggregate> {
        let mut agg = self.load_owned(actor, case_id)?;
        if agg.case.state != CaseState::CaseCreated {
            return Err(CaseflowError::gate(
                agg.case.state,
                format!(
                    "A decision pause can only start right after case creation. \
                     Your case is currently in \"{}\".",
                    agg.case.state
                ),
            ));
        }
        self.advance(&mut agg.case, CaseState::DecisionPauseActive);
        self.store.commit(CaseCommit::new(agg.case))
    }

    /// Start or complete the shop diagnostic.
    pub fn verify(
        &self,
        actor: &CustomerId,
        case_id: &CaseId,
        request: VerifyRequest,
    ) -> CaseflowResult<CaseAggregate> {
        let mut agg = self.load_owned(actor, case_id)?;
        if request.verified {
            if agg.case.state != CaseState::Verifying {
                return Err(CaseflowError::gate(
                    agg.case.state,
                    format!(
                        "Verification can only be completed while the case is in \
                         \"VERIFYING\". Your case is currently in \"{}\". \
                         Run \"Verify (start)\" first.",
                        agg.case.state
                    ),
                ));
            }
            agg.case.diagnostic_summary = request.diagnostic_summary;
            agg.case.recommended_parts = request.recommended_parts;
            agg.case.labor_estimate_hours = request.labor_estimate_hours;
            self.advance(&mut agg.case, CaseState::VerifiedWithUnknowns);
        } else {
            match agg.case.state {
                CaseState::CaseCreated | CaseState::DecisionPauseActive => {
                    self.advance(&mut agg.case, CaseState::Verifying);
                }
                CaseState::Verifying => {
                    return Err(CaseflowError::gate(
                        agg.case.state,
                        "Verification has already started. Run \"Verify (done)\" next.",
                    ));
                }
                other => {
                    return Err(CaseflowError::gate(
                        other,
                        format!(
                            "Verification can only start right after case creation or \
                             the decision pause. Your case is currently in \"{}\".",
                            other
                        ),
                    ));
                }
            }
        }
        self.store.commit(CaseCommit::new(agg.case))
    }

    /// Propose an install window. Allowed once verification is done;
    /// further windows may be proposed until one is accepted.
    pub fn propose_install_window(
        &self,
        actor: &CustomerId,
        case_id: &CaseId,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> CaseflowResult<CaseAggregate> {
        let mut agg = self.load_owned(actor, case_id)?;
        match agg.case.state {
            CaseState::VerifiedWithUnknowns => {
                self.advance(&mut agg.case, CaseState::InstallWindowProposed);
            }
            CaseState::InstallWindowProposed => {}
            other => {
                let next = if other == CaseState::InstallWindowAccepted {
                    "Run \"Create decision lock\" next."
                } else {
                    "Complete \"Verify (done)\" first."
                };
                return Err(CaseflowError::gate(
                    other,
                    format!(
                        "Install windows can only be proposed after verification. \
                         Your case is currently in \"{}\". {}",
                        other, next
                    ),
                ));
            }
        }
        let window = InstallWindow::propose(case_id.clone(), start_at, end_at);
        self.store
            .commit(CaseCommit::new(agg.case).write(ChildWrite::InstallWindow(window)))
    }

    /// Accept one proposed install window by id.
    pub fn accept_install_window(
        &self,
        actor: &CustomerId,
        case_id: &CaseId,
        window_id: &InstallWindowId,
    ) -> CaseflowResult<CaseAggregate> {
        let mut agg = self.load_owned(actor, case_id)?;
        if agg.case.state != CaseState::InstallWindowProposed {
            return Err(CaseflowError::gate(
                agg.case.state,
                format!(
                    "An install window can only be accepted while one is proposed. \
                     Your case is currently in \"{}\". Run \"Propose install window\" first.",
                    agg.case.state
                ),
            ));
        }
        let mut window = agg
            .install_window(window_id)
            .cloned()
            .ok_or_else(|| CaseflowError::not_found("install window", window_id))?;
        if window.is_accepted() {
            return Err(CaseflowError::Validation(
                "Install window not found or not proposed".into(),
            ));
        }
        window.accept();
        self.advance(&mut agg.case, CaseState::InstallWindowAccepted);
        self.store
            .commit(CaseCommit::new(agg.case).write(ChildWrite::InstallWindow(window)))
    }

    /// Write the decision lock and its receipt, freezing the facts,
    /// risks and consent. At most one per case; the store enforces the
    /// same rule again inside the commit, so a racing duplicate fails
    /// with `Conflict` instead of landing.
    pub fn create_decision_lock(
        &self,
        actor: &CustomerId,
        case_id: &CaseId,
        request: DecisionLockRequest,
    ) -> CaseflowResult<CaseAggregate> {
        let mut agg = self.load_owned(actor, case_id)?;
        if agg.decision_lock().is_some() {
            return Err(CaseflowError::Conflict(
                "This case already has a decision lock. Continue with the next step \
                 (Vendor availability confirm)."
                    .into(),
            ));
        }
        self.gates
            .can_create_decision_lock(&agg)
            .check(agg.case.state)?;
        let (lock, receipt) = self.locks.build(case_id, request)?;
        self.advance(&mut agg.case, CaseState::DecisionLocked);
        self.store.commit(
            CaseCommit::new(agg.case)
                .write(ChildWrite::DecisionLock(lock))
                .write(ChildWrite::DecisionReceipt(receipt)),
        )
    }

    /// Record a vendor's availability confirmation. Vendor-side call, so
    /// there is no customer ownership check.
    pub fn confirm_vendor_availability(
        &self,
        case_id: &CaseId,
        request: VendorConfirmRequest,
    ) -> CaseflowResult<CaseAggregate> {
        if request.sku.trim().is_empty() {
            return Err(CaseflowError::Validation("sku is required".into()));
        }
        let mut agg = self.store.get_aggregate(case_id)?;
        if agg.case.state != CaseState::DecisionLocked {
            return Err(CaseflowError::gate(
                agg.case.state,
                format!(
                    "Vendor availability can only be confirmed after the decision lock. \
                     Your case is currently in \"{}\". Run \"Create decision lock\" first.",
                    agg.case.state
                ),
            ));
        }
        let commitment = VendorFulfillmentCommitment {
            id: CommitmentId::generate(),
            case_id: case_id.clone(),
            vendor_id: request.vendor_id,
            sku: request.sku,
            quantity: request.quantity,
            available: request.available,
            lead_time_min_days: request.lead_time_min_days,
            lead_time_max_days: request.lead_time_max_days,
            service_level: request.service_level,
            cutoff_time: request.cutoff_time,
            backorder_risk: request.backorder_risk,
            valid_until: request.valid_until,
            confirmation_ref: request.confirmation_ref,
            created_at: Utc::now(),
        };
        self.advance(&mut agg.case, CaseState::VendorAvailConfirmed);
        self.store
            .commit(CaseCommit::new(agg.case).write(ChildWrite::VendorCommitment(commitment)))
    }

    /// Shop confirms it can work the accepted window.
    pub fn confirm_shop_window(
        &self,
        actor: &CustomerId,
        case_id: &CaseId,
    ) -> CaseflowResult<CaseAggregate> {
        let mut agg = self.load_owned(actor, case_id)?;
        if agg.case.state != CaseState::VendorAvailConfirmed {
            return Err(CaseflowError::gate(
                agg.case.state,
                format!(
                    "Parts vendor must confirm availability before the shop can confirm \
                     its window. Your case is currently in \"{}\". \
                     Run \"Vendor availability confirm\" first.",
                    agg.case.state
                ),
            ));
        }
        self.advance(&mut agg.case, CaseState::ShopWindowConfirmed);
        self.store.commit(CaseCommit::new(agg.case))
    }

    /// Lock the shop appointment against the decision lock. The shop
    /// names the slot; it usually matches the accepted window but is not
    /// required to.
    pub fn lock_appointment(
        &self,
        actor: &CustomerId,
        case_id: &CaseId,
        slot_start: DateTime<Utc>,
        slot_end: DateTime<Utc>,
    ) -> CaseflowResult<CaseAggregate> {
        let mut agg = self.load_owned(actor, case_id)?;
        self.gates.can_lock_appointment(&agg).check(agg.case.state)?;
        // The gate just proved the lock exists.
        let lock_id = agg
            .decision_lock()
            .map(|l| l.id.clone())
            .ok_or_else(|| CaseflowError::Validation("decision lock missing".into()))?;
        let appointment = Appointment::lock(
            case_id.clone(),
            agg.case.shop_id.clone(),
            lock_id,
            slot_start,
            slot_end,
        );
        self.advance(&mut agg.case, CaseState::ShopAppointmentLocked);
        self.store
            .commit(CaseCommit::new(agg.case).write(ChildWrite::Appointment(appointment)))
    }

    /// Create a draft shipment. Every shipment is drafted while the
    /// appointment is locked, before the first trigger moves the case on.
    pub fn create_shipment(
        &self,
        actor: &CustomerId,
        case_id: &CaseId,
        request: ShipmentRequest,
    ) -> CaseflowResult<CaseAggregate> {
        let agg = self.load_owned(actor, case_id)?;
        if agg.case.state != CaseState::ShopAppointmentLocked {
            return Err(CaseflowError::gate(
                agg.case.state,
                format!(
                    "A shipment can only be created while the appointment is locked. \
                     Your case is currently in \"{}\". Run \"Appointment lock\" first.",
                    agg.case.state
                ),
            ));
        }
        let mut shipment = Shipment::draft(case_id.clone())
            .with_alerts_enabled(request.alerts_enabled)
            .with_carrier_webhook_registered(request.carrier_webhook_registered);
        if let Some(tracking) = request.tracking_number {
            shipment = shipment.with_tracking_number(tracking);
        }
        self.store
            .commit(CaseCommit::new(agg.case).write(ChildWrite::Shipment(shipment)))
    }

    /// Update a draft shipment's trigger prerequisites. Refused once the
    /// shipment has left draft.
    pub fn update_shipment(
        &self,
        actor: &CustomerId,
        shipment_id: &ShipmentId,
        update: ShipmentUpdate,
    ) -> CaseflowResult<CaseAggregate> {
        let (agg, mut shipment) = self.load_shipment_owned(actor, shipment_id)?;
        if shipment.state != ShipmentState::Draft {
            return Err(CaseflowError::Validation(
                "Can only update a draft shipment".into(),
            ));
        }
        if let Some(tracking) = update.tracking_number {
            shipment.tracking_number = Some(tracking);
        }
        if let Some(enabled) = update.alerts_enabled {
            shipment.alerts_enabled = enabled;
        }
        if let Some(registered) = update.carrier_webhook_registered {
            shipment.carrier_webhook_registered = registered;
        }
        shipment.updated_at = Utc::now();
        self.store
            .commit(CaseCommit::new(agg.case).write(ChildWrite::Shipment(shipment)))
    }

    /// Hand a shipment to the carrier. The first trigger also moves the
    /// case to `SHIP_TRIGGERED`; later shipments leave the case alone.
    pub fn trigger_shipment(
        &self,
        actor: &CustomerId,
        shipment_id: &ShipmentId,
    ) -> CaseflowResult<CaseAggregate> {
        let (mut agg, mut shipment) = self.load_shipment_owned(actor, shipment_id)?;
        match agg.case.state {
            CaseState::ShopAppointmentLocked => {}
            CaseState::ShipTriggered | CaseState::InTransit => {}
            other => {
                return Err(CaseflowError::gate(
                    other,
                    format!(
                        "Shipments can only be triggered after the appointment is locked. \
                         Your case is currently in \"{}\". Run \"Appointment lock\" first.",
                        other
                    ),
                ));
            }
        }
        self.gates
            .can_trigger_shipment(&shipment)
            .check(agg.case.state)?;
        shipment.set_state(ShipmentState::ShipTriggered);
        if agg.case.state == CaseState::ShopAppointmentLocked {
            self.advance(&mut agg.case, CaseState::ShipTriggered);
        }
        self.store
            .commit(CaseCommit::new(agg.case).write(ChildWrite::Shipment(shipment)))
    }

    /// Carrier reported movement. No ownership check: this is driven by
    /// tracking events, not by the customer.
    pub fn set_in_transit(&self, shipment_id: &ShipmentId) -> CaseflowResult<CaseAggregate> {
        let mut shipment = self.store.get_shipment(shipment_id)?;
        if shipment.state != ShipmentState::ShipTriggered {
            return Err(CaseflowError::Validation(format!(
                "Only a triggered shipment can move to in-transit; this shipment is in \"{}\".",
                shipment.state
            )));
        }
        let mut agg = self.store.get_aggregate(&shipment.case_id)?;
        shipment.set_state(ShipmentState::InTransit);
        if agg.case.state == CaseState::ShipTriggered {
            self.advance(&mut agg.case, CaseState::InTransit);
        }
        self.store
            .commit(CaseCommit::new(agg.case).write(ChildWrite::Shipment(shipment)))
    }

    /// Carrier reported delivery. The case follows the latest delivery
    /// event; whether every shipment has landed is recomputed by the
    /// install gate, never tracked here.
    pub fn set_delivered(&self, shipment_id: &ShipmentId) -> CaseflowResult<CaseAggregate> {
        let mut shipment = self.store.get_shipment(shipment_id)?;
        if shipment.state != ShipmentState::InTransit {
            return Err(CaseflowError::Validation(format!(
                "Only an in-transit shipment can be delivered; this shipment is in \"{}\".",
                shipment.state
            )));
        }
        let mut agg = self.store.get_aggregate(&shipment.case_id)?;
        shipment.set_state(ShipmentState::Delivered);
        if !agg.case.state.is_terminal() && agg.case.state != CaseState::Delivered {
            self.advance(&mut agg.case, CaseState::Delivered);
        }
        self.store
            .commit(CaseCommit::new(agg.case).write(ChildWrite::Shipment(shipment)))
    }

    /// Shop starts the install. Requires every shipment delivered.
    pub fn start_install(
        &self,
        actor: &CustomerId,
        case_id: &CaseId,
    ) -> CaseflowResult<CaseAggregate> {
        let mut agg = self.load_owned(actor, case_id)?;
        self.gates.can_start_install(&agg).check(agg.case.state)?;
        self.advance(&mut agg.case, CaseState::InstallInProgress);
        self.store.commit(CaseCommit::new(agg.case))
    }

    /// Shop finishes the install.
    pub fn complete_install(
        &self,
        actor: &CustomerId,
        case_id: &CaseId,
    ) -> CaseflowResult<CaseAggregate> {
        let mut agg = self.load_owned(actor, case_id)?;
        if agg.case.state != CaseState::InstallInProgress {
            return Err(CaseflowError::gate(
                agg.case.state,
                format!(
                    "The shop must have started the install before you can complete it. \
                     Your case is currently in \"{}\". Run \"Install start\" first.",
                    agg.case.state
                ),
            ));
        }
        self.advance(&mut agg.case, CaseState::Installed);
        self.store.commit(CaseCommit::new(agg.case))
    }

    /// Customer confirms the outcome; the case completes.
    pub fn post_confirmation(
        &self,
        actor: &CustomerId,
        case_id: &CaseId,
    ) -> CaseflowResult<CaseAggregate> {
        let mut agg = self.load_owned(actor, case_id)?;
        if agg.case.state != CaseState::Installed {
            return Err(CaseflowError::gate(
                agg.case.state,
                format!(
                    "Install must be completed before post-confirmation. \
                     Your case is currently in \"{}\". Run \"Install complete\" first.",
                    agg.case.state
                ),
            ));
        }
        agg.case.completed_at = Some(Utc::now());
        self.advance(&mut agg.case, CaseState::PostConfirmationComplete);
        self.store.commit(CaseCommit::new(agg.case))
    }

    /// Record a chain-of-custody handoff. Informational: never moves the
    /// case.
    pub fn add_custody_event(
        &self,
        actor: &CustomerId,
        request: CustodyRequest,
    ) -> CaseflowResult<CaseAggregate> {
        let (agg, shipment) = self.load_shipment_owned(actor, &request.shipment_id)?;
        let event = CustodyEvent {
            id: CustodyEventId::generate(),
            case_id: agg.case.id.clone(),
            shipment_id: shipment.id,
            custody: request.custody,
            proof_ref: request.proof_ref,
            declared_value: request.declared_value,
            insurance_ref: request.insurance_ref,
            recorded_at: Utc::now(),
        };
        self.store
            .commit(CaseCommit::new(agg.case).write(ChildWrite::CustodyEvent(event)))
    }

    /// Record an out-of-band exception. Bypasses every gate: this must
    /// work from any state, including terminal ones.
    pub fn create_exception(
        &self,
        actor: &CustomerId,
        case_id: &CaseId,
        exception_type: ExceptionType,
        payload: Option<serde_json::Value>,
    ) -> CaseflowResult<CaseAggregate> {
        let mut agg = self.load_owned(actor, case_id)?;
        let exception = self
            .exceptions
            .record(&mut agg.case, exception_type, payload);
        self.store
            .commit(CaseCommit::new(agg.case).write(ChildWrite::Exception(exception)))
    }

    /// Record a carrier-reported problem against the shipment's case.
    /// Webhook-style ingestion: identified by shipment id or tracking
    /// number, no customer ownership check.
    pub fn record_carrier_exception(
        &self,
        shipment: ShipmentRef,
        event: serde_json::Value,
        note: Option<String>,
    ) -> CaseflowResult<CaseAggregate> {
        let shipment = match shipment {
            ShipmentRef::Id(id) => self.store.get_shipment(&id)?,
            ShipmentRef::Tracking(tracking) => self
                .store
                .find_shipment_by_tracking(&tracking)?
                .ok_or_else(|| CaseflowError::not_found("shipment", tracking))?,
        };
        let mut agg = self.store.get_aggregate(&shipment.case_id)?;
        let payload = self.exceptions.carrier_event(event, note);
        let exception =
            self.exceptions
                .record(&mut agg.case, ExceptionType::CarrierException, Some(payload));
        self.store
            .commit(CaseCommit::new(agg.case).write(ChildWrite::Exception(exception)))
    }

    fn advance(&self, case: &mut Case, to: CaseState) {
        tracing::info!(case_id = %case.id, from = %case.state, to = %to, "case transition");
        case.set_state(to);
    }

    fn load_shipment_owned(
        &self,
        actor: &CustomerId,
        shipment_id: &ShipmentId,
    ) -> CaseflowResult<(CaseAggregate, Shipment)> {
        let shipment = self.store.get_shipment(shipment_id)?;
        let agg = self.store.get_aggregate(&shipment.case_id)?;
        if agg.case.customer_id != *actor {
            return Err(CaseflowError::not_found("shipment", shipment_id));
        }
        Ok((agg, shipment))
    }
}
