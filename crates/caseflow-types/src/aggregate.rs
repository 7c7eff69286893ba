//! The case aggregate: a case plus every child record it owns.
//!
//! Orchestrator operations load the aggregate, gate-check against it,
//! and commit the mutated case together with any new children in one
//! transaction.

use crate::{
    Appointment, Case, CaseException, CustodyEvent, DecisionLock, DecisionReceipt, InstallWindow,
    InstallWindowId, Shipment, ShipmentState, VendorFulfillmentCommitment,
};
use serde::{Deserialize, Serialize};

/// A case with all of its owned child records.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaseAggregate {
    /// The aggregate root
    pub case: Case,
    /// Proposed and accepted install windows
    pub install_windows: Vec<InstallWindow>,
    /// Decision locks (at most one; a Vec for store symmetry)
    pub decision_locks: Vec<DecisionLock>,
    /// Decision receipts
    pub decision_receipts: Vec<DecisionReceipt>,
    /// Vendor fulfillment commitments
    pub vendor_commitments: Vec<VendorFulfillmentCommitment>,
    /// Locked appointments
    pub appointments: Vec<Appointment>,
    /// Parts shipments
    pub shipments: Vec<Shipment>,
    /// Chain-of-custody events
    pub custody_events: Vec<CustodyEvent>,
    /// Recorded exceptions
    pub exceptions: Vec<CaseException>,
}

impl CaseAggregate {
    /// Wrap a bare case with no children yet.
    pub fn new(case: Case) -> Self {
        Self {
            case,
            install_windows: Vec::new(),
            decision_locks: Vec::new(),
            decision_receipts: Vec::new(),
            vendor_commitments: Vec::new(),
            appointments: Vec::new(),
            shipments: Vec::new(),
            custody_events: Vec::new(),
            exceptions: Vec::new(),
        }
    }

    /// The accepted install window, if any.
    pub fn accepted_window(&self) -> Option<&InstallWindow> {
        self.install_windows.iter().find(|w| w.is_accepted())
    }

    /// Find an install window by id.
    pub fn install_window(&self, id: &InstallWindowId) -> Option<&InstallWindow> {
        self.install_windows.iter().find(|w| &w.id == id)
    }

    /// The case's decision lock, if one has been written.
    pub fn decision_lock(&self) -> Option<&DecisionLock> {
        self.decision_locks.first()
    }

    pub fn has_vendor_commitment(&self) -> bool {
        !self.vendor_commitments.is_empty()
    }

    /// True when the shipments list is empty or every shipment is
    /// `DELIVERED`. Recomputed by scanning on every call.
    pub fn all_shipments_delivered(&self) -> bool {
        self.shipments
            .iter()
            .all(|s| s.state == ShipmentState::Delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CaseId, CustomerId, ShopId, VehicleId};

    fn make_aggregate() -> CaseAggregate {
        CaseAggregate::new(Case::new(
            CustomerId::new("cust-1"),
            VehicleId::new("veh-1"),
            ShopId::new("shop-1"),
        ))
    }

    #[test]
    fn empty_shipments_count_as_delivered() {
        let agg = make_aggregate();
        assert!(agg.all_shipments_delivered());
    }

    #[test]
    fn one_undelivered_shipment_blocks() {
        let mut agg = make_aggregate();
        let case_id = agg.case.id.clone();

        let mut delivered = Shipment::draft(case_id.clone());
        delivered.set_state(ShipmentState::Delivered);
        agg.shipments.push(delivered);
        assert!(agg.all_shipments_delivered());

        let mut in_transit = Shipment::draft(case_id);
        in_transit.set_state(ShipmentState::InTransit);
        agg.shipments.push(in_transit);
        assert!(!agg.all_shipments_delivered());
    }

    #[test]
    fn accepted_window_lookup() {
        let mut agg = make_aggregate();
        let case_id = agg.case.id.clone();
        let now = chrono::Utc::now();

        agg.install_windows
            .push(InstallWindow::propose(case_id.clone(), now, now));
        assert!(agg.accepted_window().is_none());

        let mut accepted = InstallWindow::propose(case_id, now, now);
        accepted.accept();
        let accepted_id = accepted.id.clone();
        agg.install_windows.push(accepted);
        assert_eq!(agg.accepted_window().map(|w| w.id.clone()), Some(accepted_id));
    }
}
