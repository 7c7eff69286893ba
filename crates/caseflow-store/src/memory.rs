//! In-memory case store for development and testing.
//!
//! A single `RwLock` guards the whole store, so a commit is trivially
//! atomic: validation runs first, and only a fully valid write set
//! mutates anything. Not suitable for production durability.

use std::collections::HashMap;
use std::sync::RwLock;

use caseflow_types::{
    Case, CaseAggregate, CaseId, CaseflowError, CaseflowResult, Shipment, ShipmentId,
};
use tracing::debug;

use crate::{CaseCommit, CaseStore, ChildWrite};

/// In-memory [`CaseStore`] implementation.
pub struct InMemoryCaseStore {
    inner: RwLock<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    /// Aggregates keyed by case id. Children live inside their
    /// aggregate — they are never shared across cases.
    cases: HashMap<CaseId, CaseAggregate>,
    /// Shipment id -> owning case id
    shipment_index: HashMap<ShipmentId, CaseId>,
}

impl InMemoryCaseStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
        }
    }

    /// Number of cases stored.
    pub fn case_count(&self) -> usize {
        self.inner.read().map(|s| s.cases.len()).unwrap_or(0)
    }
}

impl Default for InMemoryCaseStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_poisoned() -> CaseflowError {
    CaseflowError::Storage("case store lock poisoned".into())
}

impl CaseStore for InMemoryCaseStore {
    fn create_case(&self, case: Case) -> CaseflowResult<()> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;
        if inner.cases.contains_key(&case.id) {
            return Err(CaseflowError::Conflict(format!(
                "case already exists: {}",
                case.id
            )));
        }
        debug!(case_id = %case.id, "case created");
        inner.cases.insert(case.id.clone(), CaseAggregate::new(case));
        Ok(())
    }

    fn get_aggregate(&self, id: &CaseId) -> CaseflowResult<CaseAggregate> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        inner
            .cases
            .get(id)
            .cloned()
            .ok_or_else(|| CaseflowError::not_found("case", id))
    }

    fn get_shipment(&self, id: &ShipmentId) -> CaseflowResult<Shipment> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        let case_id = inner
            .shipment_index
            .get(id)
            .ok_or_else(|| CaseflowError::not_found("shipment", id))?;
        inner
            .cases
            .get(case_id)
            .and_then(|agg| agg.shipments.iter().find(|s| &s.id == id))
            .cloned()
            .ok_or_else(|| CaseflowError::not_found("shipment", id))
    }

    fn find_shipment_by_tracking(&self, tracking_number: &str) -> CaseflowResult<Option<Shipment>> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        Ok(inner
            .cases
            .values()
            .flat_map(|agg| agg.shipments.iter())
            .find(|s| s.tracking_number.as_deref() == Some(tracking_number))
            .cloned())
    }

    fn commit(&self, commit: CaseCommit) -> CaseflowResult<CaseAggregate> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;
        let case_id = commit.case.id.clone();

        // Validate the whole write set before touching anything, so a
        // rejected commit leaves no partial state behind.
        {
            let agg = inner
                .cases
                .get(&case_id)
                .ok_or_else(|| CaseflowError::not_found("case", &case_id))?;
            for write in &commit.writes {
                validate_write(agg, &case_id, write)?;
            }
        }

        let agg = inner
            .cases
            .get_mut(&case_id)
            .ok_or_else(|| CaseflowError::not_found("case", &case_id))?;

        debug!(
            case_id = %case_id,
            state = %commit.case.state,
            writes = commit.writes.len(),
            "committing case write set"
        );

        agg.case = commit.case;
        let mut new_shipments = Vec::new();
        for write in commit.writes {
            match write {
                ChildWrite::InstallWindow(w) => upsert(&mut agg.install_windows, w, |w| &w.id),
                ChildWrite::DecisionLock(l) => agg.decision_locks.push(l),
                ChildWrite::DecisionReceipt(r) => agg.decision_receipts.push(r),
                ChildWrite::VendorCommitment(c) => agg.vendor_commitments.push(c),
                ChildWrite::Appointment(a) => agg.appointments.push(a),
                ChildWrite::Shipment(s) => {
                    new_shipments.push(s.id.clone());
                    upsert(&mut agg.shipments, s, |s| &s.id);
                }
                ChildWrite::CustodyEvent(e) => agg.custody_events.push(e),
                ChildWrite::Exception(e) => agg.exceptions.push(e),
            }
        }
        let updated = agg.clone();
        for shipment_id in new_shipments {
            inner.shipment_index.insert(shipment_id, case_id.clone());
        }
        Ok(updated)
    }
}

/// Check a single child write against the stored aggregate.
fn validate_write(agg: &CaseAggregate, case_id: &CaseId, write: &ChildWrite) -> CaseflowResult<()> {
    match write {
        // Unique per case: the storage-level safeguard against the
        // check-then-act race on lock creation.
        ChildWrite::DecisionLock(lock) => {
            if let Some(existing) = agg.decision_lock() {
                if existing.id != lock.id {
                    return Err(CaseflowError::Conflict(format!(
                        "a decision lock already exists for case {}",
                        case_id
                    )));
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Insert or replace a record by id.
fn upsert<T, K: PartialEq>(records: &mut Vec<T>, record: T, key: impl Fn(&T) -> &K) {
    match records.iter_mut().find(|r| key(r) == key(&record)) {
        Some(slot) => *slot = record,
        None => records.push(record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseflow_types::{
        CaseState, CustomerId, DecisionLock, DecisionLockId, ShopId, VehicleId,
    };
    use chrono::Utc;

    fn seeded_store() -> (InMemoryCaseStore, CaseId) {
        let store = InMemoryCaseStore::new();
        let case = Case::new(
            CustomerId::new("cust-1"),
            VehicleId::new("veh-1"),
            ShopId::new("shop-1"),
        );
        let case_id = case.id.clone();
        store.create_case(case).unwrap();
        (store, case_id)
    }

    fn make_lock(case_id: &CaseId) -> DecisionLock {
        let now = Utc::now();
        DecisionLock {
            id: DecisionLockId::generate(),
            case_id: case_id.clone(),
            verified_facts: vec!["brake pads worn".into()],
            unknowns: vec![],
            remaining_risks: vec!["possible rotor wear".into()],
            install_window_start: now,
            install_window_end: now,
            consent_data: serde_json::json!({"accepted": true}),
            parts_strategy: caseflow_types::DEFAULT_PARTS_STRATEGY.into(),
            client_ip: None,
            device_info: None,
            version: None,
            audit_hash: "deadbeef".into(),
            created_at: now,
        }
    }

    #[test]
    fn create_and_load() {
        let (store, case_id) = seeded_store();
        let agg = store.get_aggregate(&case_id).unwrap();
        assert_eq!(agg.case.state, CaseState::CaseCreated);
        assert!(agg.shipments.is_empty());
    }

    #[test]
    fn duplicate_case_id_conflicts() {
        let (store, case_id) = seeded_store();
        let mut dup = Case::new(
            CustomerId::new("cust-2"),
            VehicleId::new("veh-2"),
            ShopId::new("shop-2"),
        );
        dup.id = case_id;
        let err = store.create_case(dup).unwrap_err();
        assert_eq!(err.kind(), caseflow_types::ErrorKind::Conflict);
    }

    #[test]
    fn unknown_case_not_found() {
        let store = InMemoryCaseStore::new();
        let err = store.get_aggregate(&CaseId::new("missing")).unwrap_err();
        assert_eq!(err.to_string(), "case not found: missing");
    }

    #[test]
    fn second_decision_lock_rejected_and_nothing_applied() {
        let (store, case_id) = seeded_store();
        let mut agg = store.get_aggregate(&case_id).unwrap();

        agg.case.set_state(CaseState::DecisionLocked);
        store
            .commit(
                CaseCommit::new(agg.case.clone())
                    .write(ChildWrite::DecisionLock(make_lock(&case_id))),
            )
            .unwrap();

        // A racing second writer: the case row in this commit must not
        // land either, since the lock write is rejected.
        let mut racing = store.get_aggregate(&case_id).unwrap().case;
        racing.set_state(CaseState::VendorAvailConfirmed);
        let err = store
            .commit(CaseCommit::new(racing).write(ChildWrite::DecisionLock(make_lock(&case_id))))
            .unwrap_err();
        assert_eq!(err.kind(), caseflow_types::ErrorKind::Conflict);

        let after = store.get_aggregate(&case_id).unwrap();
        assert_eq!(after.decision_locks.len(), 1);
        assert_eq!(after.case.state, CaseState::DecisionLocked);
    }

    #[test]
    fn shipment_index_and_tracking_lookup() {
        let (store, case_id) = seeded_store();
        let agg = store.get_aggregate(&case_id).unwrap();
        let shipment = Shipment::draft(case_id.clone()).with_tracking_number("1Z999");
        let shipment_id = shipment.id.clone();

        store
            .commit(CaseCommit::new(agg.case).write(ChildWrite::Shipment(shipment)))
            .unwrap();

        assert_eq!(store.get_shipment(&shipment_id).unwrap().id, shipment_id);
        let found = store.find_shipment_by_tracking("1Z999").unwrap().unwrap();
        assert_eq!(found.id, shipment_id);
        assert!(store.find_shipment_by_tracking("NOPE").unwrap().is_none());
    }

    #[test]
    fn shipment_upsert_replaces_by_id() {
        let (store, case_id) = seeded_store();
        let agg = store.get_aggregate(&case_id).unwrap();
        let shipment = Shipment::draft(case_id.clone());
        let shipment_id = shipment.id.clone();

        store
            .commit(CaseCommit::new(agg.case.clone()).write(ChildWrite::Shipment(shipment)))
            .unwrap();

        let mut updated = store.get_shipment(&shipment_id).unwrap();
        updated.alerts_enabled = true;
        store
            .commit(CaseCommit::new(agg.case).write(ChildWrite::Shipment(updated)))
            .unwrap();

        let after = store.get_aggregate(&case_id).unwrap();
        assert_eq!(after.shipments.len(), 1);
        assert!(after.shipments[0].alerts_enabled);
    }
}
