//! Storage layer for caseflow.
//!
//! The engine talks to a [`CaseStore`]: transactional load of a case
//! aggregate by id, plus an all-or-nothing [`commit`](CaseStore::commit)
//! of a mutated case together with its new or updated child records.
//!
//! The store — not the engine — enforces the one safety-critical
//! uniqueness rule: at most one decision lock per case. A second writer
//! that raced past the engine's existence check receives a `Conflict`
//! from the commit instead of silently creating a duplicate.

#![deny(unsafe_code)]

mod memory;

pub use memory::InMemoryCaseStore;

use caseflow_types::{
    Appointment, Case, CaseAggregate, CaseException, CaseId, CaseflowResult, CustodyEvent,
    DecisionLock, DecisionReceipt, InstallWindow, Shipment, ShipmentId,
    VendorFulfillmentCommitment,
};

/// Transactional access to cases and their child records.
pub trait CaseStore: Send + Sync {
    /// Insert a newly created case. Fails with `Conflict` if the id is
    /// already taken.
    fn create_case(&self, case: Case) -> CaseflowResult<()>;

    /// Load a case with all of its children. Fails with `NotFound` for
    /// an unknown id.
    fn get_aggregate(&self, id: &CaseId) -> CaseflowResult<CaseAggregate>;

    /// Load a single shipment by id. Fails with `NotFound`.
    fn get_shipment(&self, id: &ShipmentId) -> CaseflowResult<Shipment>;

    /// Find a shipment by carrier tracking number, for webhook-style
    /// ingestion that only knows the tracking reference.
    fn find_shipment_by_tracking(&self, tracking_number: &str) -> CaseflowResult<Option<Shipment>>;

    /// Apply a commit atomically: the case row and every child write
    /// land together or not at all. Returns the updated aggregate.
    fn commit(&self, commit: CaseCommit) -> CaseflowResult<CaseAggregate>;
}

/// One atomic write set: the (already mutated) case plus child writes.
#[derive(Clone, Debug)]
pub struct CaseCommit {
    /// The case row to persist, replacing the stored one
    pub case: Case,
    /// Child records to insert or update alongside it
    pub writes: Vec<ChildWrite>,
}

impl CaseCommit {
    /// Start a commit that persists the given case row.
    pub fn new(case: Case) -> Self {
        Self {
            case,
            writes: Vec::new(),
        }
    }

    /// Add a child write to the set.
    pub fn write(mut self, write: ChildWrite) -> Self {
        self.writes.push(write);
        self
    }
}

/// A child record carried by a [`CaseCommit`].
///
/// Each write is an upsert keyed by the record's own id, except
/// `DecisionLock`, which is insert-only: the store rejects a second lock
/// for the same case with `Conflict`.
#[derive(Clone, Debug)]
pub enum ChildWrite {
    InstallWindow(InstallWindow),
    DecisionLock(DecisionLock),
    DecisionReceipt(DecisionReceipt),
    VendorCommitment(VendorFulfillmentCommitment),
    Appointment(Appointment),
    Shipment(Shipment),
    CustodyEvent(CustodyEvent),
    Exception(CaseException),
}
