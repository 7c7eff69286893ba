//! Vendor fulfillment commitments and locked shop appointments.

use crate::{AppointmentId, CaseId, CommitmentId, DecisionLockId, ShopId, VendorId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A parts vendor's promise to supply a SKU for a case.
///
/// Created once per availability confirmation; the case moves to
/// `VENDOR_AVAIL_CONFIRMED` as a side effect of recording it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VendorFulfillmentCommitment {
    /// Unique commitment id
    pub id: CommitmentId,
    /// The case this commitment belongs to
    pub case_id: CaseId,
    /// The vendor making the promise
    pub vendor_id: VendorId,
    /// Part SKU
    pub sku: String,
    /// Quantity promised
    pub quantity: u32,
    /// Whether the part is actually available
    pub available: bool,
    /// Minimum lead time in days, if quoted
    pub lead_time_min_days: Option<u32>,
    /// Maximum lead time in days, if quoted
    pub lead_time_max_days: Option<u32>,
    /// Service level the vendor commits to, if quoted
    pub service_level: Option<String>,
    /// Order cutoff time for the quoted lead times
    pub cutoff_time: Option<DateTime<Utc>>,
    /// Whether the vendor flags a backorder risk
    pub backorder_risk: bool,
    /// When the promise expires
    pub valid_until: DateTime<Utc>,
    /// Vendor-side confirmation reference, if supplied
    pub confirmation_ref: Option<String>,
    /// When the commitment was recorded
    pub created_at: DateTime<Utc>,
}

/// Status of a locked appointment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    /// The slot is locked against the decision lock
    Locked,
}

/// The locked shop time slot for the install.
///
/// Created only when the appointment gate passes: decision lock, vendor
/// commitment and accepted install window all present, shop window
/// confirmed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Appointment {
    /// Unique appointment id
    pub id: AppointmentId,
    /// The case this appointment belongs to
    pub case_id: CaseId,
    /// The shop holding the slot
    pub shop_id: ShopId,
    /// Back-reference to the decision lock that authorized the booking
    pub decision_lock_id: DecisionLockId,
    /// Slot start
    pub slot_start: DateTime<Utc>,
    /// Slot end
    pub slot_end: DateTime<Utc>,
    /// Always `Locked` today; the enum is closed for future statuses
    pub status: AppointmentStatus,
    /// When the slot was locked
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// Lock a slot for a case.
    pub fn lock(
        case_id: CaseId,
        shop_id: ShopId,
        decision_lock_id: DecisionLockId,
        slot_start: DateTime<Utc>,
        slot_end: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AppointmentId::generate(),
            case_id,
            shop_id,
            decision_lock_id,
            slot_start,
            slot_end,
            status: AppointmentStatus::Locked,
            created_at: Utc::now(),
        }
    }
}
