//! The repair case and its lifecycle state.
//!
//! `CaseState` is deliberately a closed enum rather than a string field:
//! `can_transition` in the engine is exhaustively matched over it, so an
//! unrecognized state is unrepresentable instead of silently accepted.

use crate::{CaseId, CustomerId, ShopId, VehicleId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One repair engagement between one customer, one vehicle and one shop.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Case {
    /// Unique case id
    pub id: CaseId,
    /// The customer who opened the case
    pub customer_id: CustomerId,
    /// The vehicle being repaired
    pub vehicle_id: VehicleId,
    /// The shop performing the install
    pub shop_id: ShopId,
    /// Current lifecycle state
    pub state: CaseState,
    /// Shop's diagnostic summary, filled in during verification
    pub diagnostic_summary: Option<String>,
    /// Recommended parts, filled in during verification
    pub recommended_parts: Option<String>,
    /// Labor estimate in hours, filled in during verification
    pub labor_estimate_hours: Option<f64>,
    /// Set when post-confirmation completes
    pub completed_at: Option<DateTime<Utc>>,
    /// When the case was created
    pub created_at: DateTime<Utc>,
    /// When the case was last mutated
    pub updated_at: DateTime<Utc>,
}

impl Case {
    /// Create a new case in `CASE_CREATED`.
    pub fn new(customer_id: CustomerId, vehicle_id: VehicleId, shop_id: ShopId) -> Self {
        let now = Utc::now();
        Self {
            id: CaseId::generate(),
            customer_id,
            vehicle_id,
            shop_id,
            state: CaseState::CaseCreated,
            diagnostic_summary: None,
            recommended_parts: None,
            labor_estimate_hours: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move the case to a new state and bump `updated_at`.
    ///
    /// This does NOT check the transition — that is the engine's job.
    pub fn set_state(&mut self, state: CaseState) {
        self.state = state;
        self.updated_at = Utc::now();
    }

    /// Whether the case can never advance again (completed or parked in
    /// an exception pseudo-state).
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// The closed set of case lifecycle states.
///
/// The main path is linear: every state except `CaseCreated` has at most
/// one successor. `Exception(_)` pseudo-states are reachable from
/// anywhere and absorbing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseState {
    /// Customer selected a vehicle and a shop
    CaseCreated,
    /// Optional cooling-off pause before verification starts
    DecisionPauseActive,
    /// Shop diagnostic in progress
    Verifying,
    /// Diagnostic done; remaining unknowns recorded
    VerifiedWithUnknowns,
    /// Shop proposed one or more install windows
    InstallWindowProposed,
    /// Customer accepted an install window
    InstallWindowAccepted,
    /// Decision lock written; facts, risks and consent are frozen
    DecisionLocked,
    /// Parts vendor confirmed availability
    VendorAvailConfirmed,
    /// Shop confirmed it can work the accepted window
    ShopWindowConfirmed,
    /// Appointment slot locked against the decision lock
    ShopAppointmentLocked,
    /// First shipment triggered
    ShipTriggered,
    /// Parts in transit
    InTransit,
    /// Parts delivered to the shop
    Delivered,
    /// Install underway
    InstallInProgress,
    /// Install done
    Installed,
    /// Customer confirmed the outcome; terminal
    PostConfirmationComplete,
    /// Out-of-band disruption recorded; absorbing
    Exception(ExceptionType),
}

impl CaseState {
    /// Whether this is an `EXCEPTION_<TYPE>` pseudo-state.
    pub fn is_exception(&self) -> bool {
        matches!(self, Self::Exception(_))
    }

    /// Terminal states: `POST_CONFIRMATION_COMPLETE` and every exception
    /// pseudo-state (no transition out of them is defined).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::PostConfirmationComplete | Self::Exception(_))
    }

    /// Every representable state: the sixteen main-path states followed
    /// by one exception pseudo-state per exception type.
    pub fn all() -> Vec<CaseState> {
        let mut states = vec![
            Self::CaseCreated,
            Self::DecisionPauseActive,
            Self::Verifying,
            Self::VerifiedWithUnknowns,
            Self::InstallWindowProposed,
            Self::InstallWindowAccepted,
            Self::DecisionLocked,
            Self::VendorAvailConfirmed,
            Self::ShopWindowConfirmed,
            Self::ShopAppointmentLocked,
            Self::ShipTriggered,
            Self::InTransit,
            Self::Delivered,
            Self::InstallInProgress,
            Self::Installed,
            Self::PostConfirmationComplete,
        ];
        states.extend(ExceptionType::ALL.iter().map(|t| Self::Exception(*t)));
        states
    }
}

impl std::fmt::Display for CaseState {
    /// Wire names as they appear to customers and shops, e.g.
    /// `INSTALL_WINDOW_ACCEPTED` or `EXCEPTION_CARRIER_EXCEPTION`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::CaseCreated => "CASE_CREATED",
            Self::DecisionPauseActive => "DECISION_PAUSE_ACTIVE",
            Self::Verifying => "VERIFYING",
            Self::VerifiedWithUnknowns => "VERIFIED_WITH_UNKNOWNS",
            Self::InstallWindowProposed => "INSTALL_WINDOW_PROPOSED",
            Self::InstallWindowAccepted => "INSTALL_WINDOW_ACCEPTED",
            Self::DecisionLocked => "DECISION_LOCKED",
            Self::VendorAvailConfirmed => "VENDOR_AVAIL_CONFIRMED",
            Self::ShopWindowConfirmed => "SHOP_WINDOW_CONFIRMED",
            Self::ShopAppointmentLocked => "SHOP_APPOINTMENT_LOCKED",
            Self::ShipTriggered => "SHIP_TRIGGERED",
            Self::InTransit => "IN_TRANSIT",
            Self::Delivered => "DELIVERED",
            Self::InstallInProgress => "INSTALL_IN_PROGRESS",
            Self::Installed => "INSTALLED",
            Self::PostConfirmationComplete => "POST_CONFIRMATION_COMPLETE",
            Self::Exception(t) => return write!(f, "EXCEPTION_{}", t),
        };
        write!(f, "{}", name)
    }
}

/// The fixed set of out-of-band exception types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExceptionType {
    /// Vendor missed a lead-time commitment
    VendorDelay,
    /// Part went on backorder after confirmation
    Backorder,
    /// Carrier reported a problem with a shipment
    CarrierException,
    /// The accepted install window was missed
    MissedWindow,
    /// The locked appointment had to move
    ApptMoved,
    /// Parts arrived damaged
    Damaged,
    /// The case was cancelled
    Cancelled,
}

impl ExceptionType {
    /// All exception types, in wire order.
    pub const ALL: [ExceptionType; 7] = [
        Self::VendorDelay,
        Self::Backorder,
        Self::CarrierException,
        Self::MissedWindow,
        Self::ApptMoved,
        Self::Damaged,
        Self::Cancelled,
    ];

    /// Wire name without the `EXCEPTION_` prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VendorDelay => "VENDOR_DELAY",
            Self::Backorder => "BACKORDER",
            Self::CarrierException => "CARRIER_EXCEPTION",
            Self::MissedWindow => "MISSED_WINDOW",
            Self::ApptMoved => "APPT_MOVED",
            Self::Damaged => "DAMAGED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for ExceptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ExceptionType {
    type Err = crate::CaseflowError;

    /// Parse a wire name. Untyped ingestion boundaries (e.g. carrier
    /// webhooks) use this; a bad name is a validation error listing the
    /// allowed values, mirroring what the caller sees.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| {
                let allowed: Vec<&str> = Self::ALL.iter().map(|t| t.as_str()).collect();
                crate::CaseflowError::Validation(format!(
                    "type must be one of: {}",
                    allowed.join(", ")
                ))
            })
    }
}
