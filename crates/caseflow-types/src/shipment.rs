//! Parts shipments and chain-of-custody events.
//!
//! A case can carry several shipments. The case's aggregate shipping
//! state is recomputed by scanning all of them (see the install gate in
//! the engine), never maintained as a counter that could drift.

use crate::{CaseId, CustodyEventId, ShipmentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shipment lifecycle states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipmentState {
    /// Created but not yet handed to the carrier
    Draft,
    /// Handed to the carrier; tracking live
    ShipTriggered,
    /// Carrier reported movement
    InTransit,
    /// Delivered to the shop
    Delivered,
}

impl std::fmt::Display for ShipmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Draft => "draft",
            Self::ShipTriggered => "SHIP_TRIGGERED",
            Self::InTransit => "IN_TRANSIT",
            Self::Delivered => "DELIVERED",
        };
        write!(f, "{}", name)
    }
}

/// One parts shipment for a case.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Shipment {
    /// Unique shipment id
    pub id: ShipmentId,
    /// The case this shipment belongs to
    pub case_id: CaseId,
    /// Current shipment state
    pub state: ShipmentState,
    /// Carrier tracking number, required before triggering
    pub tracking_number: Option<String>,
    /// Whether delivery alerts are enabled, required before triggering
    pub alerts_enabled: bool,
    /// Whether the carrier exception webhook is registered, required
    /// before triggering
    pub carrier_webhook_registered: bool,
    /// When the shipment was created
    pub created_at: DateTime<Utc>,
    /// When the shipment was last mutated
    pub updated_at: DateTime<Utc>,
}

impl Shipment {
    /// Create a draft shipment for a case.
    pub fn draft(case_id: CaseId) -> Self {
        let now = Utc::now();
        Self {
            id: ShipmentId::generate(),
            case_id,
            state: ShipmentState::Draft,
            tracking_number: None,
            alerts_enabled: false,
            carrier_webhook_registered: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_tracking_number(mut self, tracking: impl Into<String>) -> Self {
        self.tracking_number = Some(tracking.into());
        self
    }

    pub fn with_alerts_enabled(mut self, enabled: bool) -> Self {
        self.alerts_enabled = enabled;
        self
    }

    pub fn with_carrier_webhook_registered(mut self, registered: bool) -> Self {
        self.carrier_webhook_registered = registered;
        self
    }

    /// Move the shipment to a new state and bump `updated_at`.
    pub fn set_state(&mut self, state: ShipmentState) {
        self.state = state;
        self.updated_at = Utc::now();
    }
}

/// Who physically holds the parts.
///
/// Custody follows the supplier -> carrier -> shop -> customer chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Custody {
    /// Parts still with the supplier
    SupplierCustody,
    /// Parts with the carrier
    CarrierCustody,
    /// Parts received by the shop
    ShopCustody,
    /// Parts handed to the customer
    CustomerCustody,
}

impl Custody {
    /// All custody holders, in chain order.
    pub const ALL: [Custody; 4] = [
        Self::SupplierCustody,
        Self::CarrierCustody,
        Self::ShopCustody,
        Self::CustomerCustody,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SupplierCustody => "SUPPLIER_CUSTODY",
            Self::CarrierCustody => "CARRIER_CUSTODY",
            Self::ShopCustody => "SHOP_CUSTODY",
            Self::CustomerCustody => "CUSTOMER_CUSTODY",
        }
    }
}

impl std::fmt::Display for Custody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Custody {
    type Err = crate::CaseflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| {
                let allowed: Vec<&str> = Self::ALL.iter().map(|c| c.as_str()).collect();
                crate::CaseflowError::Validation(format!(
                    "custody must be one of: {}",
                    allowed.join(", ")
                ))
            })
    }
}

/// Append-only chain-of-custody marker for a shipment.
///
/// Informational only — custody events never gate a case transition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustodyEvent {
    /// Unique event id
    pub id: CustodyEventId,
    /// The case the shipment belongs to
    pub case_id: CaseId,
    /// The shipment the parts moved on
    pub shipment_id: ShipmentId,
    /// Who holds the parts now
    pub custody: Custody,
    /// Proof reference (photo, signature, scan), if captured
    pub proof_ref: Option<String>,
    /// Declared value for insurance, if captured
    pub declared_value: Option<f64>,
    /// Insurance reference, if captured
    pub insurance_ref: Option<String>,
    /// When the handoff was recorded
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_shipment_is_not_triggerable_material() {
        let shipment = Shipment::draft(CaseId::new("case-1"));
        assert_eq!(shipment.state, ShipmentState::Draft);
        assert!(!shipment.alerts_enabled);
        assert!(shipment.tracking_number.is_none());
        assert!(!shipment.carrier_webhook_registered);
    }

    #[test]
    fn builder_fills_trigger_prerequisites() {
        let shipment = Shipment::draft(CaseId::new("case-1"))
            .with_tracking_number("1Z999")
            .with_alerts_enabled(true)
            .with_carrier_webhook_registered(true);
        assert_eq!(shipment.tracking_number.as_deref(), Some("1Z999"));
        assert!(shipment.alerts_enabled);
        assert!(shipment.carrier_webhook_registered);
    }

    #[test]
    fn custody_parse() {
        assert_eq!(
            "SHOP_CUSTODY".parse::<Custody>().unwrap(),
            Custody::ShopCustody
        );
        let err = "NOWHERE".parse::<Custody>().unwrap_err();
        assert!(err.to_string().contains("custody must be one of"));
    }
}
