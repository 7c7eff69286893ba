//! Identifier newtypes for every caseflow entity.
//!
//! Ids are opaque strings (UUID v4 when generated here) so that an
//! external durable store can supply its own key format without the
//! engine caring.

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a new random id
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Create an id from a known string
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Unique identifier for a repair case
    CaseId
);
entity_id!(
    /// Unique identifier for a customer
    CustomerId
);
entity_id!(
    /// Unique identifier for a vehicle
    VehicleId
);
entity_id!(
    /// Unique identifier for a repair shop
    ShopId
);
entity_id!(
    /// Unique identifier for a parts vendor
    VendorId
);
entity_id!(
    /// Unique identifier for an install window
    InstallWindowId
);
entity_id!(
    /// Unique identifier for a decision lock
    DecisionLockId
);
entity_id!(
    /// Unique identifier for a decision receipt
    DecisionReceiptId
);
entity_id!(
    /// Unique identifier for a vendor fulfillment commitment
    CommitmentId
);
entity_id!(
    /// Unique identifier for a shop appointment
    AppointmentId
);
entity_id!(
    /// Unique identifier for a parts shipment
    ShipmentId
);
entity_id!(
    /// Unique identifier for a chain-of-custody event
    CustodyEventId
);
entity_id!(
    /// Unique identifier for a case exception record
    CaseExceptionId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(CaseId::generate(), CaseId::generate());
    }

    #[test]
    fn display_round_trips() {
        let id = ShipmentId::new("ship-42");
        assert_eq!(id.to_string(), "ship-42");
        assert_eq!(ShipmentId::new(id.to_string()), id);
    }
}
