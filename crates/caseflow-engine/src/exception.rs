//! Exception side channel: out-of-band disruptions, recordable from any
//! state.
//!
//! The side channel bypasses every gate. Vendor delays, backorders,
//! carrier problems, missed windows, moved appointments, damage and
//! cancellation can happen at any point in the lifecycle, so refusing to
//! record one because of the current state would lose the audit trail at
//! exactly the moment it matters. Recording is additive: prior child
//! records are kept, the case is parked in the matching
//! `EXCEPTION_<TYPE>` pseudo-state.

use caseflow_types::{Case, CaseException, CaseState, ExceptionType};
use chrono::Utc;

/// Records out-of-band disruptions against a case
#[derive(Clone, Debug, Default)]
pub struct ExceptionSideChannel;

impl ExceptionSideChannel {
    pub fn new() -> Self {
        Self
    }

    /// Park the case in `EXCEPTION_<TYPE>` and return the exception
    /// record to persist alongside it. Never gate-checked, never
    /// refused.
    pub fn record(
        &self,
        case: &mut Case,
        exception_type: ExceptionType,
        payload: Option<serde_json::Value>,
    ) -> CaseException {
        tracing::info!(
            case_id = %case.id,
            from = %case.state,
            exception = %exception_type,
            "recording case exception"
        );
        case.set_state(CaseState::Exception(exception_type));
        CaseException::record(case.id.clone(), exception_type, payload)
    }

    /// Wrap a raw carrier event body into an exception payload, stamped
    /// with the ingestion time.
    pub fn carrier_event(
        &self,
        event: serde_json::Value,
        note: Option<String>,
    ) -> serde_json::Value {
        serde_json::json!({
            "source": "carrier",
            "event": event,
            "note": note,
            "received_at": Utc::now().to_rfc3339(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseflow_types::{CustomerId, ShopId, VehicleId};

    fn case_in(state: CaseState) -> Case {
        let mut case = Case::new(
            CustomerId::new("cust-1"),
            VehicleId::new("veh-1"),
            ShopId::new("shop-1"),
        );
        case.state = state;
        case
    }

    #[test]
    fn record_parks_case_from_any_state() {
        let channel = ExceptionSideChannel::new();
        for from in CaseState::all() {
            let mut case = case_in(from);
            let ex = channel.record(&mut case, ExceptionType::Backorder, None);
            assert_eq!(case.state, CaseState::Exception(ExceptionType::Backorder));
            assert!(case.is_terminal());
            assert_eq!(ex.case_id, case.id);
        }
    }

    #[test]
    fn record_keeps_payload() {
        let channel = ExceptionSideChannel::new();
        let mut case = case_in(CaseState::InTransit);
        let ex = channel.record(
            &mut case,
            ExceptionType::CarrierException,
            Some(serde_json::json!({"code": "WEATHER_DELAY"})),
        );
        assert_eq!(ex.payload.unwrap()["code"], "WEATHER_DELAY");
    }

    #[test]
    fn carrier_event_is_stamped() {
        let payload = ExceptionSideChannel::new().carrier_event(
            serde_json::json!({"status": "exception"}),
            Some("address unreadable".into()),
        );
        assert_eq!(payload["source"], "carrier");
        assert_eq!(payload["event"]["status"], "exception");
        assert_eq!(payload["note"], "address unreadable");
        assert!(payload["received_at"].is_string());
    }
}
