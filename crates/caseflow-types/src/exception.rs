//! Case exceptions: append-only records of out-of-band disruptions.
//!
//! Exceptions are additive, not corrective. Recording one never deletes
//! or alters prior child records; it parks the case in the matching
//! `EXCEPTION_<TYPE>` pseudo-state. Failure is explicit, never silent.

use crate::{CaseExceptionId, CaseId, ExceptionType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded out-of-band disruption.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaseException {
    /// Unique exception id
    pub id: CaseExceptionId,
    /// The case this exception belongs to
    pub case_id: CaseId,
    /// What kind of disruption occurred
    pub exception_type: ExceptionType,
    /// Free-form context (carrier event body, operator note, ...)
    pub payload: Option<serde_json::Value>,
    /// When the exception was recorded
    pub recorded_at: DateTime<Utc>,
}

impl CaseException {
    /// Record a new exception for a case.
    pub fn record(
        case_id: CaseId,
        exception_type: ExceptionType,
        payload: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: CaseExceptionId::generate(),
            case_id,
            exception_type,
            payload,
            recorded_at: Utc::now(),
        }
    }
}
