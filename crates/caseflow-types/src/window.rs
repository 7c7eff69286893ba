//! Install windows: proposed and accepted time ranges for the repair.
//!
//! Multiple proposed windows may coexist on a case; only one is ever
//! accepted, by id.

use crate::{CaseId, InstallWindowId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of an install window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowStatus {
    /// Proposed by the shop, awaiting customer acceptance
    Proposed,
    /// Accepted by the customer
    Accepted,
}

/// A proposed or accepted time range for the install.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InstallWindow {
    /// Unique window id
    pub id: InstallWindowId,
    /// The case this window belongs to
    pub case_id: CaseId,
    /// Window start
    pub start_at: DateTime<Utc>,
    /// Window end
    pub end_at: DateTime<Utc>,
    /// Proposed or accepted
    pub status: WindowStatus,
    /// When the customer accepted, if they did
    pub accepted_at: Option<DateTime<Utc>>,
    /// When the window was proposed
    pub created_at: DateTime<Utc>,
}

impl InstallWindow {
    /// Propose a new window for a case.
    pub fn propose(case_id: CaseId, start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> Self {
        Self {
            id: InstallWindowId::generate(),
            case_id,
            start_at,
            end_at,
            status: WindowStatus::Proposed,
            accepted_at: None,
            created_at: Utc::now(),
        }
    }

    /// Mark the window accepted.
    pub fn accept(&mut self) {
        self.status = WindowStatus::Accepted;
        self.accepted_at = Some(Utc::now());
    }

    pub fn is_accepted(&self) -> bool {
        self.status == WindowStatus::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn propose_then_accept() {
        let mut window = InstallWindow::propose(
            CaseId::new("case-1"),
            Utc::now(),
            Utc::now() + chrono::Duration::hours(3),
        );
        assert_eq!(window.status, WindowStatus::Proposed);
        assert!(window.accepted_at.is_none());

        window.accept();
        assert!(window.is_accepted());
        assert!(window.accepted_at.is_some());
    }
}
