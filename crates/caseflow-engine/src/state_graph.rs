//! The static case state graph: valid states and allowed transitions.
//!
//! The main path is linear and non-skippable. `CASE_CREATED` may go to
//! `DECISION_PAUSE_ACTIVE` or straight to `VERIFYING`; every other state
//! has exactly one successor. Any state may additionally move to any
//! `EXCEPTION_<TYPE>` pseudo-state; exception states have no successor.
//!
//! Everything here is pure — no side effects, no storage.

use caseflow_types::CaseState;

/// Allowed direct successors of a state on the main path.
///
/// Exception pseudo-states are not listed here: they are reachable from
/// everywhere and handled by [`can_transition`] directly.
pub fn allowed_next(from: CaseState) -> &'static [CaseState] {
    use CaseState::*;
    match from {
        CaseCreated => &[DecisionPauseActive, Verifying],
        DecisionPauseActive => &[Verifying],
        Verifying => &[VerifiedWithUnknowns],
        VerifiedWithUnknowns => &[InstallWindowProposed],
        InstallWindowProposed => &[InstallWindowAccepted],
        InstallWindowAccepted => &[DecisionLocked],
        DecisionLocked => &[VendorAvailConfirmed],
        VendorAvailConfirmed => &[ShopWindowConfirmed],
        ShopWindowConfirmed => &[ShopAppointmentLocked],
        ShopAppointmentLocked => &[ShipTriggered],
        ShipTriggered => &[InTransit],
        InTransit => &[Delivered],
        Delivered => &[InstallInProgress],
        InstallInProgress => &[Installed],
        Installed => &[PostConfirmationComplete],
        PostConfirmationComplete => &[],
        Exception(_) => &[],
    }
}

/// Whether a direct transition is allowed.
///
/// True iff `to` is an exception pseudo-state, or `to` is a listed
/// successor of `from`. Pure and total over the state enum.
pub fn can_transition(from: CaseState, to: CaseState) -> bool {
    if to.is_exception() {
        return true;
    }
    allowed_next(from).contains(&to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseflow_types::ExceptionType;
    use CaseState::*;

    /// The main path written out independently of `allowed_next`, so a
    /// table edit that skips or reorders a step fails here.
    const MAIN_PATH: [CaseState; 15] = [
        CaseCreated,
        Verifying,
        VerifiedWithUnknowns,
        InstallWindowProposed,
        InstallWindowAccepted,
        DecisionLocked,
        VendorAvailConfirmed,
        ShopWindowConfirmed,
        ShopAppointmentLocked,
        ShipTriggered,
        InTransit,
        Delivered,
        InstallInProgress,
        Installed,
        PostConfirmationComplete,
    ];

    #[test]
    fn main_path_steps_are_allowed() {
        for pair in MAIN_PATH.windows(2) {
            assert!(
                can_transition(pair[0], pair[1]),
                "{} -> {} must be allowed",
                pair[0],
                pair[1]
            );
        }
        // The optional pause branch.
        assert!(can_transition(CaseCreated, DecisionPauseActive));
        assert!(can_transition(DecisionPauseActive, Verifying));
    }

    #[test]
    fn no_skipping_or_jumping() {
        // Every pair that is not a direct successor (and not an
        // exception target) must be rejected, including self-loops and
        // backwards moves.
        for from in CaseState::all() {
            for to in CaseState::all() {
                let expected = to.is_exception() || allowed_next(from).contains(&to);
                assert_eq!(
                    can_transition(from, to),
                    expected,
                    "can_transition({}, {})",
                    from,
                    to
                );
            }
        }
        // Spot checks a reader can eyeball.
        assert!(!can_transition(CaseCreated, VerifiedWithUnknowns));
        assert!(!can_transition(Verifying, Verifying));
        assert!(!can_transition(Delivered, InTransit));
        assert!(!can_transition(InstallWindowAccepted, VendorAvailConfirmed));
    }

    #[test]
    fn exceptions_reachable_from_every_state() {
        for from in CaseState::all() {
            for t in ExceptionType::ALL {
                assert!(can_transition(from, Exception(t)));
            }
        }
    }

    #[test]
    fn exception_states_are_absorbing() {
        for t in ExceptionType::ALL {
            assert!(allowed_next(Exception(t)).is_empty());
            for to in CaseState::all() {
                if !to.is_exception() {
                    assert!(!can_transition(Exception(t), to));
                }
            }
        }
    }

    #[test]
    fn linearity_every_state_past_created_has_at_most_one_successor() {
        for from in CaseState::all() {
            if from == CaseCreated {
                assert_eq!(allowed_next(from).len(), 2);
            } else {
                assert!(allowed_next(from).len() <= 1);
            }
        }
    }
}
