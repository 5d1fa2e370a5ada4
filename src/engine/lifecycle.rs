use crate::model::BookingStatus;

use super::EngineError;

/// The booking state machine.
///
/// ```text
/// PENDING ──payment──▶ CONFIRMED ──check-in──▶ CHECKED_IN ──check-out──▶ COMPLETED
///    │                     │
///    └──────cancel─────────┴──▶ CANCELLED
/// ```
///
/// COMPLETED and CANCELLED are terminal. Anything not in the table is an
/// `InvalidTransition`, and the caller must perform no mutation.
pub(crate) fn check_transition(
    from: BookingStatus,
    to: BookingStatus,
) -> Result<(), EngineError> {
    use BookingStatus::*;
    let legal = matches!(
        (from, to),
        (Pending, Confirmed)
            | (Pending, Cancelled)
            | (Confirmed, Cancelled)
            | (Confirmed, CheckedIn)
            | (CheckedIn, Completed)
    );
    if legal {
        Ok(())
    } else {
        Err(EngineError::InvalidTransition { from, to })
    }
}
