use chrono::Datelike;

use crate::limits::*;
use crate::model::*;

use super::EngineError;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as Ms
}

/// Reject malformed stays before they reach the overlap checker: zero or
/// negative night counts, dates outside the bookable window, marathon stays.
pub(crate) fn validate_stay(stay: &Stay) -> Result<(), EngineError> {
    if stay.check_out <= stay.check_in {
        return Err(EngineError::InvalidRange {
            check_in: stay.check_in,
            check_out: stay.check_out,
        });
    }
    if stay.check_in.year() < MIN_BOOKABLE_YEAR || stay.check_out.year() > MAX_BOOKABLE_YEAR {
        return Err(EngineError::InvalidRequest("stay outside bookable date window"));
    }
    if stay.nights() > MAX_STAY_NIGHTS {
        return Err(EngineError::InvalidRequest("stay too long"));
    }
    Ok(())
}

/// The interval overlap checker. Read-only: scans the room's bookings for one
/// in a non-terminal status whose half-open stay overlaps the candidate.
/// CANCELLED and COMPLETED bookings never conflict; back-to-back stays
/// (one checks out the day another checks in) never conflict.
pub(crate) fn find_conflict(room: &RoomState, stay: &Stay) -> Option<BookingId> {
    room.overlapping(stay)
        .find(|b| !b.status.is_terminal())
        .map(|b| b.id)
}

pub(crate) fn check_no_conflict(room: &RoomState, stay: &Stay) -> Result<(), EngineError> {
    match find_conflict(room, stay) {
        Some(id) => Err(EngineError::RoomUnavailable {
            room: room.number,
            conflicts_with: id,
        }),
        None => Ok(()),
    }
}
