use chrono::NaiveDate;

use crate::model::{BookingId, BookingStatus, RoomNumber};

#[derive(Debug)]
pub enum EngineError {
    /// Check-out is not strictly after check-in.
    InvalidRange {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
    RoomNotFound(RoomNumber),
    /// The requested stay overlaps a non-terminal booking.
    RoomUnavailable {
        room: RoomNumber,
        conflicts_with: BookingId,
    },
    BookingNotFound(BookingId),
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
    PaymentRejected(&'static str),
    DuplicateRoom(RoomNumber),
    /// Room removal refused while non-terminal bookings exist.
    ActiveBookings(RoomNumber),
    /// Request breaches a `limits` cap or a field invariant.
    InvalidRequest(&'static str),
    StoreUnavailable(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidRange { check_in, check_out } => {
                write!(f, "invalid range: check-out {check_out} must be after check-in {check_in}")
            }
            EngineError::RoomNotFound(n) => write!(f, "room not found: {n}"),
            EngineError::RoomUnavailable { room, conflicts_with } => {
                write!(f, "room {room} unavailable: conflicts with booking {conflicts_with}")
            }
            EngineError::BookingNotFound(id) => write!(f, "booking not found: {id}"),
            EngineError::InvalidTransition { from, to } => {
                write!(f, "invalid transition: {from} -> {to}")
            }
            EngineError::PaymentRejected(reason) => write!(f, "payment rejected: {reason}"),
            EngineError::DuplicateRoom(n) => write!(f, "room already exists: {n}"),
            EngineError::ActiveBookings(n) => {
                write!(f, "cannot remove room {n}: non-terminal bookings exist")
            }
            EngineError::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
            EngineError::StoreUnavailable(e) => write!(f, "store unavailable: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
