use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — used for creation stamps only. Occupancy is date-based.
pub type Ms = i64;

/// Room numbers are assigned by staff and never change.
pub type RoomNumber = u32;

pub type BookingId = Ulid;

/// Opaque reference to a customer. Identity and profile data live elsewhere.
pub type CustomerId = Ulid;

/// Half-open stay `[check_in, check_out)` — the checkout day itself is not
/// occupied, so same-day turnover is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stay {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl Stay {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Self {
        debug_assert!(check_in < check_out, "Stay check_in must be before check_out");
        Self { check_in, check_out }
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Two half-open stays overlap iff each begins before the other ends.
    pub fn overlaps(&self, other: &Stay) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.check_in <= date && date < self.check_out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    CheckedIn,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Terminal bookings no longer hold their dates against the room.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::CheckedIn => "CHECKED_IN",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Card,
    Cash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "CARD",
            PaymentMethod::Cash => "CASH",
        }
    }
}

/// Room category. A room's nightly price may override the type's base price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomType {
    pub type_name: String,
    pub description: String,
    pub base_price: Decimal,
    pub max_occupancy: u32,
    pub extra_bed: bool,
}

/// One reservation. Never physically deleted — cancellation is a status
/// change, so the room keeps its full history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub id: BookingId,
    pub customer_id: CustomerId,
    pub stay: Stay,
    pub status: BookingStatus,
    pub total_cost: Decimal,
    pub booked_at: Ms,
}

/// Created once per successful confirm transition; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub booking_id: BookingId,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub paid_at: Ms,
}

#[derive(Debug, Clone)]
pub struct RoomState {
    pub number: RoomNumber,
    pub room_type: RoomType,
    pub price_per_night: Decimal,
    /// Coarse availability flag — a cache for browse views. The per-date
    /// overlap check against `bookings` is authoritative.
    pub is_available: bool,
    pub location: String,
    pub amenities: String,
    /// Full booking history, sorted by `stay.check_in`.
    pub bookings: Vec<BookingRecord>,
}

impl RoomState {
    pub fn new(
        number: RoomNumber,
        room_type: RoomType,
        price_per_night: Decimal,
        location: String,
        amenities: String,
    ) -> Self {
        Self {
            number,
            room_type,
            price_per_night,
            is_available: true,
            location,
            amenities,
            bookings: Vec::new(),
        }
    }

    /// Insert a booking maintaining sort order by check-in date.
    pub fn insert_booking(&mut self, booking: BookingRecord) {
        let pos = self
            .bookings
            .binary_search_by_key(&booking.stay.check_in, |b| b.stay.check_in)
            .unwrap_or_else(|e| e);
        self.bookings.insert(pos, booking);
    }

    pub fn booking(&self, id: BookingId) -> Option<&BookingRecord> {
        self.bookings.iter().find(|b| b.id == id)
    }

    pub fn booking_mut(&mut self, id: BookingId) -> Option<&mut BookingRecord> {
        self.bookings.iter_mut().find(|b| b.id == id)
    }

    /// All bookings (any status) whose stay overlaps the query.
    /// Binary search skips bookings starting at or after `stay.check_out`.
    pub fn overlapping(&self, stay: &Stay) -> impl Iterator<Item = &BookingRecord> {
        let cutoff = self
            .bookings
            .partition_point(|b| b.stay.check_in < stay.check_out);
        let stay = *stay;
        self.bookings[..cutoff]
            .iter()
            .filter(move |b| b.stay.check_out > stay.check_in)
    }

    pub fn has_non_terminal_bookings(&self) -> bool {
        self.bookings.iter().any(|b| !b.status.is_terminal())
    }
}

/// The event types — flat, no nesting. This is the WAL record format, and
/// applying events is the only way engine state changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    RoomAdded {
        number: RoomNumber,
        room_type: RoomType,
        price_per_night: Decimal,
        location: String,
        amenities: String,
    },
    RoomUpdated {
        number: RoomNumber,
        room_type: RoomType,
        price_per_night: Decimal,
        location: String,
        amenities: String,
    },
    RoomRemoved {
        number: RoomNumber,
    },
    AvailabilityFlagSet {
        number: RoomNumber,
        available: bool,
    },
    BookingCreated {
        id: BookingId,
        customer_id: CustomerId,
        room_number: RoomNumber,
        stay: Stay,
        total_cost: Decimal,
        booked_at: Ms,
    },
    /// Confirms the booking and records the payment in one atomic record.
    PaymentConfirmed {
        booking_id: BookingId,
        room_number: RoomNumber,
        amount: Decimal,
        method: PaymentMethod,
        paid_at: Ms,
    },
    BookingCancelled {
        id: BookingId,
        room_number: RoomNumber,
    },
    GuestCheckedIn {
        id: BookingId,
        room_number: RoomNumber,
    },
    GuestCheckedOut {
        id: BookingId,
        room_number: RoomNumber,
    },
}

// ── Read views for UI/API layers ─────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub number: RoomNumber,
    pub room_type: RoomType,
    pub price_per_night: Decimal,
    pub is_available: bool,
    pub location: String,
    pub amenities: String,
}

impl RoomInfo {
    pub(crate) fn from_state(rs: &RoomState) -> Self {
        Self {
            number: rs.number,
            room_type: rs.room_type.clone(),
            price_per_night: rs.price_per_night,
            is_available: rs.is_available,
            location: rs.location.clone(),
            amenities: rs.amenities.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingInfo {
    pub id: BookingId,
    pub customer_id: CustomerId,
    pub room_number: RoomNumber,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub status: BookingStatus,
    pub total_cost: Decimal,
    pub booked_at: Ms,
}

impl BookingInfo {
    pub(crate) fn from_record(room_number: RoomNumber, b: &BookingRecord) -> Self {
        Self {
            id: b.id,
            customer_id: b.customer_id,
            room_number,
            check_in: b.stay.check_in,
            check_out: b.stay.check_out,
            status: b.status,
            total_cost: b.total_cost,
            booked_at: b.booked_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentInfo {
    pub booking_id: BookingId,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub paid_at: Ms,
}

impl PaymentInfo {
    pub(crate) fn from_record(p: &PaymentRecord) -> Self {
        Self {
            booking_id: p.booking_id,
            amount: p.amount,
            method: p.method,
            paid_at: p.paid_at,
        }
    }
}
