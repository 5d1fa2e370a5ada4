//! Hard caps on engine input. Requests beyond these are rejected with
//! `EngineError::InvalidRequest` before any mutation.

/// Rooms per property.
pub const MAX_ROOMS_PER_PROPERTY: usize = 10_000;

/// Booking records (history included) per room.
pub const MAX_BOOKINGS_PER_ROOM: usize = 50_000;

/// Free-text fields: location, amenities, type name, type description.
pub const MAX_TEXT_LEN: usize = 512;

/// Longest accepted stay, in nights.
pub const MAX_STAY_NIGHTS: i64 = 365;

/// Bookable date window. Dates outside it are almost certainly caller bugs
/// (year-0 sentinels, far-future garbage) and would bloat the booking lists.
pub const MIN_BOOKABLE_YEAR: i32 = 2000;
pub const MAX_BOOKABLE_YEAR: i32 = 2200;

/// Properties a single manager will open.
pub const MAX_PROPERTIES: usize = 64;

pub const MAX_PROPERTY_NAME_LEN: usize = 128;
