use chrono::NaiveDate;

use crate::model::*;

use super::conflict::{find_conflict, validate_stay};
use super::{Engine, EngineError, SharedRoomState};

impl Engine {
    pub async fn get_room(&self, number: RoomNumber) -> Option<RoomInfo> {
        let rs = self.get_room_state(number)?;
        let guard = rs.read().await;
        Some(RoomInfo::from_state(&guard))
    }

    pub async fn list_rooms(&self) -> Vec<RoomInfo> {
        let room_states: Vec<SharedRoomState> =
            self.rooms.iter().map(|e| e.value().clone()).collect();
        let mut rooms = Vec::with_capacity(room_states.len());
        for rs in room_states {
            let guard = rs.read().await;
            rooms.push(RoomInfo::from_state(&guard));
        }
        rooms.sort_by_key(|r| r.number);
        rooms
    }

    /// Rooms bookable for the stay: coarse flag available AND no conflicting
    /// non-terminal booking. The flag is a fast filter for browse views; the
    /// overlap check is what actually decides.
    pub async fn list_available(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<Vec<RoomInfo>, EngineError> {
        let stay = Stay { check_in, check_out };
        validate_stay(&stay)?;

        let room_states: Vec<SharedRoomState> =
            self.rooms.iter().map(|e| e.value().clone()).collect();
        let mut available = Vec::new();
        for rs in room_states {
            let guard = rs.read().await;
            if guard.is_available && find_conflict(&guard, &stay).is_none() {
                available.push(RoomInfo::from_state(&guard));
            }
        }
        available.sort_by_key(|r| r.number);
        Ok(available)
    }

    pub async fn get_booking(&self, booking_id: BookingId) -> Result<BookingInfo, EngineError> {
        let room = self
            .room_for_booking(&booking_id)
            .ok_or(EngineError::BookingNotFound(booking_id))?;
        let rs = self
            .get_room_state(room)
            .ok_or(EngineError::RoomNotFound(room))?;
        let guard = rs.read().await;
        guard
            .booking(booking_id)
            .map(|b| BookingInfo::from_record(room, b))
            .ok_or(EngineError::BookingNotFound(booking_id))
    }

    /// Full booking history of a room, terminal bookings included.
    pub async fn bookings_for_room(
        &self,
        number: RoomNumber,
    ) -> Result<Vec<BookingInfo>, EngineError> {
        let rs = self
            .get_room_state(number)
            .ok_or(EngineError::RoomNotFound(number))?;
        let guard = rs.read().await;
        Ok(guard
            .bookings
            .iter()
            .map(|b| BookingInfo::from_record(number, b))
            .collect())
    }

    /// Every booking a customer has made across the property.
    pub async fn bookings_for_customer(&self, customer_id: CustomerId) -> Vec<BookingInfo> {
        let room_states: Vec<SharedRoomState> =
            self.rooms.iter().map(|e| e.value().clone()).collect();
        let mut bookings = Vec::new();
        for rs in room_states {
            let guard = rs.read().await;
            for b in &guard.bookings {
                if b.customer_id == customer_id {
                    bookings.push(BookingInfo::from_record(guard.number, b));
                }
            }
        }
        bookings.sort_by_key(|b| b.booked_at);
        bookings
    }

    pub fn payment_for_booking(&self, booking_id: BookingId) -> Option<PaymentInfo> {
        self.payments
            .get(&booking_id)
            .map(|p| PaymentInfo::from_record(&p))
    }
}
