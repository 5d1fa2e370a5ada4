use rust_decimal::Decimal;
use tracing::debug;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::conflict::{check_no_conflict, now_ms, validate_stay};
use super::lifecycle::check_transition;
use super::{Engine, EngineError, SharedRoomState, WalCommand};

fn validate_room_fields(
    room_type: &RoomType,
    price_per_night: Decimal,
    location: &str,
    amenities: &str,
) -> Result<(), EngineError> {
    if price_per_night < Decimal::ZERO || room_type.base_price < Decimal::ZERO {
        return Err(EngineError::InvalidRequest("price must not be negative"));
    }
    if room_type.type_name.len() > MAX_TEXT_LEN
        || room_type.description.len() > MAX_TEXT_LEN
        || location.len() > MAX_TEXT_LEN
        || amenities.len() > MAX_TEXT_LEN
    {
        return Err(EngineError::InvalidRequest("text field too long"));
    }
    Ok(())
}

impl Engine {
    // ── Room inventory ───────────────────────────────────────

    pub async fn add_room(
        &self,
        number: RoomNumber,
        room_type: RoomType,
        price_per_night: Decimal,
        location: String,
        amenities: String,
    ) -> Result<RoomInfo, EngineError> {
        validate_room_fields(&room_type, price_per_night, &location, &amenities)?;
        if self.rooms.len() >= MAX_ROOMS_PER_PROPERTY {
            return Err(EngineError::InvalidRequest("too many rooms"));
        }
        if self.rooms.contains_key(&number) {
            return Err(EngineError::DuplicateRoom(number));
        }

        let event = Event::RoomAdded {
            number,
            room_type: room_type.clone(),
            price_per_night,
            location: location.clone(),
            amenities: amenities.clone(),
        };
        self.wal_append(&event).await?;
        let rs = RoomState::new(number, room_type, price_per_night, location, amenities);
        let info = RoomInfo::from_state(&rs);
        self.rooms
            .insert(number, std::sync::Arc::new(tokio::sync::RwLock::new(rs)));
        self.notify.send(number, &event);
        Ok(info)
    }

    pub async fn update_room(
        &self,
        number: RoomNumber,
        room_type: RoomType,
        price_per_night: Decimal,
        location: String,
        amenities: String,
    ) -> Result<RoomInfo, EngineError> {
        validate_room_fields(&room_type, price_per_night, &location, &amenities)?;
        let rs = self
            .get_room_state(number)
            .ok_or(EngineError::RoomNotFound(number))?;
        let mut guard = rs.write().await;

        let event = Event::RoomUpdated {
            number,
            room_type,
            price_per_night,
            location,
            amenities,
        };
        self.persist_and_apply(number, &mut guard, &event).await?;
        Ok(RoomInfo::from_state(&guard))
    }

    /// Remove a room from inventory. Refused while any booking is still in a
    /// non-terminal status; terminal history goes with the room.
    pub async fn remove_room(&self, number: RoomNumber) -> Result<(), EngineError> {
        let rs = self
            .get_room_state(number)
            .ok_or(EngineError::RoomNotFound(number))?;
        let guard = rs.write().await;
        if guard.has_non_terminal_bookings() {
            return Err(EngineError::ActiveBookings(number));
        }

        let event = Event::RoomRemoved { number };
        self.wal_append(&event).await?;
        for b in &guard.bookings {
            self.booking_to_room.remove(&b.id);
            self.payments.remove(&b.id);
        }
        drop(guard);
        self.rooms.remove(&number);
        self.notify.send(number, &event);
        self.notify.remove(&number);
        Ok(())
    }

    /// Set the coarse availability flag to occupied. Idempotent: a no-op
    /// toggle succeeds without appending an event.
    pub async fn mark_occupied(&self, number: RoomNumber) -> Result<(), EngineError> {
        self.set_availability_flag(number, false).await
    }

    /// Set the coarse availability flag to available. Idempotent.
    pub async fn mark_available(&self, number: RoomNumber) -> Result<(), EngineError> {
        self.set_availability_flag(number, true).await
    }

    async fn set_availability_flag(
        &self,
        number: RoomNumber,
        available: bool,
    ) -> Result<(), EngineError> {
        let rs = self
            .get_room_state(number)
            .ok_or(EngineError::RoomNotFound(number))?;
        let mut guard = rs.write().await;
        if guard.is_available == available {
            return Ok(());
        }
        let event = Event::AvailabilityFlagSet { number, available };
        self.persist_and_apply(number, &mut guard, &event).await
    }

    // ── Reservations ─────────────────────────────────────────

    /// Create a PENDING booking for the stay, or fail without mutating
    /// anything. The overlap check and the booking creation run under the
    /// room's write lock, so two overlapping requests for the same room can
    /// never both succeed; requests for other rooms are unaffected.
    pub async fn reserve(
        &self,
        customer_id: CustomerId,
        room_number: RoomNumber,
        check_in: chrono::NaiveDate,
        check_out: chrono::NaiveDate,
    ) -> Result<BookingInfo, EngineError> {
        let stay = Stay { check_in, check_out };
        validate_stay(&stay)?;
        let rs = self
            .get_room_state(room_number)
            .ok_or(EngineError::RoomNotFound(room_number))?;
        let mut guard = rs.write().await;
        if guard.bookings.len() >= MAX_BOOKINGS_PER_ROOM {
            return Err(EngineError::InvalidRequest("too many bookings on room"));
        }

        if let Err(e) = check_no_conflict(&guard, &stay) {
            metrics::counter!(observability::RESERVATION_CONFLICTS_TOTAL).increment(1);
            return Err(e);
        }

        // Cost always derives from the room's current nightly price.
        let total_cost = guard.price_per_night * Decimal::from(stay.nights());
        let id = Ulid::new();
        let event = Event::BookingCreated {
            id,
            customer_id,
            room_number,
            stay,
            total_cost,
            booked_at: now_ms(),
        };
        self.persist_and_apply(room_number, &mut guard, &event).await?;

        metrics::counter!(observability::RESERVATIONS_TOTAL).increment(1);
        debug!("booking {id} created on room {room_number} for {check_in}..{check_out}");
        let record = guard
            .booking(id)
            .ok_or(EngineError::BookingNotFound(id))?;
        Ok(BookingInfo::from_record(room_number, record))
    }

    /// Confirm a PENDING booking with the amount the payment collaborator
    /// actually charged. On success the booking is CONFIRMED and exactly one
    /// immutable payment record exists; on rejection nothing changes.
    pub async fn confirm_payment(
        &self,
        booking_id: BookingId,
        amount: Decimal,
        method: PaymentMethod,
    ) -> Result<PaymentInfo, EngineError> {
        let (room_number, mut guard) = self.resolve_booking_write(&booking_id).await?;
        let record = guard
            .booking(booking_id)
            .ok_or(EngineError::BookingNotFound(booking_id))?;
        if record.status != BookingStatus::Pending {
            metrics::counter!(observability::PAYMENTS_REJECTED_TOTAL).increment(1);
            return Err(EngineError::PaymentRejected("booking is not pending"));
        }
        if amount < record.total_cost {
            metrics::counter!(observability::PAYMENTS_REJECTED_TOTAL).increment(1);
            return Err(EngineError::PaymentRejected("amount below total cost"));
        }

        let paid_at = now_ms();
        let event = Event::PaymentConfirmed {
            booking_id,
            room_number,
            amount,
            method,
            paid_at,
        };
        self.persist_and_apply(room_number, &mut guard, &event).await?;

        metrics::counter!(observability::PAYMENTS_TOTAL).increment(1);
        debug!("booking {booking_id} confirmed, {} paid by {}", amount, method.as_str());
        Ok(PaymentInfo {
            booking_id,
            amount,
            method,
            paid_at,
        })
    }

    /// Cancel a PENDING or CONFIRMED booking. Refund policy, if any, belongs
    /// to the calling layer.
    pub async fn cancel(&self, booking_id: BookingId) -> Result<BookingInfo, EngineError> {
        let info = self
            .apply_transition(booking_id, BookingStatus::Cancelled)
            .await?;
        metrics::counter!(observability::CANCELLATIONS_TOTAL).increment(1);
        Ok(info)
    }

    /// Guest arrives: CONFIRMED → CHECKED_IN, coarse flag → occupied.
    pub async fn check_in(&self, booking_id: BookingId) -> Result<BookingInfo, EngineError> {
        let info = self
            .apply_transition(booking_id, BookingStatus::CheckedIn)
            .await?;
        metrics::counter!(observability::CHECKINS_TOTAL).increment(1);
        Ok(info)
    }

    /// Guest departs: CHECKED_IN → COMPLETED, coarse flag → available.
    pub async fn check_out(&self, booking_id: BookingId) -> Result<BookingInfo, EngineError> {
        let info = self
            .apply_transition(booking_id, BookingStatus::Completed)
            .await?;
        metrics::counter!(observability::CHECKOUTS_TOTAL).increment(1);
        Ok(info)
    }

    async fn apply_transition(
        &self,
        booking_id: BookingId,
        to: BookingStatus,
    ) -> Result<BookingInfo, EngineError> {
        let (room_number, mut guard) = self.resolve_booking_write(&booking_id).await?;
        let record = guard
            .booking(booking_id)
            .cloned()
            .ok_or(EngineError::BookingNotFound(booking_id))?;
        check_transition(record.status, to)?;

        let event = match to {
            BookingStatus::Cancelled => Event::BookingCancelled {
                id: booking_id,
                room_number,
            },
            BookingStatus::CheckedIn => Event::GuestCheckedIn {
                id: booking_id,
                room_number,
            },
            BookingStatus::Completed => Event::GuestCheckedOut {
                id: booking_id,
                room_number,
            },
            // Pending is entered only via reserve, Confirmed only via payment
            BookingStatus::Pending | BookingStatus::Confirmed => unreachable!(),
        };
        self.persist_and_apply(room_number, &mut guard, &event).await?;

        debug!("booking {booking_id} -> {to}");
        Ok(BookingInfo::from_record(
            room_number,
            &BookingRecord { status: to, ..record },
        ))
    }

    // ── WAL maintenance ──────────────────────────────────────

    /// Rewrite the WAL as the minimal event stream that recreates current
    /// state. Booking history (terminal bookings included) survives
    /// compaction; superseded flag toggles collapse.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let mut events = Vec::new();
        let room_states: Vec<SharedRoomState> =
            self.rooms.iter().map(|e| e.value().clone()).collect();

        for rs in room_states {
            let guard = rs.read().await;
            events.push(Event::RoomAdded {
                number: guard.number,
                room_type: guard.room_type.clone(),
                price_per_night: guard.price_per_night,
                location: guard.location.clone(),
                amenities: guard.amenities.clone(),
            });
            for b in &guard.bookings {
                events.push(Event::BookingCreated {
                    id: b.id,
                    customer_id: b.customer_id,
                    room_number: guard.number,
                    stay: b.stay,
                    total_cost: b.total_cost,
                    booked_at: b.booked_at,
                });
                if let Some(p) = self.payments.get(&b.id) {
                    events.push(Event::PaymentConfirmed {
                        booking_id: b.id,
                        room_number: guard.number,
                        amount: p.amount,
                        method: p.method,
                        paid_at: p.paid_at,
                    });
                }
                match b.status {
                    BookingStatus::Pending | BookingStatus::Confirmed => {}
                    BookingStatus::CheckedIn => events.push(Event::GuestCheckedIn {
                        id: b.id,
                        room_number: guard.number,
                    }),
                    BookingStatus::Completed => {
                        events.push(Event::GuestCheckedIn {
                            id: b.id,
                            room_number: guard.number,
                        });
                        events.push(Event::GuestCheckedOut {
                            id: b.id,
                            room_number: guard.number,
                        });
                    }
                    BookingStatus::Cancelled => events.push(Event::BookingCancelled {
                        id: b.id,
                        room_number: guard.number,
                    }),
                }
            }
            // Check-in/out replay rewrites the flag; pin the real value last.
            events.push(Event::AvailabilityFlagSet {
                number: guard.number,
                available: guard.is_available,
            });
        }

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact {
                events,
                response: tx,
            })
            .await
            .map_err(|_| EngineError::StoreUnavailable("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::StoreUnavailable("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::StoreUnavailable(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = tokio::sync::oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
