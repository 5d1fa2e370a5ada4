mod conflict;
mod error;
mod lifecycle;
mod mutations;
mod queries;

pub use error::EngineError;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, mpsc, oneshot};

use crate::model::*;
use crate::notify::NotifyHub;
use crate::wal::Wal;

pub type SharedRoomState = Arc<RwLock<RoomState>>;

// ── Group-commit WAL channel ─────────────────────────────

enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task owning the WAL. Batches whatever appends are queued at the
/// moment one arrives, writes them with a single fsync, then answers every
/// sender — group commit.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];
                let mut deferred = None;

                // Drain every append already queued into this batch.
                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            deferred = Some(other);
                            break;
                        }
                        Err(_) => break, // channel empty
                    }
                }

                metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE)
                    .record(batch.len() as f64);
                let flush_start = std::time::Instant::now();
                let result = flush_batch(&mut wal, &batch);
                metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
                    .record(flush_start.elapsed().as_secs_f64());
                respond_batch(batch, &result);

                if let Some(cmd) = deferred {
                    handle_non_append(&mut wal, cmd);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn flush_batch(wal: &mut Wal, batch: &[(Event, oneshot::Sender<io::Result<()>>)]) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Flush even after an append error so partially buffered bytes don't
    // leak into the next batch (these callers are all told the batch failed).
    let flush_err = wal.flush_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}

fn respond_batch(batch: Vec<(Event, oneshot::Sender<io::Result<()>>)>, result: &io::Result<()>) {
    for (_, tx) in batch {
        let r = match result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

/// The reservation engine for one property.
///
/// Rooms live behind per-room `RwLock`s in a `DashMap`, so the
/// check-overlap-then-create sequence is serialized per room while requests
/// against different rooms run fully in parallel. There is no global lock.
/// The engine holds no cross-request state outside the WAL-backed maps.
pub struct Engine {
    rooms: DashMap<RoomNumber, SharedRoomState>,
    wal_tx: mpsc::Sender<WalCommand>,
    pub notify: Arc<NotifyHub>,
    /// Reverse lookup: booking id → room number.
    booking_to_room: DashMap<BookingId, RoomNumber>,
    /// One payment per confirmed booking.
    payments: DashMap<BookingId, PaymentRecord>,
}

/// Apply an event to a room's state (no locking — caller holds the lock).
fn apply_to_room(
    rs: &mut RoomState,
    event: &Event,
    booking_index: &DashMap<BookingId, RoomNumber>,
    payments: &DashMap<BookingId, PaymentRecord>,
) {
    match event {
        Event::RoomUpdated {
            room_type,
            price_per_night,
            location,
            amenities,
            ..
        } => {
            rs.room_type = room_type.clone();
            rs.price_per_night = *price_per_night;
            rs.location = location.clone();
            rs.amenities = amenities.clone();
        }
        Event::AvailabilityFlagSet { available, .. } => {
            rs.is_available = *available;
        }
        Event::BookingCreated {
            id,
            customer_id,
            room_number,
            stay,
            total_cost,
            booked_at,
        } => {
            rs.insert_booking(BookingRecord {
                id: *id,
                customer_id: *customer_id,
                stay: *stay,
                status: BookingStatus::Pending,
                total_cost: *total_cost,
                booked_at: *booked_at,
            });
            booking_index.insert(*id, *room_number);
        }
        Event::PaymentConfirmed {
            booking_id,
            amount,
            method,
            paid_at,
            ..
        } => {
            if let Some(b) = rs.booking_mut(*booking_id) {
                b.status = BookingStatus::Confirmed;
            }
            payments.insert(
                *booking_id,
                PaymentRecord {
                    booking_id: *booking_id,
                    amount: *amount,
                    method: *method,
                    paid_at: *paid_at,
                },
            );
        }
        Event::BookingCancelled { id, .. } => {
            if let Some(b) = rs.booking_mut(*id) {
                b.status = BookingStatus::Cancelled;
            }
        }
        Event::GuestCheckedIn { id, .. } => {
            if let Some(b) = rs.booking_mut(*id) {
                b.status = BookingStatus::CheckedIn;
            }
            rs.is_available = false;
        }
        Event::GuestCheckedOut { id, .. } => {
            if let Some(b) = rs.booking_mut(*id) {
                b.status = BookingStatus::Completed;
            }
            rs.is_available = true;
        }
        // RoomAdded/RoomRemoved are handled at the DashMap level, not here
        Event::RoomAdded { .. } | Event::RoomRemoved { .. } => {}
    }
}

impl Engine {
    /// Open the property's WAL, replay it into memory, and start the
    /// group-commit writer. Must run inside a tokio runtime.
    pub fn new(wal_path: PathBuf, notify: Arc<NotifyHub>) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            rooms: DashMap::new(),
            wal_tx,
            notify,
            booking_to_room: DashMap::new(),
            payments: DashMap::new(),
        };

        // Replay — we're the sole owner of these Arcs, so try_write always
        // succeeds instantly. Never block here: new() may run inside an
        // async context (lazy property creation).
        for event in &events {
            match event {
                Event::RoomAdded {
                    number,
                    room_type,
                    price_per_night,
                    location,
                    amenities,
                } => {
                    let rs = RoomState::new(
                        *number,
                        room_type.clone(),
                        *price_per_night,
                        location.clone(),
                        amenities.clone(),
                    );
                    engine.rooms.insert(*number, Arc::new(RwLock::new(rs)));
                }
                Event::RoomRemoved { number } => {
                    if let Some((_, rs)) = engine.rooms.remove(number) {
                        let guard = rs.try_read().expect("replay: uncontended read");
                        for b in &guard.bookings {
                            engine.booking_to_room.remove(&b.id);
                            engine.payments.remove(&b.id);
                        }
                    }
                }
                other => {
                    if let Some(number) = event_room_number(other)
                        && let Some(entry) = engine.rooms.get(&number)
                    {
                        let rs_arc = entry.value().clone();
                        drop(entry);
                        let mut guard = rs_arc.try_write().expect("replay: uncontended write");
                        apply_to_room(&mut guard, other, &engine.booking_to_room, &engine.payments);
                    }
                }
            }
        }

        Ok(engine)
    }

    /// Write an event through the group-commit writer.
    async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::StoreUnavailable("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::StoreUnavailable("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::StoreUnavailable(e.to_string()))
    }

    pub fn get_room_state(&self, number: RoomNumber) -> Option<SharedRoomState> {
        self.rooms.get(&number).map(|e| e.value().clone())
    }

    pub fn room_for_booking(&self, booking_id: &BookingId) -> Option<RoomNumber> {
        self.booking_to_room.get(booking_id).map(|e| *e.value())
    }

    /// WAL-append + apply + notify in one call, under the caller's room lock.
    /// The append happens first: if the store fails, nothing mutates.
    pub(super) async fn persist_and_apply(
        &self,
        room: RoomNumber,
        rs: &mut RoomState,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        apply_to_room(rs, event, &self.booking_to_room, &self.payments);
        self.notify.send(room, event);
        Ok(())
    }

    /// Look up a booking's room and acquire its write lock.
    pub(super) async fn resolve_booking_write(
        &self,
        booking_id: &BookingId,
    ) -> Result<(RoomNumber, tokio::sync::OwnedRwLockWriteGuard<RoomState>), EngineError> {
        let room = self
            .room_for_booking(booking_id)
            .ok_or(EngineError::BookingNotFound(*booking_id))?;
        let rs = self
            .get_room_state(room)
            .ok_or(EngineError::RoomNotFound(room))?;
        let guard = rs.write_owned().await;
        Ok((room, guard))
    }
}

/// Extract the room number from an event (for non-add/remove events).
fn event_room_number(event: &Event) -> Option<RoomNumber> {
    match event {
        Event::RoomUpdated { number, .. } | Event::AvailabilityFlagSet { number, .. } => {
            Some(*number)
        }
        Event::BookingCreated { room_number, .. }
        | Event::PaymentConfirmed { room_number, .. }
        | Event::BookingCancelled { room_number, .. }
        | Event::GuestCheckedIn { room_number, .. }
        | Event::GuestCheckedOut { room_number, .. } => Some(*room_number),
        Event::RoomAdded { .. } | Event::RoomRemoved { .. } => None,
    }
}
