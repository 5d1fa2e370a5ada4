//! End-to-end reservation flow over the public library surface: open a
//! property, stock rooms, browse, reserve, pay, check in, check out, and
//! survive a restart.

use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use ulid::Ulid;

use innkeep::model::{BookingStatus, Event, PaymentMethod, RoomType};
use innkeep::property::PropertyManager;

fn test_data_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("innkeep_test_flow").join(name);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn standard_type() -> RoomType {
    RoomType {
        type_name: "Standard".into(),
        description: "Queen bed, city view".into(),
        base_price: Decimal::from(100),
        max_occupancy: 2,
        extra_bed: false,
    }
}

fn deluxe_type() -> RoomType {
    RoomType {
        type_name: "Deluxe".into(),
        description: "King bed, balcony".into(),
        base_price: Decimal::from(180),
        max_occupancy: 3,
        extra_bed: true,
    }
}

#[tokio::test]
async fn full_reservation_flow() {
    let dir = test_data_dir("full_flow");
    let manager = PropertyManager::new(dir.clone(), 10_000);
    let hotel = manager.get_or_create("seaside").unwrap();

    hotel
        .add_room(101, standard_type(), Decimal::from(100), "Floor 1".into(), "WiFi".into())
        .await
        .unwrap();
    hotel
        .add_room(201, deluxe_type(), Decimal::from(180), "Floor 2".into(), "WiFi, minibar".into())
        .await
        .unwrap();

    // A front-desk view watches room 101
    let mut room_feed = hotel.notify.subscribe(101);

    // Browse, then book the standard room for three nights
    let free = hotel.list_available(d(2025, 9, 1), d(2025, 9, 4)).await.unwrap();
    assert_eq!(free.len(), 2);

    let guest = Ulid::new();
    let booking = hotel
        .reserve(guest, 101, d(2025, 9, 1), d(2025, 9, 4))
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.total_cost, Decimal::from(300));

    // The watcher saw the booking land
    assert!(matches!(
        room_feed.recv().await.unwrap(),
        Event::BookingCreated { .. }
    ));

    // Room 101 no longer shows for the booked range, 201 still does
    let free = hotel.list_available(d(2025, 9, 1), d(2025, 9, 4)).await.unwrap();
    assert_eq!(free.len(), 1);
    assert_eq!(free[0].number, 201);

    // Payment confirms; check-in occupies the room; check-out completes
    hotel
        .confirm_payment(booking.id, Decimal::from(300), PaymentMethod::Card)
        .await
        .unwrap();
    hotel.check_in(booking.id).await.unwrap();
    assert!(!hotel.get_room(101).await.unwrap().is_available);
    hotel.check_out(booking.id).await.unwrap();
    assert!(hotel.get_room(101).await.unwrap().is_available);

    let done = hotel.get_booking(booking.id).await.unwrap();
    assert_eq!(done.status, BookingStatus::Completed);

    // Restart: a fresh manager over the same data directory sees it all
    drop(hotel);
    let manager2 = PropertyManager::new(dir, 10_000);
    let hotel2 = manager2.get_or_create("seaside").unwrap();

    let restored = hotel2.get_booking(booking.id).await.unwrap();
    assert_eq!(restored.status, BookingStatus::Completed);
    assert_eq!(restored.customer_id, guest);
    assert_eq!(
        hotel2.payment_for_booking(booking.id).unwrap().amount,
        Decimal::from(300)
    );

    let mine = hotel2.bookings_for_customer(guest).await;
    assert_eq!(mine.len(), 1);
}

#[tokio::test]
async fn competing_guests_for_the_last_room() {
    let dir = test_data_dir("competing");
    let manager = PropertyManager::new(dir, 10_000);
    let hotel = manager.get_or_create("downtown").unwrap();

    hotel
        .add_room(301, standard_type(), Decimal::from(120), String::new(), String::new())
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let hotel = hotel.clone();
        handles.push(tokio::spawn(async move {
            hotel
                .reserve(Ulid::new(), 301, d(2025, 12, 24), d(2025, 12, 27))
                .await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);

    // The losers left no trace: one booking, and the range is gone
    assert_eq!(hotel.bookings_for_room(301).await.unwrap().len(), 1);
    assert!(
        hotel
            .list_available(d(2025, 12, 24), d(2025, 12, 27))
            .await
            .unwrap()
            .is_empty()
    );
}
