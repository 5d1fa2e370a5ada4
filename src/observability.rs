use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: bookings created.
pub const RESERVATIONS_TOTAL: &str = "innkeep_reservations_total";

/// Counter: reservation attempts rejected because the room was taken.
pub const RESERVATION_CONFLICTS_TOTAL: &str = "innkeep_reservation_conflicts_total";

/// Counter: payments accepted (booking confirmed).
pub const PAYMENTS_TOTAL: &str = "innkeep_payments_total";

/// Counter: payments rejected (insufficient amount or wrong status).
pub const PAYMENTS_REJECTED_TOTAL: &str = "innkeep_payments_rejected_total";

/// Counter: bookings cancelled.
pub const CANCELLATIONS_TOTAL: &str = "innkeep_cancellations_total";

/// Counter: guests checked in.
pub const CHECKINS_TOTAL: &str = "innkeep_checkins_total";

/// Counter: guests checked out.
pub const CHECKOUTS_TOTAL: &str = "innkeep_checkouts_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: properties with a loaded engine.
pub const PROPERTIES_ACTIVE: &str = "innkeep_properties_active";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "innkeep_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "innkeep_wal_flush_batch_size";

/// Install the Prometheus exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
