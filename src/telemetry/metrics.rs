//! Metric instrument factories for stateful-processor.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without a registered provider these are no-ops.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("stateful-processor")
}

/// Counter: successful worker invocations.
pub fn items_processed() -> Counter<u64> {
    meter()
        .u64_counter("stateful.items.processed")
        .with_description("Items processed by the worker")
        .build()
}

/// Counter: items skipped because they were already recorded.
pub fn items_skipped() -> Counter<u64> {
    meter()
        .u64_counter("stateful.items.skipped")
        .with_description("Items skipped as already processed")
        .build()
}

/// Counter: snapshots written.
/// Labels: `trigger` ("completion" | "interrupt").
pub fn snapshots_saved() -> Counter<u64> {
    meter()
        .u64_counter("stateful.snapshots.saved")
        .with_description("Snapshots written to the store")
        .build()
}

/// Histogram: worker call duration in milliseconds.
pub fn item_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("stateful.item.duration_ms")
        .with_description("Worker call duration in milliseconds")
        .with_unit("ms")
        .build()
}
