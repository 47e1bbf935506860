//! Run span helpers.

use tracing::Span;
use uuid::Uuid;

use crate::model::RunOutcome;

/// Start a span covering one engine run.
///
/// The `run.outcome` field is declared empty and filled by
/// [`record_outcome`].
pub fn start_run_span(store: &str, total: usize) -> Span {
    tracing::info_span!(
        "job.run",
        "run.id" = %Uuid::new_v4(),
        "run.store" = store,
        "run.items" = total,
        "run.outcome" = tracing::field::Empty,
    )
}

/// Record how the run ended on its span.
pub fn record_outcome(span: &Span, outcome: RunOutcome) {
    span.record("run.outcome", tracing::field::display(outcome));
}
