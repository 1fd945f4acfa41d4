/// Metrics and telemetry for the AdWatch moderation service
///
/// Prometheus counters for screening outcomes, case churn, and staff
/// decisions, exposed on /metrics.
use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    /// Screened submissions by routed action (allow / force_review / block)
    pub static ref LISTINGS_SCREENED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "listings_screened_total",
        "Total listing submissions screened, by enforcement action",
        &["action"]
    )
    .unwrap();

    /// Review cases opened or refreshed
    pub static ref MODERATION_CASES_OPENED_TOTAL: IntCounter = register_int_counter!(
        "moderation_cases_opened_total",
        "Total moderation case upserts"
    )
    .unwrap();

    /// Staff decisions by action (approve / reject / escalate)
    pub static ref MODERATION_DECISIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "moderation_decisions_total",
        "Total staff decisions, by action",
        &["action"]
    )
    .unwrap();

    /// Distribution of computed risk scores
    pub static ref MODERATION_SCORE: Histogram = register_histogram!(
        "moderation_score",
        "Distribution of computed moderation scores",
        vec![0.0, 10.0, 25.0, 50.0, 75.0, 85.0, 100.0]
    )
    .unwrap();
}

/// Render all registered metrics in Prometheus text format
pub fn render() -> String {
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_registered_counters() {
        LISTINGS_SCREENED_TOTAL.with_label_values(&["allow"]).inc();

        let text = render();
        assert!(text.contains("listings_screened_total"));
    }
}
