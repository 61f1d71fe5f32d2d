/// Wall-clock helpers.

/// Returns the current Unix timestamp in milliseconds.
pub fn now_timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ============================================================================
// TESTS
// ============================================================================
