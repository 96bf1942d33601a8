//! Textual classification of scrape/probe failures.
//!
//! Both the health manager (probing idle accounts) and the orchestrator
//! (dispatching worker errors) need the same answer for the same message, so
//! the match logic lives here once.

/// Outcome of classifying a scrape or probe failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Ok,
    RateLimit,
    Auth,
    Network,
}

const RATE_LIMIT_PATTERNS: &[&str] = &["too many requests", "ratelimit", "429"];
const AUTH_PATTERNS: &[&str] = &["unauthorized", "forbidden", "401", "403", "invalid_grant"];

/// Classify a free-form error message from the scraping collaborator.
///
/// Matches the heuristics in the rate-limit/auth/network failure split:
/// rate-limit and auth patterns are checked first (case-insensitively),
/// anything else that reaches this function is a network failure.
pub fn classify_message(message: &str) -> ErrorClass {
    let lower = message.to_lowercase();
    if RATE_LIMIT_PATTERNS.iter().any(|p| lower.contains(p)) {
        return ErrorClass::RateLimit;
    }
    if AUTH_PATTERNS.iter().any(|p| lower.contains(p)) {
        return ErrorClass::Auth;
    }
    ErrorClass::Network
}

/// Classify by HTTP status first, falling back to the message for ambiguous
/// statuses (e.g. a 200 that embeds an error payload).
pub fn classify_status(status: u16, message: &str) -> ErrorClass {
    match status {
        200..=299 => ErrorClass::Ok,
        401 | 403 => ErrorClass::Auth,
        429 => ErrorClass::RateLimit,
        _ => classify_message(message),
    }
}
