//! Reconnect Backoff
//!
//! Exponential delay with symmetric jitter for the automatic reconnect
//! path. Kept as pure functions so the schedule is testable without a
//! clock.

use std::time::Duration;

use rand::Rng;

/// First-retry base delay
pub const BASE_DELAY_MS: u64 = 1_000;
/// Lower clamp after jitter
pub const MIN_DELAY_MS: u64 = 200;
/// Upper clamp after jitter
pub const MAX_DELAY_MS: u64 = 30_000;
/// Jitter fraction applied symmetrically around the base delay
const JITTER_FACTOR: f64 = 0.1;

/// Un-jittered delay for a 0-based attempt index: `1000ms * 2^attempt`.
///
/// The exponent is capped well past the point where clamping takes over,
/// so large attempt counts cannot overflow.
pub fn base_delay_ms(attempt: u32) -> u64 {
    BASE_DELAY_MS.saturating_mul(1u64 << attempt.min(20))
}

/// Delay before the given reconnect attempt: exponential base, ±10%
/// jitter, clamped to `[MIN_DELAY_MS, MAX_DELAY_MS]`.
pub fn reconnect_delay(attempt: u32) -> Duration {
    let base = base_delay_ms(attempt) as f64;
    let jitter = base * JITTER_FACTOR * rand::thread_rng().gen_range(-1.0..=1.0);
    let delay = (base + jitter).round() as u64;
    Duration::from_millis(delay.clamp(MIN_DELAY_MS, MAX_DELAY_MS))
}
