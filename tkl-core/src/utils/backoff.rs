use std::time::Duration;

/// Hard cap on the exponent so a misconfigured attempt count cannot overflow.
const MAX_EXPONENT: u32 = 11;

/// Delay before the next fulfillment attempt.
///
/// `attempt` is the 1-based number of the attempt that just failed, so the
/// first retry waits `initial` and each following one doubles it.
pub fn retry_delay(initial: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(MAX_EXPONENT);
    initial.saturating_mul(2u32.pow(exponent))
}
