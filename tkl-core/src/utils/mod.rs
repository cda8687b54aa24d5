pub mod backoff;
pub mod clock;
pub mod http;
pub mod idempotency;
pub mod order_code;
