use time::{OffsetDateTime, PrimitiveDateTime};

/// Current UTC time without offset, matching `TIMESTAMP` columns.
pub fn now() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

pub fn to_unix(at: PrimitiveDateTime) -> i64 {
    at.assume_utc().unix_timestamp()
}

pub fn from_unix(ts: i64) -> Option<PrimitiveDateTime> {
    let at = OffsetDateTime::from_unix_timestamp(ts).ok()?;
    Some(PrimitiveDateTime::new(at.date(), at.time()))
}
