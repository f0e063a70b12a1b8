use chrono::{DateTime, TimeDelta, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn now_i64() -> i64 {
    Utc::now().timestamp()
}

/// Absolute expiry for an `expires_in` (seconds) answer of the token endpoint.
pub fn expires_at_from_seconds(expires_in: i64) -> DateTime<Utc> {
    now() + TimeDelta::seconds(expires_in)
}

pub fn from_unix(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}
