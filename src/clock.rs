use chrono::{DateTime, FixedOffset, Local, Utc};

/// Source of the operator's current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn local_offset(&self) -> FixedOffset;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_offset(&self) -> FixedOffset {
        *Local::now().offset()
    }
}

/// `GMT+HH:MM` / `GMT-HH:MM` label for a UTC offset.
pub fn gmt_offset_label(offset: FixedOffset) -> String {
    let secs = offset.local_minus_utc();
    let sign = if secs < 0 { '-' } else { '+' };
    let minutes = secs.unsigned_abs() / 60;
    format!("GMT{}{:02}:{:02}", sign, minutes / 60, minutes % 60)
}
