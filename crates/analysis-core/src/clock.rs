use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::America::New_York;

/// US equity session close plus settlement buffer, NY civil time.
const SESSION_CLOSE_BUFFER: (u32, u32) = (16, 15);

/// Reference date and session state for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    /// Calendar date in America/New_York
    pub today_ny: NaiveDate,
    /// True once NY time reaches 16:15; weekends/holidays are not special-cased
    /// here, trimming downstream relies on data absence instead.
    pub market_closed_for_today: bool,
}

/// Clock and session oracle. All time-of-day arithmetic happens in
/// America/New_York civil time.
pub struct SessionOracle;

impl SessionOracle {
    /// Session status for an arbitrary instant. Pure; tests feed mock clocks
    /// through here.
    pub fn status_at(instant: DateTime<Utc>) -> SessionStatus {
        let ny = instant.with_timezone(&New_York);
        let close_buffer =
            NaiveTime::from_hms_opt(SESSION_CLOSE_BUFFER.0, SESSION_CLOSE_BUFFER.1, 0)
                .expect("valid close buffer time");

        SessionStatus {
            today_ny: ny.date_naive(),
            market_closed_for_today: ny.time() >= close_buffer,
        }
    }

    /// Session status for the current wall clock.
    pub fn now() -> SessionStatus {
        Self::status_at(Utc::now())
    }
}
