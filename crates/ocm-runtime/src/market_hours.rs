//! Market-hours gate.
//!
//! Deterministic, pure logic. "Now" is always passed in.
//!
//! The window is `[09:30:00, 16:33:00]` America/New_York, both ends
//! inclusive. The close runs three minutes past the 16:30 schedule slot so
//! the last scheduled call of the day still goes through. Days of the week
//! and holidays are not considered.

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarketWindow {
    pub tz: Tz,
    pub open: NaiveTime,
    pub close: NaiveTime,
}

fn wall_clock(hour: u32, min: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, min, 0).expect("market window times are valid wall-clock times")
}

impl Default for MarketWindow {
    fn default() -> Self {
        Self {
            tz: chrono_tz::America::New_York,
            open: wall_clock(9, 30),
            close: wall_clock(16, 33),
        }
    }
}

impl MarketWindow {
    /// Returns `true` if `now` falls inside the window, in market time.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let t = now.with_timezone(&self.tz).time();
        t >= self.open && t <= self.close
    }

    /// `now` rendered in market time, for logs.
    pub fn local(&self, now: DateTime<Utc>) -> DateTime<Tz> {
        now.with_timezone(&self.tz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn default_window_is_half_past_nine_to_four_thirty_three() {
        let w = MarketWindow::default();
        assert_eq!(w.tz, chrono_tz::America::New_York);
        assert_eq!(w.open.format("%H:%M:%S").to_string(), "09:30:00");
        assert_eq!(w.close.format("%H:%M:%S").to_string(), "16:33:00");
    }

    #[test]
    fn boundaries_are_inclusive_in_winter() {
        let w = MarketWindow::default();
        // EST = UTC-5
        assert!(!w.contains(utc(2024, 1, 15, 14, 29, 59)));
        assert!(w.contains(utc(2024, 1, 15, 14, 30, 0)));
        assert!(w.contains(utc(2024, 1, 15, 21, 33, 0)));
        assert!(!w.contains(utc(2024, 1, 15, 21, 33, 1)));
    }

    #[test]
    fn daylight_saving_shifts_the_utc_window() {
        let w = MarketWindow::default();
        // EDT = UTC-4
        assert!(w.contains(utc(2024, 7, 15, 13, 30, 0)));
        assert!(!w.contains(utc(2024, 7, 15, 13, 29, 0)));
        assert!(w.contains(utc(2024, 7, 15, 20, 33, 0)));
        assert!(!w.contains(utc(2024, 7, 15, 20, 34, 0)));
    }

    #[test]
    fn half_past_four_slot_is_open() {
        let w = MarketWindow::default();
        assert!(w.contains(utc(2024, 1, 15, 21, 30, 0)));
        assert!(!w.contains(utc(2024, 1, 15, 3, 0, 0)));
    }
}
