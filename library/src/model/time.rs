use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

const MICROS_PER_SECOND: i64 = 1_000_000;

/// A point or span on the timeline, in microseconds.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[serde(transparent)]
pub struct Time(i64);

impl Time {
    pub const ZERO: Time = Time(0);
    pub const MAX: Time = Time(i64::MAX);

    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    pub const fn from_millis(millis: i64) -> Self {
        Self(millis * 1_000)
    }

    pub const fn from_secs(secs: i64) -> Self {
        Self(secs * MICROS_PER_SECOND)
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs * MICROS_PER_SECOND as f64).round() as i64)
    }

    pub const fn as_micros(self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / MICROS_PER_SECOND as f64
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Multiplies by a factor, rounding to the nearest microsecond.
    pub fn scale(self, factor: f64) -> Self {
        Self((self.0 as f64 * factor).round() as i64)
    }

    /// Divides by a factor, rounding to the nearest microsecond.
    pub fn div_f64(self, divisor: f64) -> Self {
        Self((self.0 as f64 / divisor).round() as i64)
    }

    /// Position of `self` inside `[start, start + length)` as a fraction.
    pub fn fraction_of(self, start: Time, length: Time) -> f64 {
        if length.0 <= 0 {
            return 1.0;
        }
        ((self.0 - start.0) as f64 / length.0 as f64).clamp(0.0, 1.0)
    }

    pub fn clamp_to(self, range: TimeRange) -> Self {
        Self(self.0.clamp(range.start.0, range.end.0))
    }

    pub fn midpoint(self, other: Time) -> Self {
        Self(self.0 + (other.0 - self.0) / 2)
    }
}

impl Add for Time {
    type Output = Time;

    fn add(self, rhs: Time) -> Time {
        Time(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Time {
    type Output = Time;

    fn sub(self, rhs: Time) -> Time {
        Time(self.0.saturating_sub(rhs.0))
    }
}

impl AddAssign for Time {
    fn add_assign(&mut self, rhs: Time) {
        *self = *self + rhs;
    }
}

impl SubAssign for Time {
    fn sub_assign(&mut self, rhs: Time) {
        *self = *self - rhs;
    }
}

impl Neg for Time {
    type Output = Time;

    fn neg(self) -> Time {
        Time(-self.0)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.as_secs_f64())
    }
}

/// Half-open interval `[start, end)`.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TimeRange {
    pub start: Time,
    pub end: Time,
}

impl TimeRange {
    pub const fn new(start: Time, end: Time) -> Self {
        Self { start, end }
    }

    pub fn with_duration(start: Time, duration: Time) -> Self {
        Self {
            start,
            end: start + duration,
        }
    }

    pub fn duration(&self) -> Time {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, time: Time) -> bool {
        self.start <= time && time < self.end
    }

    /// Strict overlap. Ranges that only touch (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn intersect(&self, other: &TimeRange) -> Option<TimeRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(TimeRange { start, end })
    }

    pub fn shifted(&self, offset: Time) -> TimeRange {
        TimeRange {
            start: self.start + offset,
            end: self.end + offset,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_ranges_do_not_overlap() {
        let a = TimeRange::new(Time::from_secs(0), Time::from_secs(5));
        let b = TimeRange::new(Time::from_secs(5), Time::from_secs(10));
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
        assert_eq!(a.intersect(&b), None);
    }

    #[test]
    fn intersect_clips_both_edges() {
        let a = TimeRange::new(Time::from_secs(0), Time::from_secs(5));
        let b = TimeRange::new(Time::from_secs(3), Time::from_secs(7));
        assert!(a.overlaps(&b));
        assert_eq!(
            a.intersect(&b),
            Some(TimeRange::new(Time::from_secs(3), Time::from_secs(5)))
        );
    }

    #[test]
    fn scale_rounds_to_nearest_micro() {
        assert_eq!(Time::from_micros(3).scale(0.5), Time::from_micros(2));
        assert_eq!(Time::from_secs(10).div_f64(2.0), Time::from_secs(5));
    }
}
