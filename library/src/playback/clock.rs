//! Transport clock for preview playback.
//!
//! Position is derived from an anchor (position + instant) and the playback rate, so
//! it never drifts with tick frequency. Callers pass `now` explicitly, which keeps the
//! clock deterministic under test.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::PreviewConfig;
use crate::error::LibraryError;
use crate::model::time::{Time, TimeRange};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// A range the preview should resolve next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreviewRequest {
    pub position: Time,
    pub range: TimeRange,
    /// Issued by a seek rather than by the rate-limited tick.
    pub immediate: bool,
}

#[derive(Clone, Debug)]
pub struct PlaybackClock {
    state: PlaybackState,
    rate: f64,
    anchor_position: Time,
    anchor_instant: Option<Instant>,
    min_interval: Duration,
    window: Time,
    last_query: Option<Instant>,
}

impl PlaybackClock {
    pub fn new(config: &PreviewConfig) -> Self {
        Self {
            state: PlaybackState::Stopped,
            rate: 1.0,
            anchor_position: Time::ZERO,
            anchor_instant: None,
            min_interval: config.min_query_interval(),
            window: config.window(),
            last_query: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn position(&self, now: Instant) -> Time {
        match (self.state, self.anchor_instant) {
            (PlaybackState::Playing, Some(anchor)) => {
                let elapsed = now.saturating_duration_since(anchor).as_secs_f64();
                self.anchor_position + Time::from_secs_f64(elapsed * self.rate)
            }
            _ => self.anchor_position,
        }
    }

    fn reanchor(&mut self, now: Instant) {
        self.anchor_position = self.position(now);
        self.anchor_instant = Some(now);
    }

    pub fn play(&mut self, now: Instant) {
        if self.state == PlaybackState::Playing {
            return;
        }
        self.anchor_instant = Some(now);
        self.state = PlaybackState::Playing;
        log::debug!("Playback started at {} (rate {})", self.anchor_position, self.rate);
    }

    pub fn pause(&mut self, now: Instant) {
        self.reanchor(now);
        self.state = PlaybackState::Paused;
        log::debug!("Playback paused at {}", self.anchor_position);
    }

    /// Pauses with the position pinned to `position`, e.g. at the end of the timeline.
    pub fn pause_at(&mut self, position: Time) {
        self.anchor_position = position.max(Time::ZERO);
        self.anchor_instant = None;
        self.state = PlaybackState::Paused;
    }

    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.anchor_position = Time::ZERO;
        self.anchor_instant = None;
        self.last_query = None;
        log::debug!("Playback stopped");
    }

    pub fn set_rate(&mut self, now: Instant, rate: f64) -> Result<(), LibraryError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(LibraryError::InvalidArgument(format!(
                "playback rate must be positive, got {rate}"
            )));
        }
        self.reanchor(now);
        self.rate = rate;
        Ok(())
    }

    /// Jumps to `position` and returns the one query that must be issued right away.
    ///
    /// Resets the rate limiter, so the next tick waits a full interval instead of
    /// replaying queries that piled up before the seek.
    pub fn seek(&mut self, now: Instant, position: Time) -> PreviewRequest {
        self.anchor_position = position.max(Time::ZERO);
        self.anchor_instant = Some(now);
        if self.state == PlaybackState::Stopped {
            self.state = PlaybackState::Paused;
        }
        self.last_query = Some(now);
        self.request(self.anchor_position, true)
    }

    /// At most one query per minimum interval while playing. Missed intervals are
    /// dropped rather than queued.
    pub fn tick(&mut self, now: Instant) -> Option<PreviewRequest> {
        if self.state != PlaybackState::Playing {
            return None;
        }
        if let Some(last) = self.last_query {
            if now.saturating_duration_since(last) < self.min_interval {
                return None;
            }
        }
        self.last_query = Some(now);
        Some(self.request(self.position(now), false))
    }

    fn request(&self, position: Time, immediate: bool) -> PreviewRequest {
        PreviewRequest {
            position,
            range: TimeRange::with_duration(position, self.window),
            immediate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> PlaybackClock {
        PlaybackClock::new(&PreviewConfig {
            max_queries_per_second: 10.0,
            window_ms: 500,
            cache_capacity: 4,
        })
    }

    #[test]
    fn position_follows_rate() {
        let start = Instant::now();
        let mut clock = clock();
        clock.set_rate(start, 2.0).unwrap();
        clock.play(start);
        assert_eq!(clock.position(start + Duration::from_secs(3)), Time::from_secs(6));
    }

    #[test]
    fn paused_clock_does_not_move() {
        let start = Instant::now();
        let mut clock = clock();
        clock.play(start);
        clock.pause(start + Duration::from_secs(1));
        assert_eq!(clock.state(), PlaybackState::Paused);
        assert_eq!(clock.position(start + Duration::from_secs(10)), Time::from_secs(1));
        assert!(clock.tick(start + Duration::from_secs(10)).is_none());
    }

    #[test]
    fn rejects_non_positive_rate() {
        let mut clock = clock();
        assert!(clock.set_rate(Instant::now(), 0.0).is_err());
        assert_eq!(clock.rate(), 1.0);
    }
}
