/// Decides how much each audio track is attenuated while several play at once.
pub trait DuckingPolicy: Send + Sync {
    /// Gain factor for the track at `track_index`, given the indices of every unmuted
    /// audio track with an active clip in the same segment (ascending).
    fn factor(&self, track_index: usize, active_tracks: &[usize]) -> f64;
}

/// The lowest active track index keeps full gain; every other active track is
/// multiplied by `attenuation` while two or more overlap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedAttenuation {
    pub attenuation: f64,
}

impl FixedAttenuation {
    pub const DEFAULT_ATTENUATION: f64 = 0.25;

    pub fn new(attenuation: f64) -> Self {
        Self {
            attenuation: attenuation.clamp(0.0, 1.0),
        }
    }
}

impl Default for FixedAttenuation {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ATTENUATION)
    }
}

impl DuckingPolicy for FixedAttenuation {
    fn factor(&self, track_index: usize, active_tracks: &[usize]) -> f64 {
        match active_tracks.iter().min() {
            Some(&priority) if active_tracks.len() >= 2 && track_index != priority => {
                self.attenuation
            }
            _ => 1.0,
        }
    }
}

/// Never attenuates.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDucking;

impl DuckingPolicy for NoDucking {
    fn factor(&self, _track_index: usize, _active_tracks: &[usize]) -> f64 {
        1.0
    }
}
