//! Partitioning of a range into segments and the clips active in each.
//!
//! A segment is a maximal interval over which every track's active clip set is constant
//! and every curve (transition blend, audio fade) is linear.

use std::collections::BTreeSet;

use crate::model::clip::Clip;
use crate::model::effect::EffectKind;
use crate::model::ids::ClipId;
use crate::model::time::{Time, TimeRange};
use crate::model::timeline::Timeline;
use crate::model::track::{Track, TrackKind};
use crate::model::transition::Boundary;
use crate::rendering::plan::{Blend, BlendRole, Ramp};
use crate::rendering::transition;

/// A clip contributing to one segment of one track.
#[derive(Clone, Debug)]
pub struct ActiveClip<'a> {
    pub clip: &'a Clip,
    /// Transition weight (opacity for video, gain multiplier for audio).
    pub weight: Ramp,
    pub blend: Option<Blend>,
}

/// Pieces an audio fade is cut into where it overlaps a transition on the same clip.
///
/// Gain there is the product of two linear curves. Over a piece of `1/n` of the
/// overlap the chord deviates from that product by at most `1 / (4 * n * n)`, so eight
/// pieces keep every emitted ramp within 1/256 of the true gain.
const PRODUCT_STEPS: i64 = 8;

/// Splits `range` at every clip edge, transition window edge, curve breakpoint and
/// audio fade point that falls strictly inside it, plus the extra points that keep a
/// fade under a transition linear per segment.
pub fn segment_ranges(timeline: &Timeline, range: TimeRange) -> Vec<TimeRange> {
    let mut points = BTreeSet::new();
    points.insert(range.start);
    points.insert(range.end);
    let mut push = |t: Time| {
        if range.start < t && t < range.end {
            points.insert(t);
        }
    };
    for track in timeline.tracks() {
        for clip in &track.clips {
            push(clip.position);
            push(clip.end());
            if track.kind == TrackKind::Audio {
                if let Some((fade_in, fade_out)) = audio_fade(clip) {
                    push(clip.position + fade_in);
                    push(clip.end() - fade_out);
                    let fades = [
                        TimeRange::with_duration(clip.position, fade_in),
                        TimeRange::new(clip.end() - fade_out, clip.end()),
                    ];
                    for t in track.transitions_for(clip.id) {
                        let Some((edit_point, _)) = track.boundary_extent(&t.boundary) else {
                            continue;
                        };
                        let window = t.window(edit_point);
                        for overlap in fades.iter().filter_map(|fade| fade.intersect(&window)) {
                            for step in 1..PRODUCT_STEPS {
                                push(overlap.start + overlap.duration().scale(step as f64 / PRODUCT_STEPS as f64));
                            }
                        }
                    }
                }
            }
        }
        for t in &track.transitions {
            let Some((edit_point, _)) = track.boundary_extent(&t.boundary) else {
                continue;
            };
            let window = t.window(edit_point);
            push(window.start);
            push(window.end);
            for breakpoint in t.kind.breakpoints() {
                push(window.start + t.duration.scale(*breakpoint));
            }
        }
    }
    let points: Vec<Time> = points.into_iter().collect();
    points
        .windows(2)
        .map(|pair| TimeRange::new(pair[0], pair[1]))
        .collect()
}

/// Clips of `track` contributing to `segment`, ordered by position.
///
/// Outside transitions this is the clip under the segment, if any. Inside a cut window
/// both sides of the cut are present; the one past its own edge holds its edge frame.
pub fn active_clips<'a>(track: &'a Track, segment: TimeRange) -> Vec<ActiveClip<'a>> {
    let mut active: Vec<ActiveClip<'a>> = track
        .clip_at(segment.start)
        .map(|clip| ActiveClip {
            clip,
            weight: Ramp::ONE,
            blend: None,
        })
        .into_iter()
        .collect();

    for t in &track.transitions {
        let Some((edit_point, _)) = track.boundary_extent(&t.boundary) else {
            continue;
        };
        let window = t.window(edit_point);
        if !(window.start <= segment.start && segment.end <= window.end) {
            continue;
        }
        let progress = Ramp::new(
            segment.start.fraction_of(window.start, t.duration),
            segment.end.fraction_of(window.start, t.duration),
        );
        let (outgoing, incoming) = transition::ramps(&t.kind, progress);
        let blend = |role| Blend {
            transition_id: t.id,
            kind: t.kind,
            role,
            progress,
        };
        match t.boundary {
            Boundary::Cut { left, right } => {
                weigh(track, &mut active, left, outgoing, blend(BlendRole::Outgoing));
                weigh(track, &mut active, right, incoming, blend(BlendRole::Incoming));
            }
            Boundary::In { clip } => weigh(track, &mut active, clip, incoming, blend(BlendRole::FadeIn)),
            Boundary::Out { clip } => {
                weigh(track, &mut active, clip, outgoing, blend(BlendRole::FadeOut))
            }
        }
    }
    active.sort_by_key(|a| a.clip.position);
    active
}

fn weigh<'a>(
    track: &'a Track,
    active: &mut Vec<ActiveClip<'a>>,
    clip_id: ClipId,
    ramp: Ramp,
    blend: Blend,
) {
    if let Some(entry) = active.iter_mut().find(|a| a.clip.id == clip_id) {
        entry.weight = entry.weight.times(ramp);
        entry.blend.get_or_insert(blend);
        return;
    }
    if let Some(clip) = track.clip(clip_id) {
        active.push(ActiveClip {
            clip,
            weight: ramp,
            blend: Some(blend),
        });
    }
}

/// Fade lengths of the topmost `AudioFade` in the clip's stack, each limited to half
/// the clip so the two ramps never overlap.
pub fn audio_fade(clip: &Clip) -> Option<(Time, Time)> {
    let (fade_in, fade_out) = clip.effects.iter().rev().find_map(|effect| match effect.kind {
        EffectKind::AudioFade { fade_in, fade_out } => Some((fade_in, fade_out)),
        _ => None,
    })?;
    let half = clip.duration.div_f64(2.0);
    Some((fade_in.min(half), fade_out.min(half)))
}

/// Fade gain over `segment`; constant 1 when the clip has no fade.
pub fn fade_ramp(clip: &Clip, segment: TimeRange) -> Ramp {
    let Some((fade_in, fade_out)) = audio_fade(clip) else {
        return Ramp::ONE;
    };
    let at = |t: Time| {
        let rising = if fade_in.is_positive() {
            t.fraction_of(clip.position, fade_in)
        } else {
            1.0
        };
        let falling = if fade_out.is_positive() {
            1.0 - t.fraction_of(clip.end() - fade_out, fade_out)
        } else {
            1.0
        };
        rising.min(falling)
    };
    Ramp::new(at(segment.start), at(segment.end))
}
