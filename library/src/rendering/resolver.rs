//! Compiles a timeline snapshot into a render plan.
//!
//! Resolution is a pure function of the timeline, the tier and the range: it reads an
//! immutable snapshot, calls the media provider once per referenced media id and never
//! touches shared state, so any number of queries can run side by side with editing.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::error::ResolutionError;
use crate::model::clip::Clip;
use crate::model::effect::EffectKind;
use crate::model::ids::MediaId;
use crate::model::time::{Time, TimeRange};
use crate::model::timeline::Timeline;
use crate::model::track::{Track, TrackKind};
use crate::rendering::ducking::{DuckingPolicy, FixedAttenuation};
use crate::rendering::media::{MediaHandle, MediaNotFound, MediaProvider, QualityTier};
use crate::rendering::plan::{
    AudioInstruction, CaptionInstruction, CompositeInstruction, LayerInstruction, MediaBinding,
    RENDER_PLAN_SCHEMA_VERSION, Ramp, RenderPlan,
};
use crate::rendering::segments::{self, ActiveClip};
use crate::util::timing::PassTimer;

/// Shared flag that aborts an in-flight resolution.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn check(&self) -> Result<(), ResolutionError> {
        if self.is_cancelled() {
            Err(ResolutionError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Debug)]
pub struct ResolveOptions {
    pub tier: QualityTier,
    pub range: TimeRange,
    /// Build instructions on the rayon pool. Output is identical either way.
    pub parallel: bool,
    pub cancel: CancellationToken,
}

impl ResolveOptions {
    pub fn new(tier: QualityTier, range: TimeRange) -> Self {
        Self {
            tier,
            range,
            parallel: false,
            cancel: CancellationToken::new(),
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}

/// Resolves `range` of `timeline` at `tier` with the default ducking policy.
pub fn resolve(
    timeline: &Timeline,
    tier: QualityTier,
    range: TimeRange,
    provider: &dyn MediaProvider,
) -> Result<RenderPlan, ResolutionError> {
    resolve_plan(
        timeline,
        provider,
        &FixedAttenuation::default(),
        &ResolveOptions::new(tier, range),
    )
}

/// Media provider plus ducking policy, cheap to clone into worker tasks.
#[derive(Clone)]
pub struct Resolver {
    provider: Arc<dyn MediaProvider>,
    ducking: Arc<dyn DuckingPolicy>,
}

impl Resolver {
    pub fn new(provider: Arc<dyn MediaProvider>) -> Self {
        Self {
            provider,
            ducking: Arc::new(FixedAttenuation::default()),
        }
    }

    pub fn from_config(provider: Arc<dyn MediaProvider>, config: &EngineConfig) -> Self {
        Self::new(provider).with_ducking(Arc::new(FixedAttenuation::new(
            config.audio.ducking_attenuation,
        )))
    }

    pub fn with_ducking(mut self, ducking: Arc<dyn DuckingPolicy>) -> Self {
        self.ducking = ducking;
        self
    }

    pub fn resolve(
        &self,
        timeline: &Timeline,
        tier: QualityTier,
        range: TimeRange,
    ) -> Result<RenderPlan, ResolutionError> {
        self.resolve_with(timeline, &ResolveOptions::new(tier, range))
    }

    pub fn resolve_with(
        &self,
        timeline: &Timeline,
        options: &ResolveOptions,
    ) -> Result<RenderPlan, ResolutionError> {
        resolve_plan(timeline, self.provider.as_ref(), self.ducking.as_ref(), options)
    }
}

/// Clips active on one track during one segment.
struct TrackSlice<'a> {
    index: usize,
    track: &'a Track,
    clips: Vec<ActiveClip<'a>>,
}

struct SegmentSlice<'a> {
    range: TimeRange,
    tracks: Vec<TrackSlice<'a>>,
}

fn slice_segment<'a>(
    timeline: &'a Timeline,
    range: TimeRange,
    cancel: &CancellationToken,
) -> Result<SegmentSlice<'a>, ResolutionError> {
    cancel.check()?;
    let tracks = timeline
        .tracks()
        .enumerate()
        .map(|(index, track)| TrackSlice {
            index,
            track,
            clips: segments::active_clips(track, range),
        })
        .collect();
    Ok(SegmentSlice { range, tracks })
}

type MediaTable = BTreeMap<MediaId, Result<MediaHandle, MediaNotFound>>;

fn resolve_plan(
    timeline: &Timeline,
    provider: &dyn MediaProvider,
    ducking: &dyn DuckingPolicy,
    options: &ResolveOptions,
) -> Result<RenderPlan, ResolutionError> {
    let mut timer = PassTimer::debug(|| {
        format!("Resolve {} at {:?}", options.range, options.tier)
    });
    let requested = options.range;
    let range = TimeRange::new(
        requested.start.max(Time::ZERO),
        requested.end.min(timeline.duration()),
    );
    if range.is_empty() {
        return Err(ResolutionError::EmptyRange {
            start: requested.start,
            end: requested.end,
        });
    }

    let segments = segments::segment_ranges(timeline, range);
    timer.set_count(segments.len());
    let cancel = &options.cancel;
    let slices: Vec<SegmentSlice<'_>> = if options.parallel {
        segments
            .par_iter()
            .map(|segment| slice_segment(timeline, *segment, cancel))
            .collect::<Result<_, _>>()?
    } else {
        segments
            .iter()
            .map(|segment| slice_segment(timeline, *segment, cancel))
            .collect::<Result<_, _>>()?
    };

    let media = resolve_media(&slices, provider, options.tier);
    cancel.check()?;

    let build = |slice: &SegmentSlice<'_>| -> Result<CompositeInstruction, ResolutionError> {
        cancel.check()?;
        Ok(build_instruction(slice, &media, ducking, options.tier))
    };
    let instructions: Vec<CompositeInstruction> = if options.parallel {
        slices.par_iter().map(build).collect::<Result<_, _>>()?
    } else {
        slices.iter().map(build).collect::<Result<_, _>>()?
    };

    let plan = RenderPlan {
        schema_version: RENDER_PLAN_SCHEMA_VERSION,
        tier: options.tier,
        range,
        frame_rate: timeline.settings().frame_rate,
        resolution: timeline.settings().resolution,
        instructions,
    };
    let broken = plan.broken_references().len();
    if broken > 0 {
        log::warn!("Render plan for {} has {} broken media references", range, broken);
    }
    Ok(plan)
}

/// Looks up every media id the plan will reference, once each, in id order.
fn resolve_media(
    slices: &[SegmentSlice<'_>],
    provider: &dyn MediaProvider,
    tier: QualityTier,
) -> MediaTable {
    let ids: BTreeSet<MediaId> = slices
        .iter()
        .flat_map(|segment| segment.tracks.iter())
        .filter(|slice| renders_media(slice.track))
        .flat_map(|slice| slice.clips.iter().map(|a| a.clip.media.media_id))
        .collect();
    ids.into_iter()
        .map(|id| (id, provider.resolve_media(id, tier)))
        .collect()
}

/// Muted video tracks are hidden and subtitle tracks draw captions, so neither needs
/// media. Muted audio tracks are still listed at zero gain.
fn renders_media(track: &Track) -> bool {
    match track.kind {
        TrackKind::Video => !track.muted,
        TrackKind::Audio => true,
        TrackKind::Subtitle => false,
    }
}

fn binding(clip: &Clip, media: &MediaTable, tier: QualityTier) -> MediaBinding {
    let media_id = clip.media.media_id;
    match media.get(&media_id) {
        Some(Ok(handle)) => MediaBinding {
            media_id,
            tier,
            handle: Some(handle.clone()),
            error: None,
        },
        _ => MediaBinding {
            media_id,
            tier,
            handle: None,
            error: Some(ResolutionError::BrokenMediaReference {
                clip_id: clip.id,
                media_id,
            }),
        },
    }
}

fn source_window(clip: &Clip, segment: TimeRange) -> TimeRange {
    TimeRange::new(
        clip.source_time_at(segment.start),
        clip.source_time_at(segment.end),
    )
}

fn build_instruction(
    sliced: &SegmentSlice<'_>,
    media: &MediaTable,
    ducking: &dyn DuckingPolicy,
    tier: QualityTier,
) -> CompositeInstruction {
    let segment = sliced.range;
    let audible: Vec<usize> = sliced
        .tracks
        .iter()
        .filter(|s| s.track.kind == TrackKind::Audio && !s.track.muted && !s.clips.is_empty())
        .map(|s| s.index)
        .collect();

    let mut instruction = CompositeInstruction {
        range: segment,
        layers: Vec::new(),
        captions: Vec::new(),
        audio: Vec::new(),
    };
    // Tracks arrive in ascending index order, so layers come out bottom to top.
    for slice in &sliced.tracks {
        let track = slice.track;
        match track.kind {
            TrackKind::Video if track.muted => {}
            TrackKind::Video => {
                instruction.layers.extend(slice.clips.iter().map(|active| LayerInstruction {
                    track_id: track.id,
                    track_index: slice.index,
                    clip_id: active.clip.id,
                    media: binding(active.clip, media, tier),
                    source: source_window(active.clip, segment),
                    speed: active.clip.speed,
                    effects: active
                        .clip
                        .effects
                        .iter()
                        .filter(|effect| !effect.kind.is_audio())
                        .cloned()
                        .collect(),
                    opacity: active.weight,
                    blend: active.blend,
                }));
            }
            TrackKind::Subtitle if track.muted => {}
            TrackKind::Subtitle => {
                for active in &slice.clips {
                    for kind in active.clip.effect_kinds() {
                        if let EffectKind::Caption { text } = kind {
                            instruction.captions.push(CaptionInstruction {
                                track_id: track.id,
                                track_index: slice.index,
                                clip_id: active.clip.id,
                                text: text.clone(),
                            });
                        }
                    }
                }
            }
            TrackKind::Audio => {
                let factor = if track.muted {
                    1.0
                } else {
                    ducking.factor(slice.index, &audible)
                };
                instruction.audio.extend(slice.clips.iter().map(|active| {
                    let gain = if track.muted {
                        Ramp::ZERO
                    } else {
                        active
                            .weight
                            .times(segments::fade_ramp(active.clip, segment))
                            .scaled(track.gain * active.clip.volume * factor)
                    };
                    AudioInstruction {
                        track_id: track.id,
                        track_index: slice.index,
                        clip_id: active.clip.id,
                        media: binding(active.clip, media, tier),
                        source: source_window(active.clip, segment),
                        speed: active.clip.speed,
                        gain,
                        ducking: factor,
                    }
                }));
            }
        }
    }
    instruction
}
