//! Turns externally produced annotations into ordinary timeline edits.
//!
//! Highlight detectors and subtitle generators describe what they found in terms of a
//! media item and a range of *source* time. To put that on the timeline the range is
//! mapped through every clip that shows the media, and each mapped piece becomes a clip
//! on a subtitle track carrying a `Highlight` or `Caption` effect. Everything lands in a
//! single `Batch`, so an import is one undo step and either applies fully or not at all.

use serde::{Deserialize, Serialize};

use crate::editor::operation::{NewClip, Operation};
use crate::editor::session::TimelineSnapshot;
use crate::error::{EditError, ValidationError};
use crate::model::clip::{Clip, duration_for};
use crate::model::effect::{Effect, EffectKind};
use crate::model::ids::{ClipId, EffectId, MediaId, TrackId};
use crate::model::time::TimeRange;
use crate::model::timeline::Timeline;
use crate::model::track::TrackKind;
use crate::plugin::traits::StudioContext;

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Highlight {
    pub media_id: MediaId,
    pub source: TimeRange,
    pub label: String,
    pub score: f64,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct SubtitleCue {
    pub media_id: MediaId,
    pub source: TimeRange,
    pub text: String,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(tag = "annotation", rename_all = "snake_case")]
pub enum Annotation {
    Highlight(Highlight),
    Subtitle(SubtitleCue),
}

impl Annotation {
    pub fn media_id(&self) -> MediaId {
        match self {
            Annotation::Highlight(h) => h.media_id,
            Annotation::Subtitle(s) => s.media_id,
        }
    }

    pub fn source(&self) -> TimeRange {
        match self {
            Annotation::Highlight(h) => h.source,
            Annotation::Subtitle(s) => s.source,
        }
    }

    fn effect_kind(&self) -> EffectKind {
        match self {
            Annotation::Highlight(h) => EffectKind::Highlight {
                label: h.label.clone(),
                score: h.score.clamp(0.0, 1.0),
            },
            Annotation::Subtitle(s) => EffectKind::Caption {
                text: s.text.clone(),
            },
        }
    }
}

impl From<Highlight> for Annotation {
    fn from(value: Highlight) -> Self {
        Annotation::Highlight(value)
    }
}

impl From<SubtitleCue> for Annotation {
    fn from(value: SubtitleCue) -> Self {
        Annotation::Subtitle(value)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No clip on the timeline shows the annotated part of the media.
    NotOnTimeline,
    /// The mapped range collides with a clip already on the target track.
    Overlap,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub struct SkippedAnnotation {
    /// Position of the annotation in the input list.
    pub index: usize,
    pub reason: SkipReason,
}

/// Result of planning an import: the batch to submit (if anything fits) and what was left out.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationImport {
    pub operation: Option<Operation>,
    pub placed: usize,
    pub skipped: Vec<SkippedAnnotation>,
}

/// Where one annotation lands: the source clip it was mapped through and the
/// intersection of the annotation with that clip's trim window.
struct Placement<'a> {
    through: &'a Clip,
    source: TimeRange,
}

impl Placement<'_> {
    fn timeline_range(&self) -> TimeRange {
        let clip = self.through;
        let start = clip.position + (self.source.start - clip.trim_in).div_f64(clip.speed);
        TimeRange::with_duration(
            start,
            duration_for(self.source.start, self.source.end, clip.speed),
        )
    }
}

fn placements<'a>(timeline: &'a Timeline, annotation: &Annotation) -> Vec<Placement<'a>> {
    let media_id = annotation.media_id();
    let wanted = annotation.source();
    timeline
        .tracks()
        .filter(|track| track.kind != TrackKind::Subtitle)
        .flat_map(|track| track.clips.iter())
        .filter(|clip| clip.media.media_id == media_id)
        .filter_map(|clip| {
            clip.source_range()
                .intersect(&wanted)
                .map(|source| Placement { through: clip, source })
        })
        .collect()
}

/// Plans the clips for `annotations` on subtitle track `track_id` of `timeline`.
///
/// `next_ids` supplies the clip and effect identifiers for every placed piece. Pieces
/// that overlap an existing clip, or an earlier piece of the same import, are skipped.
pub fn plan_import(
    timeline: &Timeline,
    track_id: TrackId,
    annotations: &[Annotation],
    mut next_ids: impl FnMut() -> (ClipId, EffectId),
) -> Result<AnnotationImport, ValidationError> {
    let track = timeline
        .track(track_id)
        .ok_or(ValidationError::TrackNotFound(track_id))?;
    if track.kind != TrackKind::Subtitle {
        return Err(ValidationError::TrackKindMismatch {
            track_id,
            expected: TrackKind::Subtitle,
            found: track.kind,
        });
    }
    if track.locked {
        return Err(ValidationError::TrackLocked(track_id));
    }

    let mut operations = Vec::new();
    let mut taken: Vec<TimeRange> = Vec::new();
    let mut placed = 0;
    let mut skipped = Vec::new();

    for (index, annotation) in annotations.iter().enumerate() {
        let pieces = placements(timeline, annotation);
        if pieces.is_empty() {
            skipped.push(SkippedAnnotation {
                index,
                reason: SkipReason::NotOnTimeline,
            });
            continue;
        }
        let mut any_placed = false;
        for piece in pieces {
            let range = piece.timeline_range();
            let collides = track.check_free(range, None).is_err()
                || taken.iter().any(|other| other.overlaps(&range));
            if collides || range.is_empty() {
                continue;
            }
            let (clip_id, effect_id) = next_ids();
            let new_clip = NewClip::new(clip_id, track_id, piece.through.media, range.start)
                .with_source_range(piece.source)
                .with_speed(piece.through.speed);
            operations.push(Operation::AddClip(new_clip));
            operations.push(Operation::StackEffect {
                clip_id,
                index: 0,
                effect: Effect::new(effect_id, annotation.effect_kind()),
            });
            taken.push(range);
            any_placed = true;
        }
        if any_placed {
            placed += 1;
        } else {
            log::debug!("Skipping annotation {}: overlaps existing captions", index);
            skipped.push(SkippedAnnotation {
                index,
                reason: SkipReason::Overlap,
            });
        }
    }

    let operation = (!operations.is_empty()).then(|| Operation::Batch {
        label: format!("Import {} Annotations", placed),
        operations,
    });
    Ok(AnnotationImport {
        operation,
        placed,
        skipped,
    })
}

/// Outcome of [`import_annotations`].
#[derive(Clone, Debug)]
pub struct ImportReport {
    pub placed: usize,
    pub skipped: Vec<SkippedAnnotation>,
    /// Snapshot after the import, `None` when nothing was placed.
    pub snapshot: Option<TimelineSnapshot>,
}

/// Plans and submits an import through a studio context.
pub fn import_annotations(
    context: &dyn StudioContext,
    track_id: TrackId,
    annotations: &[Annotation],
) -> Result<ImportReport, EditError> {
    let current = context.snapshot();
    let import = plan_import(&current.timeline, track_id, annotations, || {
        (context.new_clip_id(), context.new_effect_id())
    })?;
    let snapshot = match import.operation {
        Some(operation) => Some(context.submit(operation)?),
        None => None,
    };
    log::info!(
        "Imported {} annotations onto track {} ({} skipped)",
        import.placed,
        track_id,
        import.skipped.len()
    );
    Ok(ImportReport {
        placed: import.placed,
        skipped: import.skipped,
        snapshot,
    })
}

/// Highlights from a detector, as annotations.
pub fn highlights(list: Vec<Highlight>) -> Vec<Annotation> {
    list.into_iter().map(Annotation::from).collect()
}

/// Subtitle cues, as annotations.
pub fn subtitles(list: Vec<SubtitleCue>) -> Vec<Annotation> {
    list.into_iter().map(Annotation::from).collect()
}
