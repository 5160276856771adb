//! Mutation operations: invariants, rejection paths and structural edge cases.

use composition_engine::editor::{GapPolicy, NewClip, Operation, apply};
use composition_engine::model::ids::{EffectId, MediaId, TransitionId};
use composition_engine::model::timeline::TimelineSettings;
use composition_engine::model::{
    Boundary, ClipId, Effect, EffectKind, MAX_SPEED, MIN_SPEED, MediaRef, Time, TimeRange,
    Timeline, TrackId, TrackKind, TransitionKind,
};
use composition_engine::{EditError, OperationError, ValidationError};

fn secs(s: i64) -> Time {
    Time::from_secs(s)
}

fn run(timeline: &Timeline, operation: Operation) -> Timeline {
    apply(timeline, &operation).unwrap().0
}

fn reject(timeline: &Timeline, operation: Operation) -> EditError {
    apply(timeline, &operation).unwrap_err()
}

fn add_track(timeline: &Timeline, kind: TrackKind) -> (Timeline, TrackId) {
    let track_id = TrackId::new_v4();
    let next = run(
        timeline,
        Operation::AddTrack {
            track_id,
            kind,
            name: format!("{kind}"),
            index: None,
        },
    );
    (next, track_id)
}

fn clip_spec(track_id: TrackId, start: i64, end: i64) -> NewClip {
    let media = MediaRef::new(MediaId::new_v4(), secs(100));
    NewClip::new(ClipId::new_v4(), track_id, media, secs(start))
        .with_source_range(TimeRange::new(Time::ZERO, secs(end - start)))
}

fn place(timeline: &Timeline, track_id: TrackId, start: i64, end: i64) -> (Timeline, ClipId) {
    let spec = clip_spec(track_id, start, end);
    let clip_id = spec.clip_id;
    (run(timeline, Operation::AddClip(spec)), clip_id)
}

fn video_timeline() -> (Timeline, TrackId) {
    add_track(&Timeline::new(TimelineSettings::default()), TrackKind::Video)
}

#[test]
fn test_add_clip_rejects_overlap() {
    let (timeline, track) = video_timeline();
    let (timeline, _) = place(&timeline, track, 0, 5);
    let (timeline, _) = place(&timeline, track, 5, 10);
    assert_eq!(timeline.duration(), secs(10));

    let err = reject(&timeline, Operation::AddClip(clip_spec(track, 3, 7)));
    assert!(matches!(
        err,
        EditError::Validation(ValidationError::Overlap { .. })
    ));
}

#[test]
fn test_add_clip_rejects_missing_track_and_negative_position() {
    let (timeline, _) = video_timeline();
    let err = reject(&timeline, Operation::AddClip(clip_spec(TrackId::new_v4(), 0, 2)));
    assert!(matches!(
        err,
        EditError::Validation(ValidationError::TrackNotFound(_))
    ));

    let (timeline, track) = video_timeline();
    let media = MediaRef::new(MediaId::new_v4(), secs(10));
    let spec = NewClip::new(ClipId::new_v4(), track, media, secs(-1));
    assert!(matches!(
        reject(&timeline, Operation::AddClip(spec)),
        EditError::Validation(ValidationError::InvalidPosition(_))
    ));
}

#[test]
fn test_insert_clip_pushes_later_clips() {
    let (timeline, track) = video_timeline();
    let (timeline, first) = place(&timeline, track, 0, 4);
    let (timeline, second) = place(&timeline, track, 4, 8);

    let spec = clip_spec(track, 4, 7);
    let inserted = spec.clip_id;
    let timeline = run(&timeline, Operation::InsertClip(spec));

    assert_eq!(timeline.clip(first).unwrap().position, Time::ZERO);
    assert_eq!(timeline.clip(inserted).unwrap().position, secs(4));
    assert_eq!(timeline.clip(second).unwrap().position, secs(7));
    assert_eq!(timeline.duration(), secs(11));
}

#[test]
fn test_insert_clip_inside_existing_clip_is_rejected() {
    let (timeline, track) = video_timeline();
    let (timeline, _) = place(&timeline, track, 0, 4);
    let err = reject(&timeline, Operation::InsertClip(clip_spec(track, 2, 3)));
    assert!(matches!(
        err,
        EditError::Validation(ValidationError::Overlap { .. })
    ));
}

#[test]
fn test_move_clip_ignores_its_own_interval() {
    let (timeline, track) = video_timeline();
    let (timeline, clip) = place(&timeline, track, 0, 5);
    let timeline = run(
        &timeline,
        Operation::MoveClip {
            clip_id: clip,
            position: secs(2),
            track_id: None,
        },
    );
    assert_eq!(timeline.clip(clip).unwrap().range(), TimeRange::new(secs(2), secs(7)));
}

#[test]
fn test_move_clip_between_tracks() {
    let (timeline, v1) = video_timeline();
    let (timeline, v2) = add_track(&timeline, TrackKind::Video);
    let (timeline, a1) = add_track(&timeline, TrackKind::Audio);
    let (timeline, clip) = place(&timeline, v1, 0, 3);

    let moved = run(
        &timeline,
        Operation::MoveClip {
            clip_id: clip,
            position: secs(1),
            track_id: Some(v2),
        },
    );
    assert_eq!(moved.clip_track(clip).unwrap().id, v2);
    assert_eq!(moved.clip(clip).unwrap().track_id, v2);
    assert!(moved.track(v1).unwrap().clips.is_empty());

    let err = reject(
        &timeline,
        Operation::MoveClip {
            clip_id: clip,
            position: secs(1),
            track_id: Some(a1),
        },
    );
    assert!(matches!(
        err,
        EditError::Validation(ValidationError::TrackKindMismatch { .. })
    ));
}

#[test]
fn test_split_clip_slices_trim_window() {
    let (timeline, track) = video_timeline();
    let (timeline, clip) = place(&timeline, track, 0, 10);
    let right = ClipId::new_v4();
    let timeline = run(
        &timeline,
        Operation::SplitClip {
            clip_id: clip,
            at: secs(4),
            new_clip_id: right,
        },
    );

    let left_clip = timeline.clip(clip).unwrap();
    let right_clip = timeline.clip(right).unwrap();
    assert_eq!(left_clip.source_range(), TimeRange::new(Time::ZERO, secs(4)));
    assert_eq!(left_clip.duration, secs(4));
    assert_eq!(right_clip.source_range(), TimeRange::new(secs(4), secs(10)));
    assert_eq!(right_clip.duration, secs(6));
    assert_eq!(right_clip.position, secs(4));
    assert_eq!(left_clip.trim_out, right_clip.trim_in);
}

#[test]
fn test_split_clip_respects_speed() {
    let (timeline, track) = video_timeline();
    let media = MediaRef::new(MediaId::new_v4(), secs(100));
    let clip = ClipId::new_v4();
    let spec = NewClip::new(clip, track, media, Time::ZERO)
        .with_source_range(TimeRange::new(Time::ZERO, secs(10)))
        .with_speed(2.0);
    let timeline = run(&timeline, Operation::AddClip(spec));
    assert_eq!(timeline.clip(clip).unwrap().duration, secs(5));

    let right = ClipId::new_v4();
    let timeline = run(
        &timeline,
        Operation::SplitClip {
            clip_id: clip,
            at: secs(2),
            new_clip_id: right,
        },
    );
    assert_eq!(timeline.clip(clip).unwrap().trim_out, secs(4));
    assert_eq!(timeline.clip(right).unwrap().duration, secs(3));
}

#[test]
fn test_split_keeps_effects_on_left_half_only() {
    let (timeline, track) = video_timeline();
    let (timeline, clip) = place(&timeline, track, 0, 10);
    let timeline = run(
        &timeline,
        Operation::StackEffect {
            clip_id: clip,
            index: 0,
            effect: Effect::new(EffectId::new_v4(), EffectKind::Brightness { amount: 0.3 }),
        },
    );
    let right = ClipId::new_v4();
    let timeline = run(
        &timeline,
        Operation::SplitClip {
            clip_id: clip,
            at: secs(5),
            new_clip_id: right,
        },
    );
    assert_eq!(timeline.clip(clip).unwrap().effects.len(), 1);
    assert!(timeline.clip(right).unwrap().effects.is_empty());
}

#[test]
fn test_split_at_clip_edge_is_rejected() {
    let (timeline, track) = video_timeline();
    let (timeline, clip) = place(&timeline, track, 2, 6);
    for at in [2, 6, 9] {
        let err = reject(
            &timeline,
            Operation::SplitClip {
                clip_id: clip,
                at: secs(at),
                new_clip_id: ClipId::new_v4(),
            },
        );
        assert!(matches!(
            err,
            EditError::Validation(ValidationError::PositionOutOfRange { .. })
        ));
    }
}

#[test]
fn test_split_moves_trailing_transition_to_right_half() {
    let (timeline, track) = video_timeline();
    let (timeline, clip) = place(&timeline, track, 0, 10);
    let fade_out = TransitionId::new_v4();
    let timeline = run(
        &timeline,
        Operation::SetTransition {
            transition_id: fade_out,
            boundary: Boundary::Out { clip },
            kind: TransitionKind::DipToBlack,
            duration: secs(1),
        },
    );
    let right = ClipId::new_v4();
    let timeline = run(
        &timeline,
        Operation::SplitClip {
            clip_id: clip,
            at: secs(5),
            new_clip_id: right,
        },
    );
    let (_, transition) = timeline.transition(fade_out).unwrap();
    assert_eq!(transition.boundary, Boundary::Out { clip: right });
}

#[test]
fn test_trim_keeps_position_and_rechecks_overlap() {
    let (timeline, track) = video_timeline();
    let (timeline, clip) = place(&timeline, track, 0, 5);
    let (timeline, _) = place(&timeline, track, 5, 8);

    let trimmed = run(
        &timeline,
        Operation::TrimClip {
            clip_id: clip,
            trim_in: secs(1),
            trim_out: secs(4),
        },
    );
    let c = trimmed.clip(clip).unwrap();
    assert_eq!(c.position, Time::ZERO);
    assert_eq!(c.duration, secs(3));

    let err = reject(
        &timeline,
        Operation::TrimClip {
            clip_id: clip,
            trim_in: Time::ZERO,
            trim_out: secs(7),
        },
    );
    assert!(matches!(
        err,
        EditError::Validation(ValidationError::Overlap { .. })
    ));
}

#[test]
fn test_trim_beyond_source_is_rejected() {
    let (timeline, track) = video_timeline();
    let (timeline, clip) = place(&timeline, track, 0, 5);
    let err = reject(
        &timeline,
        Operation::TrimClip {
            clip_id: clip,
            trim_in: secs(90),
            trim_out: secs(101),
        },
    );
    assert!(matches!(
        err,
        EditError::Validation(ValidationError::TrimOutOfRange { .. })
    ));
}

#[test]
fn test_set_speed_recomputes_duration() {
    let (timeline, track) = video_timeline();
    let (timeline, clip) = place(&timeline, track, 0, 10);
    let timeline = run(&timeline, Operation::SetClipSpeed { clip_id: clip, speed: 2.0 });
    assert_eq!(timeline.clip(clip).unwrap().duration, secs(5));
    assert_eq!(timeline.clip(clip).unwrap().source_range(), TimeRange::new(Time::ZERO, secs(10)));

    let err = reject(&timeline, Operation::SetClipSpeed { clip_id: clip, speed: 0.0 });
    assert!(matches!(
        err,
        EditError::Operation(OperationError::InvalidSpeed(_))
    ));
}

#[test]
fn test_speed_outside_bounds_is_rejected() {
    let (timeline, track) = video_timeline();
    let (timeline, clip) = place(&timeline, track, 0, 10);
    for speed in [1e-19, MAX_SPEED * 10.0, f64::NAN] {
        let err = reject(&timeline, Operation::SetClipSpeed { clip_id: clip, speed });
        assert!(matches!(
            err,
            EditError::Operation(OperationError::InvalidSpeed(_))
        ));
    }
    assert_eq!(timeline.clip(clip).unwrap().speed, 1.0);

    let timeline = run(&timeline, Operation::SetClipSpeed { clip_id: clip, speed: MIN_SPEED });
    assert_eq!(timeline.clip(clip).unwrap().duration, secs(1000));
    let timeline = run(&timeline, Operation::SetClipSpeed { clip_id: clip, speed: MAX_SPEED });
    assert_eq!(timeline.clip(clip).unwrap().duration, Time::from_millis(100));
}

#[test]
fn test_stacked_effect_parameters_are_range_checked() {
    let (timeline, track) = video_timeline();
    let (timeline, clip) = place(&timeline, track, 0, 5);
    for kind in [
        EffectKind::Opacity { amount: 7.5 },
        EffectKind::GaussianBlur { radius: -40.0 },
    ] {
        let err = reject(
            &timeline,
            Operation::StackEffect {
                clip_id: clip,
                index: 0,
                effect: Effect::new(EffectId::new_v4(), kind),
            },
        );
        assert!(matches!(
            err,
            EditError::Operation(OperationError::InvalidParameter { .. })
        ));
    }
    assert!(timeline.clip(clip).unwrap().effects.is_empty());
}

#[test]
fn test_ripple_delete_closes_gap() {
    let (timeline, track) = video_timeline();
    let (timeline, first) = place(&timeline, track, 0, 5);
    let (timeline, second) = place(&timeline, track, 5, 9);

    let rippled = run(
        &timeline,
        Operation::DeleteClip {
            clip_id: first,
            gap: GapPolicy::Ripple,
        },
    );
    assert_eq!(rippled.clip(second).unwrap().range(), TimeRange::new(Time::ZERO, secs(4)));

    let gapped = run(
        &timeline,
        Operation::DeleteClip {
            clip_id: first,
            gap: GapPolicy::LeaveGap,
        },
    );
    assert_eq!(gapped.clip(second).unwrap().position, secs(5));
}

#[test]
fn test_ripple_delete_only_shifts_later_clips() {
    let (timeline, track) = video_timeline();
    let (timeline, early) = place(&timeline, track, 0, 2);
    let (timeline, middle) = place(&timeline, track, 4, 6);
    let (timeline, late) = place(&timeline, track, 6, 9);

    let rippled = run(
        &timeline,
        Operation::DeleteClip {
            clip_id: middle,
            gap: GapPolicy::Ripple,
        },
    );
    assert_eq!(rippled.clip(early).unwrap().position, Time::ZERO);
    assert_eq!(rippled.clip(late).unwrap().range(), TimeRange::new(secs(4), secs(7)));
}

#[test]
fn test_locked_track_rejects_clip_edits() {
    let (timeline, track) = video_timeline();
    let (timeline, clip) = place(&timeline, track, 0, 5);
    let locked = run(&timeline, Operation::LockTrack { track_id: track, locked: true });

    for operation in [
        Operation::AddClip(clip_spec(track, 6, 8)),
        Operation::MoveClip {
            clip_id: clip,
            position: secs(1),
            track_id: None,
        },
        Operation::DeleteClip {
            clip_id: clip,
            gap: GapPolicy::LeaveGap,
        },
        Operation::DeleteTrack { track_id: track },
    ] {
        assert!(matches!(
            reject(&locked, operation),
            EditError::Validation(ValidationError::TrackLocked(_))
        ));
    }

    // Track-level toggles still work.
    let muted = run(&locked, Operation::MuteTrack { track_id: track, muted: true });
    assert!(muted.track(track).unwrap().muted);
    let unlocked = run(&muted, Operation::LockTrack { track_id: track, locked: false });
    assert!(!unlocked.track(track).unwrap().locked);
}

#[test]
fn test_delete_track_cascades() {
    let (timeline, track) = video_timeline();
    let (timeline, clip) = place(&timeline, track, 0, 5);
    let timeline = run(&timeline, Operation::DeleteTrack { track_id: track });
    assert_eq!(timeline.track_count(), 0);
    assert!(timeline.clip(clip).is_none());
}

#[test]
fn test_effect_stack_operations() {
    let (timeline, track) = video_timeline();
    let (timeline, clip) = place(&timeline, track, 0, 5);
    let blur = Effect::new(EffectId::new_v4(), EffectKind::GaussianBlur { radius: 4.0 });
    let tint = Effect::new(EffectId::new_v4(), EffectKind::Saturation { amount: 0.5 });

    let timeline = run(
        &timeline,
        Operation::StackEffect {
            clip_id: clip,
            index: 0,
            effect: blur.clone(),
        },
    );
    let timeline = run(
        &timeline,
        Operation::StackEffect {
            clip_id: clip,
            index: 1,
            effect: tint.clone(),
        },
    );
    let timeline = run(&timeline, Operation::ReorderEffect { clip_id: clip, from: 1, to: 0 });
    assert_eq!(timeline.clip(clip).unwrap().effects, vec![tint, blur.clone()]);

    let err = reject(
        &timeline,
        Operation::StackEffect {
            clip_id: clip,
            index: 5,
            effect: Effect::new(EffectId::new_v4(), EffectKind::Opacity { amount: 0.1 }),
        },
    );
    assert!(matches!(
        err,
        EditError::Validation(ValidationError::IndexOutOfRange { index: 5, len: 2 })
    ));

    let timeline = run(&timeline, Operation::RemoveEffect { clip_id: clip, index: 0 });
    assert_eq!(timeline.clip(clip).unwrap().effects, vec![blur]);
}

#[test]
fn test_removing_last_effect_restores_baseline() {
    let (baseline, track) = video_timeline();
    let (baseline, clip) = place(&baseline, track, 0, 5);
    let with_effect = run(
        &baseline,
        Operation::StackEffect {
            clip_id: clip,
            index: 0,
            effect: Effect::new(EffectId::new_v4(), EffectKind::Contrast { amount: 2.0 }),
        },
    );
    let removed = run(&with_effect, Operation::RemoveEffect { clip_id: clip, index: 0 });
    assert_eq!(removed, baseline);
}

#[test]
fn test_transition_duration_is_clamped() {
    let (timeline, track) = video_timeline();
    let (timeline, left) = place(&timeline, track, 0, 2);
    let (timeline, right) = place(&timeline, track, 2, 6);
    let id = TransitionId::new_v4();
    let timeline = run(
        &timeline,
        Operation::SetTransition {
            transition_id: id,
            boundary: Boundary::Cut { left, right },
            kind: TransitionKind::CrossDissolve,
            duration: secs(10),
        },
    );
    assert_eq!(timeline.transition(id).unwrap().1.duration, secs(2));
}

#[test]
fn test_transition_needs_touching_clips() {
    let (timeline, track) = video_timeline();
    let (timeline, left) = place(&timeline, track, 0, 2);
    let (timeline, right) = place(&timeline, track, 3, 6);
    let err = reject(
        &timeline,
        Operation::SetTransition {
            transition_id: TransitionId::new_v4(),
            boundary: Boundary::Cut { left, right },
            kind: TransitionKind::CrossDissolve,
            duration: secs(1),
        },
    );
    assert!(matches!(
        err,
        EditError::Validation(ValidationError::InvalidBoundary)
    ));
}

#[test]
fn test_moving_clip_apart_drops_cut_transition() {
    let (timeline, track) = video_timeline();
    let (timeline, left) = place(&timeline, track, 0, 2);
    let (timeline, right) = place(&timeline, track, 2, 6);
    let id = TransitionId::new_v4();
    let timeline = run(
        &timeline,
        Operation::SetTransition {
            transition_id: id,
            boundary: Boundary::Cut { left, right },
            kind: TransitionKind::CrossDissolve,
            duration: secs(1),
        },
    );
    let timeline = run(
        &timeline,
        Operation::MoveClip {
            clip_id: right,
            position: secs(3),
            track_id: None,
        },
    );
    assert!(timeline.transition(id).is_none());
}

#[test]
fn test_trim_reclamps_transition() {
    let (timeline, track) = video_timeline();
    let (timeline, clip) = place(&timeline, track, 0, 4);
    let id = TransitionId::new_v4();
    let timeline = run(
        &timeline,
        Operation::SetTransition {
            transition_id: id,
            boundary: Boundary::In { clip },
            kind: TransitionKind::CrossDissolve,
            duration: secs(3),
        },
    );
    let timeline = run(
        &timeline,
        Operation::TrimClip {
            clip_id: clip,
            trim_in: Time::ZERO,
            trim_out: secs(2),
        },
    );
    assert_eq!(timeline.transition(id).unwrap().1.duration, secs(2));
}

#[test]
fn test_batch_is_all_or_nothing() {
    let (timeline, track) = video_timeline();
    let (timeline, _) = place(&timeline, track, 0, 5);
    let good = clip_spec(track, 6, 8);
    let good_id = good.clip_id;
    let batch = Operation::Batch {
        label: "Two Clips".to_string(),
        operations: vec![
            Operation::AddClip(good),
            Operation::AddClip(clip_spec(track, 2, 4)),
        ],
    };
    assert!(apply(&timeline, &batch).is_err());
    assert!(timeline.clip(good_id).is_none());

    let empty = Operation::Batch {
        label: "Nothing".to_string(),
        operations: Vec::new(),
    };
    assert!(matches!(
        reject(&timeline, empty),
        EditError::Operation(OperationError::EmptyBatch(_))
    ));
}

#[test]
fn test_duplicate_clip_id_is_rejected() {
    let (timeline, track) = video_timeline();
    let spec = clip_spec(track, 0, 2);
    let timeline = run(&timeline, Operation::AddClip(spec.clone()));
    let mut again = spec;
    again.position = secs(5);
    assert!(matches!(
        reject(&timeline, Operation::AddClip(again)),
        EditError::Validation(ValidationError::DuplicateId(_))
    ));
}

#[test]
fn test_operation_labels() {
    let (timeline, track) = video_timeline();
    let (_, clip) = place(&timeline, track, 0, 2);
    assert_eq!(
        Operation::DeleteClip {
            clip_id: clip,
            gap: GapPolicy::Ripple
        }
        .label(),
        "Ripple Delete"
    );
    assert_eq!(
        Operation::StackEffect {
            clip_id: clip,
            index: 0,
            effect: Effect::new(EffectId::new_v4(), EffectKind::Opacity { amount: 1.0 }),
        }
        .label(),
        "Add Effect 'opacity'"
    );
}

#[test]
fn test_operations_serialize_as_tagged_json() {
    let operation = Operation::MuteTrack {
        track_id: TrackId::new_v4(),
        muted: true,
    };
    let json = serde_json::to_value(&operation).unwrap();
    assert_eq!(json["op"], "mute_track");
    let back: Operation = serde_json::from_value(json).unwrap();
    assert_eq!(back, operation);
}
