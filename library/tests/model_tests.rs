use composition_engine::model::ids::{EffectId, MediaId, TransitionId};
use composition_engine::model::timeline::TimelineSettings;
use composition_engine::model::{
    Boundary, ClipId, Effect, EffectKind, MediaRef, Time, TimeRange, Timeline, TrackId,
    TrackKind, TransitionKind,
};
use composition_engine::{LibraryError, ValidationError};
use composition_engine::editor::{NewClip, Operation, apply};

fn secs(s: i64) -> Time {
    Time::from_secs(s)
}

fn run(timeline: &Timeline, operation: Operation) -> Timeline {
    apply(timeline, &operation).unwrap().0
}

fn timeline_with_track(kind: TrackKind) -> (Timeline, TrackId) {
    let track_id = TrackId::new_v4();
    let timeline = run(
        &Timeline::new(TimelineSettings::default()),
        Operation::AddTrack {
            track_id,
            kind,
            name: "Track".to_string(),
            index: None,
        },
    );
    (timeline, track_id)
}

fn place(timeline: &Timeline, track_id: TrackId, start: i64, end: i64) -> (Timeline, ClipId) {
    let clip_id = ClipId::new_v4();
    let media = MediaRef::new(MediaId::new_v4(), secs(100));
    let spec = NewClip::new(clip_id, track_id, media, secs(start))
        .with_source_range(TimeRange::new(Time::ZERO, secs(end - start)));
    (run(timeline, Operation::AddClip(spec)), clip_id)
}

#[test]
fn test_document_roundtrip() {
    let (timeline, track_id) = timeline_with_track(TrackKind::Video);
    let (timeline, clip_id) = place(&timeline, track_id, 0, 5);
    let timeline = run(
        &timeline,
        Operation::StackEffect {
            clip_id,
            index: 0,
            effect: Effect::new(EffectId::new_v4(), EffectKind::Opacity { amount: 0.5 }),
        },
    );

    let json = timeline.save().unwrap();
    let loaded = Timeline::load(&json).unwrap();
    assert_eq!(loaded, timeline);
    assert_eq!(loaded.clip(clip_id).unwrap().effects.len(), 1);
}

#[test]
fn test_load_rejects_out_of_range_effect() {
    let (timeline, track_id) = timeline_with_track(TrackKind::Video);
    let (timeline, clip_id) = place(&timeline, track_id, 0, 5);
    let timeline = run(
        &timeline,
        Operation::StackEffect {
            clip_id,
            index: 0,
            effect: Effect::new(EffectId::new_v4(), EffectKind::Opacity { amount: 0.5 }),
        },
    );

    let mut raw: serde_json::Value = serde_json::from_str(&timeline.save().unwrap()).unwrap();
    raw["timeline"]["tracks"][0]["clips"][0]["effects"][0]["kind"]["amount"] = serde_json::json!(7.5);

    let result = Timeline::load(&raw.to_string());
    assert!(matches!(
        result,
        Err(LibraryError::InvalidDocument(ValidationError::InvalidClip { clip_id: id, .. })) if id == clip_id
    ));
}

#[test]
fn test_load_rejects_overlapping_document() {
    let (timeline, track_id) = timeline_with_track(TrackKind::Video);
    let (timeline, _) = place(&timeline, track_id, 0, 5);
    let (timeline, second) = place(&timeline, track_id, 5, 10);

    // Hand-edit the saved document so the second clip starts inside the first.
    let mut raw: serde_json::Value = serde_json::from_str(&timeline.save().unwrap()).unwrap();
    let clips = raw["timeline"]["tracks"][0]["clips"].as_array_mut().unwrap();
    let edited = clips
        .iter_mut()
        .find(|c| c["id"] == serde_json::json!(second.as_uuid().to_string()))
        .unwrap();
    edited["position"] = serde_json::json!(secs(3).as_micros());

    let result = Timeline::load(&raw.to_string());
    assert!(matches!(
        result,
        Err(LibraryError::InvalidDocument(ValidationError::Overlap { .. }))
    ));
}

#[test]
fn test_unversioned_document_is_upgraded() {
    let (timeline, track_id) = timeline_with_track(TrackKind::Audio);
    let (timeline, _) = place(&timeline, track_id, 1, 3);
    let bare = serde_json::to_string(&timeline).unwrap();
    assert_eq!(Timeline::load(&bare).unwrap(), timeline);
}

#[test]
fn test_unknown_schema_version_is_rejected() {
    let json = r#"{"schema_version": 99, "timeline": {}}"#;
    assert!(matches!(
        Timeline::load(json),
        Err(LibraryError::UnsupportedSchema { found: 99, .. })
    ));
}

#[test]
fn test_duration_is_latest_clip_end() {
    let (timeline, video) = timeline_with_track(TrackKind::Video);
    let audio = TrackId::new_v4();
    let timeline = run(
        &timeline,
        Operation::AddTrack {
            track_id: audio,
            kind: TrackKind::Audio,
            name: "A1".to_string(),
            index: None,
        },
    );
    let (timeline, _) = place(&timeline, video, 0, 4);
    let (timeline, _) = place(&timeline, audio, 2, 9);
    assert_eq!(timeline.duration(), secs(9));
    assert_eq!(timeline.track_index(audio), Some(1));
}

#[test]
fn test_clip_at_hit_testing() {
    let (timeline, track_id) = timeline_with_track(TrackKind::Video);
    let (timeline, first) = place(&timeline, track_id, 0, 5);
    let (timeline, second) = place(&timeline, track_id, 5, 10);

    assert_eq!(timeline.clip_at(track_id, secs(4)).map(|c| c.id), Some(first));
    // Half-open: the boundary belongs to the later clip.
    assert_eq!(timeline.clip_at(track_id, secs(5)).map(|c| c.id), Some(second));
    assert!(timeline.clip_at(track_id, secs(10)).is_none());
}

#[test]
fn test_free_intervals_and_nearest_slot() {
    let (timeline, track_id) = timeline_with_track(TrackKind::Video);
    let (timeline, _) = place(&timeline, track_id, 0, 4);
    let (timeline, _) = place(&timeline, track_id, 6, 10);

    let gaps = timeline
        .free_intervals(track_id, TimeRange::new(Time::ZERO, secs(12)))
        .unwrap();
    assert_eq!(
        gaps,
        vec![
            TimeRange::new(secs(4), secs(6)),
            TimeRange::new(secs(10), secs(12)),
        ]
    );

    // Three seconds do not fit in the gap at 4s, so the slot after the last clip wins.
    let slot = timeline
        .nearest_free_slot(track_id, secs(5), secs(3), None)
        .unwrap();
    assert_eq!(slot, secs(10));

    let slot = timeline
        .nearest_free_slot(track_id, secs(5), secs(2), None)
        .unwrap();
    assert_eq!(slot, secs(4));
}

#[test]
fn test_transitions_for_clip() {
    let (timeline, track_id) = timeline_with_track(TrackKind::Video);
    let (timeline, left) = place(&timeline, track_id, 0, 4);
    let (timeline, right) = place(&timeline, track_id, 4, 8);
    let timeline = run(
        &timeline,
        Operation::SetTransition {
            transition_id: TransitionId::new_v4(),
            boundary: Boundary::Cut { left, right },
            kind: TransitionKind::CrossDissolve,
            duration: secs(1),
        },
    );
    assert_eq!(timeline.transitions_for(left).count(), 1);
    assert_eq!(timeline.transitions_for(right).count(), 1);
}
