use std::sync::Arc;
use std::time::{Duration, Instant};

use composition_engine::config::EngineConfig;
use composition_engine::editor::{EditorSession, NewClip, Operation};
use composition_engine::model::ids::MediaId;
use composition_engine::model::timeline::TimelineSettings;
use composition_engine::model::{ClipId, MediaRef, Time, TimeRange, Timeline, TrackKind};
use composition_engine::playback::{PlaybackState, PreviewCommand, PreviewDriver, spawn_preview_loop};
use composition_engine::rendering::{QualityTier, Resolver, UriTemplateProvider};

fn secs(s: i64) -> Time {
    Time::from_secs(s)
}

/// Session holding one video track with an 8 second clip.
fn session() -> Arc<EditorSession> {
    let session = EditorSession::new(Timeline::new(TimelineSettings::default()), &EngineConfig::default());
    let track_id = session.new_track_id();
    session
        .submit(Operation::AddTrack {
            track_id,
            kind: TrackKind::Video,
            name: "V1".to_string(),
            index: None,
        })
        .unwrap();
    let media = MediaRef::new(MediaId::new_v4(), secs(30));
    let spec = NewClip::new(session.new_clip_id(), track_id, media, Time::ZERO)
        .with_source_range(TimeRange::new(Time::ZERO, secs(8)));
    session.submit(Operation::AddClip(spec)).unwrap();
    Arc::new(session)
}

fn driver(session: &Arc<EditorSession>) -> PreviewDriver {
    let resolver = Resolver::new(Arc::new(UriTemplateProvider::new("media://{media}/{tier}")));
    PreviewDriver::new(Arc::clone(session), resolver, &EngineConfig::default())
}

#[test]
fn test_seek_resolves_window_at_proxy_tier() {
    let session = session();
    let mut driver = driver(&session);
    let plan = driver.seek(Instant::now(), secs(2)).unwrap();

    assert_eq!(plan.tier, QualityTier::Proxy);
    assert_eq!(plan.range, TimeRange::new(secs(2), secs(2) + Time::from_millis(500)));
    assert_eq!(session.snapshot().timeline.playhead(), secs(2));
    assert_eq!(driver.clock().state(), PlaybackState::Paused);
}

#[test]
fn test_seek_past_end_yields_no_plan() {
    let session = session();
    let mut driver = driver(&session);
    assert!(driver.seek(Instant::now(), secs(20)).is_none());
}

#[test]
fn test_tick_is_idle_until_playing() {
    let session = session();
    let mut driver = driver(&session);
    let start = Instant::now();
    assert!(driver.tick(start).is_none());

    driver.play(start);
    let plan = driver.tick(start + Duration::from_secs(1)).unwrap();
    assert_eq!(plan.range.start, secs(1));
    // Inside the minimum interval the clock stays quiet.
    assert!(driver.tick(start + Duration::from_millis(1010)).is_none());
}

#[test]
fn test_playback_pauses_at_end() {
    let session = session();
    let mut driver = driver(&session);
    let start = Instant::now();
    driver.play(start);

    assert!(driver.tick(start + Duration::from_secs(20)).is_none());
    assert_eq!(driver.clock().state(), PlaybackState::Paused);
    assert_eq!(driver.clock().position(start + Duration::from_secs(30)), secs(8));
    assert_eq!(session.snapshot().timeline.playhead(), secs(8));
}

#[test]
fn test_stop_rewinds_playhead() {
    let session = session();
    let mut driver = driver(&session);
    driver.seek(Instant::now(), secs(4));
    driver.stop();
    assert_eq!(driver.clock().state(), PlaybackState::Stopped);
    assert_eq!(session.snapshot().timeline.playhead(), Time::ZERO);
}

#[test]
fn test_repeated_query_hits_cache_until_edit() {
    let session = session();
    let mut driver = driver(&session);
    let now = Instant::now();

    let first = driver.seek(now, secs(3)).unwrap();
    let again = driver.seek(now, secs(3)).unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(driver.cache().len(), 1);

    let track_id = session.snapshot().timeline.tracks().next().unwrap().id;
    session
        .submit(Operation::MuteTrack {
            track_id,
            muted: true,
        })
        .unwrap();
    let edited = driver.seek(now, secs(3)).unwrap();
    assert!(!Arc::ptr_eq(&first, &edited));
    assert!(edited.instructions[0].layers.is_empty());
    // Plans for the old revision are dropped.
    assert_eq!(driver.cache().len(), 1);
}

#[test]
fn test_rate_must_be_positive() {
    let session = session();
    let mut driver = driver(&session);
    assert!(driver.set_rate(Instant::now(), -1.0).is_err());
    assert!(driver.set_rate(Instant::now(), 2.0).is_ok());
    assert_eq!(driver.clock().rate(), 2.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_preview_loop_publishes_seek_plans() {
    let session = session();
    let handle = spawn_preview_loop(driver(&session));
    let mut plans = handle.plans();
    assert!(plans.borrow().is_none());

    assert!(handle.send(PreviewCommand::Seek(secs(1))).await);
    tokio::time::timeout(Duration::from_secs(5), plans.changed())
        .await
        .expect("no plan published")
        .unwrap();
    let plan = plans.borrow_and_update().clone().unwrap();
    assert_eq!(plan.range.start, secs(1));

    handle.shutdown().await;
    assert_eq!(session.snapshot().timeline.playhead(), secs(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_preview_loop_stops_on_shutdown() {
    let session = session();
    let handle = spawn_preview_loop(driver(&session));
    assert!(handle.send(PreviewCommand::Play).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.shutdown().await;

    // The loop pauses playback on the way out, so the playhead was written back.
    let playhead = session.snapshot().timeline.playhead();
    assert!(playhead > Time::ZERO && playhead < secs(8));
}
