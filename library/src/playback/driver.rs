//! Preview driver: turns clock requests into cached render plans.
//!
//! [`PreviewDriver`] is synchronous and can be stepped by hand. [`spawn_preview_loop`]
//! runs it on a tokio task, offloading every resolution to the blocking pool so the
//! loop stays responsive, and cancelling the previous query whenever a new one starts.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::cache::{PlanCache, PlanKey, SharedPlanCache};
use crate::config::EngineConfig;
use crate::editor::session::{EditorSession, TimelineSnapshot};
use crate::error::{LibraryError, ResolutionError};
use crate::model::time::Time;
use crate::playback::clock::{PlaybackClock, PlaybackState, PreviewRequest};
use crate::rendering::media::QualityTier;
use crate::rendering::plan::RenderPlan;
use crate::rendering::resolver::{CancellationToken, ResolveOptions, Resolver};

pub struct PreviewDriver {
    session: Arc<EditorSession>,
    resolver: Resolver,
    cache: SharedPlanCache,
    clock: PlaybackClock,
    tier: QualityTier,
}

impl PreviewDriver {
    pub fn new(session: Arc<EditorSession>, resolver: Resolver, config: &EngineConfig) -> Self {
        Self {
            session,
            resolver,
            cache: Arc::new(PlanCache::new(config.preview.cache_capacity)),
            clock: PlaybackClock::new(&config.preview),
            tier: QualityTier::Proxy,
        }
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn cache(&self) -> &SharedPlanCache {
        &self.cache
    }

    pub fn play(&mut self, now: Instant) {
        self.clock.play(now);
    }

    pub fn pause(&mut self, now: Instant) {
        self.clock.pause(now);
        self.session.set_playhead(self.clock.position(now));
    }

    pub fn stop(&mut self) {
        self.clock.stop();
        self.session.set_playhead(Time::ZERO);
    }

    pub fn set_rate(&mut self, now: Instant, rate: f64) -> Result<(), LibraryError> {
        self.clock.set_rate(now, rate)
    }

    /// Clock request for a seek. Also moves the session playhead.
    pub fn seek_request(&mut self, now: Instant, position: Time) -> PreviewRequest {
        let request = self.clock.seek(now, position);
        self.session.set_playhead(request.position);
        request
    }

    /// Rate-limited clock request. Playback pauses once it runs off the end.
    pub fn tick_request(&mut self, now: Instant) -> Option<PreviewRequest> {
        let request = self.clock.tick(now)?;
        let end = self.session.snapshot().timeline.duration();
        if request.position >= end {
            log::debug!("Reached end of timeline at {}", end);
            self.clock.pause_at(end);
            self.session.set_playhead(end);
            return None;
        }
        Some(request)
    }

    /// Seeks and resolves the one immediate query.
    pub fn seek(&mut self, now: Instant, position: Time) -> Option<Arc<RenderPlan>> {
        let request = self.seek_request(now, position);
        self.serve(request)
    }

    pub fn tick(&mut self, now: Instant) -> Option<Arc<RenderPlan>> {
        let request = self.tick_request(now)?;
        self.serve(request)
    }

    fn serve(&self, request: PreviewRequest) -> Option<Arc<RenderPlan>> {
        match self.job(request, CancellationToken::new()).run() {
            Ok(plan) => Some(plan),
            Err(err) => {
                log::debug!("Preview query at {} produced no plan: {}", request.position, err);
                None
            }
        }
    }

    /// Self-contained resolution work for `request` against the current snapshot.
    pub fn job(&self, request: PreviewRequest, cancel: CancellationToken) -> PreviewJob {
        PreviewJob {
            snapshot: self.session.snapshot(),
            request,
            tier: self.tier,
            resolver: self.resolver.clone(),
            cache: Arc::clone(&self.cache),
            cancel,
        }
    }
}

pub struct PreviewJob {
    snapshot: TimelineSnapshot,
    request: PreviewRequest,
    tier: QualityTier,
    resolver: Resolver,
    cache: SharedPlanCache,
    cancel: CancellationToken,
}

impl PreviewJob {
    fn key(&self) -> PlanKey {
        PlanKey {
            revision: self.snapshot.revision,
            tier: self.tier,
            range: self.request.range,
        }
    }

    pub fn cached(&self) -> Option<Arc<RenderPlan>> {
        self.cache.get(&self.key())
    }

    pub fn run(&self) -> Result<Arc<RenderPlan>, ResolutionError> {
        let key = self.key();
        if let Some(plan) = self.cache.get(&key) {
            return Ok(plan);
        }
        let options = ResolveOptions::new(self.tier, self.request.range)
            .with_cancellation(self.cancel.clone());
        let plan = Arc::new(self.resolver.resolve_with(&self.snapshot.timeline, &options)?);
        self.cache.retain_revision(self.snapshot.revision);
        self.cache.put(key, Arc::clone(&plan));
        Ok(plan)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PreviewCommand {
    Play,
    Pause,
    Stop,
    Seek(Time),
    SetRate(f64),
    Shutdown,
}

pub struct PreviewHandle {
    commands: mpsc::Sender<PreviewCommand>,
    plans: watch::Receiver<Option<Arc<RenderPlan>>>,
    task: JoinHandle<()>,
}

impl PreviewHandle {
    pub async fn send(&self, command: PreviewCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    /// Latest published plan; `changed()` on the receiver waits for the next one.
    pub fn plans(&self) -> watch::Receiver<Option<Arc<RenderPlan>>> {
        self.plans.clone()
    }

    pub async fn shutdown(self) {
        let _ = self.commands.send(PreviewCommand::Shutdown).await;
        if let Err(err) = self.task.await {
            log::warn!("Preview loop ended abnormally: {}", err);
        }
    }
}

/// Runs `driver` on the current tokio runtime.
pub fn spawn_preview_loop(mut driver: PreviewDriver) -> PreviewHandle {
    let (command_tx, mut command_rx) = mpsc::channel(32);
    let (plan_tx, plan_rx) = watch::channel(None);
    let plan_tx = Arc::new(plan_tx);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(driver.clock().min_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight: Option<CancellationToken> = None;

        loop {
            let request = tokio::select! {
                _ = ticker.tick() => driver.tick_request(Instant::now()),
                command = command_rx.recv() => {
                    let now = Instant::now();
                    match command {
                        None | Some(PreviewCommand::Shutdown) => break,
                        Some(PreviewCommand::Play) => {
                            driver.play(now);
                            None
                        }
                        Some(PreviewCommand::Pause) => {
                            driver.pause(now);
                            None
                        }
                        Some(PreviewCommand::Stop) => {
                            driver.stop();
                            None
                        }
                        Some(PreviewCommand::SetRate(rate)) => {
                            if let Err(err) = driver.set_rate(now, rate) {
                                log::warn!("{}", err);
                            }
                            None
                        }
                        Some(PreviewCommand::Seek(position)) => Some(driver.seek_request(now, position)),
                    }
                }
            };
            let Some(request) = request else {
                continue;
            };

            if let Some(previous) = in_flight.take() {
                previous.cancel();
            }
            let token = CancellationToken::new();
            let job = driver.job(request, token.clone());
            if let Some(plan) = job.cached() {
                plan_tx.send_replace(Some(plan));
                continue;
            }
            in_flight = Some(token.clone());
            let plan_tx = Arc::clone(&plan_tx);
            tokio::task::spawn_blocking(move || match job.run() {
                Ok(plan) if !token.is_cancelled() => {
                    plan_tx.send_replace(Some(plan));
                }
                Ok(_) | Err(ResolutionError::Cancelled) => {
                    log::debug!("Preview query at {} superseded", request.position);
                }
                Err(err) => log::debug!("Preview query at {} failed: {}", request.position, err),
            });
        }

        if let Some(previous) = in_flight {
            previous.cancel();
        }
        if driver.clock().state() == PlaybackState::Playing {
            driver.pause(Instant::now());
        }
        log::debug!("Preview loop stopped");
    });

    PreviewHandle {
        commands: command_tx,
        plans: plan_rx,
        task,
    }
}
