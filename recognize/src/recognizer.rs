//! The recognition state machine and its scan loop.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use facecrm_faceid::{
    ContactRepository, FaceDetection, FaceExtractor, FaceIdError, Gallery, GalleryHandle,
    ImageBuffer, MatchResult, Matcher,
};
use parking_lot::Mutex;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::{
    ErrorKind, Frame, FrameSource, LastSeenThrottle, MatchTransition, RecognitionError,
    RecognitionEvent, RecognitionState, RecognitionUpdate, RecognizerConfig,
};

/// Observable state of the current session.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub state: RecognitionState,
    pub current_match: Option<MatchResult>,
    pub gallery: Arc<Gallery>,
}

/// Re-identifies enrolled contacts from a live frame source.
///
/// [`Recognizer::start`] loads the gallery, acquires the frame source and
/// spawns the scan loop; [`Recognizer::stop`] cancels it and releases the
/// source. Each cycle polls one frame, extracts every face, matches them
/// against the gallery snapshot taken at the top of the cycle, and waits
/// `interval` before the next one.
///
/// At most one extraction call is outstanding at any time. A stop does not
/// abort an in-flight extraction; its result is discarded when it arrives.
///
/// Transitions are published as [`RecognitionEvent`]s, read with
/// [`Recognizer::recv_event`].
pub struct Recognizer {
    shared: Arc<Shared>,
    events_rx: AsyncMutex<mpsc::Receiver<RecognitionEvent>>,
}

struct Shared {
    cfg: RecognizerConfig,
    matcher: Matcher,
    extractor: Arc<dyn FaceExtractor>,
    source: Arc<dyn FrameSource>,
    repo: Arc<dyn ContactRepository>,
    gallery: GalleryHandle,
    throttle: LastSeenThrottle,

    // Serializes start/stop so a session is never acquired twice.
    lifecycle: AsyncMutex<()>,
    // Held across every extraction call.
    extract_gate: AsyncMutex<()>,

    inner: Mutex<Inner>,
    events_tx: mpsc::Sender<RecognitionEvent>,
}

#[derive(Default)]
struct Inner {
    state: RecognitionState,
    current_match: Option<MatchResult>,
    generation: u64,
    cancel: Option<CancellationToken>,
    // Set by stop() while the session is still starting.
    stop_requested: bool,
    seen: HashSet<String>,
    last_matched: Option<String>,
    cycles: u64,
}

impl Recognizer {
    pub fn new(
        cfg: RecognizerConfig,
        matcher: Matcher,
        extractor: Arc<dyn FaceExtractor>,
        source: Arc<dyn FrameSource>,
        repo: Arc<dyn ContactRepository>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(cfg.event_buffer.max(1));
        let throttle = LastSeenThrottle::new(cfg.last_seen_throttle);
        let gallery = GalleryHandle::new(Gallery::empty(matcher.config().dimension));
        Self {
            shared: Arc::new(Shared {
                cfg,
                matcher,
                extractor,
                source,
                repo,
                gallery,
                throttle,
                lifecycle: AsyncMutex::new(()),
                extract_gate: AsyncMutex::new(()),
                inner: Mutex::new(Inner::default()),
                events_tx,
            }),
            events_rx: AsyncMutex::new(events_rx),
        }
    }

    /// Starts scanning. A no-op unless the recognizer is idle.
    ///
    /// On acquisition failure the recognizer returns to idle and the error
    /// is both returned and published. There is no automatic retry.
    ///
    /// If [`Recognizer::stop`] is called before acquisition completes, the
    /// source is released, the recognizer returns to idle and `start`
    /// returns `Ok` without ever entering `Scanning`.
    pub async fn start(&self) -> Result<(), RecognitionError> {
        self.shared.clone().start().await
    }

    /// Stops scanning and releases the frame source. A no-op while idle.
    pub async fn stop(&self) {
        {
            let mut inner = self.shared.inner.lock();
            if inner.state == RecognitionState::Starting {
                inner.stop_requested = true;
            }
        }
        let _lifecycle = self.shared.lifecycle.lock().await;
        self.shared.stop_session(None).await;
    }

    /// Reloads contacts and swaps in a new gallery snapshot.
    /// The scan loop picks it up at the start of its next cycle.
    pub async fn refresh_gallery(&self) -> Result<Arc<Gallery>, RecognitionError> {
        self.shared
            .gallery
            .refresh(self.shared.repo.as_ref())
            .await
            .map_err(RecognitionError::Gallery)
    }

    pub fn state(&self) -> RecognitionState {
        self.shared.inner.lock().state
    }

    pub fn current_match(&self) -> Option<MatchResult> {
        self.shared.inner.lock().current_match.clone()
    }

    pub fn gallery(&self) -> Arc<Gallery> {
        self.shared.gallery.snapshot()
    }

    pub fn session(&self) -> SessionSnapshot {
        let inner = self.shared.inner.lock();
        SessionSnapshot {
            state: inner.state,
            current_match: inner.current_match.clone(),
            gallery: self.shared.gallery.snapshot(),
        }
    }

    /// Waits for the next event.
    pub async fn recv_event(&self) -> Option<RecognitionEvent> {
        self.events_rx.lock().await.recv().await
    }

    /// Returns the next event if one is already queued.
    ///
    /// Also returns `None` while another task is waiting in
    /// [`Recognizer::recv_event`], since that task holds the receiver.
    pub fn try_recv_event(&self) -> Option<RecognitionEvent> {
        self.events_rx.try_lock().ok()?.try_recv().ok()
    }
}

/// Cancels the scan loop. The loop releases the frame source on its way out.
impl Drop for Recognizer {
    fn drop(&mut self) {
        if let Some(cancel) = self.shared.inner.lock().cancel.take() {
            cancel.cancel();
        }
    }
}

impl Shared {
    async fn start(self: Arc<Self>) -> Result<(), RecognitionError> {
        let _lifecycle = self.lifecycle.lock().await;

        let generation = {
            let mut inner = self.inner.lock();
            if inner.state != RecognitionState::Idle {
                debug!(state = %inner.state, "start ignored, session already active");
                return Ok(());
            }
            inner.generation += 1;
            inner.state = RecognitionState::Starting;
            inner.stop_requested = false;
            inner.current_match = None;
            inner.seen.clear();
            inner.last_matched = None;
            inner.cycles = 0;
            self.publish(&inner, MatchTransition::None);
            inner.generation
        };
        self.throttle.reset();

        match self.gallery.refresh(self.repo.as_ref()).await {
            Ok(g) => debug!(entries = g.len(), "gallery loaded"),
            Err(e) => {
                warn!(error = %e, "failed to load contacts, keeping previous gallery");
                self.emit_error(ErrorKind::GalleryLoadFailed, e.to_string());
            }
        }

        let abandoned = self.abandon_if_stopped(&mut self.inner.lock());
        if abandoned {
            self.settle_idle();
            return Ok(());
        }

        if let Err(e) = self.source.acquire(&self.cfg.constraints).await {
            warn!(error = %e, "frame source acquisition failed");
            {
                let mut inner = self.inner.lock();
                inner.state = RecognitionState::Idle;
                self.publish(&inner, MatchTransition::None);
            }
            self.emit_error(ErrorKind::AcquisitionFailed, e.to_string());
            return Err(RecognitionError::AcquisitionFailed(e));
        }

        // The stop check and the move to Scanning happen under one lock, so
        // a stop either lands here or waits for the running session.
        let cancel = CancellationToken::new();
        let abandoned = {
            let mut inner = self.inner.lock();
            let abandoned = self.abandon_if_stopped(&mut inner);
            if !abandoned {
                inner.cancel = Some(cancel.clone());
                inner.state = RecognitionState::Scanning;
                self.publish(&inner, MatchTransition::None);
            }
            abandoned
        };
        if abandoned {
            self.source.release().await;
            self.settle_idle();
            return Ok(());
        }
        info!(generation, entries = self.gallery.snapshot().len(), "recognition started");
        tokio::spawn(self.clone().run(generation, cancel));
        Ok(())
    }

    /// Moves a starting session to `Stopping` if a stop was requested.
    fn abandon_if_stopped(&self, inner: &mut Inner) -> bool {
        if !inner.stop_requested || inner.state != RecognitionState::Starting {
            return false;
        }
        inner.stop_requested = false;
        inner.state = RecognitionState::Stopping;
        self.publish(inner, MatchTransition::None);
        info!(generation = inner.generation, "start abandoned, stop requested");
        true
    }

    fn settle_idle(&self) {
        let mut inner = self.inner.lock();
        inner.state = RecognitionState::Idle;
        inner.current_match = None;
        inner.last_matched = None;
        self.publish(&inner, MatchTransition::None);
    }

    /// Ends the session. With `only` set, ends it only if it is still
    /// that generation. Callers hold the lifecycle lock.
    async fn stop_session(&self, only: Option<u64>) {
        let cancel = {
            let mut inner = self.inner.lock();
            if inner.state == RecognitionState::Idle {
                return;
            }
            if only.is_some_and(|g| g != inner.generation) {
                return;
            }
            inner.state = RecognitionState::Stopping;
            self.publish(&inner, MatchTransition::None);
            inner.cancel.take()
        };
        if let Some(cancel) = cancel {
            cancel.cancel();
        }

        self.source.release().await;
        self.settle_idle();
        info!("recognition stopped");
    }

    async fn run(self: Arc<Self>, generation: u64, cancel: CancellationToken) {
        debug!(generation, "scan loop running");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            let gallery = self.gallery.snapshot();

            let image = match self.source.current_frame().await {
                Ok(Frame::Ready(image)) => image,
                Ok(Frame::Unavailable) => {
                    trace!("no frame available, backing off");
                    if !pause(&cancel, self.cfg.backoff).await {
                        break;
                    }
                    continue;
                }
                Err(e) => {
                    debug!(error = %e, "frame poll failed, backing off");
                    if !pause(&cancel, self.cfg.backoff).await {
                        break;
                    }
                    continue;
                }
            };

            let Some(extracted) = self.extract(&image, &cancel).await else {
                break;
            };
            if cancel.is_cancelled() {
                debug!(generation, "session stopped during extraction, discarding result");
                break;
            }

            let outcome = extracted.and_then(|dets| self.best_match(&dets, &gallery));
            match outcome {
                Ok(best) => self.apply(generation, best),
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "unrecoverable extraction error, stopping session");
                    let kind = match e {
                        FaceIdError::ModelNotLoaded => ErrorKind::ModelUnavailable,
                        _ => ErrorKind::DimensionMismatch,
                    };
                    self.emit_error(kind, e.to_string());
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "face extraction failed");
                    self.emit_error(ErrorKind::ExtractionFailed, e.to_string());
                    self.apply(generation, None);
                }
            }

            if !pause(&cancel, self.cfg.interval).await {
                break;
            }
        }
        debug!(generation, "scan loop exited");

        // No-op when stop() already ended this generation. Otherwise the
        // loop stopped on a fatal error or its recognizer was dropped, and
        // nobody else will release the source.
        let _lifecycle = self.lifecycle.lock().await;
        self.stop_session(Some(generation)).await;
    }

    /// Runs one extraction under the gate. Returns `None` if the session
    /// was cancelled before the call could begin.
    async fn extract(
        &self,
        image: &ImageBuffer,
        cancel: &CancellationToken,
    ) -> Option<Result<Vec<FaceDetection>, FaceIdError>> {
        let _gate = tokio::select! {
            _ = cancel.cancelled() => return None,
            gate = self.extract_gate.lock() => gate,
        };
        if cancel.is_cancelled() {
            return None;
        }
        Some(self.extractor.detect_all(image).await)
    }

    /// Matches every detection and keeps the lowest-distance result.
    fn best_match(
        &self,
        detections: &[FaceDetection],
        gallery: &Gallery,
    ) -> Result<Option<MatchResult>, FaceIdError> {
        let mut best: Option<MatchResult> = None;
        for det in detections {
            let r = self.matcher.find_best(&det.embedding, gallery)?;
            match &best {
                Some(b) if r.distance >= b.distance => {}
                _ => best = Some(r),
            }
        }
        Ok(best)
    }

    fn apply(&self, generation: u64, best: Option<MatchResult>) {
        let matched = best
            .as_ref()
            .and_then(|m| m.matched_id())
            .map(str::to_string);

        {
            let mut inner = self.inner.lock();
            if inner.generation != generation || inner.state != RecognitionState::Scanning {
                debug!(generation, "stale cycle result discarded");
                return;
            }
            let first_cycle = inner.cycles == 0;
            inner.cycles += 1;

            let transition = match (&inner.last_matched, &matched) {
                (Some(prev), Some(id)) if prev == id => MatchTransition::None,
                (_, Some(id)) => {
                    if inner.seen.insert(id.clone()) {
                        MatchTransition::Matched {
                            contact_id: id.clone(),
                        }
                    } else {
                        MatchTransition::Reseen {
                            contact_id: id.clone(),
                        }
                    }
                }
                (Some(_), None) => MatchTransition::NoMatch,
                (None, None) if first_cycle => MatchTransition::NoMatch,
                (None, None) => MatchTransition::None,
            };

            inner.current_match = best;
            inner.last_matched = matched.clone();
            if transition != MatchTransition::None {
                debug!(?transition, "match transition");
                self.publish(&inner, transition);
            }
        }

        if let Some(id) = matched {
            self.touch_last_seen(id);
        }
    }

    fn touch_last_seen(&self, contact_id: String) {
        if !self.throttle.allow(&contact_id, tokio::time::Instant::now()) {
            return;
        }
        let repo = self.repo.clone();
        tokio::spawn(async move {
            if let Err(e) = repo.touch_last_seen(&contact_id, Utc::now()).await {
                warn!(contact_id = %contact_id, error = %e, "failed to update last seen");
            }
        });
    }

    fn publish(&self, inner: &Inner, transition: MatchTransition) {
        self.send(RecognitionEvent::Update(RecognitionUpdate {
            state: inner.state,
            current_match: inner.current_match.clone(),
            transition,
        }));
    }

    fn emit_error(&self, kind: ErrorKind, message: String) {
        self.send(RecognitionEvent::Error { kind, message });
    }

    fn send(&self, event: RecognitionEvent) {
        match self.events_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("recognition event dropped: channel full"),
            Err(TrySendError::Closed(_)) => trace!("recognition event dropped: no receiver"),
        }
    }
}

/// Sleeps for `d` unless cancelled first. Returns false on cancellation.
async fn pause(cancel: &CancellationToken, d: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(d) => true,
    }
}
