use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use facecrm_faceid::{
    BoundingBox, Contact, ContactRepository, Detection, Embedding, FaceDetection, FaceExtractor,
    FaceIdError, ImageBuffer, Interaction, MatchConfig, Matcher, MemoryRepository, NewContact,
    NewInteraction, RepositoryError,
};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::{
    ErrorKind, ExclusiveFrameSource, Frame, FrameConstraints, FrameError, FrameSource,
    MatchTransition, RecognitionError, RecognitionEvent, RecognitionState, RecognitionUpdate,
    Recognizer, RecognizerConfig,
};

const DIM: usize = 4;
const E1: [f32; DIM] = [0.1, 0.2, 0.3, 0.4];
const E2: [f32; DIM] = [0.9, 0.1, 0.0, 0.5];
const FAR: [f32; DIM] = [5.0, 5.0, 5.0, 5.0];

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn emb(v: [f32; DIM]) -> Embedding {
    Embedding::new(v.to_vec(), DIM).unwrap()
}

fn face(v: [f32; DIM]) -> FaceDetection {
    FaceDetection {
        bbox: BoundingBox {
            x: 10.0,
            y: 20.0,
            width: 100.0,
            height: 120.0,
        },
        score: 0.98,
        embedding: emb(v),
    }
}

fn contact(id: &str, v: [f32; DIM]) -> Contact {
    Contact {
        id: id.into(),
        name: format!("Contact {id}"),
        company: "Acme".into(),
        title: String::new(),
        linkedin_url: String::new(),
        email: None,
        phone: None,
        notes: None,
        tags: Vec::new(),
        embedding: Some(v.to_vec()),
        image_ref: String::new(),
        created_at: Utc::now(),
        last_seen: None,
    }
}

#[derive(Default)]
struct MockSource {
    acquires: AtomicUsize,
    releases: AtomicUsize,
    fail: AtomicBool,
    unavailable: AtomicUsize,
    acquire_delay: Mutex<Duration>,
}

#[async_trait]
impl FrameSource for MockSource {
    async fn acquire(&self, _constraints: &FrameConstraints) -> Result<(), FrameError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(FrameError::Device("camera permission denied".into()));
        }
        let delay = *self.acquire_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.acquires.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn current_frame(&self) -> Result<Frame, FrameError> {
        let pending = self.unavailable.load(Ordering::SeqCst);
        if pending > 0 {
            self.unavailable.store(pending - 1, Ordering::SeqCst);
            return Ok(Frame::Unavailable);
        }
        Ok(Frame::Ready(
            ImageBuffer::new("image/jpeg", vec![0xFFu8, 0xD8]).with_size(640, 480),
        ))
    }

    async fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Replays scripted results, then repeats `fallback` forever.
#[derive(Default)]
struct MockExtractor {
    script: Mutex<VecDeque<Result<Vec<FaceDetection>, FaceIdError>>>,
    fallback: Mutex<Vec<FaceDetection>>,
    delay: Duration,
    hold: Option<(Arc<Notify>, Arc<Notify>)>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockExtractor {
    fn returning(faces: Vec<FaceDetection>) -> Self {
        Self {
            fallback: Mutex::new(faces),
            ..Default::default()
        }
    }

    fn scripted(script: Vec<Result<Vec<FaceDetection>, FaceIdError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FaceExtractor for MockExtractor {
    async fn detect_single(&self, image: &ImageBuffer) -> Result<Detection, FaceIdError> {
        Ok(Detection::best_of(self.detect_all(image).await?))
    }

    async fn detect_all(&self, _image: &ImageBuffer) -> Result<Vec<FaceDetection>, FaceIdError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some((entered, release)) = &self.hold {
            entered.notify_one();
            release.notified().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        match next {
            Some(r) => r,
            None => Ok(self.fallback.lock().clone()),
        }
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

/// Wraps a [`MemoryRepository`], counting last-seen writes.
#[derive(Default)]
struct CountingRepo {
    inner: MemoryRepository,
    touches: AtomicUsize,
    fail_touch: AtomicBool,
    fail_list: AtomicBool,
}

impl CountingRepo {
    fn with_contacts(contacts: Vec<Contact>) -> Self {
        Self {
            inner: MemoryRepository::with_contacts(contacts),
            ..Default::default()
        }
    }

    fn touches(&self) -> usize {
        self.touches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContactRepository for CountingRepo {
    async fn list(&self) -> Result<Vec<Contact>, RepositoryError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(RepositoryError::Storage("database offline".into()));
        }
        self.inner.list().await
    }

    async fn get(&self, id: &str) -> Result<Option<Contact>, RepositoryError> {
        self.inner.get(id).await
    }

    async fn create(&self, new: NewContact) -> Result<Contact, RepositoryError> {
        self.inner.create(new).await
    }

    async fn touch_last_seen(&self, id: &str, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        self.touches.fetch_add(1, Ordering::SeqCst);
        if self.fail_touch.load(Ordering::SeqCst) {
            return Err(RepositoryError::Storage("write rejected".into()));
        }
        self.inner.touch_last_seen(id, at).await
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        self.inner.delete(id).await
    }

    async fn add_interaction(&self, new: NewInteraction) -> Result<Interaction, RepositoryError> {
        self.inner.add_interaction(new).await
    }

    async fn interactions_for(
        &self,
        contact_id: &str,
    ) -> Result<Vec<Interaction>, RepositoryError> {
        self.inner.interactions_for(contact_id).await
    }
}

struct Harness {
    rec: Recognizer,
    source: Arc<MockSource>,
    extractor: Arc<MockExtractor>,
    repo: Arc<CountingRepo>,
}

fn config() -> RecognizerConfig {
    RecognizerConfig {
        event_buffer: 1024,
        ..Default::default()
    }
}

fn harness(contacts: Vec<Contact>, extractor: MockExtractor, cfg: RecognizerConfig) -> Harness {
    let source = Arc::new(MockSource::default());
    let extractor = Arc::new(extractor);
    let repo = Arc::new(CountingRepo::with_contacts(contacts));
    let matcher = Matcher::new(MatchConfig {
        threshold: 0.6,
        dimension: DIM,
    });
    let rec = Recognizer::new(cfg, matcher, extractor.clone(), source.clone(), repo.clone());
    Harness {
        rec,
        source,
        extractor,
        repo,
    }
}

async fn next_event(rec: &Recognizer) -> RecognitionEvent {
    tokio::time::timeout(Duration::from_secs(10), rec.recv_event())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

async fn wait_update(
    rec: &Recognizer,
    pred: impl Fn(&RecognitionUpdate) -> bool,
) -> RecognitionUpdate {
    loop {
        if let RecognitionEvent::Update(u) = next_event(rec).await {
            if pred(&u) {
                return u;
            }
        }
    }
}

async fn wait_error(rec: &Recognizer, kind: ErrorKind) -> String {
    loop {
        if let RecognitionEvent::Error { kind: k, message } = next_event(rec).await {
            if k == kind {
                return message;
            }
        }
    }
}

fn matched(id: &str) -> MatchTransition {
    MatchTransition::Matched {
        contact_id: id.into(),
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn stop_while_idle_is_noop() {
    let h = harness(vec![], MockExtractor::returning(vec![]), config());
    h.rec.stop().await;
    assert_eq!(h.rec.state(), RecognitionState::Idle);
    assert_eq!(h.source.releases.load(Ordering::SeqCst), 0);
    assert!(h.rec.try_recv_event().is_none());
}

#[tokio::test(start_paused = true)]
async fn start_twice_acquires_once() {
    let h = harness(vec![], MockExtractor::returning(vec![]), config());
    h.rec.start().await.unwrap();
    h.rec.start().await.unwrap();
    assert_eq!(h.rec.state(), RecognitionState::Scanning);
    assert_eq!(h.source.acquires.load(Ordering::SeqCst), 1);

    h.rec.stop().await;
    assert_eq!(h.rec.state(), RecognitionState::Idle);
    assert_eq!(h.source.releases.load(Ordering::SeqCst), 1);

    h.rec.start().await.unwrap();
    assert_eq!(h.source.acquires.load(Ordering::SeqCst), 2);
    h.rec.stop().await;
}

#[tokio::test(start_paused = true)]
async fn lifecycle_events_in_order() {
    let h = harness(vec![], MockExtractor::returning(vec![]), config());
    h.rec.start().await.unwrap();
    h.rec.stop().await;

    let mut states = Vec::new();
    while let Some(ev) = h.rec.try_recv_event() {
        if let RecognitionEvent::Update(u) = ev {
            if states.last() != Some(&u.state) {
                states.push(u.state);
            }
        }
    }
    assert_eq!(
        states,
        vec![
            RecognitionState::Starting,
            RecognitionState::Scanning,
            RecognitionState::Stopping,
            RecognitionState::Idle,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn acquisition_failure_returns_to_idle() {
    let h = harness(vec![], MockExtractor::returning(vec![]), config());
    h.source.fail.store(true, Ordering::SeqCst);

    let err = h.rec.start().await.unwrap_err();
    assert!(matches!(
        err,
        RecognitionError::AcquisitionFailed(FrameError::Device(_))
    ));
    assert_eq!(h.rec.state(), RecognitionState::Idle);
    wait_error(&h.rec, ErrorKind::AcquisitionFailed).await;

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.extractor.calls(), 0, "no automatic retry");

    h.source.fail.store(false, Ordering::SeqCst);
    h.rec.start().await.unwrap();
    assert_eq!(h.rec.state(), RecognitionState::Scanning);
    h.rec.stop().await;
}

fn sharing(source: &Arc<ExclusiveFrameSource<MockSource>>) -> Recognizer {
    Recognizer::new(
        config(),
        Matcher::new(MatchConfig {
            threshold: 0.6,
            dimension: DIM,
        }),
        Arc::new(MockExtractor::returning(vec![])),
        source.clone(),
        Arc::new(CountingRepo::default()),
    )
}

#[tokio::test(start_paused = true)]
async fn exclusive_source_rejects_second_session() {
    let source = Arc::new(ExclusiveFrameSource::new(MockSource::default()));
    let first = sharing(&source);
    let second = sharing(&source);

    first.start().await.unwrap();
    assert!(matches!(
        second.start().await,
        Err(RecognitionError::AcquisitionFailed(FrameError::Busy))
    ));
    assert_eq!(second.state(), RecognitionState::Idle);

    first.stop().await;
    assert!(!source.is_held());
    second.start().await.unwrap();
    assert_eq!(source.inner().acquires.load(Ordering::SeqCst), 2);
    second.stop().await;
}

#[tokio::test(start_paused = true)]
async fn dropped_recognizer_releases_source() {
    let source = Arc::new(ExclusiveFrameSource::new(MockSource::default()));
    let first = sharing(&source);
    first.start().await.unwrap();
    assert!(source.is_held());

    drop(first);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!source.is_held());
    assert_eq!(source.inner().releases.load(Ordering::SeqCst), 1);

    let second = sharing(&source);
    second.start().await.unwrap();
    assert_eq!(second.state(), RecognitionState::Scanning);
    second.stop().await;
    assert_eq!(source.inner().releases.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn stop_during_acquisition_abandons_start() {
    let h = harness(
        vec![contact("a", E1)],
        MockExtractor::returning(vec![face(E1)]),
        config(),
    );
    *h.source.acquire_delay.lock() = Duration::from_millis(500);

    let (started, ()) = tokio::join!(h.rec.start(), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(h.rec.state(), RecognitionState::Starting);
        h.rec.stop().await;
    });
    started.unwrap();
    assert_eq!(h.rec.state(), RecognitionState::Idle);
    assert_eq!(h.source.acquires.load(Ordering::SeqCst), 1);
    assert_eq!(h.source.releases.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.extractor.calls(), 0);
    assert_eq!(h.repo.touches(), 0);

    let mut states = Vec::new();
    while let Some(ev) = h.rec.try_recv_event() {
        if let RecognitionEvent::Update(u) = ev {
            assert_eq!(u.transition, MatchTransition::None);
            states.push(u.state);
        }
    }
    assert_eq!(
        states,
        vec![
            RecognitionState::Starting,
            RecognitionState::Stopping,
            RecognitionState::Idle,
        ]
    );

    *h.source.acquire_delay.lock() = Duration::ZERO;
    h.rec.start().await.unwrap();
    wait_update(&h.rec, |u| u.transition == matched("a")).await;
    h.rec.stop().await;
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn recognizes_enrolled_contact() {
    let h = harness(
        vec![contact("a", E1), contact("b", E2)],
        MockExtractor::returning(vec![face(E1)]),
        config(),
    );
    h.rec.start().await.unwrap();
    assert_eq!(h.rec.gallery().len(), 2);

    let u = wait_update(&h.rec, |u| u.transition == matched("a")).await;
    let m = u.current_match.unwrap();
    assert!(m.is_match);
    assert_eq!(m.distance, 0.0);
    assert_eq!(m.label.as_deref(), Some("Contact a"));

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(h.rec.current_match().unwrap().matched_id(), Some("a"));
    let stored = h.repo.get("a").await.unwrap().unwrap();
    assert!(stored.last_seen.is_some());
    assert_eq!(h.repo.touches(), 1, "throttled to one write");

    h.rec.stop().await;
    assert!(h.rec.current_match().is_none());
}

#[tokio::test(start_paused = true)]
async fn zero_throttle_touches_every_match() {
    let h = harness(
        vec![contact("a", E1)],
        MockExtractor::returning(vec![face(E1)]),
        RecognizerConfig {
            last_seen_throttle: Duration::ZERO,
            ..config()
        },
    );
    h.rec.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1000)).await;
    h.rec.stop().await;
    assert!(h.repo.touches() >= 5, "touches = {}", h.repo.touches());
}

#[tokio::test(start_paused = true)]
async fn last_seen_failures_do_not_stop_scanning() {
    let h = harness(
        vec![contact("a", E1)],
        MockExtractor::returning(vec![face(E1)]),
        RecognizerConfig {
            last_seen_throttle: Duration::ZERO,
            ..config()
        },
    );
    h.repo.fail_touch.store(true, Ordering::SeqCst);
    h.rec.start().await.unwrap();
    wait_update(&h.rec, |u| u.transition == matched("a")).await;
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(h.rec.state(), RecognitionState::Scanning);
    assert!(h.repo.touches() >= 2);
    while let Some(ev) = h.rec.try_recv_event() {
        assert!(ev.error_kind().is_none(), "unexpected error event: {ev:?}");
    }
    h.rec.stop().await;
}

#[tokio::test(start_paused = true)]
async fn no_faces_is_no_match() {
    let h = harness(vec![contact("a", E1)], MockExtractor::returning(vec![]), config());
    h.rec.start().await.unwrap();
    let u = wait_update(&h.rec, |u| u.transition == MatchTransition::NoMatch).await;
    assert!(u.current_match.is_none());
    assert_eq!(h.repo.touches(), 0);
    h.rec.stop().await;
}

#[tokio::test(start_paused = true)]
async fn unknown_face_reports_distance() {
    let h = harness(vec![contact("a", E1)], MockExtractor::returning(vec![face(FAR)]), config());
    h.rec.start().await.unwrap();
    let u = wait_update(&h.rec, |u| u.transition == MatchTransition::NoMatch).await;
    let m = u.current_match.unwrap();
    assert!(!m.is_match);
    assert!(m.contact_id.is_none());
    assert!(m.distance > 0.6);
    h.rec.stop().await;
}

#[tokio::test(start_paused = true)]
async fn closest_detection_wins() {
    let h = harness(
        vec![contact("a", E1), contact("b", E2)],
        MockExtractor::returning(vec![face(FAR), face([0.9, 0.1, 0.0, 0.45])]),
        config(),
    );
    h.rec.start().await.unwrap();
    let u = wait_update(&h.rec, |u| matches!(u.transition, MatchTransition::Matched { .. })).await;
    assert_eq!(u.transition, matched("b"));
    h.rec.stop().await;
}

#[tokio::test(start_paused = true)]
async fn reseen_after_gap() {
    let h = harness(
        vec![contact("a", E1), contact("b", E2)],
        MockExtractor::scripted(vec![
            Ok(vec![face(E1)]),
            Ok(vec![face(E1)]),
            Ok(vec![]),
            Ok(vec![face(E2)]),
            Ok(vec![face(E1)]),
        ]),
        config(),
    );
    h.rec.start().await.unwrap();

    let mut transitions = Vec::new();
    while transitions.len() < 5 {
        if let RecognitionEvent::Update(u) = next_event(&h.rec).await {
            if u.transition != MatchTransition::None {
                transitions.push(u.transition);
            }
        }
    }
    assert_eq!(
        transitions,
        vec![
            matched("a"),
            MatchTransition::NoMatch,
            matched("b"),
            MatchTransition::Reseen {
                contact_id: "a".into()
            },
            MatchTransition::NoMatch,
        ]
    );
    h.rec.stop().await;
}

// ---------------------------------------------------------------------------
// Scheduling and cancellation
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn stop_discards_in_flight_extraction() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let extractor = MockExtractor {
        hold: Some((entered.clone(), release.clone())),
        ..MockExtractor::returning(vec![face(E1)])
    };
    let h = harness(vec![contact("a", E1)], extractor, config());

    h.rec.start().await.unwrap();
    entered.notified().await;

    h.rec.stop().await;
    assert_eq!(h.rec.state(), RecognitionState::Idle);
    assert_eq!(h.source.releases.load(Ordering::SeqCst), 1);

    release.notify_one();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(h.rec.current_match().is_none());
    assert_eq!(h.extractor.calls(), 1);
    assert_eq!(h.repo.touches(), 0);
    while let Some(ev) = h.rec.try_recv_event() {
        if let RecognitionEvent::Update(u) = ev {
            assert!(!matches!(u.transition, MatchTransition::Matched { .. }));
        }
    }
}

#[tokio::test(start_paused = true)]
async fn single_flight_and_minimum_interval() {
    let extractor = MockExtractor {
        delay: Duration::from_millis(300),
        ..MockExtractor::returning(vec![])
    };
    let h = harness(vec![], extractor, config());
    h.rec.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(2000)).await;
    h.rec.stop().await;

    let calls = h.extractor.calls();
    assert_eq!(h.extractor.max_in_flight.load(Ordering::SeqCst), 1);
    // One call per 300ms extraction + 100ms interval.
    assert!((4..=6).contains(&calls), "calls = {calls}");
}

#[tokio::test(start_paused = true)]
async fn unavailable_frames_back_off_silently() {
    let h = harness(vec![contact("a", E1)], MockExtractor::returning(vec![face(E1)]), config());
    h.source.unavailable.store(3, Ordering::SeqCst);

    let started = Instant::now();
    h.rec.start().await.unwrap();
    wait_update(&h.rec, |u| u.transition == matched("a")).await;
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert_eq!(h.extractor.calls(), 1);
    h.rec.stop().await;
    while let Some(ev) = h.rec.try_recv_event() {
        assert!(ev.error_kind().is_none());
    }
}

// ---------------------------------------------------------------------------
// Errors and gallery refresh
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn extraction_failure_is_transient() {
    let h = harness(
        vec![contact("a", E1)],
        MockExtractor::scripted(vec![
            Ok(vec![face(E1)]),
            Err(FaceIdError::Extraction("inference timeout".into())),
            Ok(vec![face(E1)]),
        ]),
        config(),
    );
    h.rec.start().await.unwrap();
    wait_update(&h.rec, |u| u.transition == matched("a")).await;
    let msg = wait_error(&h.rec, ErrorKind::ExtractionFailed).await;
    assert!(msg.contains("inference timeout"));
    let u = wait_update(&h.rec, |u| u.transition != MatchTransition::None).await;
    assert_eq!(u.transition, MatchTransition::NoMatch);
    let u = wait_update(&h.rec, |u| u.transition != MatchTransition::None).await;
    assert_eq!(
        u.transition,
        MatchTransition::Reseen {
            contact_id: "a".into()
        }
    );
    assert_eq!(h.rec.state(), RecognitionState::Scanning);
    h.rec.stop().await;
}

#[tokio::test(start_paused = true)]
async fn dimension_mismatch_stops_session() {
    let bad = FaceDetection {
        bbox: BoundingBox::default(),
        score: 1.0,
        embedding: Embedding::from_vec(vec![0.0; 3]).unwrap(),
    };
    let h = harness(vec![contact("a", E1)], MockExtractor::returning(vec![bad]), config());
    h.rec.start().await.unwrap();

    wait_error(&h.rec, ErrorKind::DimensionMismatch).await;
    wait_update(&h.rec, |u| u.state == RecognitionState::Idle).await;
    assert_eq!(h.rec.state(), RecognitionState::Idle);
    assert_eq!(h.source.releases.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.extractor.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn unloaded_model_stops_session() {
    let h = harness(
        vec![contact("a", E1)],
        MockExtractor::scripted(vec![Err(FaceIdError::ModelNotLoaded)]),
        config(),
    );
    h.rec.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.rec.state(), RecognitionState::Idle);
    assert_eq!(h.source.releases.load(Ordering::SeqCst), 1);
    assert_eq!(h.extractor.calls(), 1);

    let mut kinds = Vec::new();
    while let Some(ev) = h.rec.try_recv_event() {
        kinds.extend(ev.error_kind());
    }
    assert_eq!(kinds, vec![ErrorKind::ModelUnavailable]);
}

#[tokio::test(start_paused = true)]
async fn gallery_load_failure_keeps_scanning() {
    let h = harness(vec![contact("a", E1)], MockExtractor::returning(vec![face(E1)]), config());
    h.repo.fail_list.store(true, Ordering::SeqCst);
    h.rec.start().await.unwrap();
    wait_error(&h.rec, ErrorKind::GalleryLoadFailed).await;
    assert_eq!(h.rec.state(), RecognitionState::Scanning);
    assert!(h.rec.gallery().is_empty());

    let u = wait_update(&h.rec, |u| u.transition == MatchTransition::NoMatch).await;
    assert!(!u.current_match.unwrap().is_match);
    h.rec.stop().await;
}

#[tokio::test(start_paused = true)]
async fn refreshed_gallery_is_used_on_next_cycle() {
    let h = harness(vec![], MockExtractor::returning(vec![face(E1)]), config());
    h.rec.start().await.unwrap();
    wait_update(&h.rec, |u| u.transition == MatchTransition::NoMatch).await;

    let created = h
        .repo
        .create(NewContact {
            name: "Grace".into(),
            company: "Navy".into(),
            title: String::new(),
            linkedin_url: String::new(),
            email: None,
            phone: None,
            notes: None,
            tags: Vec::new(),
            embedding: emb(E1),
            image: ImageBuffer::new("image/jpeg", vec![1u8]),
        })
        .await
        .unwrap();
    assert!(h.rec.gallery().is_empty(), "snapshot is stale until refreshed");

    let g = h.rec.refresh_gallery().await.unwrap();
    assert_eq!(g.len(), 1);
    let u = wait_update(&h.rec, |u| matches!(u.transition, MatchTransition::Matched { .. })).await;
    assert_eq!(u.transition, matched(&created.id));

    let session = h.rec.session();
    assert_eq!(session.state, RecognitionState::Scanning);
    assert_eq!(session.gallery.len(), 1);
    h.rec.stop().await;
}
