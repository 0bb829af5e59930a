//! Per-item polling loop.
//!
//! One [`ItemMonitor`] owns the sample history and tracking flags of a single
//! item. Each tick runs:
//!
//! ```text
//! fetch stats -> forecast on stored history -> append + persist -> policy -> side effects
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use milestone_core::{
    now_local, ItemId, MonitorPhase, Sample, TrackingState, VideoMetadata,
};
use milestone_forecast::CompletionEstimator;
use milestone_notify::{Broadcaster, ForwardNode, Payload, Segment};
use milestone_storage::Storage;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::policy::{self, PolicyAction, PolicyConfig};
use crate::report::{self, ItemReport, StatusReport};
use crate::sampler::Sampler;
use crate::store::SampleStore;
use crate::{FetchError, MonitorError, Result};

/// Collaborators shared by every monitor.
#[derive(Clone)]
pub struct MonitorDeps {
    /// Durable storage
    pub storage: Arc<dyn Storage>,
    /// Stats source
    pub sampler: Arc<dyn Sampler>,
    /// Notification fan-out
    pub broadcaster: Broadcaster,
    /// Forecast tuning
    pub estimator: CompletionEstimator,
    /// Upper bound for one stats fetch
    pub fetch_timeout: Duration,
}

impl MonitorDeps {
    /// Deps with notifications disabled and a 10 second fetch timeout.
    pub fn new(storage: Arc<dyn Storage>, sampler: Arc<dyn Sampler>) -> Self {
        Self {
            storage,
            sampler,
            broadcaster: Broadcaster::disabled(),
            estimator: CompletionEstimator::new(),
            fetch_timeout: Duration::from_secs(10),
        }
    }

    /// Use `broadcaster` for notifications.
    pub fn with_broadcaster(mut self, broadcaster: Broadcaster) -> Self {
        self.broadcaster = broadcaster;
        self
    }
}

/// What one tick produced.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    /// The sample that was persisted
    pub sample: Sample,
    /// Policy decisions, already carried out
    pub actions: Vec<PolicyAction>,
}

impl TickOutcome {
    /// Whether the policy ended the loop.
    pub fn stopped(&self) -> bool {
        self.actions.contains(&PolicyAction::Stop)
    }
}

struct Progress {
    tracking: TrackingState,
    last_view: Option<u64>,
    metadata: Option<VideoMetadata>,
}

/// Monitor of one tracked item.
pub struct ItemMonitor {
    id: ItemId,
    deps: MonitorDeps,
    store: SampleStore,
    progress: Mutex<Progress>,
    configured_interval: AtomicU64,
    running: AtomicBool,
    stop_requested: AtomicBool,
    wake: Notify,
}

impl ItemMonitor {
    /// Open a monitor, resuming history and flags from storage.
    pub async fn open(id: ItemId, deps: MonitorDeps, interval: u64) -> Result<Self> {
        let store = SampleStore::load(id.clone(), deps.storage.clone()).await?;
        let persisted = deps.storage.load_state(&id).await?;
        let last_view = store.last().await.map(|s| s.view);

        let mut tracking = TrackingState::new(interval);
        tracking.resume(last_view, &persisted);
        if last_view.is_some() {
            info!(
                item = %id,
                ?last_view,
                extended = tracking.extended_target_mode,
                "resumed session"
            );
        }

        Ok(Self {
            id,
            deps,
            store,
            progress: Mutex::new(Progress { tracking, last_view, metadata: None }),
            configured_interval: AtomicU64::new(interval.max(1)),
            running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            wake: Notify::new(),
        })
    }

    /// Item id.
    pub fn id(&self) -> &ItemId {
        &self.id
    }

    /// Sample history.
    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    /// Copy of the tracking flags.
    pub fn tracking(&self) -> TrackingState {
        self.with_progress(|p| p.tracking.clone())
    }

    /// Whether the loop is active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Configured interval (seconds).
    pub fn configured_interval(&self) -> u64 {
        self.configured_interval.load(Ordering::SeqCst)
    }

    /// Change the configured interval. Takes effect immediately unless the
    /// item is sprinting.
    pub fn set_interval(&self, secs: u64) {
        let secs = secs.max(1);
        self.configured_interval.store(secs, Ordering::SeqCst);
        self.with_progress(|p| {
            if p.tracking.phase != MonitorPhase::Sprinting {
                p.tracking.effective_interval = secs;
            }
        });
        info!(item = %self.id, interval = secs, "interval updated");
    }

    /// Ask the loop to exit. A tick in progress is finished first; a
    /// pending wait is cut short.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    fn with_progress<T>(&self, f: impl FnOnce(&mut Progress) -> T) -> T {
        let mut guard = match self.progress.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    fn policy_config(&self) -> PolicyConfig {
        PolicyConfig { interval: self.configured_interval() }
    }

    /// Run the polling loop until stopped or a final milestone is reached.
    pub async fn run(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(MonitorError::AlreadyRunning(self.id.clone()));
        }
        self.with_progress(|p| {
            p.tracking.is_monitoring = true;
            p.tracking.phase = MonitorPhase::Running;
        });
        info!(item = %self.id, "monitoring started");

        self.capture_cover().await;

        while !self.stop_requested.load(Ordering::SeqCst) {
            match self.tick().await {
                Ok(outcome) if outcome.stopped() => break,
                Ok(_) => {}
                Err(MonitorError::Fetch(e)) => {
                    warn!(item = %self.id, error = %e, "fetch failed, retrying next interval");
                }
                Err(e) => {
                    error!(item = %self.id, error = %e, "tick failed");
                }
            }
            if self.stop_requested.load(Ordering::SeqCst) {
                break;
            }
            let interval = self.with_progress(|p| p.tracking.effective_interval);
            self.wait(Duration::from_secs(interval)).await;
        }

        self.with_progress(|p| {
            p.tracking.is_monitoring = false;
            if p.tracking.phase != MonitorPhase::ReachedFinal {
                p.tracking.phase = MonitorPhase::Stopped;
            }
        });
        self.stop_requested.store(false, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        info!(item = %self.id, "monitoring ended");
        Ok(())
    }

    /// Sleep for `interval` or until a stop is requested. A wake-up left
    /// over from an earlier run does not cut the wait short.
    async fn wait(&self, interval: Duration) {
        let deadline = tokio::time::Instant::now() + interval;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return,
                _ = self.wake.notified() => {
                    if self.stop_requested.load(Ordering::SeqCst) {
                        return;
                    }
                }
            }
        }
    }

    /// Fetch metadata and save the cover image. Failures are logged only.
    pub async fn capture_cover(&self) {
        let metadata = match self.deps.sampler.fetch_metadata(&self.id).await {
            Ok(m) => m,
            Err(e) => {
                warn!(item = %self.id, error = %e, "failed to fetch metadata");
                return;
            }
        };
        let cover_url = metadata.cover_url.clone();
        self.with_progress(|p| p.metadata = Some(metadata));

        let Some(url) = cover_url else {
            return;
        };
        match self.deps.sampler.fetch_cover(&url).await {
            Ok(bytes) => match self.deps.storage.save_cover(&self.id, &bytes).await {
                Ok(path) => info!(item = %self.id, path = %path.display(), "cover saved"),
                Err(e) => warn!(item = %self.id, error = %e, "failed to save cover"),
            },
            Err(e) => warn!(item = %self.id, error = %e, "failed to download cover"),
        }
    }

    /// One polling iteration.
    pub async fn tick(&self) -> Result<TickOutcome> {
        let timeout = self.deps.fetch_timeout;
        let stats = tokio::time::timeout(timeout, self.deps.sampler.fetch_stats(&self.id))
            .await
            .map_err(|_| FetchError::Timeout(timeout))??;

        let now = now_local();
        let history = self.store.snapshot().await;
        let (last_view, target) = self.with_progress(|p| (p.last_view, p.tracking.target()));
        let increment = last_view.map_or(0, |prev| stats.view as i64 - prev as i64);

        let mut sample = Sample::from_stats(now, &stats, increment);
        match self.deps.estimator.estimate_at(&history, stats.view, target, now) {
            Ok(outcome) => {
                let (label, date) = outcome.labels();
                sample.estimated_time = label;
                sample.estimated_date = date;
                sample.sample_count = outcome.valid_sample_count();
                sample.avg_increment_per_interval = outcome.average_increment();
            }
            Err(e) => {
                debug!(item = %self.id, error = %e, "no forecast this tick");
                sample.estimated_time = format!("cannot estimate yet: {}", e);
                sample.estimated_date = sample.estimated_time.clone();
            }
        }

        self.store.append(sample.clone()).await?;
        info!(
            item = %self.id,
            view = stats.view,
            inc = increment,
            like = stats.like,
            coin = stats.coin,
            danmaku = stats.danmaku,
            "sample"
        );

        let config = self.policy_config();
        let actions = self.with_progress(|p| {
            p.last_view = Some(stats.view);
            policy::evaluate(&mut p.tracking, stats.view, &config)
        });
        self.apply(&actions).await;

        Ok(TickOutcome { sample, actions })
    }

    async fn apply(&self, actions: &[PolicyAction]) {
        for action in actions {
            match *action {
                PolicyAction::SetInterval(secs) => {
                    info!(item = %self.id, interval = secs, "effective interval changed");
                }
                PolicyAction::PersistState => {
                    let blob = self.with_progress(|p| p.tracking.persisted());
                    if let Err(e) = self.deps.storage.save_state(&self.id, &blob).await {
                        error!(item = %self.id, error = %e, "failed to persist state");
                    }
                }
                PolicyAction::SprintAlert { target, view } => {
                    info!(item = %self.id, target, view, "sprint mode");
                    let text = report::sprint_text(&self.id, view, target);
                    self.deps.broadcaster.broadcast(&Payload::Text(text));
                }
                PolicyAction::Milestone { target, view } => {
                    info!(item = %self.id, target, view, "milestone reached");
                    let text = report::milestone_text(&self.id, view, target);
                    let node = self.deps.broadcaster.node(vec![Segment::text(text)]);
                    self.deps.broadcaster.broadcast(&Payload::Forward(vec![node]));
                }
                PolicyAction::Stop => self.stop(),
            }
        }
    }

    /// Latest sample with a freshly computed estimate.
    pub async fn report(&self) -> Option<ItemReport> {
        let history = self.store.snapshot().await;
        let latest = history.last()?.clone();
        let (target, title) = self.with_progress(|p| {
            let title = p.metadata.as_ref().map(|m| m.title.clone()).filter(|t| !t.is_empty());
            (p.tracking.target(), title)
        });

        let (estimated_time, estimated_date, valid_sample_count, average_increment) =
            match self.deps.estimator.estimate(&history, latest.view, target) {
                Ok(outcome) => {
                    let (label, date) = outcome.labels();
                    (label, date, outcome.valid_sample_count(), outcome.average_increment())
                }
                Err(_) => (
                    latest.estimated_time.clone(),
                    latest.estimated_date.clone(),
                    latest.sample_count,
                    latest.avg_increment_per_interval,
                ),
            };

        Some(ItemReport {
            id: self.id.clone(),
            title: title.unwrap_or_else(|| self.id.to_string()),
            latest,
            estimated_time,
            estimated_date,
            valid_sample_count,
            average_increment,
        })
    }

    /// Forwarded-card node for this item: the report text plus the saved cover.
    pub async fn card_node(&self) -> Option<ForwardNode> {
        let report = self.report().await?;
        let mut content = vec![Segment::text(report.card_text())];
        match self.deps.storage.load_cover(&self.id).await {
            Ok(Some(bytes)) => content.push(Segment::image_bytes(&bytes)),
            Ok(None) => {}
            Err(e) => warn!(item = %self.id, error = %e, "failed to load cover"),
        }
        Some(self.deps.broadcaster.node(content))
    }

    /// Push this item's card to every configured target.
    pub async fn push_card(&self) -> Result<bool> {
        let node = self
            .card_node()
            .await
            .ok_or_else(|| MonitorError::NoSamples(self.id.clone()))?;
        Ok(self.deps.broadcaster.broadcast(&Payload::Forward(vec![node])))
    }

    /// Status snapshot with the last `window` increments.
    pub async fn status(&self, window: usize) -> StatusReport {
        let samples = self.store.snapshot().await;
        let tracking = self.tracking();
        StatusReport {
            id: self.id.clone(),
            phase: tracking.phase,
            effective_interval: tracking.effective_interval,
            target: tracking.target(),
            sample_count: samples.len(),
            latest: samples.last().cloned(),
            recent_increments: report::recent_increments(&samples, window),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::tests::MockStorage;
    use async_trait::async_trait;
    use milestone_core::{
        parse_time, PersistedState, StatSnapshot, FINAL_TARGET, FIRST_TARGET, SPRINT_INTERVAL_SECS,
    };
    use milestone_notify::{Notifier, NotifySettings, Target};
    use std::collections::VecDeque;

    /// Sampler replaying a fixed sequence of view counts.
    pub(crate) struct MockSampler {
        views: Mutex<VecDeque<u64>>,
        pub cover_url: Option<String>,
    }

    impl MockSampler {
        pub fn new(views: impl IntoIterator<Item = u64>) -> Self {
            Self { views: Mutex::new(views.into_iter().collect()), cover_url: None }
        }
    }

    #[async_trait]
    impl Sampler for MockSampler {
        async fn fetch_stats(&self, _id: &ItemId) -> std::result::Result<StatSnapshot, FetchError> {
            let view = self
                .views
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| FetchError::Decode("no more data".into()))?;
            Ok(StatSnapshot { view, like: view / 100, ..Default::default() })
        }

        async fn fetch_metadata(&self, _id: &ItemId) -> std::result::Result<VideoMetadata, FetchError> {
            Ok(VideoMetadata { title: "demo video".into(), cover_url: self.cover_url.clone() })
        }

        async fn fetch_cover(&self, _url: &str) -> std::result::Result<Vec<u8>, FetchError> {
            Ok(vec![0xFF, 0xD8, 0xFF])
        }
    }

    /// Notifier remembering every payload.
    #[derive(Default)]
    pub(crate) struct RecordingNotifier {
        pub sent: Mutex<Vec<(Target, Payload)>>,
    }

    impl RecordingNotifier {
        pub fn texts(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter_map(|(_, p)| match p {
                    Payload::Text(t) => Some(t.clone()),
                    Payload::Forward(nodes) => match nodes.as_slice() {
                        [node] => match node.content.as_slice() {
                            [Segment::Text { text }] => Some(text.clone()),
                            _ => None,
                        },
                        _ => None,
                    },
                })
                .collect()
        }
    }

    impl Notifier for RecordingNotifier {
        fn send(&self, target: Target, payload: Payload) -> milestone_notify::Result<()> {
            self.sent.lock().unwrap().push((target, payload));
            Ok(())
        }
    }

    pub(crate) fn id() -> ItemId {
        ItemId::new("BV1xx411c7mD").unwrap()
    }

    pub(crate) fn deps(
        storage: Arc<MockStorage>,
        sampler: MockSampler,
        notifier: Arc<RecordingNotifier>,
    ) -> MonitorDeps {
        let settings = NotifySettings {
            onebot_enabled: true,
            onebot_http_url: "http://127.0.0.1:3000".into(),
            onebot_bot_qq: 10001,
            onebot_group_ids: vec![100],
            ..Default::default()
        };
        MonitorDeps::new(storage, Arc::new(sampler))
            .with_broadcaster(Broadcaster::new(notifier, settings))
    }

    fn history(views: &[u64]) -> Vec<Sample> {
        let start = parse_time("2024-01-01 00:00:00").unwrap();
        views
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let t = start + chrono::Duration::seconds(i as i64 * 60);
                Sample::from_stats(t, &StatSnapshot { view: *v, ..Default::default() }, 0)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_first_tick_records_zero_increment() {
        let storage = Arc::new(MockStorage::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let m = ItemMonitor::open(id(), deps(storage.clone(), MockSampler::new([1000, 1250]), notifier), 75)
            .await
            .unwrap();

        let first = m.tick().await.unwrap();
        assert_eq!(first.sample.view_increment, 0);
        assert!(first.sample.estimated_time.starts_with("cannot estimate yet"));
        let second = m.tick().await.unwrap();
        assert_eq!(second.sample.view_increment, 250);
        assert_eq!(storage.load_history(&id()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_milestone_end_to_end() {
        let storage = Arc::new(MockStorage::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let sampler = MockSampler::new([1_050_000, 2_000_000, 10_200_000]);
        let m = ItemMonitor::open(id(), deps(storage, sampler, notifier.clone()), 75)
            .await
            .unwrap();

        let out = m.tick().await.unwrap();
        assert!(!out.stopped());
        assert!(m.tracking().extended_target_mode);
        assert_eq!(
            notifier.texts(),
            vec![format!("{} reached milestone: 1050000 / {}", id(), FIRST_TARGET)]
        );

        assert!(!m.tick().await.unwrap().stopped());
        assert_eq!(notifier.texts().len(), 1);

        let out = m.tick().await.unwrap();
        assert!(out.stopped());
        let texts = notifier.texts();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[1], format!("{} reached milestone: 10200000 / {}", id(), FINAL_TARGET));
        assert_eq!(m.tracking().phase, MonitorPhase::ReachedFinal);
    }

    #[tokio::test]
    async fn test_sprint_alert_survives_restart() {
        let storage = Arc::new(MockStorage::default());
        storage.histories.lock().unwrap().insert(id(), history(&[990_000, 995_000]));
        let notifier = Arc::new(RecordingNotifier::default());

        let m = ItemMonitor::open(id(), deps(storage.clone(), MockSampler::new([999_600]), notifier.clone()), 75)
            .await
            .unwrap();
        m.tick().await.unwrap();
        assert_eq!(notifier.texts().len(), 1);
        assert_eq!(m.tracking().effective_interval, SPRINT_INTERVAL_SECS);
        assert_eq!(
            storage.load_state(&id()).await.unwrap(),
            PersistedState { special_push_done: true, special_push_target: Some(FIRST_TARGET) }
        );

        // Simulated restart: new monitor over the same storage.
        let m = ItemMonitor::open(id(), deps(storage.clone(), MockSampler::new([999_700]), notifier.clone()), 75)
            .await
            .unwrap();
        m.tick().await.unwrap();
        assert_eq!(notifier.texts().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_does_not_advance() {
        let storage = Arc::new(MockStorage::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let m = ItemMonitor::open(id(), deps(storage.clone(), MockSampler::new([100, 1_000_500, 200]), notifier.clone()), 75)
            .await
            .unwrap();
        m.tick().await.unwrap();

        storage.set_failing(true);
        let err = m.tick().await.unwrap_err();
        assert!(matches!(err, MonitorError::Persistence(_)));
        assert_eq!(m.store().len().await, 1);
        assert!(notifier.texts().is_empty());

        storage.set_failing(false);
        let out = m.tick().await.unwrap();
        assert_eq!(out.sample.view_increment, 100);
    }

    #[tokio::test]
    async fn test_fetch_error_surfaces() {
        let storage = Arc::new(MockStorage::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let m = ItemMonitor::open(id(), deps(storage, MockSampler::new([]), notifier), 75)
            .await
            .unwrap();
        assert!(matches!(m.tick().await, Err(MonitorError::Fetch(_))));
        assert!(m.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_forecast_fields_filled_once_enough_history() {
        let storage = Arc::new(MockStorage::default());
        let views: Vec<u64> = (0..10).map(|i| 100_000 + i * 600).collect();
        storage.histories.lock().unwrap().insert(id(), history(&views));
        let notifier = Arc::new(RecordingNotifier::default());
        let m = ItemMonitor::open(id(), deps(storage, MockSampler::new([106_000]), notifier), 75)
            .await
            .unwrap();

        let out = m.tick().await.unwrap();
        assert!(out.sample.estimated_time.starts_with("about "));
        assert_eq!(out.sample.sample_count, 10);
        assert!((out.sample.avg_increment_per_interval - 600.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_run_stops_on_final_milestone() {
        let storage = Arc::new(MockStorage::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let mut sampler = MockSampler::new([500, 1_000_100]);
        sampler.cover_url = Some("http://example.invalid/cover.jpg".into());
        let m = ItemMonitor::open(id(), deps(storage.clone(), sampler, notifier.clone()), 1)
            .await
            .unwrap();

        m.run().await.unwrap();
        assert!(!m.is_running());
        assert_eq!(m.store().len().await, 2);
        assert_eq!(notifier.texts().len(), 1);
        assert!(storage.load_cover(&id()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_milestone_is_sent_as_single_node_card() {
        let storage = Arc::new(MockStorage::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let m = ItemMonitor::open(id(), deps(storage, MockSampler::new([10_000_001]), notifier.clone()), 75)
            .await
            .unwrap();
        assert!(m.tick().await.unwrap().stopped());

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let Payload::Forward(nodes) = &sent[0].1 else { panic!("expected forward") };
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].uin, "10001");
        assert!(matches!(
            nodes[0].content.as_slice(),
            [Segment::Text { text }] if text.contains("reached milestone")
        ));
    }

    #[tokio::test]
    async fn test_restart_after_stop_waits_full_interval() {
        let storage = Arc::new(MockStorage::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let m = Arc::new(
            ItemMonitor::open(id(), deps(storage, MockSampler::new([10, 20, 30]), notifier), 3600)
                .await
                .unwrap(),
        );

        // Stop with no loop waiting, then a run that exits at once.
        m.stop();
        m.run().await.unwrap();
        assert!(m.store().is_empty().await);

        let runner = m.clone();
        let handle = tokio::spawn(async move { runner.run().await });
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(m.store().len().await, 1);

        m.stop();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(m.store().len().await, 1);
    }

    #[tokio::test]
    async fn test_push_card_contains_text_and_cover() {
        let storage = Arc::new(MockStorage::default());
        storage.histories.lock().unwrap().insert(id(), history(&[10, 20]));
        storage.covers.lock().unwrap().insert(id(), vec![1, 2, 3]);
        let notifier = Arc::new(RecordingNotifier::default());
        let m = ItemMonitor::open(id(), deps(storage, MockSampler::new([]), notifier.clone()), 75)
            .await
            .unwrap();

        assert!(m.push_card().await.unwrap());
        let sent = notifier.sent.lock().unwrap();
        let (target, payload) = &sent[0];
        assert_eq!(*target, Target::Group(100));
        let Payload::Forward(nodes) = payload else { panic!("expected forward") };
        assert_eq!(nodes[0].uin, "10001");
        assert_eq!(nodes[0].content.len(), 2);
        assert!(matches!(&nodes[0].content[1], Segment::Image { file } if file.starts_with("base64://")));
    }

    #[tokio::test]
    async fn test_push_card_without_samples() {
        let storage = Arc::new(MockStorage::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let m = ItemMonitor::open(id(), deps(storage, MockSampler::new([]), notifier), 75)
            .await
            .unwrap();
        assert!(matches!(m.push_card().await, Err(MonitorError::NoSamples(_))));
    }

    #[tokio::test]
    async fn test_status_window() {
        let storage = Arc::new(MockStorage::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let m = ItemMonitor::open(id(), deps(storage, MockSampler::new([10, 15, 30, 31]), notifier), 75)
            .await
            .unwrap();
        for _ in 0..4 {
            m.tick().await.unwrap();
        }
        let status = m.status(2).await;
        assert_eq!(status.sample_count, 4);
        assert_eq!(status.recent_increments, vec![15, 1]);
        assert_eq!(status.latest.unwrap().view, 31);
    }
}
