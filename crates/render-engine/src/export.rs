//! Export job management.
//!
//! An [`Exporter`] runs one export attempt at a time through the states
//! `Idle → Building → Exporting → {Succeeded, Failed, Cancelled}`. Status
//! and progress are published on watch channels; the host consumes them
//! through an [`ExportHandle`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use collage_common::config::ExportDefaults;
use collage_common::error::{CollageError, CollageResult};
use collage_model::{CollageTimeline, ExportStatus, SourceMedia, SLOT_COUNT};

use crate::compositor::build_timeline;
use crate::encoder::{Encoder, OutputProfile, ProgressCell};
use crate::persist::Persistence;

/// Settings for export attempts.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Temporary output file, replaced on every attempt.
    pub temp_path: PathBuf,

    /// Progress sampling period.
    pub progress_interval: Duration,

    /// Output encoding profile.
    pub profile: OutputProfile,
}

impl ExportSettings {
    pub fn from_defaults(defaults: &ExportDefaults) -> Self {
        Self {
            temp_path: defaults.temp_path(),
            progress_interval: defaults.progress_interval(),
            profile: OutputProfile::highest_quality(),
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self::from_defaults(&ExportDefaults::default())
    }
}

/// Result of a successful export.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    /// Where persistence stored the collage.
    pub saved_path: PathBuf,

    /// Duration of the exported timeline.
    pub duration_secs: f64,

    /// Frames in the exported timeline.
    pub total_frames: u64,
}

/// Runs collage exports, one at a time.
pub struct Exporter {
    encoder: Arc<dyn Encoder>,
    persistence: Arc<dyn Persistence>,
    settings: ExportSettings,
    busy: Arc<AtomicBool>,
}

impl Exporter {
    pub fn new(
        encoder: Arc<dyn Encoder>,
        persistence: Arc<dyn Persistence>,
        settings: ExportSettings,
    ) -> Self {
        Self {
            encoder,
            persistence,
            settings,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Whether an export started by this exporter is still running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Start an export in the background.
    ///
    /// Must be called from within a Tokio runtime. Fails with
    /// [`CollageError::ExportBusy`] while a previous export is still live,
    /// or while any other exporter in this process writes the same
    /// temporary output path.
    pub fn start(&self, sources: Vec<SourceMedia>) -> CollageResult<ExportHandle> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("Export rejected: another export is in progress");
            return Err(CollageError::ExportBusy);
        }
        if !claimed_outputs().insert(self.settings.temp_path.clone()) {
            self.busy.store(false, Ordering::SeqCst);
            tracing::warn!(
                output = %self.settings.temp_path.display(),
                "Export rejected: temporary output is in use by another export"
            );
            return Err(CollageError::ExportBusy);
        }
        let guard = BusyGuard {
            busy: self.busy.clone(),
            output: self.settings.temp_path.clone(),
        };

        let (status_tx, status_rx) = watch::channel(ExportStatus::Idle);
        let (progress_tx, progress_rx) = watch::channel(0.0f64);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let run = ExportRun {
            encoder: self.encoder.clone(),
            persistence: self.persistence.clone(),
            settings: self.settings.clone(),
            status_tx,
            progress_tx,
            cancel_rx,
        };

        let task = tokio::spawn(async move {
            let _guard = guard;
            run.execute(sources).await
        });

        Ok(ExportHandle {
            status_rx,
            progress_rx,
            cancel: ExportCanceller(Arc::new(cancel_tx)),
            task,
        })
    }

    /// Start an export and wait for it to finish.
    pub async fn export(&self, sources: Vec<SourceMedia>) -> CollageResult<ExportOutcome> {
        self.start(sources)?.wait().await
    }
}

/// Temporary output paths written by live exports in this process.
static CLAIMED_OUTPUTS: Mutex<BTreeSet<PathBuf>> = Mutex::new(BTreeSet::new());

fn claimed_outputs() -> MutexGuard<'static, BTreeSet<PathBuf>> {
    CLAIMED_OUTPUTS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Releases the busy flag and the output claim when the export task ends.
struct BusyGuard {
    busy: Arc<AtomicBool>,
    output: PathBuf,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        claimed_outputs().remove(&self.output);
        self.busy.store(false, Ordering::SeqCst);
    }
}

/// Host-side view of a running export.
///
/// Dropping the handle detaches the export; it keeps running to completion.
pub struct ExportHandle {
    status_rx: watch::Receiver<ExportStatus>,
    progress_rx: watch::Receiver<f64>,
    cancel: ExportCanceller,
    task: JoinHandle<CollageResult<ExportOutcome>>,
}

impl ExportHandle {
    /// Current state.
    pub fn status(&self) -> ExportStatus {
        *self.status_rx.borrow()
    }

    /// Latest sampled progress in `[0.0, 1.0]`.
    pub fn progress(&self) -> f64 {
        *self.progress_rx.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ExportStatus> {
        self.status_rx.clone()
    }

    /// Progress stream; closes when the export task ends.
    pub fn subscribe_progress(&self) -> watch::Receiver<f64> {
        self.progress_rx.clone()
    }

    /// Request cancellation. Has no effect once encoding has finished.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A cloneable cancel trigger usable while [`wait`](Self::wait) is pending.
    pub fn canceller(&self) -> ExportCanceller {
        self.cancel.clone()
    }

    /// Wait for the export to reach a terminal state and the result to be saved.
    pub async fn wait(self) -> CollageResult<ExportOutcome> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(CollageError::export(format!("Export task failed: {e}"))),
        }
    }
}

/// Cancels the export it was taken from.
#[derive(Debug, Clone)]
pub struct ExportCanceller(Arc<watch::Sender<bool>>);

impl ExportCanceller {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

/// State owned by one export attempt.
struct ExportRun {
    encoder: Arc<dyn Encoder>,
    persistence: Arc<dyn Persistence>,
    settings: ExportSettings,
    status_tx: watch::Sender<ExportStatus>,
    progress_tx: watch::Sender<f64>,
    cancel_rx: watch::Receiver<bool>,
}

impl ExportRun {
    async fn execute(self, sources: Vec<SourceMedia>) -> CollageResult<ExportOutcome> {
        tracing::info!(
            sources = sources.len(),
            output = %self.settings.temp_path.display(),
            encoder = self.encoder.name(),
            "Export requested"
        );

        if sources.len() != SLOT_COUNT {
            let err = CollageError::precondition(format!(
                "exactly {SLOT_COUNT} videos are required, got {}",
                sources.len()
            ));
            return Err(self.abort(err).await);
        }

        self.set_status(ExportStatus::Building);
        let timeline = match build_timeline(&sources) {
            Ok(timeline) => timeline,
            Err(err) => return Err(self.abort(err).await),
        };
        drop(sources);

        let cancelled = *self.cancel_rx.borrow();
        if cancelled {
            return Err(self.abort(CollageError::ExportCancelled).await);
        }

        if let Err(err) = prepare_output_path(&self.settings.temp_path).await {
            return Err(self.abort(err).await);
        }

        self.set_status(ExportStatus::Exporting);
        if let Err(err) = self.run_encoder(&timeline).await {
            return Err(self.abort(err).await);
        }

        self.publish_progress(1.0);
        self.set_status(ExportStatus::Succeeded);

        let saved = self
            .persistence
            .persist(&self.settings.temp_path)
            .await
            .map_err(|err| match err {
                err @ CollageError::Persistence { .. } => err,
                other => CollageError::persistence(other.to_string()),
            });
        remove_temp_file(&self.settings.temp_path).await;

        match saved {
            Ok(saved_path) => {
                tracing::info!(
                    saved = %saved_path.display(),
                    persistence = self.persistence.name(),
                    "Export complete"
                );
                Ok(ExportOutcome {
                    saved_path,
                    duration_secs: timeline.duration_secs,
                    total_frames: timeline.total_frames(),
                })
            }
            Err(err) => {
                tracing::error!(error = %err, "Saving export failed");
                Err(err)
            }
        }
    }

    /// Drive the encoder while sampling its progress until it leaves `Exporting`.
    async fn run_encoder(&self, timeline: &CollageTimeline) -> CollageResult<()> {
        let cell = ProgressCell::new();
        let encode = self.encoder.encode(
            timeline,
            &self.settings.profile,
            &self.settings.temp_path,
            &cell,
        );
        tokio::pin!(encode);

        let mut cancel_rx = self.cancel_rx.clone();
        let mut cancel_live = true;
        let mut ticker = tokio::time::interval(self.settings.progress_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                result = &mut encode => return result,
                requested = async { cancel_rx.wait_for(|cancelled| *cancelled).await.is_ok() },
                    if cancel_live =>
                {
                    if requested {
                        tracing::info!("Export cancellation requested");
                        return Err(CollageError::ExportCancelled);
                    }
                    // Every canceller is gone; the export can no longer be cancelled.
                    cancel_live = false;
                }
                _ = ticker.tick() => self.publish_progress(cell.get()),
            }
        }
    }

    /// Clean up after a failed or cancelled attempt and publish the terminal state.
    async fn abort(&self, err: CollageError) -> CollageError {
        remove_temp_file(&self.settings.temp_path).await;
        if err.is_cancelled() {
            tracing::info!("Export cancelled");
            self.set_status(ExportStatus::Cancelled);
        } else {
            tracing::error!(error = %err, "Export failed");
            self.set_status(ExportStatus::Failed);
        }
        err
    }

    fn set_status(&self, status: ExportStatus) {
        tracing::debug!(status = status.as_str(), "Export status changed");
        self.status_tx.send_replace(status);
    }

    /// Publish a progress sample, never moving backwards.
    fn publish_progress(&self, value: f64) {
        if !value.is_finite() {
            return;
        }
        let value = value.clamp(0.0, 1.0);
        self.progress_tx.send_if_modified(|current| {
            if value > *current {
                *current = value;
                true
            } else {
                false
            }
        });
    }
}

/// Remove any stale file at `path` and make sure its directory exists.
async fn prepare_output_path(path: &Path) -> CollageResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed stale export file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(CollageError::session(format!(
                "Failed to remove stale export file {}: {e}",
                path.display()
            )))
        }
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            CollageError::session(format!(
                "Failed to create export directory {}: {e}",
                parent.display()
            ))
        })?;
    }
    Ok(())
}

async fn remove_temp_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed temporary export file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            error = %e,
            path = %path.display(),
            "Failed to remove temporary export file"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use collage_model::VisualTrack;

    #[derive(Debug, Clone)]
    enum Finish {
        Succeed,
        Fail(&'static str),
        FailSession,
        Hang,
    }

    struct FakeEncoder {
        steps: Vec<f64>,
        step_delay: Duration,
        finishes: Mutex<VecDeque<Finish>>,
        calls: AtomicUsize,
        saw_stale_file: AtomicBool,
    }

    impl FakeEncoder {
        fn new(steps: Vec<f64>, finishes: Vec<Finish>) -> Arc<Self> {
            Arc::new(Self {
                steps,
                step_delay: Duration::from_millis(15),
                finishes: Mutex::new(finishes.into()),
                calls: AtomicUsize::new(0),
                saw_stale_file: AtomicBool::new(false),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Encoder for FakeEncoder {
        fn name(&self) -> &str {
            "fake"
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn encode(
            &self,
            _timeline: &CollageTimeline,
            _profile: &OutputProfile,
            output: &Path,
            progress: &ProgressCell,
        ) -> CollageResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let finish = self
                .finishes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Finish::Succeed);

            if let Finish::FailSession = finish {
                return Err(CollageError::session("no encoder available"));
            }

            if output.exists() {
                self.saw_stale_file.store(true, Ordering::SeqCst);
            }
            std::fs::write(output, b"partial").unwrap();

            for step in &self.steps {
                progress.set(*step);
                tokio::time::sleep(self.step_delay).await;
            }

            match finish {
                Finish::Succeed => {
                    std::fs::write(output, b"finished movie").unwrap();
                    progress.set(1.0);
                    Ok(())
                }
                Finish::Fail(msg) => Err(CollageError::export(msg)),
                Finish::Hang => std::future::pending().await,
                Finish::FailSession => unreachable!(),
            }
        }
    }

    #[derive(Default)]
    struct FakePersistence {
        fail: bool,
        saved: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl Persistence for FakePersistence {
        fn name(&self) -> &str {
            "fake"
        }

        async fn persist(&self, file: &Path) -> CollageResult<PathBuf> {
            let contents = std::fs::read(file)
                .map_err(|e| CollageError::persistence(format!("unreadable export: {e}")))?;
            if self.fail {
                return Err(CollageError::persistence("library is full"));
            }
            self.saved.lock().unwrap().push(contents);
            Ok(PathBuf::from("/library/collage.mov"))
        }
    }

    fn source(name: &str, width: u32, height: u32, duration_secs: f64) -> SourceMedia {
        SourceMedia::new(
            format!("/videos/{name}"),
            VisualTrack {
                video_index: 0,
                stream_index: 0,
                codec: "h264".to_string(),
                width,
                height,
            },
            duration_secs,
        )
    }

    fn three_sources() -> Vec<SourceMedia> {
        vec![
            source("a.mov", 1920, 1080, 6.0),
            source("b.mov", 1080, 1920, 4.5),
            source("c.mov", 1080, 1080, 9.0),
        ]
    }

    fn settings(dir: &Path) -> ExportSettings {
        ExportSettings {
            temp_path: dir.join("out").join("collaged_video.mov"),
            progress_interval: Duration::from_millis(5),
            profile: OutputProfile::highest_quality(),
        }
    }

    fn exporter(
        encoder: Arc<FakeEncoder>,
        persistence: Arc<FakePersistence>,
        dir: &Path,
    ) -> Exporter {
        Exporter::new(encoder, persistence, settings(dir))
    }

    fn collect_progress(handle: &ExportHandle) -> JoinHandle<Vec<f64>> {
        let mut rx = handle.subscribe_progress();
        tokio::spawn(async move {
            let mut seen = vec![*rx.borrow_and_update()];
            while rx.changed().await.is_ok() {
                seen.push(*rx.borrow_and_update());
            }
            seen
        })
    }

    #[tokio::test]
    async fn test_successful_export_saves_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = FakeEncoder::new(vec![0.1, 0.4, 0.3, 0.8], vec![Finish::Succeed]);
        let persistence = Arc::new(FakePersistence::default());
        let exporter = exporter(encoder.clone(), persistence.clone(), dir.path());

        let handle = exporter.start(three_sources()).unwrap();
        assert!(exporter.is_busy());
        let status = handle.subscribe_status();
        let progress = collect_progress(&handle);

        let outcome = handle.wait().await.unwrap();
        assert_eq!(outcome.saved_path, PathBuf::from("/library/collage.mov"));
        assert_eq!(outcome.duration_secs, 4.5);
        assert_eq!(outcome.total_frames, 135);

        assert_eq!(*status.borrow(), ExportStatus::Succeeded);
        assert_eq!(encoder.calls(), 1);
        assert_eq!(
            persistence.saved.lock().unwrap().as_slice(),
            &[b"finished movie".to_vec()]
        );
        assert!(!exporter.settings().temp_path.exists());
        assert!(!exporter.is_busy());

        let samples = progress.await.unwrap();
        assert!(samples.windows(2).all(|w| w[0] <= w[1]), "{samples:?}");
        assert_eq!(samples.last().copied(), Some(1.0));
        assert!(samples.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[tokio::test]
    async fn test_wrong_source_count_fails_without_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = FakeEncoder::new(vec![], vec![]);
        let persistence = Arc::new(FakePersistence::default());
        let exporter = exporter(encoder.clone(), persistence.clone(), dir.path());

        let mut two = three_sources();
        two.pop();
        let mut four = three_sources();
        four.push(source("d.mov", 640, 480, 3.0));

        for sources in [two, four] {
            let handle = exporter.start(sources).unwrap();
            let status = handle.subscribe_status();
            let err = handle.wait().await.unwrap_err();
            assert!(matches!(err, CollageError::PreconditionViolation { .. }));
            assert_eq!(*status.borrow(), ExportStatus::Failed);
        }
        assert_eq!(encoder.calls(), 0);
        assert!(persistence.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_encoder_failure_preserves_message_and_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = FakeEncoder::new(vec![0.2], vec![Finish::Fail("codec blew up")]);
        let persistence = Arc::new(FakePersistence::default());
        let exporter = exporter(encoder, persistence.clone(), dir.path());

        let handle = exporter.start(three_sources()).unwrap();
        let status = handle.subscribe_status();
        let err = handle.wait().await.unwrap_err();

        assert_eq!(err.to_string(), "Export failed: codec blew up");
        assert_eq!(*status.borrow(), ExportStatus::Failed);
        assert!(!exporter.settings().temp_path.exists());
        assert!(persistence.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_session_creation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = FakeEncoder::new(vec![], vec![Finish::FailSession]);
        let exporter = exporter(encoder, Arc::new(FakePersistence::default()), dir.path());

        let err = exporter.export(three_sources()).await.unwrap_err();
        assert!(matches!(err, CollageError::ExportSessionCreation { .. }));
    }

    #[tokio::test]
    async fn test_cancel_stops_export_and_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = FakeEncoder::new(vec![0.3], vec![Finish::Hang]);
        let persistence = Arc::new(FakePersistence::default());
        let exporter = exporter(encoder, persistence.clone(), dir.path());

        let handle = exporter.start(three_sources()).unwrap();
        let mut status = handle.subscribe_status();
        status
            .wait_for(|s| *s == ExportStatus::Exporting)
            .await
            .unwrap();
        let progress = collect_progress(&handle);

        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.cancel();
        let err = handle.wait().await.unwrap_err();

        assert!(matches!(err, CollageError::ExportCancelled));
        assert_eq!(*status.borrow(), ExportStatus::Cancelled);
        assert!(!exporter.settings().temp_path.exists());
        assert!(persistence.saved.lock().unwrap().is_empty());
        assert!(!exporter.is_busy());

        // The progress stream closes once the job is gone.
        let samples = progress.await.unwrap();
        assert!(samples.iter().all(|p| *p < 1.0), "{samples:?}");
    }

    #[tokio::test]
    async fn test_second_export_is_rejected_while_busy() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = FakeEncoder::new(vec![], vec![Finish::Hang]);
        let exporter = exporter(
            encoder.clone(),
            Arc::new(FakePersistence::default()),
            dir.path(),
        );

        let first = exporter.start(three_sources()).unwrap();
        first
            .subscribe_status()
            .wait_for(|s| *s == ExportStatus::Exporting)
            .await
            .unwrap();
        assert!(matches!(
            exporter.start(three_sources()),
            Err(CollageError::ExportBusy)
        ));

        first.canceller().cancel();
        assert!(first.wait().await.unwrap_err().is_cancelled());
        assert!(!exporter.is_busy());
        assert_eq!(encoder.calls(), 1);
    }

    #[tokio::test]
    async fn test_exporters_sharing_a_temp_path_do_not_overlap() {
        let dir = tempfile::tempdir().unwrap();
        let hanging = FakeEncoder::new(vec![], vec![Finish::Hang]);
        let first = exporter(
            hanging.clone(),
            Arc::new(FakePersistence::default()),
            dir.path(),
        );
        let finishing = FakeEncoder::new(vec![0.5], vec![Finish::Succeed]);
        let persistence = Arc::new(FakePersistence::default());
        let second = exporter(finishing.clone(), persistence.clone(), dir.path());

        let running = first.start(three_sources()).unwrap();
        running
            .subscribe_status()
            .wait_for(|s| *s == ExportStatus::Exporting)
            .await
            .unwrap();
        let temp_path = first.settings().temp_path.clone();
        while !temp_path.exists() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert!(matches!(
            second.start(three_sources()),
            Err(CollageError::ExportBusy)
        ));
        assert!(!second.is_busy());
        assert_eq!(finishing.calls(), 0);
        assert_eq!(std::fs::read(&temp_path).unwrap(), b"partial");

        running.cancel();
        assert!(running.wait().await.unwrap_err().is_cancelled());

        second.export(three_sources()).await.unwrap();
        assert_eq!(finishing.calls(), 1);
        assert_eq!(
            persistence.saved.lock().unwrap().as_slice(),
            &[b"finished movie".to_vec()]
        );
    }

    #[tokio::test]
    async fn test_retry_after_failure_replaces_stale_file() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = FakeEncoder::new(
            vec![0.5],
            vec![Finish::Fail("first attempt"), Finish::Succeed],
        );
        let persistence = Arc::new(FakePersistence::default());
        let exporter = exporter(encoder.clone(), persistence.clone(), dir.path());

        assert!(exporter.export(three_sources()).await.is_err());

        let temp_path = exporter.settings().temp_path.clone();
        std::fs::create_dir_all(temp_path.parent().unwrap()).unwrap();
        std::fs::write(&temp_path, b"stale").unwrap();

        exporter.export(three_sources()).await.unwrap();
        assert!(!encoder.saw_stale_file.load(Ordering::SeqCst));
        assert_eq!(
            persistence.saved.lock().unwrap().as_slice(),
            &[b"finished movie".to_vec()]
        );
        assert!(!temp_path.exists());
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_succeeded_status() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = FakeEncoder::new(vec![0.5], vec![Finish::Succeed]);
        let persistence = Arc::new(FakePersistence {
            fail: true,
            ..FakePersistence::default()
        });
        let exporter = exporter(encoder, persistence, dir.path());

        let handle = exporter.start(three_sources()).unwrap();
        let status = handle.subscribe_status();
        let err = handle.wait().await.unwrap_err();

        assert_eq!(err.to_string(), "Failed to save export: library is full");
        assert_eq!(*status.borrow(), ExportStatus::Succeeded);
        assert!(!exporter.settings().temp_path.exists());
    }

    #[tokio::test]
    async fn test_detached_export_runs_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = FakeEncoder::new(vec![0.5], vec![Finish::Succeed]);
        let persistence = Arc::new(FakePersistence::default());
        let exporter = exporter(encoder, persistence.clone(), dir.path());

        let handle = exporter.start(three_sources()).unwrap();
        let mut status = handle.subscribe_status();
        drop(handle);

        status.wait_for(|s| s.is_terminal()).await.unwrap();
        assert_eq!(*status.borrow(), ExportStatus::Succeeded);
        while exporter.is_busy() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(persistence.saved.lock().unwrap().len(), 1);
    }
}
