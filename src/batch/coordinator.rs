//! Batch coordinator
//!
//! # Delivery
//!
//! 1. Every path is looked up in the [`FingerprintCache`]; hits are sent on
//!    the result channel, in input order, before any task is spawned.
//! 2. Each distinct missed path becomes one task on a fixed-size rayon pool.
//!    A task decodes, extracts, writes through to the cache and sends one
//!    event per input index carrying that path.
//!
//! Cancellation is checked only when a task starts: tasks already running
//! finish and report; tasks not yet started report nothing.
//!
//! A panic inside extraction is caught in the task and reported as a
//! decoding error for that path. The record is written under the fingerprint
//! taken before extraction began.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender};

use crate::analysis::extractor::TrackAnalyzer;
use crate::analysis::result::DescriptorBundle;
use crate::cache::{FingerprintCache, TrackFingerprint};
use crate::config::BatchConfig;
use crate::error::AnalysisError;

/// Where a result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    /// Served from the fingerprint cache
    Cache,
    /// Computed by a worker in this batch
    Extraction,
}

/// One per-track result
#[derive(Debug, Clone)]
pub struct BatchEvent {
    /// Position of the path in the input
    pub index: usize,
    /// The path as given
    pub path: PathBuf,
    /// Cache hit or fresh extraction
    pub source: ResultSource,
    /// Descriptors, or the reason the track could not be analyzed
    pub outcome: Result<DescriptorBundle, AnalysisError>,
}

/// Cooperative cancellation flag shared by one batch's tasks
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// A token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once [`cancel`](Self::cancel) was called on any clone
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Input split into cache hits and misses, both in input order
#[derive(Debug, Default)]
pub struct Partition {
    /// `(index, path, bundle)` for every hit
    pub hits: Vec<(usize, PathBuf, DescriptorBundle)>,
    /// `(index, path)` for every miss
    pub misses: Vec<(usize, PathBuf)>,
}

/// Receiving end of one batch
///
/// Iterating yields events until every hit and every started task has
/// reported.
#[derive(Debug)]
pub struct BatchStream {
    events: Receiver<BatchEvent>,
    token: CancellationToken,
    total: usize,
    cached: usize,
    dispatched: usize,
}

impl BatchStream {
    /// Number of input paths
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of cache hits (already queued on the stream)
    pub fn cached(&self) -> usize {
        self.cached
    }

    /// Number of extraction tasks submitted (distinct missed paths)
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// Stop starting new tasks for this batch
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Token shared with this batch's tasks
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Iterator for BatchStream {
    type Item = BatchEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.events.recv().ok()
    }
}

/// Drives extraction over many tracks, cache first
pub struct BatchCoordinator {
    cache: FingerprintCache,
    analyzer: Arc<dyn TrackAnalyzer>,
    pool: Arc<rayon::ThreadPool>,
    workers: usize,
    current: Mutex<Option<CancellationToken>>,
}

impl std::fmt::Debug for BatchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchCoordinator")
            .field("cache", &self.cache)
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

impl BatchCoordinator {
    /// Create a coordinator with its own worker pool
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for zero workers and
    /// `AnalysisError::ProcessingError` if the pool cannot be built.
    pub fn new(
        cache: FingerprintCache,
        analyzer: Arc<dyn TrackAnalyzer>,
        config: &BatchConfig,
    ) -> Result<Self, AnalysisError> {
        if config.workers == 0 {
            return Err(AnalysisError::InvalidInput(
                "Batch needs at least one worker".to_string(),
            ));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|idx| format!("trackflow-worker-{idx}"))
            .build()
            .map_err(|e| AnalysisError::ProcessingError(format!("Cannot build worker pool: {e}")))?;

        Ok(Self {
            cache,
            analyzer,
            pool: Arc::new(pool),
            workers: config.workers,
            current: Mutex::new(None),
        })
    }

    /// Worker pool size
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Resolve every path against the cache without extracting anything
    pub fn partition<P: AsRef<Path>>(&self, paths: &[P]) -> Partition {
        let mut partition = Partition::default();
        for (index, path) in paths.iter().enumerate() {
            let path = path.as_ref();
            match self.cache.get(path) {
                Some(bundle) => partition.hits.push((index, path.to_path_buf(), bundle)),
                None => partition.misses.push((index, path.to_path_buf())),
            }
        }
        partition
    }

    /// Analyze every path, cache first
    ///
    /// Returns immediately; hits are already queued on the returned stream.
    pub fn analyze_all<P: AsRef<Path>>(&self, paths: &[P]) -> BatchStream {
        let token = CancellationToken::new();
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());

        let (tx, rx) = crossbeam_channel::unbounded();
        let Partition { hits, misses } = self.partition(paths);
        let cached = hits.len();

        for (index, path, bundle) in hits {
            let _ = tx.send(BatchEvent {
                index,
                path,
                source: ResultSource::Cache,
                outcome: Ok(bundle),
            });
        }

        // One task per distinct path, in first-occurrence order
        let mut groups: Vec<(PathBuf, Vec<usize>)> = Vec::new();
        let mut seen: HashMap<PathBuf, usize> = HashMap::new();
        for (index, path) in misses {
            match seen.get(&path) {
                Some(&group) => groups[group].1.push(index),
                None => {
                    seen.insert(path.clone(), groups.len());
                    groups.push((path, vec![index]));
                }
            }
        }
        let dispatched = groups.len();

        log::debug!(
            "Batch of {}: {} cached, {} to extract on {} worker(s)",
            paths.len(),
            cached,
            dispatched,
            self.workers
        );

        for (path, indices) in groups {
            let tx = tx.clone();
            let token = token.clone();
            let cache = self.cache.clone();
            let analyzer = Arc::clone(&self.analyzer);
            self.pool
                .spawn(move || run_task(&path, &indices, analyzer.as_ref(), &cache, &token, &tx));
        }
        drop(tx);

        BatchStream {
            events: rx,
            token,
            total: paths.len(),
            cached,
            dispatched,
        }
    }

    /// Cancel the most recently started batch
    pub fn cancel(&self) {
        if let Some(token) = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            log::debug!("Cancelling batch");
            token.cancel();
        }
    }
}

fn run_task(
    path: &Path,
    indices: &[usize],
    analyzer: &dyn TrackAnalyzer,
    cache: &FingerprintCache,
    token: &CancellationToken,
    tx: &Sender<BatchEvent>,
) {
    if token.is_cancelled() {
        log::debug!("Skipping {} (batch cancelled)", path.display());
        return;
    }

    // Identity of the version about to be read; a write during extraction
    // must not attach these descriptors to the newer version.
    let fingerprint = TrackFingerprint::from_path(path);

    let outcome = catch_unwind(AssertUnwindSafe(|| analyzer.analyze(path)))
        .unwrap_or_else(|payload| {
            Err(AnalysisError::DecodingError(format!(
                "Analysis panicked: {}",
                panic_message(payload.as_ref())
            )))
        });

    match (&outcome, &fingerprint) {
        (Ok(bundle), Ok(fingerprint)) => {
            if let Err(e) = cache.put_fingerprint(fingerprint, bundle) {
                log::warn!("Cannot cache descriptors for {}: {}", path.display(), e);
            }
        }
        (Ok(_), Err(e)) => {
            log::warn!("Cannot cache descriptors for {}: {}", path.display(), e);
        }
        (Err(e), _) => log::warn!("Analysis failed for {}: {}", path.display(), e),
    }

    for &index in indices {
        let event = BatchEvent {
            index,
            path: path.to_path_buf(),
            source: ResultSource::Extraction,
            outcome: outcome.clone(),
        };
        if tx.send(event).is_err() {
            log::debug!("Batch receiver dropped, discarding result for {}", path.display());
            return;
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::result::{EnergyInfo, KeyInfo};
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;

    struct FakeAnalyzer {
        calls: AtomicUsize,
        started: Option<Sender<()>>,
        gate: Option<Receiver<()>>,
    }

    impl FakeAnalyzer {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                started: None,
                gate: None,
            }
        }
    }

    impl TrackAnalyzer for FakeAnalyzer {
        fn analyze(&self, path: &Path) -> Result<DescriptorBundle, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(started) = &self.started {
                let _ = started.send(());
            }
            if let Some(gate) = &self.gate {
                let _ = gate.recv();
            }
            let name = path.to_string_lossy();
            if name.ends_with("panic.wav") {
                panic!("decoder blew up on {}", name);
            }
            if name.ends_with("growing.wav") {
                use std::io::Write;
                let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
                file.write_all(b" plus a new tail").unwrap();
            }
            if name.ends_with("bad.wav") {
                return Err(AnalysisError::DecodingError("not audio".to_string()));
            }
            Ok(fake_bundle(path))
        }
    }

    fn fake_bundle(path: &Path) -> DescriptorBundle {
        DescriptorBundle {
            file_path: path.to_string_lossy().into_owned(),
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            tempo: Some(120.0),
            key: KeyInfo::unknown(),
            energy: EnergyInfo::unknown(),
            feature: None,
            metadata: Default::default(),
            audio_info: Default::default(),
            duration: 1.0,
        }
    }

    fn library(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|name| {
                let path = dir.join(name);
                std::fs::write(&path, name.as_bytes()).unwrap();
                path
            })
            .collect()
    }

    fn coordinator(
        dir: &Path,
        analyzer: Arc<FakeAnalyzer>,
        workers: usize,
    ) -> (BatchCoordinator, FingerprintCache) {
        let cache = FingerprintCache::open(dir.join("cache")).unwrap();
        let coordinator =
            BatchCoordinator::new(cache.clone(), analyzer, &BatchConfig { workers }).unwrap();
        (coordinator, cache)
    }

    #[test]
    fn test_hits_first_in_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let paths = library(
            dir.path(),
            &["0.wav", "1.wav", "2.wav", "3.wav", "4.wav", "5.wav", "6.wav", "7.wav"],
        );
        let analyzer = Arc::new(FakeAnalyzer::new());
        let (coordinator, cache) = coordinator(dir.path(), Arc::clone(&analyzer), 3);

        let cached_indices = [0usize, 2, 3, 5, 7];
        for &i in &cached_indices {
            cache.put(&paths[i], &fake_bundle(&paths[i])).unwrap();
        }

        let stream = coordinator.analyze_all(&paths);
        assert_eq!(stream.total(), 8);
        assert_eq!(stream.cached(), 5);
        assert_eq!(stream.dispatched(), 3);

        let events: Vec<BatchEvent> = stream.collect();
        assert_eq!(events.len(), 8);

        let first: Vec<usize> = events[..5].iter().map(|e| e.index).collect();
        assert_eq!(first, cached_indices);
        assert!(events[..5].iter().all(|e| e.source == ResultSource::Cache));
        assert!(events[5..].iter().all(|e| e.source == ResultSource::Extraction));

        let indices: HashSet<usize> = events.iter().map(|e| e.index).collect();
        assert_eq!(indices.len(), 8);
        assert!(events.iter().all(|e| e.outcome.is_ok()));
        assert!(events.iter().all(|e| e.path == paths[e.index]));

        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 3);
        assert!(paths.iter().all(|p| cache.contains(p)));
    }

    #[test]
    fn test_second_run_is_all_hits() {
        let dir = tempfile::tempdir().unwrap();
        let paths = library(dir.path(), &["a.wav", "b.wav", "c.wav"]);
        let analyzer = Arc::new(FakeAnalyzer::new());
        let (coordinator, _cache) = coordinator(dir.path(), Arc::clone(&analyzer), 2);

        assert_eq!(coordinator.analyze_all(&paths).count(), 3);
        let second: Vec<BatchEvent> = coordinator.analyze_all(&paths).collect();
        assert_eq!(second.len(), 3);
        assert!(second.iter().all(|e| e.source == ResultSource::Cache));
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_decode_failure_is_per_track() {
        let dir = tempfile::tempdir().unwrap();
        let paths = library(dir.path(), &["good.wav", "bad.wav", "other.wav"]);
        let analyzer = Arc::new(FakeAnalyzer::new());
        let (coordinator, cache) = coordinator(dir.path(), analyzer, 3);

        let events: Vec<BatchEvent> = coordinator.analyze_all(&paths).collect();
        assert_eq!(events.len(), 3);

        for event in &events {
            if event.index == 1 {
                assert!(matches!(event.outcome, Err(AnalysisError::DecodingError(_))));
            } else {
                assert!(event.outcome.is_ok());
            }
        }
        assert!(!cache.contains(&paths[1]));
        assert!(cache.contains(&paths[0]));
    }

    #[test]
    fn test_panicking_track_is_reported_per_index() {
        let dir = tempfile::tempdir().unwrap();
        let paths = library(dir.path(), &["panic.wav", "good.wav"]);
        let input = vec![paths[0].clone(), paths[1].clone(), paths[0].clone()];
        let analyzer = Arc::new(FakeAnalyzer::new());
        let (coordinator, cache) = coordinator(dir.path(), Arc::clone(&analyzer), 2);

        let mut events: Vec<BatchEvent> = coordinator.analyze_all(&input).collect();
        events.sort_by_key(|e| e.index);
        assert_eq!(events.len(), 3);
        for index in [0, 2] {
            match &events[index].outcome {
                Err(AnalysisError::DecodingError(msg)) => assert!(msg.contains("panicked")),
                other => panic!("expected a decoding error, got {:?}", other),
            }
        }
        assert!(events[1].outcome.is_ok());
        assert!(!cache.contains(&paths[0]));
        assert!(cache.contains(&paths[1]));

        // The pool survives and serves the next batch
        let again: Vec<BatchEvent> = coordinator.analyze_all(&paths).collect();
        assert_eq!(again.len(), 2);
    }

    #[test]
    fn test_file_changed_during_extraction_is_not_cached_as_new_version() {
        let dir = tempfile::tempdir().unwrap();
        let paths = library(dir.path(), &["growing.wav"]);
        let analyzer = Arc::new(FakeAnalyzer::new());
        let (coordinator, cache) = coordinator(dir.path(), Arc::clone(&analyzer), 1);

        let first: Vec<BatchEvent> = coordinator.analyze_all(&paths).collect();
        assert_eq!(first.len(), 1);
        assert!(first[0].outcome.is_ok());

        // The record belongs to the version that was read, not the current one
        assert!(!cache.contains(&paths[0]));
        assert!(cache.get(&paths[0]).is_none());

        let second: Vec<BatchEvent> = coordinator.analyze_all(&paths).collect();
        assert_eq!(second[0].source, ResultSource::Extraction);
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_duplicate_paths_extracted_once() {
        let dir = tempfile::tempdir().unwrap();
        let paths = library(dir.path(), &["a.wav", "b.wav"]);
        let input = vec![paths[0].clone(), paths[1].clone(), paths[0].clone()];
        let analyzer = Arc::new(FakeAnalyzer::new());
        let (coordinator, _cache) = coordinator(dir.path(), Arc::clone(&analyzer), 3);

        let stream = coordinator.analyze_all(&input);
        assert_eq!(stream.dispatched(), 2);
        let mut indices: Vec<usize> = stream.map(|e| e.index).collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cancel_lets_in_flight_task_finish() {
        let dir = tempfile::tempdir().unwrap();
        let paths = library(dir.path(), &["a.wav", "b.wav", "c.wav", "d.wav"]);

        let (started_tx, started_rx) = crossbeam_channel::unbounded();
        let (gate_tx, gate_rx) = crossbeam_channel::unbounded::<()>();
        let analyzer = Arc::new(FakeAnalyzer {
            calls: AtomicUsize::new(0),
            started: Some(started_tx),
            gate: Some(gate_rx),
        });
        let (coordinator, _cache) = coordinator(dir.path(), Arc::clone(&analyzer), 1);

        let stream = coordinator.analyze_all(&paths);
        started_rx.recv().unwrap();
        coordinator.cancel();
        drop(gate_tx);

        let events: Vec<BatchEvent> = stream.collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, ResultSource::Extraction);
        assert!(events[0].outcome.is_ok());
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FingerprintCache::open(dir.path()).unwrap();
        let result = BatchCoordinator::new(
            cache,
            Arc::new(FakeAnalyzer::new()),
            &BatchConfig { workers: 0 },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_partition() {
        let dir = tempfile::tempdir().unwrap();
        let paths = library(dir.path(), &["a.wav", "b.wav"]);
        let (coordinator, cache) = coordinator(dir.path(), Arc::new(FakeAnalyzer::new()), 1);
        cache.put(&paths[1], &fake_bundle(&paths[1])).unwrap();

        let partition = coordinator.partition(&paths);
        assert_eq!(partition.hits.len(), 1);
        assert_eq!(partition.hits[0].0, 1);
        assert_eq!(partition.misses, vec![(0, paths[0].clone())]);
    }
}
