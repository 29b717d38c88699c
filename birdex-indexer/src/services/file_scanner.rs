//! Photo directory scanner
//!
//! Recursively walks root folders, keeps files whose extension is on the
//! image whitelist, matches each file name against the catalog and
//! registers hits with the [`PhotoRegistry`].
//!
//! - Several roots are scanned in parallel on a bounded rayon pool.
//! - Counters are atomics shared by all workers, so totals are exact under
//!   any scheduling.
//! - A missing or unreadable directory is logged and skipped; it adds zero
//!   to both counters and the scan goes on.
//! - A registry invariant violation aborts the scan.
//! - The cancellation token is checked between directory entries; a
//!   cancelled scan returns the accurate partial counts.

use parking_lot::Mutex;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::models::PhotoRecord;
use crate::services::registry::{PhotoRegistry, RegistryError};
use birdex_common::config::{ScanSettings, DEFAULT_EXTENSIONS};

/// Per-path scan errors
///
/// Never escalated: the scanner logs them and skips the path.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Path cannot be accessed
    #[error("Access error {0}: {1}")]
    AccessError(PathBuf, String),
}

/// Scan totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanCounts {
    /// Whitelisted image files seen
    pub scanned: usize,
    /// Files matched to a species and registered
    pub matched: usize,
    /// Scan stopped early on the cancellation token
    pub cancelled: bool,
}

/// Progress callback, receives cumulative `(scanned, matched)`
///
/// Calls are serialized; successive calls never report smaller counts.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Shared counters for one scan call
struct ScanTally {
    scanned: AtomicUsize,
    matched: AtomicUsize,
    report_lock: Mutex<()>,
}

impl ScanTally {
    fn new() -> Self {
        Self {
            scanned: AtomicUsize::new(0),
            matched: AtomicUsize::new(0),
            report_lock: Mutex::new(()),
        }
    }

    /// Invoke the callback with the current totals
    ///
    /// Counters are read while holding the report lock; since they only
    /// grow, each report sees totals at least as large as the previous one.
    fn report(&self, progress: Option<&ProgressCallback>) {
        if let Some(callback) = progress {
            let _guard = self.report_lock.lock();
            callback(
                self.scanned.load(Ordering::SeqCst),
                self.matched.load(Ordering::SeqCst),
            );
        }
    }

    fn counts(&self, cancelled: bool) -> ScanCounts {
        ScanCounts {
            scanned: self.scanned.load(Ordering::SeqCst),
            matched: self.matched.load(Ordering::SeqCst),
            cancelled,
        }
    }
}

/// Photo directory scanner
pub struct DirectoryScanner {
    registry: Arc<PhotoRegistry>,
    extensions: Vec<String>,
    ignore_patterns: Vec<String>,
    workers: usize,
    progress_interval: usize,
    progress: Option<ProgressCallback>,
    cancel: CancellationToken,
}

impl DirectoryScanner {
    /// Scanner with the default image whitelist
    ///
    /// Ignores system files like .DS_Store, Thumbs.db, .git.
    pub fn new(registry: Arc<PhotoRegistry>) -> Self {
        Self {
            registry,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                ".git".to_string(),
                ".svn".to_string(),
                "@eaDir".to_string(),
            ],
            workers: 0,
            progress_interval: 100,
            progress: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Apply `[scan]` settings from the config file
    pub fn with_settings(self, settings: &ScanSettings) -> Self {
        self.with_extensions(&settings.extensions)
            .with_workers(settings.workers)
            .with_progress_interval(settings.progress_interval)
    }

    /// Replace the extension whitelist (with or without leading dot)
    pub fn with_extensions<S: AsRef<str>>(mut self, extensions: &[S]) -> Self {
        self.extensions = extensions
            .iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    /// Worker threads for multi-root scans (0 = available parallelism)
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Report progress every `interval` scanned files (0 = only per root)
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Scan one root folder
    pub fn scan(&self, root: &Path) -> Result<ScanCounts, RegistryError> {
        let tally = ScanTally::new();
        self.scan_root(root, &tally)?;
        Ok(tally.counts(self.cancel.is_cancelled()))
    }

    /// Scan several root folders in parallel, summing the counts
    pub fn scan_all<P: AsRef<Path> + Sync>(&self, roots: &[P]) -> Result<ScanCounts, RegistryError> {
        let tally = ScanTally::new();
        let workers = self.worker_count(roots.len());

        match rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("birdex-scan-{}", i))
            .build()
        {
            Ok(pool) => {
                debug!(workers, roots = roots.len(), "Scanning roots in parallel");
                pool.install(|| {
                    roots
                        .par_iter()
                        .try_for_each(|root| self.scan_root(root.as_ref(), &tally))
                })?;
            }
            Err(e) => {
                warn!(error = %e, "Scan worker pool unavailable, scanning sequentially");
                for root in roots {
                    self.scan_root(root.as_ref(), &tally)?;
                }
            }
        }

        let counts = tally.counts(self.cancel.is_cancelled());
        info!(
            scanned = counts.scanned,
            matched = counts.matched,
            cancelled = counts.cancelled,
            "Scan finished"
        );
        Ok(counts)
    }

    fn worker_count(&self, roots: usize) -> usize {
        let limit = if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        };
        limit.clamp(1, roots.max(1))
    }

    fn scan_root(&self, root: &Path, tally: &ScanTally) -> Result<(), RegistryError> {
        let root = match check_root(root) {
            Ok(root) => root,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Skipping scan root");
                return Ok(());
            }
        };

        info!(root = %root.display(), "Scanning directory");
        let catalog = self.registry.catalog();
        let (mut scanned, mut matched) = (0usize, 0usize);

        let walker = WalkDir::new(&root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_ignored(e));

        for entry in walker {
            if self.cancel.is_cancelled() {
                debug!(root = %root.display(), "Scan cancelled");
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // walkdir skips the unreadable subtree and continues
                    warn!(
                        path = %e.path().map(|p| p.display().to_string()).unwrap_or_default(),
                        error = %e,
                        "Skipping unreadable entry"
                    );
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.has_image_extension(entry.path()) {
                continue;
            }

            scanned += 1;
            let total = tally.scanned.fetch_add(1, Ordering::SeqCst) + 1;

            let file_name = entry.file_name().to_string_lossy();
            if let Some(species_id) = catalog.match_file(&file_name) {
                self.registry
                    .register_photo_in(&catalog, PhotoRecord::matched(entry.path(), species_id))?;
                matched += 1;
                tally.matched.fetch_add(1, Ordering::SeqCst);
            }

            if self.progress_interval > 0 && total % self.progress_interval == 0 {
                tally.report(self.progress.as_ref());
            }
        }

        tally.report(self.progress.as_ref());
        info!(root = %root.display(), scanned, matched, "Directory scan complete");
        Ok(())
    }

    fn is_ignored(&self, entry: &DirEntry) -> bool {
        let file_name = entry.file_name().to_string_lossy();
        self.ignore_patterns
            .iter()
            .any(|pattern| file_name.contains(pattern.as_str()))
    }

    /// Case-insensitive whitelist check
    fn has_image_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
    }
}

/// Validate a scan root and make it absolute
fn check_root(root: &Path) -> Result<PathBuf, ScanError> {
    if !root.exists() {
        return Err(ScanError::PathNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    root.canonicalize()
        .map_err(|e| ScanError::AccessError(root.to_path_buf(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SpeciesRecord;
    use std::fs;
    use tempfile::TempDir;

    fn registry() -> Arc<PhotoRegistry> {
        let registry = PhotoRegistry::default();
        registry
            .load_catalog(vec![SpeciesRecord::new(
                "Passeriformes",
                "Passeridae",
                "Passer domesticus",
                "House Sparrow",
            )])
            .unwrap();
        Arc::new(registry)
    }

    #[test]
    fn test_extension_whitelist_is_case_insensitive() {
        let scanner = DirectoryScanner::new(registry());
        assert!(scanner.has_image_extension(Path::new("a.JPG")));
        assert!(scanner.has_image_extension(Path::new("a.Nef")));
        assert!(scanner.has_image_extension(Path::new("dir/a.cr2")));
        assert!(!scanner.has_image_extension(Path::new("a.txt")));
        assert!(!scanner.has_image_extension(Path::new("jpg")));
    }

    #[test]
    fn test_custom_extensions() {
        let scanner = DirectoryScanner::new(registry()).with_extensions(&[".HEIC", "tif"]);
        assert!(scanner.has_image_extension(Path::new("a.heic")));
        assert!(scanner.has_image_extension(Path::new("a.TIF")));
        assert!(!scanner.has_image_extension(Path::new("a.jpg")));
    }

    #[test]
    fn test_scan_nonexistent_path_counts_zero() {
        let scanner = DirectoryScanner::new(registry());
        let counts = scanner.scan(Path::new("/nonexistent/birdex/path")).unwrap();
        assert_eq!(counts, ScanCounts::default());
    }

    #[test]
    fn test_check_root_rejects_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.jpg");
        fs::write(&file, b"").unwrap();
        assert!(matches!(check_root(&file), Err(ScanError::NotADirectory(_))));
        assert!(matches!(
            check_root(&dir.path().join("missing")),
            Err(ScanError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_scan_recurses_and_filters() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("2024/march")).unwrap();
        fs::write(dir.path().join("House_Sparrow_001.jpg"), b"").unwrap();
        fs::write(dir.path().join("2024/march/house sparrow.NEF"), b"").unwrap();
        fs::write(dir.path().join("2024/unknown_bird.png"), b"").unwrap();
        fs::write(dir.path().join("2024/House_Sparrow_notes.txt"), b"").unwrap();

        let registry = registry();
        let scanner = DirectoryScanner::new(Arc::clone(&registry));
        let counts = scanner.scan(dir.path()).unwrap();

        assert_eq!(counts.scanned, 3);
        assert_eq!(counts.matched, 2);
        assert!(!counts.cancelled);
        assert_eq!(registry.photo_count(), 2);
        assert!(registry
            .photos()
            .iter()
            .all(|p| Path::new(&p.absolute_path).is_absolute()));
    }

    #[test]
    fn test_ignored_directories_are_skipped() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/House_Sparrow.jpg"), b"").unwrap();
        fs::write(dir.path().join("House_Sparrow.jpg"), b"").unwrap();

        let counts = DirectoryScanner::new(registry()).scan(dir.path()).unwrap();
        assert_eq!(counts.scanned, 1);
    }

    #[test]
    fn test_cancelled_scan_returns_partial_counts() {
        let dir = TempDir::new().unwrap();
        for i in 0..10 {
            fs::write(dir.path().join(format!("House_Sparrow_{}.jpg", i)), b"").unwrap();
        }
        let cancel = CancellationToken::new();
        cancel.cancel();

        let registry = registry();
        let counts = DirectoryScanner::new(Arc::clone(&registry))
            .with_cancellation(cancel)
            .scan(dir.path())
            .unwrap();
        assert!(counts.cancelled);
        assert_eq!(counts.scanned, 0);
        assert_eq!(registry.photo_count(), counts.matched);
    }

    #[test]
    fn test_catalog_swap_mid_walk_keeps_snapshot() {
        let dir = TempDir::new().unwrap();
        for i in 0..20 {
            fs::write(dir.path().join(format!("House_Sparrow_{}.jpg", i)), b"").unwrap();
        }

        let registry = registry();
        let swapper = Arc::clone(&registry);
        let counts = DirectoryScanner::new(Arc::clone(&registry))
            .with_progress_interval(1)
            .with_progress(Arc::new(move |scanned: usize, _matched: usize| {
                if scanned == 5 {
                    swapper
                        .load_catalog(vec![SpeciesRecord::new(
                            "Pelecaniformes",
                            "Ardeidae",
                            "Ardea cinerea",
                            "Grey Heron",
                        )])
                        .unwrap();
                }
            }))
            .scan(dir.path())
            .unwrap();

        assert_eq!(counts.scanned, 20);
        assert_eq!(counts.matched, 20);
        assert_eq!(registry.photo_count(), 20);
        assert!(!registry.catalog().contains("Passer domesticus"));
    }

    #[test]
    fn test_progress_reports_are_monotonic() {
        let dir = TempDir::new().unwrap();
        for d in 0..4 {
            let sub = dir.path().join(format!("d{}", d));
            fs::create_dir_all(&sub).unwrap();
            for i in 0..30 {
                fs::write(sub.join(format!("House_Sparrow_{}.jpg", i)), b"").unwrap();
            }
        }
        let roots: Vec<PathBuf> = (0..4).map(|d| dir.path().join(format!("d{}", d))).collect();

        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reports);
        let counts = DirectoryScanner::new(registry())
            .with_progress_interval(7)
            .with_workers(4)
            .with_progress(Arc::new(move |s: usize, m: usize| sink.lock().push((s, m))))
            .scan_all(&roots)
            .unwrap();

        assert_eq!(counts.scanned, 120);
        let reports = reports.lock();
        assert!(!reports.is_empty());
        assert!(reports.windows(2).all(|w| w[0].0 <= w[1].0 && w[0].1 <= w[1].1));
        assert_eq!(*reports.last().unwrap(), (120, 120));
    }
}
