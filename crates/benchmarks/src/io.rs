//! I/O operations for benchmark runs.
//!
//! This module persists [`BenchmarkRun`] records as one pretty-printed JSON
//! file per run and writes CLI output files. Storage is a plain blob store:
//! whatever is written is read back unchanged.

use crate::markdown;
use medbench_core::BenchmarkRun;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

/// Default output directory used by the CLI.
pub const OUTPUT_DIR: &str = "benchmarks/output";

/// Summary file name inside an output directory.
pub const SUMMARY_FILE: &str = "summary.md";

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No run with this id
    #[error("Benchmark run not found: {0}")]
    NotFound(String),

    /// Run exists but has no such (model, question) result
    #[error("No result for model '{model}' and question '{question_id}'")]
    ResultNotFound {
        /// Model identifier
        model: String,
        /// Question identifier
        question_id: String,
    },

    /// Rating outside 1..=5
    #[error("Invalid rating {0}: expected a value between 1 and 5")]
    InvalidRating(u8),

    /// Run id cannot be used as a file name
    #[error("Invalid run id: {0}")]
    InvalidId(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Durable storage of benchmark runs.
pub trait ResultStore: Send + Sync {
    /// Persist a run, replacing any run with the same id.
    fn save(&self, run: &BenchmarkRun) -> Result<()>;

    /// Load one run.
    fn load(&self, id: &str) -> Result<BenchmarkRun>;

    /// All runs, newest first.
    fn list(&self) -> Result<Vec<BenchmarkRun>>;

    /// Delete one run.
    fn delete(&self, id: &str) -> Result<()>;

    /// Delete every run and return how many were removed.
    fn delete_all(&self) -> Result<usize>;

    /// Attach a reviewer rating and comment to one result.
    fn rate(
        &self,
        run_id: &str,
        model: &str,
        question_id: &str,
        rating: u8,
        comment: Option<String>,
    ) -> Result<BenchmarkRun>;
}

/// Validate a reviewer rating.
pub fn validate_rating(rating: u8) -> Result<()> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(StoreError::InvalidRating(rating))
    }
}

/// File-per-run JSON store.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles such as ratings.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open a store rooted at `dir`, creating it if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self, run: &BenchmarkRun) -> Result<()> {
        let path = self.path_for(&run.id)?;
        write_run_json(run, &path)?;
        debug!(run_id = %run.id, path = %path.display(), "Benchmark run saved");
        Ok(())
    }

    fn json_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                files.push(path);
            }
        }
        Ok(files)
    }
}

impl ResultStore for JsonFileStore {
    fn save(&self, run: &BenchmarkRun) -> Result<()> {
        let _guard = self.lock();
        self.write(run)
    }

    fn load(&self, id: &str) -> Result<BenchmarkRun> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        read_run_json(path)
    }

    fn list(&self) -> Result<Vec<BenchmarkRun>> {
        let mut runs = Vec::new();
        for path in self.json_files()? {
            match read_run_json(&path) {
                Ok(run) => runs.push(run),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable run file"),
            }
        }
        runs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(runs)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let path = self.path_for(id)?;
        let _guard = self.lock();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn delete_all(&self) -> Result<usize> {
        let _guard = self.lock();
        let files = self.json_files()?;
        let count = files.len();
        for path in files {
            fs::remove_file(path)?;
        }
        Ok(count)
    }

    fn rate(
        &self,
        run_id: &str,
        model: &str,
        question_id: &str,
        rating: u8,
        comment: Option<String>,
    ) -> Result<BenchmarkRun> {
        validate_rating(rating)?;
        let _guard = self.lock();

        let mut run = self.load(run_id)?;
        let result = run
            .result_mut(model, question_id)
            .ok_or_else(|| StoreError::ResultNotFound {
                model: model.to_string(),
                question_id: question_id.to_string(),
            })?;
        result.user_rating = Some(rating);
        result.user_comment = comment.filter(|c| !c.trim().is_empty());

        self.write(&run)?;
        Ok(run)
    }
}

/// Write one run to a JSON file.
///
/// The content goes to a sibling `.tmp` file first and is renamed over
/// `path`, so readers see either the previous run or the new one.
pub fn write_run_json(run: &BenchmarkRun, path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(run)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        e
    })
}

/// Read one run from a JSON file.
pub fn read_run_json(path: impl AsRef<Path>) -> Result<BenchmarkRun> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Which files [`write_outputs`] produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `<id>.json` only
    Json,
    /// `<id>.md` and `summary.md` only
    Markdown,
    /// Both
    Both,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            "both" => Ok(Self::Both),
            other => Err(format!("unknown output format: {}", other)),
        }
    }
}

/// Write a run's output files into `dir` and return the written paths.
pub fn write_outputs(run: &BenchmarkRun, dir: impl AsRef<Path>, format: OutputFormat) -> io::Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    if matches!(format, OutputFormat::Json | OutputFormat::Both) {
        let path = dir.join(format!("{}.json", run.id));
        write_run_json(run, &path)?;
        written.push(path);
    }

    if matches!(format, OutputFormat::Markdown | OutputFormat::Both) {
        let path = dir.join(format!("{}.md", run.id));
        fs::write(&path, markdown::generate_run_report(run))?;
        written.push(path);

        let summary = dir.join(SUMMARY_FILE);
        fs::write(&summary, markdown::generate_summary(std::slice::from_ref(run)))?;
        written.push(summary);
    }

    Ok(written)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use medbench_core::{ModelRunSummary, OrderedMap, RunSummary, TestResult};

    pub(crate) fn sample_run(id: &str, minutes_ago: i64) -> BenchmarkRun {
        let mut questions = OrderedMap::new();
        questions.insert("q1", TestResult::success("answer", 100, 10));
        questions.insert("q2", TestResult::failure("HTTP 500: boom", 40));
        let mut results = OrderedMap::new();
        results.insert("m1", ModelRunSummary::from_results(questions));
        let summary = RunSummary::from_models(&results, 150);

        BenchmarkRun {
            id: id.to_string(),
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
            models_tested: 1,
            questions_tested: 2,
            results,
            summary,
            dropped_question_ids: Vec::new(),
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let run = sample_run("run_1", 0);

        store.save(&run).unwrap();
        assert_eq!(store.load("run_1").unwrap(), run);
    }

    #[test]
    fn test_overwrite_replaces_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.save(&sample_run("run_1", 5)).unwrap();
        // Leftover from an interrupted write.
        fs::write(dir.path().join("stale.json.tmp"), "{").unwrap();

        let rated = store.rate("run_1", "m1", "q1", 4, None).unwrap();

        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["run_1.json", "stale.json.tmp"]);
        assert_eq!(store.load("run_1").unwrap(), rated);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_list_newest_first_and_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.save(&sample_run("old", 60)).unwrap();
        store.save(&sample_run("new", 1)).unwrap();
        fs::write(dir.path().join("broken.json"), "{").unwrap();

        let ids: Vec<_> = store.list().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[test]
    fn test_delete_and_delete_all() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.save(&sample_run("a", 0)).unwrap();
        store.save(&sample_run("b", 0)).unwrap();

        store.delete("a").unwrap();
        assert!(matches!(store.load("a"), Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete("a"), Err(StoreError::NotFound(_))));

        assert_eq!(store.delete_all().unwrap(), 1);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(matches!(store.load("../etc/passwd"), Err(StoreError::InvalidId(_))));
        assert!(matches!(store.delete(""), Err(StoreError::InvalidId(_))));
    }

    #[test]
    fn test_rate_persists_rating_and_comment() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.save(&sample_run("run_1", 0)).unwrap();

        store
            .rate("run_1", "m1", "q1", 4, Some("Clinically sound".to_string()))
            .unwrap();

        let reloaded = store.load("run_1").unwrap();
        let result = reloaded.result("m1", "q1").unwrap();
        assert_eq!(result.user_rating, Some(4));
        assert_eq!(result.user_comment.as_deref(), Some("Clinically sound"));
        assert_eq!(reloaded.result("m1", "q2").unwrap().user_rating, None);
    }

    #[test]
    fn test_rate_validation() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.save(&sample_run("run_1", 0)).unwrap();

        assert!(matches!(store.rate("run_1", "m1", "q1", 0, None), Err(StoreError::InvalidRating(0))));
        assert!(matches!(store.rate("run_1", "m1", "q1", 6, None), Err(StoreError::InvalidRating(6))));
        assert!(matches!(
            store.rate("run_1", "m9", "q1", 3, None),
            Err(StoreError::ResultNotFound { .. })
        ));
        assert!(matches!(store.rate("missing", "m1", "q1", 3, None), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_write_outputs_both() {
        let dir = tempfile::tempdir().unwrap();
        let run = sample_run("run_1", 0);

        let written = write_outputs(&run, dir.path(), OutputFormat::Both).unwrap();
        assert_eq!(written.len(), 3);
        assert_eq!(read_run_json(dir.path().join("run_1.json")).unwrap(), run);
        assert!(dir.path().join(SUMMARY_FILE).exists());
    }
}
