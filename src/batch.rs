/*!
 * Batch processing of subtitle directories.
 *
 * A batch discovers `.ass` files, rewrites them one at a time in discovery
 * order, and writes each result under the same base name into a flat output
 * directory. Progress is reported as a finite stream of [`BatchEvent`]s.
 */

use log::{debug, warn};
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::app_config::{Config, FontMapping};
use crate::errors::BatchError;
use crate::file_utils::{FileManager, SubtitleText};
use crate::font_rewriter::FontRewriter;

/// Suffix of the files picked up by discovery
pub const SUBTITLE_SUFFIX: &str = ".ass";

/// Find the subtitle files to process under `root`
///
/// Fails with [`BatchError::NoInputSelected`] when the directory is missing or
/// contains no matching file, so nothing is created for an empty run.
pub fn discover_files(root: &Path, recursive: bool) -> Result<Vec<PathBuf>, BatchError> {
    if !FileManager::dir_exists(root) {
        return Err(BatchError::NoInputSelected { path: root.to_path_buf() });
    }

    let files = FileManager::find_files(root, SUBTITLE_SUFFIX, recursive)
        .map_err(|e| BatchError::Discovery {
            path: root.to_path_buf(),
            message: format!("{:#}", e),
        })?;

    if files.is_empty() {
        return Err(BatchError::NoInputSelected { path: root.to_path_buf() });
    }

    debug!("Discovered {} subtitle file(s) under {:?}", files.len(), root);
    Ok(files)
}

/// Output directory name used when none is chosen: `output_<YYYYMMDD_HHMMSS>`
pub fn default_output_dir() -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("output_{}", timestamp))
}

/// Integer completion percentage, truncated
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (completed.min(total) * 100 / total) as u8
}

/// Everything a batch run needs, captured once before it starts
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub input_files: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub mapping: FontMapping,
    pub default_font: String,
    pub remove_spacing: bool,
}

impl BatchJob {
    pub fn new(
        input_files: Vec<PathBuf>,
        output_dir: impl Into<PathBuf>,
        mapping: FontMapping,
        default_font: impl Into<String>,
        remove_spacing: bool,
    ) -> Self {
        Self {
            input_files,
            output_dir: output_dir.into(),
            mapping,
            default_font: default_font.into(),
            remove_spacing,
        }
    }

    /// Snapshot the mapping, default font and spacing flag from a config
    pub fn from_config(input_files: Vec<PathBuf>, output_dir: impl Into<PathBuf>, config: &Config) -> Self {
        Self::new(
            input_files,
            output_dir,
            config.fonts.clone(),
            config.default_font(),
            config.remove_font_spacing,
        )
    }
}

/// Observable progress of a batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    /// A file was rewritten and written out
    FileProcessed {
        /// Base name of the input file
        file_name: String,
        /// Where the rewritten file was written
        output_path: PathBuf,
    },
    /// Share of files completed so far (0-100)
    Progress {
        percent: u8,
    },
}

/// Result of a completed batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// Number of files rewritten
    pub processed: usize,
    pub output_dir: PathBuf,
    /// Output files in write order; repeats when base names collide
    pub outputs: Vec<PathBuf>,
    /// Number of writes that overwrote an earlier output of the same run
    pub collisions: usize,
}

/// Runs a [`BatchJob`] sequentially, one file at a time
pub struct BatchRunner {
    job: BatchJob,
    rewriter: FontRewriter,
    cancelled: Arc<AtomicBool>,
}

impl BatchRunner {
    pub fn new(job: BatchJob) -> Self {
        let rewriter = FontRewriter::new(&job.mapping, job.default_font.clone(), job.remove_spacing);
        Self {
            job,
            rewriter,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn job(&self) -> &BatchJob {
        &self.job
    }

    /// Flag that stops the run before the next file when set
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Process every file, reporting events to `on_event`
    ///
    /// Stops at the first read or write failure; outputs already written stay.
    /// A job without input files fails with [`BatchError::NoInputSelected`]
    /// carrying an empty path, since no directory was searched.
    pub fn run<F>(&self, mut on_event: F) -> Result<BatchSummary, BatchError>
    where
        F: FnMut(BatchEvent),
    {
        let job = &self.job;
        let total = job.input_files.len();

        if total == 0 {
            return Err(BatchError::NoInputSelected { path: PathBuf::new() });
        }

        self.prepare_output_dir()?;

        let mut summary = BatchSummary {
            processed: 0,
            output_dir: job.output_dir.clone(),
            outputs: Vec::with_capacity(total),
            collisions: 0,
        };
        let mut written: HashSet<OsString> = HashSet::new();

        for (index, input_file) in job.input_files.iter().enumerate() {
            if self.cancelled.load(Ordering::SeqCst) {
                return Err(BatchError::Cancelled { processed: summary.processed });
            }

            let output_path = self.process_file(input_file)?;

            let file_name = input_file.file_name().unwrap_or_default().to_os_string();
            if !written.insert(file_name.clone()) {
                warn!(
                    "{:?} overwrote an earlier output with the same name in {:?}",
                    input_file, job.output_dir
                );
                summary.collisions += 1;
            }

            summary.processed += 1;
            summary.outputs.push(output_path.clone());

            on_event(BatchEvent::FileProcessed {
                file_name: file_name.to_string_lossy().into_owned(),
                output_path,
            });
            on_event(BatchEvent::Progress {
                percent: progress_percent(index + 1, total),
            });
        }

        Ok(summary)
    }

    /// Run on a blocking worker thread, streaming events through a channel
    pub fn spawn(self) -> BatchHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancelled = self.cancel_handle();

        let task = tokio::task::spawn_blocking(move || {
            self.run(|event| {
                // The receiver may have been dropped; the run still completes
                let _ = tx.send(event);
            })
        });

        BatchHandle { events: rx, task, cancelled }
    }

    fn prepare_output_dir(&self) -> Result<(), BatchError> {
        let output_dir = &self.job.output_dir;

        // A directory that does not exist yet cannot hold any input
        if let Ok(canonical_output) = fs::canonicalize(output_dir) {
            for input_file in &self.job.input_files {
                let parent = match input_file.parent() {
                    Some(p) if !p.as_os_str().is_empty() => p,
                    _ => Path::new("."),
                };
                if fs::canonicalize(parent).is_ok_and(|p| p == canonical_output) {
                    return Err(BatchError::OutputOverlapsInput { path: output_dir.clone() });
                }
            }
        }

        let unwritable = |source: std::io::Error| BatchError::OutputDirUnwritable {
            path: output_dir.clone(),
            source,
        };
        FileManager::ensure_dir(output_dir).map_err(unwritable)?;

        // An existing directory may still refuse new files; removed on drop
        tempfile::NamedTempFile::new_in(output_dir).map_err(unwritable)?;
        Ok(())
    }

    fn process_file(&self, input_file: &Path) -> Result<PathBuf, BatchError> {
        let content = FileManager::read_subtitle(input_file).map_err(|source| BatchError::FileRead {
            path: input_file.to_path_buf(),
            source,
        })?;

        let rewritten = SubtitleText {
            text: self.rewriter.rewrite_text(&content.text),
            has_bom: content.has_bom,
        };

        let output_path = FileManager::generate_output_path(input_file, &self.job.output_dir);
        FileManager::write_subtitle(&output_path, &rewritten).map_err(|source| BatchError::FileWrite {
            path: output_path.clone(),
            source,
        })?;

        debug!("Rewrote {:?} -> {:?}", input_file, output_path);
        Ok(output_path)
    }
}

/// A batch running in the background
pub struct BatchHandle {
    events: mpsc::UnboundedReceiver<BatchEvent>,
    task: JoinHandle<Result<BatchSummary, BatchError>>,
    cancelled: Arc<AtomicBool>,
}

impl BatchHandle {
    /// Next event, or `None` once the run has finished or failed
    pub async fn next_event(&mut self) -> Option<BatchEvent> {
        self.events.recv().await
    }

    /// Ask the run to stop before its next file
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Wait for the run to end, draining any events not yet consumed
    pub async fn finish(mut self) -> anyhow::Result<Result<BatchSummary, BatchError>> {
        self.events.close();
        while self.events.recv().await.is_some() {}

        let result = self.task.await?;
        Ok(result)
    }
}
