use anyhow::{Result, Context};
use log::{info, warn};
use std::path::PathBuf;
use indicatif::{ProgressBar, ProgressStyle};
use crate::app_config::Config;
use crate::batch::{self, BatchEvent, BatchJob, BatchRunner, BatchSummary};

// @module: Application controller for batch font replacement

/// Main application controller for rewriting subtitle directories
pub struct Controller {
    // @field: Config snapshot taken before the run
    config: Config,
}

impl Controller {
    /// Create a new controller for test purposes with default configuration
    pub fn new_for_test() -> Result<Self> {
        Self::with_config(Config::default())
    }

    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Rewrite every subtitle under `input_dir` into `output_dir`
    ///
    /// Without an output directory a timestamped `output_<YYYYMMDD_HHMMSS>` is used.
    pub async fn run(&self, input_dir: PathBuf, recursive: bool, output_dir: Option<PathBuf>) -> Result<BatchSummary> {
        let start_time = std::time::Instant::now();

        // Fails before any output directory is created
        let files = batch::discover_files(&input_dir, recursive)?;

        let output_dir = output_dir.unwrap_or_else(batch::default_output_dir);
        info!(
            "Rewriting {} file(s) from {:?} into {:?} (default font: {}, spacing removal: {})",
            files.len(),
            input_dir,
            output_dir,
            self.config.default_font(),
            if self.config.remove_font_spacing { "on" } else { "off" }
        );

        let job = BatchJob::from_config(files, output_dir, &self.config);
        let summary = self.run_job(job).await?;

        info!(
            "Processing completed: {} file(s) written to {:?} in {}",
            summary.processed,
            summary.output_dir,
            Self::format_duration(start_time.elapsed())
        );
        if summary.collisions > 0 {
            warn!(
                "{} output file(s) were overwritten by files with the same name from other directories",
                summary.collisions
            );
        }

        Ok(summary)
    }

    /// Run a prepared job in the background and follow it with a progress bar
    async fn run_job(&self, job: BatchJob) -> Result<BatchSummary> {
        let progress_bar = Self::create_progress_bar();
        let mut handle = BatchRunner::new(job).spawn();

        while let Some(event) = handle.next_event().await {
            match event {
                BatchEvent::FileProcessed { file_name, .. } => {
                    progress_bar.suspend(|| info!("Processed {}", file_name));
                    progress_bar.set_message(file_name);
                }
                BatchEvent::Progress { percent } => {
                    progress_bar.set_position(u64::from(percent));
                }
            }
        }

        match handle.finish().await? {
            Ok(summary) => {
                progress_bar.finish_with_message("done");
                Ok(summary)
            }
            Err(e) => {
                progress_bar.abandon_with_message("failed");
                Err(e.into())
            }
        }
    }

    fn create_progress_bar() -> ProgressBar {
        let progress_bar = ProgressBar::new(100);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}% {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar
    }

    /// Format a duration as `1m 05s` or `3.2s`
    pub fn format_duration(duration: std::time::Duration) -> String {
        let secs = duration.as_secs();
        if secs >= 60 {
            format!("{}m {:02}s", secs / 60, secs % 60)
        } else {
            format!("{:.1}s", duration.as_secs_f64())
        }
    }
}
