use anyhow::{anyhow, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_util::sync::CancellationToken;

use crate::app_config::Config;
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::providers::ollama::{ModelInfo, Ollama};
use crate::translation::{
    BatchSettings, BatchTranslator, BlockStatus, JobResult, JobState, JobStatus, ProgressEvent, TranslationJob,
    TranslationOptions, TranslationService,
};

/// Main application controller for subtitle translation
pub struct Controller {
    /// Application configuration
    config: Config,
    /// Cancels every job started by this controller
    cancel: CancellationToken,
}

/// Totals over a finished batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: usize,
    pub partial: usize,
    pub skipped: usize,
    pub cancelled: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn from_results(results: &[JobResult]) -> Self {
        let mut report = Self::default();
        for result in results {
            match result.status {
                JobStatus::Success => report.succeeded += 1,
                JobStatus::Partial => report.partial += 1,
                JobStatus::Skipped(_) => report.skipped += 1,
                JobStatus::Cancelled => report.cancelled += 1,
                JobStatus::Failed(_) => report.failed += 1,
            }
        }
        report
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl std::fmt::Display for BatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} translated, {} partial, {} skipped, {} cancelled, {} failed",
            self.succeeded, self.partial, self.skipped, self.cancelled, self.failed
        )
    }
}

fn block_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} blocks ({percent}%) {msg}")
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░")
}

fn file_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.green/white}] {pos}/{len} files {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░")
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Draw progress bars from job events until every sender is gone
async fn render_progress(mut events: UnboundedReceiver<ProgressEvent>, multi_progress: MultiProgress, total_files: usize) {
    let files = (total_files > 1).then(|| {
        let bar = multi_progress.add(ProgressBar::new(total_files as u64));
        bar.set_style(file_bar_style());
        bar
    });
    let mut bars: HashMap<PathBuf, ProgressBar> = HashMap::new();

    while let Some(event) = events.recv().await {
        match event {
            ProgressEvent::JobStarted { source } => {
                let bar = multi_progress.add(ProgressBar::new(0));
                bar.set_style(block_bar_style());
                bar.set_message(file_label(&source));
                bar.enable_steady_tick(Duration::from_millis(120));
                bars.insert(source, bar);
            }
            ProgressEvent::StateChanged { source, state: JobState::Translating { total, .. } } => {
                if let Some(bar) = bars.get(&source) {
                    bar.set_length(total as u64);
                }
            }
            ProgressEvent::StateChanged { .. } => {}
            ProgressEvent::BlockFinished { source, block, status, .. } => {
                if let Some(bar) = bars.get(&source) {
                    bar.set_position(block as u64);
                    if let BlockStatus::Failed(_) = status {
                        bar.set_message(format!("{} (block {} kept in source language)", file_label(&source), block));
                    }
                }
            }
            ProgressEvent::JobFinished { source, .. } => {
                if let Some(bar) = bars.remove(&source) {
                    bar.finish_and_clear();
                }
                if let Some(files) = &files {
                    files.inc(1);
                }
            }
        }
    }

    if let Some(files) = files {
        files.finish_and_clear();
    }
}

impl Controller {
    /// Create a controller for a validated configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token that stops the running batch at the next block boundary
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Expand files and folders into one job per subtitle file
    pub fn build_jobs(&self, inputs: &[PathBuf]) -> Result<Vec<TranslationJob>> {
        let options = TranslationOptions::from_config(&self.config);
        let files = FileManager::collect_inputs(inputs)?;
        Ok(files
            .into_iter()
            .map(|file| TranslationJob::new(file, options.clone()))
            .collect())
    }

    /// Translate every subtitle file under `inputs` against the configured Ollama server
    pub async fn run(&self, inputs: &[PathBuf], multi_progress: &MultiProgress) -> Result<Vec<JobResult>> {
        let jobs = self.build_jobs(inputs)?;
        if jobs.is_empty() {
            warn!("No subtitle files found");
            return Ok(Vec::new());
        }

        let service = TranslationService::from_config(&self.config)?;
        if let Err(e) = service.test_connection().await {
            warn!("Could not reach {}: {}", self.config.endpoint, e);
        }

        Ok(self.run_jobs(service, jobs, multi_progress).await)
    }

    /// Run prepared jobs on a given service, drawing progress as they go
    pub async fn run_jobs(&self, service: TranslationService, jobs: Vec<TranslationJob>, multi_progress: &MultiProgress) -> Vec<JobResult> {
        info!(
            "Translating {} file(s) into {} with {}",
            jobs.len(),
            language_utils::display_name(&self.config.target_language),
            self.config.model
        );

        let (events, receiver) = mpsc::unbounded_channel();
        let renderer = tokio::spawn(render_progress(receiver, multi_progress.clone(), jobs.len()));

        let translator = BatchTranslator::new(service, BatchSettings::from_config(&self.config))
            .with_progress(events)
            .with_cancellation(self.cancel.clone());
        let results = translator.run_batch(&jobs).await;

        // Dropping the translator closes the event channel
        drop(translator);
        if let Err(e) = renderer.await {
            error!("Progress display stopped unexpectedly: {}", e);
        }

        results
    }

    /// Models installed on the configured server
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let client = Ollama::new_with_config(&self.config.endpoint, Duration::from_secs(self.config.timeout_secs))?;
        client
            .list_models()
            .await
            .map_err(|e| anyhow!("Failed to list models at {}: {}", self.config.endpoint, e))
    }

    /// Log one line per file plus the batch totals
    pub fn report(&self, results: &[JobResult]) -> BatchReport {
        for result in results {
            let label = file_label(&result.source);
            match &result.status {
                JobStatus::Success => info!("{} -> {}: {}", label, file_label(&result.output), result.summary()),
                JobStatus::Partial | JobStatus::Cancelled => {
                    warn!("{} -> {}: {}", label, file_label(&result.output), result.summary())
                }
                JobStatus::Skipped(_) => info!("{}: {}", label, result.summary()),
                JobStatus::Failed(_) => error!("{}: {}", label, result.summary()),
            }
        }

        let report = BatchReport::from_results(results);
        info!("Done: {}", report);
        report
    }
}
