/*!
 * Batch translation processing.
 *
 * This module runs translation jobs: one job per subtitle file, each moving
 * through `Pending -> Parsing -> Translating -> Writing -> Done`, or ending in
 * `Errored`. Blocks inside a job are translated in file order; several jobs
 * can run at once. Progress is reported as `ProgressEvent`s over an unbounded
 * channel, and a `CancellationToken` stops work at the next block boundary.
 *
 * A block that fails keeps its source text and the job carries on. A job that
 * fails never affects its siblings.
 */

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::app_config::Config;
use crate::errors::{JobError, TranslationError};
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::subtitle_processor::{parse_srt, serialize_srt, LineEnding};

use super::core::{TranslationOptions, TranslationService};
use super::placeholders::{self, RestoredText};

/// Settings shared by every job of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSettings {
    /// Files translated at the same time
    pub concurrent_jobs: usize,
    /// Line terminator of written files
    pub line_ending: LineEnding,
    /// Replace existing output files instead of skipping
    pub force_overwrite: bool,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            concurrent_jobs: 1,
            line_ending: LineEnding::Lf,
            force_overwrite: false,
        }
    }
}

impl BatchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            concurrent_jobs: config.concurrent_jobs,
            line_ending: config.line_ending,
            force_overwrite: config.force_overwrite,
        }
    }
}

/// One file to translate
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationJob {
    /// Subtitle file to read
    pub source: PathBuf,
    /// Where the translation is written
    pub output: PathBuf,
    /// Language, tone and model for this file
    pub options: TranslationOptions,
}

impl TranslationJob {
    /// Create a job writing next to the source, named after the target language
    pub fn new(source: impl Into<PathBuf>, options: TranslationOptions) -> Self {
        let source = source.into();
        let output = FileManager::generate_output_path(&source, &options.target_language);
        Self { source, output, options }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }
}

/// Lifecycle of a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Parsing,
    /// `current` is the 1-based block being worked on
    Translating { current: usize, total: usize },
    Writing,
    Done,
    Errored,
}

/// How a single block came out
#[derive(Debug, Clone, PartialEq)]
pub enum BlockStatus {
    Translated,
    /// Translated, but some markup could not be put back
    Degraded { missing: Vec<String> },
    /// Kept in the source language
    Failed(TranslationError),
    /// Nothing to translate
    Blank,
}

/// How a job ended
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// Every block translated cleanly
    Success,
    /// Written, but some blocks failed or lost markup
    Partial,
    /// Stopped early; partial output is written when any block was done
    Cancelled,
    /// Nothing to do
    Skipped(String),
    Failed(JobError),
}

impl JobStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Events emitted while jobs run
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    JobStarted { source: PathBuf },
    StateChanged { source: PathBuf, state: JobState },
    BlockFinished { source: PathBuf, block: usize, total: usize, status: BlockStatus },
    JobFinished { source: PathBuf, status: JobStatus },
}

/// Outcome of one job
#[derive(Debug, Clone, PartialEq)]
pub struct JobResult {
    pub source: PathBuf,
    pub output: PathBuf,
    pub status: JobStatus,
    /// Whether the output file was written
    pub written: bool,
    pub total_blocks: usize,
    pub translated_blocks: usize,
    pub blank_blocks: usize,
    /// 1-based numbers of blocks whose markup was dropped
    pub degraded_blocks: Vec<usize>,
    /// Per-block errors, in file order
    pub failures: Vec<TranslationError>,
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

impl JobResult {
    fn new(job: &TranslationJob) -> Self {
        Self {
            source: job.source.clone(),
            output: job.output.clone(),
            status: JobStatus::Success,
            written: false,
            total_blocks: 0,
            translated_blocks: 0,
            blank_blocks: 0,
            degraded_blocks: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// 1-based numbers of blocks that kept their source text
    pub fn failed_blocks(&self) -> Vec<usize> {
        self.failures
            .iter()
            .filter_map(|failure| match failure {
                TranslationError::TranslationFailed { block, .. } => Some(*block),
                _ => None,
            })
            .collect()
    }

    /// Blocks that got an answer from the model, degraded or not
    pub fn completed_blocks(&self) -> usize {
        self.translated_blocks + self.degraded_blocks.len()
    }

    /// One-line, human-readable outcome
    pub fn summary(&self) -> String {
        let mut details = Vec::new();
        if !self.failures.is_empty() {
            details.push(format!("{} failed", plural(self.failures.len(), "block")));
        }
        if !self.degraded_blocks.is_empty() {
            details.push(format!("{} lost formatting", plural(self.degraded_blocks.len(), "block")));
        }
        let details = if details.is_empty() { String::new() } else { format!(", {}", details.join(", ")) };

        match &self.status {
            JobStatus::Success => format!("{} translated", plural(self.total_blocks, "block")),
            JobStatus::Partial => format!(
                "{} of {} translated{}",
                self.completed_blocks(),
                plural(self.total_blocks, "block"),
                details
            ),
            JobStatus::Cancelled => format!(
                "cancelled after {} of {}{}",
                self.completed_blocks(),
                plural(self.total_blocks, "block"),
                details
            ),
            JobStatus::Skipped(reason) => format!("skipped: {}", reason),
            JobStatus::Failed(error) => format!("failed: {}", error),
        }
    }
}

/// Book-keeping for one running job
struct JobRun<'a> {
    source: &'a Path,
    events: Option<&'a UnboundedSender<ProgressEvent>>,
    state: JobState,
    result: JobResult,
}

impl<'a> JobRun<'a> {
    fn new(job: &'a TranslationJob, events: Option<&'a UnboundedSender<ProgressEvent>>) -> Self {
        let run = Self {
            source: &job.source,
            events,
            state: JobState::Pending,
            result: JobResult::new(job),
        };
        run.emit(ProgressEvent::JobStarted { source: job.source.clone() });
        run
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(events) = self.events {
            // A closed receiver only means nobody is watching
            let _ = events.send(event);
        }
    }

    fn set_state(&mut self, state: JobState) {
        debug!("{}: {:?} -> {:?}", self.source.display(), self.state, state);
        self.state = state.clone();
        self.emit(ProgressEvent::StateChanged { source: self.source.to_path_buf(), state });
    }

    fn record(&mut self, block: usize, status: BlockStatus) {
        match &status {
            BlockStatus::Translated => self.result.translated_blocks += 1,
            BlockStatus::Degraded { .. } => self.result.degraded_blocks.push(block),
            BlockStatus::Failed(error) => self.result.failures.push(error.clone()),
            BlockStatus::Blank => self.result.blank_blocks += 1,
        }
        self.emit(ProgressEvent::BlockFinished {
            source: self.source.to_path_buf(),
            block,
            total: self.result.total_blocks,
            status,
        });
    }

    fn finish(mut self, status: JobStatus) -> JobResult {
        let terminal = if status.is_failure() { JobState::Errored } else { JobState::Done };
        self.set_state(terminal);
        self.result.status = status;

        match &self.result.status {
            JobStatus::Failed(_) => warn!("{}: {}", self.source.display(), self.result.summary()),
            _ => info!("{}: {}", self.source.display(), self.result.summary()),
        }

        self.emit(ProgressEvent::JobFinished {
            source: self.source.to_path_buf(),
            status: self.result.status.clone(),
        });
        self.result
    }
}

/// Batch translator running jobs over a translation service
pub struct BatchTranslator {
    /// The translation service to use
    service: TranslationService,
    settings: BatchSettings,
    events: Option<UnboundedSender<ProgressEvent>>,
    cancel: CancellationToken,
}

impl BatchTranslator {
    pub fn new(service: TranslationService, settings: BatchSettings) -> Self {
        Self {
            service,
            settings,
            events: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Send progress events to this channel
    pub fn with_progress(mut self, events: UnboundedSender<ProgressEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Stop when this token is cancelled
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels this translator's jobs
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn skip_reason(&self, job: &TranslationJob) -> Option<String> {
        let target = &job.options.target_language;
        let in_target = FileManager::language_segment(&job.source)
            .is_some_and(|segment| language_utils::language_codes_match(&segment, target));
        if in_target || job.output == job.source {
            return Some(format!("already in target language {}", target));
        }
        if !self.settings.force_overwrite && FileManager::file_exists(&job.output) {
            return Some(format!("{} already exists", job.output.display()));
        }
        None
    }

    /// Mask markup, translate, then put the markup back
    async fn translate_block(&self, block: usize, text: &str, options: &TranslationOptions) -> Result<RestoredText, TranslationError> {
        let protected = placeholders::protect(text);
        let answer = self.service.translate_masked(block, &protected, options).await?;
        Ok(placeholders::restore(&answer, &protected.map))
    }

    /// Translate one file.
    ///
    /// Never panics or returns early with an error: every failure ends up in
    /// the returned result's status.
    pub async fn run_job(&self, job: &TranslationJob) -> JobResult {
        let mut run = JobRun::new(job, self.events.as_ref());

        if self.cancel.is_cancelled() {
            return run.finish(JobStatus::Cancelled);
        }
        if let Some(reason) = self.skip_reason(job) {
            return run.finish(JobStatus::Skipped(reason));
        }

        run.set_state(JobState::Parsing);
        let content = match FileManager::read_to_string(&job.source) {
            Ok(content) => content,
            Err(e) => {
                let error = JobError::Read { path: job.source.clone(), message: e.to_string() };
                return run.finish(JobStatus::Failed(error));
            }
        };
        let mut blocks = match parse_srt(&content) {
            Ok(blocks) => blocks,
            Err(e) => return run.finish(JobStatus::Failed(e.into())),
        };
        if blocks.is_empty() {
            return run.finish(JobStatus::Skipped("no subtitle blocks".to_string()));
        }

        let total = blocks.len();
        run.result.total_blocks = total;
        let mut cancelled = false;
        let mut attempted = false;

        for (position, block) in blocks.iter_mut().enumerate() {
            let number = position + 1;
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            run.set_state(JobState::Translating { current: number, total });

            if block.is_blank() {
                run.record(number, BlockStatus::Blank);
                continue;
            }

            // Cancellation is honoured between blocks; an in-flight request always completes
            let status = match self.translate_block(number, &block.text, &job.options).await {
                Ok(restored) => {
                    block.text = restored.text;
                    if restored.degraded {
                        warn!(
                            "{}: block {} lost formatting ({})",
                            job.source.display(),
                            number,
                            restored.missing.join(", ")
                        );
                        BlockStatus::Degraded { missing: restored.missing }
                    } else {
                        BlockStatus::Translated
                    }
                }
                Err(error) => {
                    let cause = error.provider_error();
                    if !attempted && cause.is_unreachable() {
                        let error = TranslationError::ServiceUnavailable(cause.clone());
                        return run.finish(JobStatus::Failed(error.into()));
                    }
                    warn!("{}: {}; keeping source text", job.source.display(), error);
                    BlockStatus::Failed(error)
                }
            };
            attempted = true;
            run.record(number, status);
        }

        if cancelled && run.result.completed_blocks() == 0 {
            return run.finish(JobStatus::Cancelled);
        }

        run.set_state(JobState::Writing);
        let output = serialize_srt(&blocks, self.settings.line_ending);
        if let Err(e) = FileManager::write_atomic(&job.output, &output) {
            let error = JobError::Write { path: job.output.clone(), message: e.to_string() };
            return run.finish(JobStatus::Failed(error));
        }
        run.result.written = true;

        let status = if cancelled {
            JobStatus::Cancelled
        } else if run.result.failures.is_empty() && run.result.degraded_blocks.is_empty() {
            JobStatus::Success
        } else {
            JobStatus::Partial
        };
        run.finish(status)
    }

    /// Translate several files, at most `concurrent_jobs` at a time.
    ///
    /// Results come back in the order of `jobs`, whatever order they finish in.
    /// When two jobs would write the same output file, only the first runs.
    pub async fn run_batch(&self, jobs: &[TranslationJob]) -> Vec<JobResult> {
        let concurrency = self.settings.concurrent_jobs.max(1);
        info!("Translating {} with up to {} at a time", plural(jobs.len(), "file"), concurrency);

        let mut claimed = HashSet::new();
        let duplicates: Vec<bool> = jobs.iter().map(|job| !claimed.insert(job.output.clone())).collect();

        let mut results: Vec<(usize, JobResult)> = stream::iter(jobs.iter().zip(duplicates).enumerate())
            .map(|(index, (job, duplicate))| async move {
                let result = if duplicate {
                    let run = JobRun::new(job, self.events.as_ref());
                    run.finish(JobStatus::Skipped(format!(
                        "another file in this batch also writes {}",
                        job.output.display()
                    )))
                } else {
                    self.run_job(job).await
                };
                (index, result)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }
}
