/*!
 * Translation service for subtitle translation using a local LLM.
 *
 * This module contains the core functionality for translating subtitles.
 * It is split into several submodules:
 *
 * - `placeholders`: Masking of inline markup before it reaches the model
 * - `prompts`: System instructions and translation styles
 * - `retry`: Bounded retry policy with pluggable waiting
 * - `core`: The per-block translation client
 * - `batch`: Jobs, progress events and the batch orchestrator
 */

// Re-export main types for easier usage
pub use self::batch::{
    BatchSettings, BatchTranslator, BlockStatus, JobResult, JobState, JobStatus, ProgressEvent, TranslationJob,
};
pub use self::core::{TranslationOptions, TranslationService};
pub use self::placeholders::{protect, restore, PlaceholderMap, ProtectedText, RestoredText};
pub use self::prompts::{build_system_prompt, TranslationStyle};
pub use self::retry::{InstantSleeper, RetryPolicy, Sleeper, TokioSleeper};

// Submodules
pub mod batch;
pub mod core;
pub mod placeholders;
pub mod prompts;
pub mod retry;
