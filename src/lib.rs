/*!
 * # srt-translator - Subtitle translation with a local LLM
 *
 * A Rust library for translating SRT subtitle files through an Ollama server.
 *
 * ## Features
 *
 * - Parse and write SRT files, keeping cue timing byte-for-byte
 * - Protect inline markup (`<i>`, `<b>`, `<u>`) while the model translates
 * - Retry transient model failures with exponential backoff
 * - Translate whole folders, several files at a time, with progress events
 * - Cancel cleanly, keeping whatever was already translated
 * - Named profiles for model, language, style and custom prompt
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration and profile management
 * - `subtitle_processor`: SRT parsing and serialization
 * - `translation`: Translation of subtitle text:
 *   - `translation::placeholders`: Markup masking and restoration
 *   - `translation::prompts`: System instructions and styles
 *   - `translation::retry`: Retry policy
 *   - `translation::core`: Per-block translation client
 *   - `translation::batch`: Job orchestration
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller and progress display
 * - `language_utils`: ISO language code utilities
 * - `providers`: Model service clients:
 *   - `providers::ollama`: Ollama API client
 *   - `providers::mock`: Scriptable provider for tests
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod subtitle_processor;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::{Config, Profile, ProfileStore};
pub use app_controller::{BatchReport, Controller};
pub use errors::{JobError, ProviderError, SubtitleError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match};
pub use subtitle_processor::{parse_srt, serialize_srt, LineEnding, SubtitleBlock, Timecode};
pub use translation::{
    BatchSettings, BatchTranslator, JobResult, JobStatus, ProgressEvent, TranslationJob, TranslationOptions,
    TranslationService, TranslationStyle,
};
