/*!
 * Common test utilities for the srt-translator test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use srt_translator::providers::Provider;
use srt_translator::translation::{
    BatchSettings, BatchTranslator, InstantSleeper, RetryPolicy, TranslationJob, TranslationOptions,
    TranslationService,
};

/// Three plain cues
pub const SIMPLE_SRT: &str = "1
00:00:01,000 --> 00:00:04,000
This is a test subtitle.

2
00:00:05,000 --> 00:00:09,000
It contains multiple entries.

3
00:00:10,000 --> 00:00:14,000
For testing purposes.
";

/// Cues with markup, a multi-line cue and position settings
pub const STYLED_SRT: &str = "1
00:00:01,000 --> 00:00:03,500 X1:40 X2:600 Y1:20 Y2:50
<i>Where are you going?</i>

2
00:00:04,000 --> 00:00:06,000
I told you, <b>never</b>
come back here.

3
00:00:06,500 --> 00:00:08,000
<I>Fine.</I> <u>Goodbye</u>.
";

/// Send test logs through env_logger; safe to call from every test
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// An SRT file with `count` numbered cues
pub fn numbered_srt(count: usize) -> String {
    (1..=count)
        .map(|i| format!("{}\n00:00:{:02},000 --> 00:00:{:02},500\nLine number {}\n", i, i, i, i))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Translation service over any provider, retrying without real waiting
pub fn service(provider: Arc<dyn Provider>, attempts: u32) -> TranslationService {
    TranslationService::new(provider, RetryPolicy::new(attempts, std::time::Duration::from_millis(10), 2.0))
        .with_sleeper(Arc::new(InstantSleeper))
}

/// Batch translator with default settings over any provider
pub fn translator(provider: Arc<dyn Provider>) -> BatchTranslator {
    BatchTranslator::new(service(provider, 3), BatchSettings::default())
}

/// Job translating into Swedish with a dummy model
pub fn swedish_job(source: &Path) -> TranslationJob {
    TranslationJob::new(source, TranslationOptions::new("sv", "mock-model"))
}
