/*!
 * End-to-end tests: read a subtitle file, translate it, write the result
 */

use std::fs;
use std::sync::Arc;
use anyhow::Result;

use srt_translator::errors::{JobError, SubtitleError};
use srt_translator::providers::mock::MockProvider;
use srt_translator::subtitle_processor::{parse_srt, LineEnding};
use srt_translator::translation::{BatchSettings, BatchTranslator, JobStatus, TranslationJob, TranslationOptions};
use crate::common;

/// Markup, cue settings and line breaks all survive a translation
#[tokio::test]
async fn test_runJob_withStyledFile_shouldKeepMarkupAndTiming() -> Result<()> {
    common::init_logger();
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(temp_dir.path(), "episode.en.srt", common::STYLED_SRT)?;

    let result = common::translator(Arc::new(MockProvider::working()))
        .run_job(&common::swedish_job(&source))
        .await;

    assert_eq!(result.status, JobStatus::Success);
    assert_eq!(result.output, temp_dir.path().join("episode.sv.srt"));
    assert_eq!(
        fs::read_to_string(&result.output)?,
        "1\n00:00:01,000 --> 00:00:03,500 X1:40 X2:600 Y1:20 Y2:50\n[TRANSLATED] <i>Where are you going?</i>\n\n\
2\n00:00:04,000 --> 00:00:06,000\n[TRANSLATED] I told you, <b>never</b>\ncome back here.\n\n\
3\n00:00:06,500 --> 00:00:08,000\n[TRANSLATED] <I>Fine.</I> <u>Goodbye</u>.\n"
    );
    Ok(())
}

/// The model only ever sees placeholders, never raw tags
#[tokio::test]
async fn test_runJob_shouldSendMaskedTextToModel() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(temp_dir.path(), "episode.srt", common::STYLED_SRT)?;
    let provider = MockProvider::working();

    common::translator(Arc::new(provider.clone()))
        .run_job(&common::swedish_job(&source))
        .await;

    let users: Vec<String> = provider.requests().into_iter().map(|r| r.user).collect();
    assert_eq!(
        users,
        vec![
            "<<TAG_0>>Where are you going?<<TAG_1>>",
            "I told you, <<TAG_0>>never<<TAG_1>>\ncome back here.",
            "<<TAG_0>>Fine.<<TAG_1>> <<TAG_2>>Goodbye<<TAG_3>>.",
        ]
    );
    Ok(())
}

/// Dropped placeholders cost the markup, not the translation
#[tokio::test]
async fn test_runJob_withModelDroppingPlaceholders_shouldDegradeGracefully() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(temp_dir.path(), "episode.srt", common::STYLED_SRT)?;

    let result = common::translator(Arc::new(MockProvider::dropping_placeholders()))
        .run_job(&common::swedish_job(&source))
        .await;

    assert_eq!(result.status, JobStatus::Partial);
    assert_eq!(result.degraded_blocks, vec![1, 2, 3]);
    assert!(result.failures.is_empty());
    assert_eq!(result.summary(), "3 of 3 blocks translated, 3 blocks lost formatting");

    let written = fs::read_to_string(&result.output)?;
    assert!(!written.contains("<<"));
    assert!(!written.contains("<i>"));
    assert!(written.contains("[TRANSLATED] Where are you going?"));
    Ok(())
}

/// Windows input with a BOM comes out as clean CRLF when asked for
#[tokio::test]
async fn test_runJob_withCrlfSetting_shouldWriteCrlf() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = format!("\u{feff}{}", common::SIMPLE_SRT.replace('\n', "\r\n"));
    let source = common::create_test_file(temp_dir.path(), "talk.en.srt", &content)?;
    let settings = BatchSettings { line_ending: LineEnding::Crlf, ..BatchSettings::default() };
    let translator = BatchTranslator::new(common::service(Arc::new(MockProvider::echo()), 1), settings);

    let result = translator.run_job(&common::swedish_job(&source)).await;

    assert_eq!(result.status, JobStatus::Success);
    let written = fs::read_to_string(&result.output)?;
    assert!(!written.starts_with('\u{feff}'));
    assert_eq!(written, common::SIMPLE_SRT.replace('\n', "\r\n"));
    Ok(())
}

/// Output is a valid file with the same cue count and timing
#[tokio::test]
async fn test_runJob_withManyCues_shouldKeepStructure() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(temp_dir.path(), "long.srt", &common::numbered_srt(40))?;

    let result = common::translator(Arc::new(MockProvider::working()))
        .run_job(&common::swedish_job(&source))
        .await;

    let original = parse_srt(&common::numbered_srt(40))?;
    let translated = parse_srt(&fs::read_to_string(&result.output)?)?;
    assert_eq!(translated.len(), 40);
    for (before, after) in original.iter().zip(&translated) {
        assert_eq!(before.timecode, after.timecode);
        assert_eq!(after.text, format!("[TRANSLATED] {}", before.text));
    }
    Ok(())
}

/// A file that is not SRT fails its job with the block position
#[tokio::test]
async fn test_runJob_withMalformedFile_shouldFailWithoutWriting() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(temp_dir.path(), "notes.srt", "1\nthis is not a timecode\nHello\n")?;
    let provider = MockProvider::working();

    let result = common::translator(Arc::new(provider.clone()))
        .run_job(&common::swedish_job(&source))
        .await;

    match &result.status {
        JobStatus::Failed(JobError::Subtitle(SubtitleError::StructuralParse { block, .. })) => assert_eq!(*block, 1),
        other => panic!("unexpected status: {:?}", other),
    }
    assert_eq!(provider.request_count(), 0);
    assert!(!result.written);
    Ok(())
}

/// Jobs for other languages and models are independent
#[tokio::test]
async fn test_runJob_withCustomOutputAndStyle_shouldUseThem() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(temp_dir.path(), "in.srt", common::SIMPLE_SRT)?;
    let output = temp_dir.path().join("out").join("german.srt");
    let provider = MockProvider::working();
    let options = TranslationOptions::new("de", "qwen2.5:7b")
        .with_style(srt_translator::translation::TranslationStyle::Formal);
    let job = TranslationJob::new(&source, options).with_output(&output);

    let result = common::translator(Arc::new(provider.clone())).run_job(&job).await;

    assert_eq!(result.status, JobStatus::Success);
    assert!(output.exists());
    let request = &provider.requests()[0];
    assert_eq!(request.model, "qwen2.5:7b");
    assert!(request.system.contains("German (de)"));
    Ok(())
}

/// Text that already looks like a placeholder gets fresh tokens, and the prompt names them
#[tokio::test]
async fn test_runJob_withTokenLikeSourceText_shouldDescribeBumpedTokens() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = "1\n00:00:01,000 --> 00:00:02,000\nType <<TAG_0>> then <i>press enter</i>\n";
    let source = common::create_test_file(temp_dir.path(), "manual.srt", content)?;
    let provider = MockProvider::echo();

    let result = common::translator(Arc::new(provider.clone()))
        .run_job(&common::swedish_job(&source))
        .await;

    assert_eq!(result.status, JobStatus::Success);
    let request = &provider.requests()[0];
    assert_eq!(request.user, "Type <<TAG_0>> then <<TAG1_0>>press enter<<TAG1_1>>");
    assert!(request.system.contains("<<TAG1_0>> or <<TAG1_1>>"));
    assert!(!request.system.contains("<<TAG_0>>"));
    assert!(fs::read_to_string(&result.output)?.contains("Type <<TAG_0>> then <i>press enter</i>\n"));
    Ok(())
}
