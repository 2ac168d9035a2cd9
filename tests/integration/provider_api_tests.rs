/*!
 * Translation jobs against a mocked Ollama HTTP server
 */

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use httpmock::prelude::*;
use serde_json::json;

use srt_translator::errors::{JobError, ProviderError, TranslationError};
use srt_translator::providers::ollama::Ollama;
use srt_translator::translation::{JobStatus, TranslationJob, TranslationOptions};
use crate::common;

const THREE_CUES: &str = "1
00:00:01,000 --> 00:00:02,000
Hello

2
00:00:03,000 --> 00:00:04,000
Broken

3
00:00:05,000 --> 00:00:06,000
<i>Goodbye</i>
";

fn chat_reply(content: &str) -> serde_json::Value {
    json!({
        "model": "llama3.2:3b",
        "created_at": "2024-01-01T00:00:00Z",
        "message": {"role": "assistant", "content": content},
        "done": true
    })
}

fn job(source: &Path) -> TranslationJob {
    TranslationJob::new(source, TranslationOptions::new("sv", "llama3.2:3b"))
}

/// A whole file goes through the chat endpoint, one request per cue
#[tokio::test]
async fn test_runJob_withOllamaServer_shouldWriteTranslation() -> Result<()> {
    common::init_logger();
    let server = MockServer::start_async().await;
    let hello = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/chat").body_includes("Hello");
            then.status(200).json_body(chat_reply("Hej"));
        })
        .await;
    let broken = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/chat").body_includes("Broken");
            then.status(200).json_body(chat_reply("Trasig"));
        })
        .await;
    let goodbye = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/chat").body_includes("Goodbye");
            then.status(200).json_body(chat_reply("<<TAG_0>>Hejdå<<TAG_1>>"));
        })
        .await;

    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(temp_dir.path(), "film.en.srt", THREE_CUES)?;
    let client = Ollama::new(&server.base_url())?;
    let translator = common::translator(Arc::new(client));

    let result = translator.run_job(&job(&source)).await;

    assert_eq!(result.status, JobStatus::Success);
    hello.assert_async().await;
    broken.assert_async().await;
    goodbye.assert_async().await;
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("film.sv.srt"))?,
        "1\n00:00:01,000 --> 00:00:02,000\nHej\n\n\
2\n00:00:03,000 --> 00:00:04,000\nTrasig\n\n\
3\n00:00:05,000 --> 00:00:06,000\n<i>Hejdå</i>\n"
    );
    Ok(())
}

/// A cue the server keeps refusing is retried, then kept in the source language
#[tokio::test]
async fn test_runJob_withPersistent503OnOneCue_shouldBePartial() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/chat").body_includes("Hello");
            then.status(200).json_body(chat_reply("Hej"));
        })
        .await;
    let broken = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/chat").body_includes("Broken");
            then.status(503).body("server overloaded");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/chat").body_includes("Goodbye");
            then.status(200).json_body(chat_reply("<<TAG_0>>Hejdå<<TAG_1>>"));
        })
        .await;

    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(temp_dir.path(), "film.en.srt", THREE_CUES)?;
    let client = Ollama::new(&server.base_url())?;
    let translator = common::translator(Arc::new(client));

    let result = translator.run_job(&job(&source)).await;

    assert_eq!(result.status, JobStatus::Partial);
    assert_eq!(broken.calls_async().await, 3);
    assert_eq!(result.failed_blocks(), vec![2]);
    assert_eq!(result.summary(), "2 of 3 blocks translated, 1 block failed");
    let written = fs::read_to_string(&result.output)?;
    assert!(written.contains("Hej\n"));
    assert!(written.contains("\nBroken\n"));
    Ok(())
}

/// An unknown model fails every cue without retrying
#[tokio::test]
async fn test_runJob_withUnknownModel_shouldNotRetry() -> Result<()> {
    let server = MockServer::start_async().await;
    let chat = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/chat");
            then.status(404).json_body(json!({"error": "model 'llama3.2:3b' not found, try pulling it first"}));
        })
        .await;

    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(temp_dir.path(), "film.en.srt", THREE_CUES)?;
    let client = Ollama::new(&server.base_url())?;
    let translator = common::translator(Arc::new(client));

    let result = translator.run_job(&job(&source)).await;

    assert_eq!(chat.calls_async().await, 3);
    assert_eq!(result.status, JobStatus::Partial);
    assert_eq!(result.completed_blocks(), 0);
    match &result.failures[0] {
        TranslationError::TranslationFailed { attempts, source, .. } => {
            assert_eq!(*attempts, 1);
            assert!(source.to_string().contains("not found"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    Ok(())
}

/// Nothing listening on the endpoint ends the job without writing a file
#[tokio::test]
async fn test_runJob_withNothingListening_shouldFailServiceUnavailable() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(temp_dir.path(), "film.en.srt", THREE_CUES)?;
    let client = Ollama::new_with_config("http://127.0.0.1:9", Duration::from_secs(2))?;
    let translator = common::translator(Arc::new(client));

    let result = translator.run_job(&job(&source)).await;

    match &result.status {
        JobStatus::Failed(JobError::Translation(TranslationError::ServiceUnavailable(cause))) => {
            assert!(matches!(cause, ProviderError::ConnectionError(_) | ProviderError::Timeout(_)));
        }
        other => panic!("unexpected status: {:?}", other),
    }
    assert!(!result.written);
    assert!(!temp_dir.path().join("film.sv.srt").exists());
    Ok(())
}

/// The endpoint may be given with the chat path attached
#[tokio::test]
async fn test_ollama_withChatPathInEndpoint_shouldStillReachServer() -> Result<()> {
    let server = MockServer::start_async().await;
    let chat = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/chat");
            then.status(200).json_body(chat_reply("Hej"));
        })
        .await;

    let client = Ollama::new(&server.url("/api/chat"))?;
    let service = common::service(Arc::new(client), 1);

    let text = service.translate(1, "Hello", &TranslationOptions::new("sv", "llama3.2:3b")).await?;

    chat.assert_async().await;
    assert_eq!(text, "Hej");
    Ok(())
}
