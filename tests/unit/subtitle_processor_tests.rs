/*!
 * Tests for subtitle processing functionality
 */

use srt_translator::errors::SubtitleError;
use srt_translator::subtitle_processor::{parse_srt, serialize_srt, LineEnding, SubtitleBlock, Timecode};
use crate::common;

/// Parsing then writing a clean file gives the same bytes back
#[test]
fn test_parseThenSerialize_withCanonicalFile_shouldBeIdentical() {
    let blocks = parse_srt(common::SIMPLE_SRT).unwrap();
    assert_eq!(blocks.len(), 3);
    assert_eq!(serialize_srt(&blocks, LineEnding::Lf), common::SIMPLE_SRT);
}

/// Cue settings after the end timestamp survive untouched
#[test]
fn test_parse_withCueSettings_shouldKeepThemVerbatim() {
    let blocks = parse_srt(common::STYLED_SRT).unwrap();

    assert_eq!(blocks[0].timecode.settings, " X1:40 X2:600 Y1:20 Y2:50");
    assert_eq!(blocks[1].text, "I told you, <b>never</b>\ncome back here.");
    assert!(serialize_srt(&blocks, LineEnding::Lf).contains("00:00:01,000 --> 00:00:03,500 X1:40 X2:600 Y1:20 Y2:50\n"));
}

/// Windows line endings, a BOM and extra blank lines are tolerated
#[test]
fn test_parse_withCrlfBomAndExtraBlankLines_shouldParse() {
    let content = "\u{feff}1\r\n00:00:01,000 --> 00:00:02,000\r\nHello\r\n\r\n\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nWorld  \r\n\r\n";

    let blocks = parse_srt(content).unwrap();

    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].index, 1);
    assert_eq!(blocks[1].text, "World");
}

/// A broken cue is reported with its position
#[test]
fn test_parse_withBadTimecode_shouldReportBlockOrdinal() {
    let content = "1\n00:00:01,000 --> 00:00:02,000\nFine\n\n2\n00:00:03 -> 00:00:04\nBroken\n";

    let error = parse_srt(content).unwrap_err();

    match error {
        SubtitleError::StructuralParse { block, .. } => assert_eq!(block, 2),
    }
}

/// Non-numeric indices are not guessed at
#[test]
fn test_parse_withTextInsteadOfIndex_shouldFail() {
    assert!(parse_srt("one\n00:00:01,000 --> 00:00:02,000\nHi\n").is_err());
}

/// Empty input is valid and has no blocks
#[test]
fn test_parse_withEmptyInput_shouldReturnNoBlocks() {
    assert!(parse_srt("").unwrap().is_empty());
    assert!(parse_srt("\n\n  \n").unwrap().is_empty());
}

/// Out-of-order indices are renumbered on write, timing is not touched
#[test]
fn test_serialize_withGappedIndices_shouldRenumber() {
    let blocks = vec![
        SubtitleBlock::new(7, Timecode::new("00:00:01,000", "00:00:02,000"), "A"),
        SubtitleBlock::new(9, Timecode::new("00:00:03,000", "00:00:04,000"), "B"),
    ];

    let output = serialize_srt(&blocks, LineEnding::Lf);

    assert_eq!(output, "1\n00:00:01,000 --> 00:00:02,000\nA\n\n2\n00:00:03,000 --> 00:00:04,000\nB\n");
}

/// CRLF output uses CRLF everywhere
#[test]
fn test_serialize_withCrlf_shouldUseCrlfOnly() {
    let blocks = parse_srt(common::SIMPLE_SRT).unwrap();

    let output = serialize_srt(&blocks, LineEnding::Crlf);

    assert!(output.ends_with("purposes.\r\n"));
    assert_eq!(output.matches('\n').count(), output.matches("\r\n").count());
}

/// Blank lines inside a translated cue would split it; they are dropped
#[test]
fn test_serialize_withBlankLineInText_shouldKeepCueTogether() {
    let blocks = vec![SubtitleBlock::new(1, Timecode::new("00:00:01,000", "00:00:02,000"), "Top\n\nBottom")];

    let output = serialize_srt(&blocks, LineEnding::Lf);

    assert_eq!(parse_srt(&output).unwrap()[0].text, "Top\nBottom");
}
