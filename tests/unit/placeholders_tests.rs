/*!
 * Tests for markup protection around model calls
 */

use srt_translator::subtitle_processor::parse_srt;
use srt_translator::translation::{protect, restore};
use crate::common;

/// Every cue of a styled file survives an identity "translation"
#[test]
fn test_protectRestore_withStyledFile_shouldRoundTripEveryCue() {
    for block in parse_srt(common::STYLED_SRT).unwrap() {
        let protected = protect(&block.text);

        let restored = restore(&protected.masked, &protected.map);
        assert_eq!(restored.text, block.text);
        assert!(!restored.degraded);
    }
}

/// Models reorder words; a span moved as a whole still restores
#[test]
fn test_restore_withReorderedSpans_shouldRestoreBoth() {
    let protected = protect("<i>Fine.</i> <u>Goodbye</u>.");
    assert_eq!(protected.masked, "<<TAG_0>>Fine.<<TAG_1>> <<TAG_2>>Goodbye<<TAG_3>>.");

    let restored = restore("<<TAG_2>>Hej då<<TAG_3>>. <<TAG_0>>Okej.<<TAG_1>>", &protected.map);

    assert_eq!(restored.text, "<u>Hej då</u>. <i>Okej.</i>");
    assert!(!restored.degraded);
    assert!(restored.missing.is_empty());
}

/// Original tag spelling is kept, not normalised
#[test]
fn test_restore_shouldKeepOriginalTagCase() {
    let protected = protect("<I>Loud</I>");
    let restored = restore(&protected.masked.replace("Loud", "Högt"), &protected.map);
    assert_eq!(restored.text, "<I>Högt</I>");
}

/// Only the broken span loses its markup
#[test]
fn test_restore_withOneSpanLost_shouldKeepTheOther() {
    let protected = protect("<b>never</b> and <i>ever</i>");

    let restored = restore("<<TAG_0>>aldrig<<TAG_1>> och alltid", &protected.map);

    assert_eq!(restored.text, "<b>aldrig</b> och alltid");
    assert!(restored.degraded);
    assert_eq!(restored.missing, vec!["<<TAG_2>>".to_string(), "<<TAG_3>>".to_string()]);
}

/// An empty answer restores to empty text, flagged degraded when markup was expected
#[test]
fn test_restore_withEmptyAnswer_shouldBeEmptyAndDegraded() {
    let protected = protect("<i>Hi</i>");
    let restored = restore("", &protected.map);
    assert_eq!(restored.text, "");
    assert!(restored.degraded);
}

/// Multi-line cues keep their line structure
#[test]
fn test_protect_withMultilineSpan_shouldMaskAcrossLines() {
    let protected = protect("<i>first line\nsecond line</i>");
    assert_eq!(protected.masked, "<<TAG_0>>first line\nsecond line<<TAG_1>>");
    let restored = restore(&protected.masked, &protected.map);
    assert_eq!(restored.text, "<i>first line\nsecond line</i>");
}
