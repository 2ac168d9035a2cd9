use std::fmt;
use regex::Regex;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use log::debug;

use crate::errors::SubtitleError;

// @module: Subtitle parsing and serialization

// @const: SRT timecode line (start --> end, optional cue settings after)
static TIMECODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}:\d{2}:\d{2},\d{3}) --> (\d{2}:\d{2}:\d{2},\d{3})(.*)$").unwrap()
});

const BOM: char = '\u{feff}';

/// Line terminator used when writing subtitle files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    Crlf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Crlf => "\r\n",
        }
    }
}

impl std::str::FromStr for LineEnding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "lf" => Ok(Self::Lf),
            "crlf" => Ok(Self::Crlf),
            _ => Err(anyhow::anyhow!("Invalid line ending: {}", s)),
        }
    }
}

/// Timing of a cue, kept exactly as it appeared in the source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timecode {
    // @field: Start timestamp (HH:MM:SS,mmm)
    pub start: String,

    // @field: End timestamp (HH:MM:SS,mmm)
    pub end: String,

    // @field: Anything after the end timestamp (position hints), verbatim
    pub settings: String,
}

impl Timecode {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            settings: String::new(),
        }
    }

    /// Parse a timecode line; `None` if it does not match the arrow format
    pub fn parse(line: &str) -> Option<Self> {
        let caps = TIMECODE_REGEX.captures(line.trim_end())?;
        Some(Self {
            start: caps[1].to_string(),
            end: caps[2].to_string(),
            settings: caps[3].to_string(),
        })
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} --> {}{}", self.start, self.end, self.settings)
    }
}

// @struct: Single subtitle cue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleBlock {
    // @field: Sequence number as read from the source
    pub index: usize,

    // @field: Cue timing, never sent to the model
    pub timecode: Timecode,

    // @field: Cue text, lines joined with '\n'; empty for a blank cue
    pub text: String,
}

impl SubtitleBlock {
    pub fn new(index: usize, timecode: Timecode, text: impl Into<String>) -> Self {
        SubtitleBlock {
            index,
            timecode,
            text: text.into(),
        }
    }

    /// Blank cues are carried through but never translated
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Text lines, skipping any blank ones so the cue stays a single group
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
    }
}

/// Parse SRT content into ordered subtitle blocks.
///
/// Cue groups are separated by one or more blank lines. CRLF input and
/// trailing whitespace are tolerated, and a leading BOM is ignored. Any group
/// lacking a numeric index or a valid timecode line is reported with its
/// 1-based position; nothing is dropped silently.
pub fn parse_srt(content: &str) -> Result<Vec<SubtitleBlock>, SubtitleError> {
    let content = content.strip_prefix(BOM).unwrap_or(content);

    let mut blocks = Vec::new();
    let mut group: Vec<&str> = Vec::new();

    for line in content.lines() {
        // str::lines leaves a lone '\r' only on the last line; strip it either way
        let line = line.trim_end_matches('\r').trim_end();
        if line.trim().is_empty() {
            if !group.is_empty() {
                blocks.push(parse_group(&group, blocks.len() + 1)?);
                group.clear();
            }
            continue;
        }
        group.push(line);
    }

    if !group.is_empty() {
        blocks.push(parse_group(&group, blocks.len() + 1)?);
    }

    debug!("Parsed {} subtitle blocks", blocks.len());
    Ok(blocks)
}

fn parse_group(lines: &[&str], ordinal: usize) -> Result<SubtitleBlock, SubtitleError> {
    let index_line = lines[0].trim();
    let index = index_line
        .parse::<usize>()
        .ok()
        .filter(|index| *index > 0)
        .ok_or_else(|| SubtitleError::StructuralParse {
            block: ordinal,
            reason: format!("expected a positive sequence number, found {:?}", index_line),
        })?;

    let timecode_line = lines.get(1).ok_or_else(|| SubtitleError::StructuralParse {
        block: ordinal,
        reason: "missing timecode line".to_string(),
    })?;

    let timecode = Timecode::parse(timecode_line.trim_start()).ok_or_else(|| SubtitleError::StructuralParse {
        block: ordinal,
        reason: format!("invalid timecode line {:?}", timecode_line),
    })?;

    Ok(SubtitleBlock {
        index,
        timecode,
        text: lines[2..].join("\n"),
    })
}

/// Serialize blocks back to SRT.
///
/// Indices are renumbered from 1, timecodes are written exactly as captured,
/// cues are separated by exactly one blank line and the file ends with a
/// single line terminator.
pub fn serialize_srt(blocks: &[SubtitleBlock], line_ending: LineEnding) -> String {
    let mut cues = Vec::with_capacity(blocks.len());

    for (position, block) in blocks.iter().enumerate() {
        let mut cue = vec![(position + 1).to_string(), block.timecode.to_string()];
        cue.extend(block.lines().map(str::to_string));
        cues.push(cue.join("\n"));
    }

    let mut output = cues.join("\n\n");
    if !output.is_empty() {
        output.push('\n');
    }

    match line_ending {
        LineEnding::Lf => output,
        LineEnding::Crlf => output.replace('\n', "\r\n"),
    }
}
