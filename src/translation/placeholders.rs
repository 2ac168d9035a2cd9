/*!
 * Placeholder protection for inline subtitle markup.
 *
 * Before a cue is sent to the model, every well-nested `<i>`, `<b>` and `<u>`
 * tag pair is swapped for opaque tokens such as `<<TAG_0>>`. After the model
 * answers, the tokens are swapped back. Tags are matched case-insensitively and
 * their original spelling is kept. Unmatched or overlapping tags are left alone
 * as literal text.
 *
 * A map lives for exactly one request and is never shared between cues.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Tag names that are protected; anything else passes through untouched
pub const ALLOWED_TAGS: &[&str] = &["i", "b", "u"];

/// Default token prefix; bumped when the source text already contains it
pub const DEFAULT_PREFIX: &str = "TAG";

static MARKUP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<(/?)([a-z]+)>").unwrap()
});

/// Whether a tag opens or closes a span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Open,
    Close,
}

/// One protected tag occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderEntry {
    /// Token written into the masked text
    pub token: String,
    /// The tag exactly as it appeared (`<I>`, `</b>`)
    pub original: String,
    /// Identifier shared by the opening and closing tag of one span
    pub pair: usize,
    /// Opening or closing tag
    pub kind: TagKind,
}

/// Mapping from tokens back to the markup they replaced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderMap {
    prefix: String,
    entries: Vec<PlaceholderEntry>,
}

impl PlaceholderMap {
    /// Token prefix used by this map (`TAG`, or `TAG1`, `TAG2`... on collision)
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn entries(&self) -> &[PlaceholderEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Pattern matching a run of this map's tokens and the spaces around it,
    /// lenient about case and spacing inside a token
    fn token_run_pattern(&self) -> Regex {
        let token = format!(r"<<\s*{}_\s*\d+\s*>>", regex::escape(&self.prefix));
        let pattern = format!(r"(?i)( *){}(?: *{})*( *)", token, token);
        // The prefix is escaped, so the pattern is always valid
        Regex::new(&pattern).unwrap_or_else(|_| Regex::new(r"( *)<<\s*TAG\d*_\s*\d+\s*>>( *)").unwrap())
    }
}

/// Result of masking a cue's text
#[derive(Debug, Clone)]
pub struct ProtectedText {
    /// Text with protected tags replaced by tokens
    pub masked: String,
    /// Map needed to undo the masking
    pub map: PlaceholderMap,
}

/// Result of restoring a model response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredText {
    /// Final text, never containing a raw token
    pub text: String,
    /// Tokens expected but not found exactly once and in order
    pub missing: Vec<String>,
    /// True when markup had to be dropped
    pub degraded: bool,
}

struct TagMatch {
    start: usize,
    end: usize,
    name: String,
    kind: TagKind,
}

/// Replace well-nested allow-listed markup with placeholder tokens.
pub fn protect(text: &str) -> ProtectedText {
    let tags: Vec<TagMatch> = MARKUP_REGEX
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps[2].to_lowercase();
            if !ALLOWED_TAGS.contains(&name.as_str()) {
                return None;
            }
            let kind = if caps[1].is_empty() { TagKind::Open } else { TagKind::Close };
            Some(TagMatch {
                start: whole.start(),
                end: whole.end(),
                name,
                kind,
            })
        })
        .collect();

    let pairs = match_pairs(&tags);

    let prefix = choose_prefix(text);
    let mut masked = String::with_capacity(text.len());
    let mut entries = Vec::new();
    let mut cursor = 0;

    for (tag, pair) in tags.iter().zip(pairs) {
        let Some(pair) = pair else {
            continue;
        };
        let token = format!("<<{}_{}>>", prefix, entries.len());
        masked.push_str(&text[cursor..tag.start]);
        masked.push_str(&token);
        cursor = tag.end;
        entries.push(PlaceholderEntry {
            token,
            original: text[tag.start..tag.end].to_string(),
            pair,
            kind: tag.kind,
        });
    }
    masked.push_str(&text[cursor..]);

    ProtectedText {
        masked,
        map: PlaceholderMap { prefix, entries },
    }
}

/// Decide which tags form well-nested pairs.
///
/// Returns, per tag, the pair id (index of the opening tag) or `None` for
/// tags that stay literal. A closing tag that would cross an inner open span
/// invalidates both spans.
fn match_pairs(tags: &[TagMatch]) -> Vec<Option<usize>> {
    let mut pairs = vec![None; tags.len()];
    let mut stack: Vec<usize> = Vec::new();

    for (position, tag) in tags.iter().enumerate() {
        match tag.kind {
            TagKind::Open => stack.push(position),
            TagKind::Close => {
                let Some(depth) = stack.iter().rposition(|open| tags[*open].name == tag.name) else {
                    continue;
                };
                if depth == stack.len() - 1 {
                    let open = stack.pop().unwrap_or(position);
                    pairs[open] = Some(open);
                    pairs[position] = Some(open);
                } else {
                    // Overlap: the matching span and everything opened inside it stay literal
                    stack.truncate(depth);
                }
            }
        }
    }

    pairs
}

fn choose_prefix(text: &str) -> String {
    let upper = text.to_uppercase();
    let mut prefix = DEFAULT_PREFIX.to_string();
    let mut bump = 0;
    while upper.contains(&format!("<<{}", prefix)) {
        bump += 1;
        prefix = format!("{}{}", DEFAULT_PREFIX, bump);
    }
    prefix
}

/// Put the original markup back into a model response.
///
/// A span is restored only when both of its tokens appear exactly once and in
/// order. Otherwise both tokens are stripped, the span's markup is lost and the
/// result is flagged degraded. Any other token-shaped text is stripped too, so
/// raw tokens never reach the output.
pub fn restore(masked: &str, map: &PlaceholderMap) -> RestoredText {
    if map.is_empty() {
        return RestoredText {
            text: masked.to_string(),
            missing: Vec::new(),
            degraded: false,
        };
    }

    let mut intact: HashMap<usize, bool> = HashMap::new();
    let mut missing = Vec::new();

    for entry in map.entries() {
        let count = masked.matches(entry.token.as_str()).count();
        if count != 1 {
            missing.push(entry.token.clone());
        }
        intact.entry(entry.pair).and_modify(|ok| *ok &= count == 1).or_insert(count == 1);
    }

    let present: Vec<usize> = intact.iter().filter(|(_, ok)| **ok).map(|(pair, _)| *pair).collect();
    for pair in present {
        let open = token_position(masked, map, pair, TagKind::Open);
        let close = token_position(masked, map, pair, TagKind::Close);
        if !matches!((open, close), (Some(open), Some(close)) if open < close) {
            intact.insert(pair, false);
        }
    }

    let mut text = masked.to_string();
    for entry in map.entries() {
        if intact.get(&entry.pair).copied().unwrap_or(false) {
            text = text.replacen(entry.token.as_str(), &entry.original, 1);
        }
    }

    let pattern = map.token_run_pattern();
    let stray = pattern.is_match(&text);
    if stray {
        text = strip_tokens(&text, &pattern);
    }

    let degraded = stray || intact.values().any(|ok| !ok);
    if degraded {
        for entry in map.entries() {
            if !intact.get(&entry.pair).copied().unwrap_or(false) && !missing.contains(&entry.token) {
                missing.push(entry.token.clone());
            }
        }
    }

    RestoredText { text, missing, degraded }
}

fn token_position(masked: &str, map: &PlaceholderMap, pair: usize, kind: TagKind) -> Option<usize> {
    map.entries()
        .iter()
        .find(|entry| entry.pair == pair && entry.kind == kind)
        .and_then(|entry| masked.find(entry.token.as_str()))
}

/// Remove stray token runs, closing only the gap each one leaves.
///
/// Inside a line the run and its surrounding spaces become one space (or
/// nothing when the token was glued to a word). Indentation before a run at
/// the start of a line is kept; spaces before a run at the end are dropped.
fn strip_tokens(text: &str, pattern: &Regex) -> String {
    pattern
        .replace_all(text, |caps: &regex::Captures| {
            let (start, end) = caps.get(0).map_or((0, 0), |m| (m.start(), m.end()));
            let at_line_start = start == 0 || text[..start].ends_with('\n');
            let at_line_end = end == text.len() || text[end..].starts_with(|c| c == '\n' || c == '\r');
            let before = caps.get(1).map_or("", |m| m.as_str());
            let after = caps.get(2).map_or("", |m| m.as_str());

            if at_line_end {
                String::new()
            } else if at_line_start {
                before.to_string()
            } else if !before.is_empty() || !after.is_empty() {
                " ".to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}
