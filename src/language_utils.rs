use anyhow::{Result, anyhow};
use isolang::Language;
use once_cell::sync::Lazy;
use regex::Regex;

/// Language utilities for ISO language code handling
///
/// This module validates and names ISO 639-1 (2-letter) and ISO 639-2
/// (3-letter) language codes, optionally followed by a region subtag
/// (`zh-CN`, `pt-BR`). It also decides whether a filename segment such as
/// the `en` in `movie.en.srt` is a language code.

// @const: code with optional region subtag
static CODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)([a-z]{2,3})(?:[-_]([a-z]{2}|[0-9]{3}|[a-z]{4}))?$").unwrap()
});

/// ISO 639-2/B codes that differ from their ISO 639-2/T form
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Split a code into its lowercase primary subtag and optional region
fn split_code(code: &str) -> Option<(String, Option<String>)> {
    let caps = CODE_REGEX.captures(code.trim())?;
    let primary = caps[1].to_lowercase();
    let region = caps.get(2).map(|m| m.as_str().to_string());
    Some((primary, region))
}

/// Resolve a primary subtag to a language
fn lookup(primary: &str) -> Option<Language> {
    match primary.len() {
        2 => Language::from_639_1(primary),
        3 => {
            let part2t = BIBLIOGRAPHIC_CODES
                .iter()
                .find(|(b, _)| *b == primary)
                .map(|(_, t)| *t)
                .unwrap_or(primary);
            Language::from_639_3(part2t)
        }
        _ => None,
    }
}

/// Validate a language code such as `sv`, `swe`, `ger` or `zh-CN`
pub fn validate_language_code(code: &str) -> Result<()> {
    let (primary, _) = split_code(code).ok_or_else(|| anyhow!("Invalid language code: {}", code))?;
    lookup(&primary)
        .map(|_| ())
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Check if two language codes name the same language.
///
/// `sv`, `SWE` and `swe` match. A region only matters when both codes carry
/// one, so `pt` matches `pt-BR` but `pt-BR` does not match `pt-PT`.
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    let (Some((primary1, region1)), Some((primary2, region2))) = (split_code(code1), split_code(code2)) else {
        return false;
    };
    let same_region = match (region1, region2) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(&b),
        _ => true,
    };
    same_region && matches!((lookup(&primary1), lookup(&primary2)), (Some(a), Some(b)) if a == b)
}

/// Get the English language name from a code, with the region appended
pub fn get_language_name(code: &str) -> Result<String> {
    let (primary, region) = split_code(code).ok_or_else(|| anyhow!("Invalid language code: {}", code))?;
    let lang = lookup(&primary).ok_or_else(|| anyhow!("Failed to get language from code: {}", code))?;

    Ok(match region {
        Some(region) => format!("{} ({})", lang.to_name(), region.to_uppercase()),
        None => lang.to_name().to_string(),
    })
}

/// Human-readable name for prompts; falls back to the raw code
pub fn display_name(code: &str) -> String {
    get_language_name(code).unwrap_or_else(|_| code.trim().to_string())
}

/// Whether a filename segment (the `en` in `movie.en.srt`) names a language.
///
/// Three-letter segments only count when the language also has a two-letter
/// code, so words like `end` or `cut` are not mistaken for obscure ISO 639-3
/// languages.
pub fn is_language_segment(segment: &str) -> bool {
    let Some((primary, _)) = split_code(segment) else {
        return false;
    };
    lookup(&primary).is_some_and(|lang| lang.to_639_1().is_some())
}
