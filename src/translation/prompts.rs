/*!
 * System instructions for subtitle translation.
 *
 * The generated instruction names the target language and a tone directive.
 * A user-supplied override replaces it entirely, but the placeholder rules are
 * always appended so markup protection can't be switched off by accident.
 */

use serde::{Deserialize, Serialize};

use crate::language_utils;

/// Tone directive folded into the system instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationStyle {
    /// Everyday, idiomatic speech
    #[default]
    Natural,
    /// Polite register
    Formal,
    /// Short sentences and common words
    Simple,
}

impl TranslationStyle {
    /// The concrete instruction sent to the model
    pub fn directive(&self) -> &'static str {
        match self {
            Self::Natural => "Use a natural, conversational tone that sounds like native speech.",
            Self::Formal => "Use a formal, polite register and avoid slang.",
            Self::Simple => "Use simple, clear wording with short sentences and common vocabulary.",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Natural => "Natural (recommended)",
            Self::Formal => "Formal",
            Self::Simple => "Simple clear",
        }
    }
}

impl std::fmt::Display for TranslationStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Natural => "natural",
            Self::Formal => "formal",
            Self::Simple => "simple",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for TranslationStyle {
    type Err = anyhow::Error;

    // Accepts both the short names and the labels saved in profiles
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "natural" | "natural (recommended)" => Ok(Self::Natural),
            "formal" => Ok(Self::Formal),
            "simple" | "simple clear" => Ok(Self::Simple),
            _ => Err(anyhow::anyhow!("Invalid translation style: {}", s)),
        }
    }
}

const PLACEHOLDER_RULES: &str = "Tokens written in double angle brackets, such as <<{prefix}_0>> or <<{prefix}_1>>, are formatting placeholders. \
Copy every placeholder into your answer exactly once, unchanged, around the words it surrounds. \
Never translate, renumber, or remove them.";

/// Rules appended to every instruction, generated or overridden.
///
/// `prefix` is the token prefix of the text being sent (`TAG`, `TAG1`...).
pub fn placeholder_rules(prefix: &str) -> String {
    PLACEHOLDER_RULES.replace("{prefix}", prefix)
}

const BASE_TEMPLATE: &str = "You are a professional subtitle translator. Translate the user's text into {target_language}.
{style}
Only translate the user text and keep its line breaks.
Do NOT add explanations, notes, or commentary.
Answer with the translated text only.";

/// Build the system instruction for one request.
///
/// `{target_language}` inside an override is substituted too.
pub fn build_system_prompt(
    target_language: &str,
    style: TranslationStyle,
    override_prompt: Option<&str>,
    placeholder_prefix: &str,
) -> String {
    let language = format!("{} ({})", language_utils::display_name(target_language), target_language.trim());

    let base = match override_prompt.map(str::trim).filter(|p| !p.is_empty()) {
        Some(custom) => custom.replace("{target_language}", &language),
        None => BASE_TEMPLATE
            .replace("{target_language}", &language)
            .replace("{style}", style.directive()),
    };

    format!("{}\n\n{}", base, placeholder_rules(placeholder_prefix))
}
