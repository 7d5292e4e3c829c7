//! Text Normalizer - Post-processing of raw generated dialogue
//!
//! Generated text often echoes the speaker name, wraps speech in quotes, runs
//! into extra paragraphs or stops mid-sentence when the token limit hits.
//! `TextNormalizer::normalize` applies a fixed pipeline of repairs:
//!
//! 1. drop everything up to and including the first `:`
//! 2. remove double quotes
//! 3. cut at the second paragraph break when the first newline comes early
//! 4. flatten remaining line breaks to spaces
//! 5. repair `*action*` markers and capitalize sentence starts
//! 6. drop a trailing incomplete sentence
//! 7. close an action marker left open at the start of the text
//!
//! Normalization never fails; malformed input gets a best-effort repair.

use serde::{Deserialize, Serialize};

/// Position of the first newline below which extra paragraphs are cut
pub const DEFAULT_EARLY_BREAK_THRESHOLD: usize = 150;

const ACTION_MARKER: char = '*';
const SENTENCE_ENDINGS: [char; 3] = ['.', '!', '?'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerSettings {
    /// Character position of the first newline under which the text is
    /// truncated at its second paragraph break
    pub early_break_threshold: usize,
    pub capitalize_sentences: bool,
    pub drop_incomplete_sentence: bool,
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        Self {
            early_break_threshold: DEFAULT_EARLY_BREAK_THRESHOLD,
            capitalize_sentences: true,
            drop_incomplete_sentence: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextNormalizer {
    settings: NormalizerSettings,
}

impl TextNormalizer {
    pub fn new(settings: NormalizerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &NormalizerSettings {
        &self.settings
    }

    /// Clean raw generated text for presentation
    pub fn normalize(&self, raw: &str) -> String {
        if raw.trim().is_empty() {
            return String::new();
        }

        let text = strip_speaker_prefix(raw).replace('"', "");

        let text = match text.chars().position(|c| c == '\n') {
            Some(pos) if pos < self.settings.early_break_threshold => {
                truncate_at_second_newline(&text).to_string()
            }
            _ => text,
        };

        let mut text = text.replace(['\n', '\r'], " ").trim().to_string();

        if self.settings.capitalize_sentences {
            text = capitalize_sentences(&repair_actions(&text));
        }

        if self.settings.drop_incomplete_sentence {
            text = drop_incomplete_sentence(&text).to_string();
        }

        close_leading_action(text.trim())
    }
}

fn strip_speaker_prefix(text: &str) -> &str {
    match text.find(':') {
        Some(idx) => &text[idx + 1..],
        None => text,
    }
}

/// Cut before the second newline. A newline directly following the first one
/// is a blank-line artifact and does not count.
fn truncate_at_second_newline(text: &str) -> &str {
    let Some(first) = text.find('\n') else {
        return text;
    };

    let next_newline = |from: usize| text[from..].find('\n').map(|idx| idx + from);

    let mut second = next_newline(first + 1);
    if second == Some(first + 1) {
        second = next_newline(first + 2);
    }

    match second {
        Some(idx) => &text[..idx],
        None => text,
    }
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn ends_sentence(text: &str) -> bool {
    let text = text.strip_suffix(ACTION_MARKER).unwrap_or(text);
    text.ends_with(SENTENCE_ENDINGS)
}

/// Rewrite standalone `*action*` spans as capitalized, punctuated actions.
/// An action is standalone when it opens a sentence, ends the text or runs
/// straight into another action; emphasis inside a sentence is kept as is.
/// An action left open at the end of the text is closed.
fn repair_actions(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    let mut rest = text;

    while let Some(start) = rest.find(ACTION_MARKER) {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find(ACTION_MARKER) {
            Some(end) => {
                let inner = &after[..end];
                rest = &after[end + 1..];

                let before = out.trim_end();
                let opens = before.is_empty() || ends_sentence(before);
                let following = rest.trim_start();
                let closes = following.is_empty() || following.starts_with(ACTION_MARKER);

                if opens || closes {
                    out.push_str(&format_action(inner, true));
                } else {
                    out.push(ACTION_MARKER);
                    out.push_str(inner);
                    out.push(ACTION_MARKER);
                }
            }
            None => {
                out.push_str(&format_action(after, false));
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

fn format_action(inner: &str, closed: bool) -> String {
    let action = inner.trim();
    if action.is_empty() {
        let close = if closed { "*" } else { "" };
        return format!("*{inner}{close}");
    }

    let mut action = capitalize_first(action);
    if !action.ends_with(SENTENCE_ENDINGS) {
        action.push('.');
    }
    format!("*{action}*")
}

/// Uppercase the first letter of every sentence. Segments opening with an
/// action marker were already handled by `repair_actions`.
fn capitalize_sentences(text: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !c.is_whitespace() || !ends_sentence(&text[start..idx]) {
            continue;
        }
        segments.push(&text[start..idx]);
        while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
        start = chars.peek().map_or(text.len(), |(next, _)| *next);
    }
    segments.push(&text[start..]);

    segments
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.starts_with(ACTION_MARKER) {
                s.to_string()
            } else {
                capitalize_first(s)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drop whatever follows the last period unless the text already ends on a
/// complete sentence
fn drop_incomplete_sentence(text: &str) -> &str {
    if ends_sentence(text) {
        return text;
    }
    let Some(last_period) = text.rfind('.') else {
        return text;
    };

    let mut end = last_period + 1;
    let opens_action = text[..last_period].matches(ACTION_MARKER).count() % 2 == 1;
    if opens_action && text[end..].starts_with(ACTION_MARKER) {
        end += 1;
    }
    &text[..end]
}

fn close_leading_action(text: &str) -> String {
    let markers = text.matches(ACTION_MARKER).count();
    if markers % 2 == 1 && text.starts_with(ACTION_MARKER) && !text.ends_with(ACTION_MARKER) {
        return format!("{text}*");
    }
    text.to_string()
}
