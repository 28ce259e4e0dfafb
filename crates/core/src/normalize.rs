use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Keys longer than this degrade to the empty key.
pub const MAX_KEY_LEN: usize = 64;

const DELIMITER: char = '_';

static ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{#(\w+)\}").expect("anchor pattern is a valid regex"));
static TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{!(\w+)\}").expect("type pattern is a valid regex"));

/// Turns display text into a short identifier for anchors and data keys.
///
/// ## Rules
///
/// - Accents are stripped: the text is decomposed (NFD), combining marks are
///   dropped and the rest is recomposed (NFC). `"Café"` → `"cafe"`.
/// - Every character that is not alphanumeric separates words, so whitespace,
///   `-`, `.`, `_` and punctuation all collapse into a single `_`.
/// - Case transitions split words as well: `"fooBar"` → `"foo_bar"`,
///   `"JSONData"` → `"json_data"`, and so do letter/digit transitions:
///   `"abc1"` → `"abc_1"`.
/// - The result is lowercase, without leading or trailing delimiters.
/// - Empty input, input without any alphanumeric character, and results
///   longer than [`MAX_KEY_LEN`] characters all give the empty key.
///
/// The function is pure, and applying it to its own output is a no-op.
pub fn normalize(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }

    let folded: Vec<char> = text
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .nfc()
        .collect();

    let mut key = String::with_capacity(folded.len());
    let mut pending_delimiter = false;

    for (index, &ch) in folded.iter().enumerate() {
        if !ch.is_alphanumeric() {
            // Separators never start a key.
            pending_delimiter = !key.is_empty();
            continue;
        }

        if !key.is_empty() && !pending_delimiter && index > 0 {
            let next = folded.get(index + 1).copied();
            pending_delimiter = is_word_boundary(folded[index - 1], ch, next);
        }

        if pending_delimiter {
            key.push(DELIMITER);
            pending_delimiter = false;
        }

        for lower in ch.to_lowercase() {
            if !is_combining_mark(lower) {
                key.push(lower);
            }
        }
    }

    if key.chars().count() > MAX_KEY_LEN {
        return String::new();
    }
    key
}

fn is_word_boundary(prev: char, ch: char, next: Option<char>) -> bool {
    let digit_switch = prev.is_numeric() != ch.is_numeric();
    let lower_to_upper = prev.is_lowercase() && ch.is_uppercase();
    let acronym_end = prev.is_uppercase()
        && ch.is_uppercase()
        && next.is_some_and(|next| next.is_lowercase());
    digit_switch || lower_to_upper || acronym_end
}

/// Splits an explicit `{#key}` off the text. Whatever follows the
/// annotation is dropped.
///
/// Returns `(key, display_text)`. Without an annotation the key is the
/// normalized text.
pub fn split_anchor(text: &str) -> (String, String) {
    let anchor = ANCHOR.captures(text);
    let cut = anchor.as_ref().and_then(|caps| caps.get(0)).map_or(text.len(), |m| m.start());
    let display = text[..cut].trim().to_string();
    (key_of(anchor.as_ref(), &display), display)
}

/// Pulls `{#key}` and `{!type}` out of header text, in either order.
///
/// Returns `(key, type, display_text)`. The display text ends where the
/// first annotation starts.
pub fn split_annotations(text: &str) -> (String, String, String) {
    let anchor = ANCHOR.captures(text);
    let kind = TYPE.captures(text);
    let cut = [anchor.as_ref(), kind.as_ref()]
        .into_iter()
        .flatten()
        .filter_map(|caps| caps.get(0))
        .map(|m| m.start())
        .min()
        .unwrap_or(text.len());

    let display = text[..cut].trim().to_string();
    let kind = kind
        .as_ref()
        .and_then(|caps| caps.get(1))
        .map_or_else(String::new, |m| m.as_str().to_string());
    (key_of(anchor.as_ref(), &display), kind, display)
}

fn key_of(anchor: Option<&Captures<'_>>, display: &str) -> String {
    match anchor {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()).to_string(),
        None => normalize(display),
    }
}
