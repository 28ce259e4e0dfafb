//! Inline formatting and `\name(args)` escapes.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

use crate::block::Inline;

static IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!\[([^\]]+)\]\( *([^ )]+) *([^)]*)\)").expect("image pattern is a valid regex")
});
static IMAGE_BARE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!\[\]\( *([^ )]+) *([^)]*)\)").expect("bare image pattern is a valid regex")
});
static LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("link pattern is a valid regex")
});
static LINK_BARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\]\(([^)]+)\)").expect("bare link pattern is a valid regex"));
static BOLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("bold pattern is a valid regex"));
static ITALIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^*]+)\*").expect("italic pattern is a valid regex"));

const TEXT_INPUT: &str = "<input class='form-control' type='text'/>";
const SUBMIT_BUTTON: &str = "<input class='btn btn-primary' type='submit' value='Submit'>";

/// Applies inline markup to a text run.
///
/// Images are replaced before links so that `![alt](src)` is not read as a
/// link preceded by `!`, and bold before italic so that `**x**` is not split
/// into two italics. None of the patterns match the tags they produce, so the
/// output can safely go through `format` again.
///
/// Text runs are markup, not plain text: `<`, `>` and `&` pass through
/// unescaped, so documents may embed raw HTML. Only code blocks are escaped.
/// Rendering untrusted documents needs sanitizing downstream.
pub fn format(text: &str) -> String {
    if !text.contains(['[', '*', '_']) {
        return text.to_string();
    }

    let text = IMAGE.replace_all(text, |caps: &Captures<'_>| {
        image_tag(&caps[2], Some(&caps[1]), &caps[3])
    });
    let text = IMAGE_BARE.replace_all(&text, |caps: &Captures<'_>| {
        image_tag(&caps[1], None, &caps[2])
    });
    let text = LINK.replace_all(&text, "<a href=\"$2\">$1</a>");
    let text = LINK_BARE.replace_all(&text, "<a href=\"$1\">$1</a>");
    let text = BOLD.replace_all(&text, "<b>$1</b>");
    let text = ITALIC.replace_all(&text, "<em>$1</em>");

    text.replace("___?", TEXT_INPUT).replace("_ok_?", SUBMIT_BUTTON)
}

fn image_tag(src: &str, alt: Option<&str>, style: &str) -> String {
    let mut tag = format!("<img src=\"{src}\"");
    if let Some(alt) = alt {
        tag.push_str(&format!(" alt=\"{alt}\""));
    }
    let style = style.trim();
    if !style.is_empty() {
        tag.push_str(&format!(" style=\"{style}\""));
    }
    tag.push('>');
    tag
}

/// Renders parsed spans as HTML: text runs through [`format`], escapes
/// through their tag mapping.
pub fn render_spans(spans: &[Inline]) -> String {
    let mut out = String::new();
    for span in spans {
        match span {
            Inline::Text { text } => out.push_str(&format(text)),
            Inline::Escape { name, args } => out.push_str(&render_escape(name, args)),
        }
    }
    out
}

/// Parses and renders a raw text run in one go.
pub fn render_text(text: &str) -> String {
    render_spans(&parse_spans(text))
}

fn render_escape(name: &str, args: &[String]) -> String {
    let body = args
        .iter()
        .map(|arg| format(arg))
        .collect::<Vec<_>>()
        .join(", ");
    let tag = match name {
        "" => return body,
        "b" => "b",
        "i" | "em" => "em",
        "u" => "u",
        "code" => "code",
        "sub" => "sub",
        "sup" => "sup",
        other => return format!("<span class='{other}'>{body}</span>"),
    };
    format!("<{tag}>{body}</{tag}>")
}

/// Splits text into literal runs and `\name(args)` escapes.
///
/// A backslash followed by anything other than a letter or `(` is literal,
/// and so is one whose argument list never closes.
pub fn parse_spans(text: &str) -> Vec<Inline> {
    let mut spans = Vec::new();
    let mut literal = String::new();
    let mut pos = 0;

    while let Some(offset) = text[pos..].find('\\') {
        let at = pos + offset;
        literal.push_str(&text[pos..at]);
        match parse_escape(&text[at..]) {
            Some((escape, used)) => {
                if !literal.is_empty() {
                    spans.push(Inline::text(std::mem::take(&mut literal)));
                }
                spans.push(escape);
                pos = at + used;
            }
            None => {
                literal.push('\\');
                pos = at + 1;
            }
        }
    }

    literal.push_str(&text[pos..]);
    if !literal.is_empty() {
        spans.push(Inline::text(literal));
    }
    spans
}

/// Parses one escape at the start of `text` (which begins with `\`).
/// Returns the escape and the number of bytes consumed.
fn parse_escape(text: &str) -> Option<(Inline, usize)> {
    let rest = text.strip_prefix('\\')?;
    let first = rest.chars().next()?;

    if first == '(' {
        let (args, used) = parse_args(&rest[1..])?;
        let escape = Inline::Escape {
            name: String::new(),
            args,
        };
        return Some((escape, 2 + used));
    }

    if !first.is_alphabetic() {
        return None;
    }

    let name_len = rest
        .find(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
        .unwrap_or(rest.len());
    let name = rest[..name_len].to_string();
    let after = &rest[name_len..];

    match after.strip_prefix('(') {
        Some(list) => {
            let Some((args, used)) = parse_args(list) else {
                debug!(escape = %name, "unterminated escape argument list");
                return None;
            };
            Some((Inline::Escape { name, args }, 1 + name_len + 1 + used))
        }
        None => Some((Inline::Escape { name, args: Vec::new() }, 1 + name_len)),
    }
}

/// Parses a comma separated argument list up to and including `)`.
fn parse_args(text: &str) -> Option<(Vec<String>, usize)> {
    let mut args = Vec::new();
    let mut pos = 0;

    loop {
        pos += text[pos..].len() - text[pos..].trim_start().len();
        let ch = text[pos..].chars().next()?;
        match ch {
            ')' => return Some((args, pos + 1)),
            ',' => pos += 1,
            '"' => {
                let (arg, used) = quoted(&text[pos + 1..])?;
                args.push(arg);
                pos += 1 + used;
            }
            _ => {
                let len = text[pos..].find([',', ')'])?;
                args.push(text[pos..pos + len].trim_end().to_string());
                pos += len;
            }
        }
    }
}

/// Reads a quoted argument body up to the closing `"`. `\"` is an escaped quote.
fn quoted(text: &str) -> Option<(String, usize)> {
    let mut arg = String::new();
    let mut chars = text.char_indices();
    while let Some((index, ch)) = chars.next() {
        match ch {
            '"' => return Some((arg, index + 1)),
            '\\' if text[index + 1..].starts_with('"') => {
                arg.push('"');
                chars.next();
            }
            _ => arg.push(ch),
        }
    }
    None
}
