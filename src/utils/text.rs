//! Text cleanup for abstracts and citation bodies.

use once_cell::sync::Lazy;
use quick_xml::escape::{resolve_html5_entity, unescape_with};
use regex::Regex;

static ENTITY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#?[A-Za-z0-9]+);").expect("valid entity regex"));

static JATS_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?jats:[^>]*>").expect("valid JATS regex"));

static TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

/// UTF-8 punctuation that was decoded as Windows-1252 or Latin-1 somewhere
/// upstream, paired with the intended text.
const MOJIBAKE: [(&str, &str); 14] = [
    // Windows-1252 readings
    ("\u{e2}\u{20ac}\u{153}", "\""),
    ("\u{e2}\u{20ac}\u{9d}", "\""),
    ("\u{e2}\u{20ac}\u{2122}", "'"),
    ("\u{e2}\u{20ac}\u{2dc}", "'"),
    ("\u{e2}\u{20ac}\u{201d}", "\u{2014}"),
    ("\u{e2}\u{20ac}\u{201c}", "\u{2013}"),
    // Latin-1 readings
    ("\u{e2}\u{80}\u{9c}", "\""),
    ("\u{e2}\u{80}\u{9d}", "\""),
    ("\u{e2}\u{80}\u{99}", "'"),
    ("\u{e2}\u{80}\u{98}", "'"),
    ("\u{e2}\u{80}\u{94}", "\u{2014}"),
    ("\u{e2}\u{80}\u{93}", "\u{2013}"),
    // non-breaking space
    ("\u{c2}\u{a0}", " "),
    ("\u{c2} ", " "),
];

/// Decode HTML named and numeric character references.
///
/// Unknown entities are left untouched rather than treated as an error.
pub fn decode_html_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    ENTITY_REGEX
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let raw = &caps[0];
            match unescape_with(raw, resolve_html5_entity) {
                Ok(decoded) => decoded.into_owned(),
                Err(_) => raw.to_string(),
            }
        })
        .into_owned()
}

/// Replace known mis-decoded punctuation sequences
pub fn repair_mojibake(text: &str) -> String {
    MOJIBAKE
        .iter()
        .fold(text.to_string(), |acc, &(broken, fixed)| {
            if acc.contains(broken) {
                acc.replace(broken, fixed)
            } else {
                acc
            }
        })
}

/// Collapse whitespace runs to single spaces and trim
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize an abstract: drop JATS and HTML markup, decode entities,
/// collapse whitespace.
pub fn clean_abstract(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let without_jats = JATS_TAG_REGEX.replace_all(text, "");
    let without_tags = TAG_REGEX.replace_all(&without_jats, "");
    collapse_whitespace(&decode_html_entities(&without_tags))
}
