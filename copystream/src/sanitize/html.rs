// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

// HTML allow-list filter
//
// Char-level state machine. Allowed tags are re-serialised in a canonical
// form (lower-case name, double-quoted escaped attributes), so running the
// filter over its own output is a no-op.

use super::is_invisible;

const ALLOWED_TAGS: &[&str] = &[
    "p", "br", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "a", "strong", "b", "em",
    "i", "u", "code", "pre", "blockquote", "table", "thead", "tbody", "tfoot", "tr", "th", "td",
    "hr",
];

const VOID_TAGS: &[&str] = &["br", "hr"];

/// Tags removed together with everything up to their closing tag.
const DROP_CONTENT_TAGS: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "noscript", "template", "textarea",
];

/// Filter `input` down to the allowed tags and attributes.
///
/// - Allowed tags are kept with only their allowed attributes.
/// - Other tags are removed; their text is kept.
/// - `script`, `style` and the other active-content tags lose their content too.
/// - Comments, doctypes and processing instructions are removed.
/// - A `<` or `>` that is not part of a tag is escaped.
/// - An anchor `href` whose scheme is not in `allowed_schemes` is dropped.
pub fn sanitize_html(input: &str, allowed_schemes: &[&str]) -> String {
    let mut result = String::with_capacity(input.len());
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let mut i = 0;

    while i < len {
        match chars[i] {
            '<' => {
                if starts_with_at(&chars, i, "<!--") {
                    i = skip_comment(&chars, i);
                    continue;
                }
                if matches!(chars.get(i + 1), Some('!') | Some('?')) {
                    match find_char(&chars, i, '>') {
                        Some(close) => i = close + 1,
                        None => {
                            result.push_str("&lt;");
                            i += 1;
                        }
                    }
                    continue;
                }
                match parse_tag(&chars, i) {
                    Some(tag) if !tag.closing && DROP_CONTENT_TAGS.contains(&tag.name.as_str()) => {
                        i = skip_to_closing_tag(&chars, tag.end, &tag.name);
                    }
                    Some(tag) => {
                        if ALLOWED_TAGS.contains(&tag.name.as_str()) {
                            write_tag(&mut result, &tag, allowed_schemes);
                        }
                        i = tag.end;
                    }
                    None => {
                        result.push_str("&lt;");
                        i += 1;
                    }
                }
            }
            '>' => {
                result.push_str("&gt;");
                i += 1;
            }
            c => {
                result.push(c);
                i += 1;
            }
        }
    }

    result
}

// ---------------------------------------------------------------------------
// Tag parsing
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Tag {
    /// Lower-case tag name.
    name: String,
    closing: bool,
    /// Lower-case attribute names with their raw (undecoded) values.
    attrs: Vec<(String, String)>,
    /// Index just past the closing `>`.
    end: usize,
}

/// Parse the tag opening at `start`. `None` when the `<` does not open a
/// well-formed tag (no name, or no closing `>`).
fn parse_tag(chars: &[char], start: usize) -> Option<Tag> {
    let len = chars.len();
    let mut i = start + 1;

    let closing = chars.get(i) == Some(&'/');
    if closing {
        i += 1;
    }

    if !chars.get(i)?.is_ascii_alphabetic() {
        return None;
    }
    let mut name = String::new();
    while i < len && chars[i].is_ascii_alphanumeric() {
        name.push(chars[i].to_ascii_lowercase());
        i += 1;
    }

    let mut attrs = Vec::new();
    loop {
        while i < len && (chars[i].is_whitespace() || chars[i] == '/') {
            i += 1;
        }
        match chars.get(i)? {
            '>' => {
                return Some(Tag {
                    name,
                    closing,
                    attrs,
                    end: i + 1,
                })
            }
            _ => {
                let mut attr_name = String::new();
                while i < len && !matches!(chars[i], '=' | '>' | '/') && !chars[i].is_whitespace() {
                    attr_name.push(chars[i].to_ascii_lowercase());
                    i += 1;
                }
                while i < len && chars[i].is_whitespace() {
                    i += 1;
                }

                let mut value = String::new();
                if chars.get(i) == Some(&'=') {
                    i += 1;
                    while i < len && chars[i].is_whitespace() {
                        i += 1;
                    }
                    let quote = *chars.get(i)?;
                    if quote == '"' || quote == '\'' {
                        let close = find_char(chars, i + 1, quote)?;
                        value.extend(&chars[i + 1..close]);
                        i = close + 1;
                    } else {
                        while i < len && chars[i] != '>' && !chars[i].is_whitespace() {
                            value.push(chars[i]);
                            i += 1;
                        }
                    }
                }

                if !attr_name.is_empty() {
                    attrs.push((attr_name, value));
                }
            }
        }
    }
}

fn write_tag(result: &mut String, tag: &Tag, allowed_schemes: &[&str]) {
    let is_void = VOID_TAGS.contains(&tag.name.as_str());
    if tag.closing {
        if !is_void {
            result.push_str("</");
            result.push_str(&tag.name);
            result.push('>');
        }
        return;
    }

    result.push('<');
    result.push_str(&tag.name);
    let mut written: Vec<&str> = Vec::new();
    for (name, value) in &tag.attrs {
        if written.contains(&name.as_str()) || !attribute_allowed(&tag.name, name, value, allowed_schemes) {
            continue;
        }
        written.push(name);
        result.push(' ');
        result.push_str(name);
        result.push_str("=\"");
        escape_attribute(result, &decode_entities(value));
        result.push('"');
    }
    result.push('>');
}

fn attribute_allowed(tag: &str, name: &str, value: &str, allowed_schemes: &[&str]) -> bool {
    match (tag, name) {
        ("a", "href") => is_safe_uri(value, allowed_schemes),
        ("a", "title") => true,
        ("th" | "td", "colspan" | "rowspan") => {
            let value = value.trim();
            !value.is_empty() && value.len() <= 3 && value.bytes().all(|b| b.is_ascii_digit())
        }
        _ => false,
    }
}

/// `[` is escaped so no marker keyword can follow a literal bracket inside
/// an attribute.
fn escape_attribute(result: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '[' => result.push_str("&#91;"),
            c if c.is_control() || is_invisible(c) => {}
            c => result.push(c),
        }
    }
}

// ---------------------------------------------------------------------------
// Skipping
// ---------------------------------------------------------------------------

fn skip_comment(chars: &[char], start: usize) -> usize {
    let mut i = start + 4;
    while i < chars.len() {
        if starts_with_at(chars, i, "-->") {
            return i + 3;
        }
        i += 1;
    }
    chars.len()
}

/// Skip from just after an opening tag past its closing tag. With no closing
/// tag the rest of the input is dropped.
fn skip_to_closing_tag(chars: &[char], from: usize, tag_name: &str) -> usize {
    let closing: Vec<char> = format!("</{tag_name}").chars().collect();
    let mut i = from;

    while i + closing.len() <= chars.len() {
        let matched = closing
            .iter()
            .enumerate()
            .all(|(k, cc)| chars[i + k].to_ascii_lowercase() == *cc);
        let boundary = chars
            .get(i + closing.len())
            .map_or(true, |c| !c.is_ascii_alphanumeric());
        if matched && boundary {
            return find_char(chars, i, '>').map_or(chars.len(), |close| close + 1);
        }
        i += 1;
    }

    chars.len()
}

fn find_char(chars: &[char], from: usize, target: char) -> Option<usize> {
    chars
        .get(from..)?
        .iter()
        .position(|&c| c == target)
        .map(|offset| from + offset)
}

fn starts_with_at(chars: &[char], at: usize, needle: &str) -> bool {
    let mut i = at;
    for n in needle.chars() {
        if chars.get(i) != Some(&n) {
            return false;
        }
        i += 1;
    }
    true
}

// ---------------------------------------------------------------------------
// URIs and entities
// ---------------------------------------------------------------------------

/// Check a link target against a scheme allow-list.
///
/// Entities are decoded and whitespace, control and invisible characters
/// removed before the scheme is read, the way a browser would see it.
/// Relative URLs, fragments and query-only links have no scheme and are
/// always accepted.
pub fn is_safe_uri(value: &str, allowed_schemes: &[&str]) -> bool {
    let cleaned: String = decode_entities(value)
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control() && !is_invisible(*c))
        .collect();

    match cleaned.find(|c| matches!(c, ':' | '/' | '?' | '#')) {
        Some(idx) if cleaned[idx..].starts_with(':') => {
            let scheme = cleaned[..idx].to_ascii_lowercase();
            allowed_schemes
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(&scheme))
        }
        _ => true,
    }
}

/// Decode numeric character references and the common named entities.
/// Numeric references are decoded with or without the trailing `;`.
fn decode_entities(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        result.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match decode_entity_at(rest) {
            Some((c, consumed)) => {
                result.push(c);
                rest = &rest[consumed..];
            }
            None => {
                result.push('&');
                rest = &rest[1..];
            }
        }
    }
    result.push_str(rest);
    result
}

/// Decode the entity at the start of `text` (which begins with `&`).
/// Returns the character and the number of bytes consumed.
fn decode_entity_at(text: &str) -> Option<(char, usize)> {
    let body = &text[1..];

    if let Some(numeric) = body.strip_prefix('#') {
        let (digits, radix, prefix) = match numeric.strip_prefix('x').or_else(|| numeric.strip_prefix('X')) {
            Some(hex) => (hex, 16, 2),
            None => (numeric, 10, 1),
        };
        let count = digits.chars().take_while(|c| c.is_digit(radix)).count();
        if count == 0 {
            return None;
        }
        let code = u32::from_str_radix(&digits[..count.min(8)], radix).unwrap_or(u32::MAX);
        let c = char::from_u32(code)
            .filter(|&c| c != '\0')
            .unwrap_or('\u{FFFD}');
        let semicolon = usize::from(digits[count..].starts_with(';'));
        return Some((c, 1 + prefix + count + semicolon));
    }

    let end = body.find(';')?;
    let c = match &body[..end] {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{A0}',
        "colon" => ':',
        "Tab" => '\t',
        "NewLine" => '\n',
        "lsqb" | "lbrack" => '[',
        "rsqb" | "rbrack" => ']',
        _ => return None,
    };
    Some((c, end + 2))
}
