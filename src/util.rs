//! Text helpers shared by the builder and the delivery adapter.

use std::borrow::Cow;

use memchr::{memchr, memchr_iter};
use quick_xml::Reader;
use quick_xml::events::Event;

/// Characters XML 1.0 does not allow anywhere in a document.
fn is_forbidden_xml_char(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}')
}

/// Drop characters that cannot appear in XML (C0 controls other than tab,
/// LF and CR, plus U+FFFE/U+FFFF).
pub fn strip_forbidden_xml_chars(s: &str) -> Cow<'_, str> {
    if s.chars().any(is_forbidden_xml_char) {
        Cow::Owned(s.chars().filter(|&c| !is_forbidden_xml_char(c)).collect())
    } else {
        Cow::Borrowed(s)
    }
}

/// Escape the five predefined XML entities (`& < > " '`).
///
/// Characters XML forbids are removed first.
pub fn escape_xml(s: &str) -> Cow<'_, str> {
    match strip_forbidden_xml_chars(s) {
        Cow::Borrowed(clean) => quick_xml::escape::escape(clean),
        Cow::Owned(clean) => Cow::Owned(quick_xml::escape::escape(&clean).into_owned()),
    }
}

/// Whether a chapter body contains something that looks like a tag.
///
/// A `<` followed by a letter, `/` or `!` counts; a lone `<` in prose
/// ("a < b") does not.
fn has_tag_start(bytes: &[u8]) -> bool {
    memchr_iter(b'<', bytes).any(|i| {
        bytes
            .get(i + 1)
            .is_some_and(|&b| b.is_ascii_alphabetic() || b == b'/' || b == b'!')
    })
}

/// Whether a chapter body is markup that can be embedded verbatim.
///
/// The body must look like it has tags and parse as a well-formed XML
/// fragment: balanced elements, quoted attributes, and only predefined or
/// numeric entity references. Anything else is treated as plain text.
pub fn looks_like_html(body: &str) -> bool {
    has_tag_start(body.as_bytes()) && is_well_formed_fragment(body)
}

fn is_well_formed_fragment(body: &str) -> bool {
    let wrapped = format!("<div>{body}</div>");
    let mut reader = Reader::from_str(&wrapped);
    reader.config_mut().check_end_names = true;

    let mut depth = 0usize;
    let mut closed = false;
    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(_) => return false,
        };
        if closed && !matches!(event, Event::Eof) {
            return false;
        }
        match event {
            Event::Start(e) => {
                if e.attributes().any(|a| a.is_err()) {
                    return false;
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if e.attributes().any(|a| a.is_err()) {
                    return false;
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    closed = true;
                }
            }
            Event::Text(t) => {
                if memchr(b'&', &t).is_some() {
                    return false;
                }
            }
            Event::GeneralRef(r) => {
                let predefined = matches!(&*r, b"amp" | b"lt" | b"gt" | b"quot" | b"apos");
                if !predefined && !matches!(r.resolve_char_ref(), Ok(Some(_))) {
                    return false;
                }
            }
            Event::Decl(_) | Event::DocType(_) | Event::PI(_) => return false,
            Event::Eof => return closed && depth == 0,
            _ => {}
        }
    }
}

/// Render plain text as an XHTML fragment: escaped, newlines as `<br/>`.
pub fn text_to_xhtml(text: &str) -> String {
    let bytes = text.as_bytes();
    if memchr(b'\n', bytes).is_none() {
        return escape_xml(text.trim_end_matches('\r')).into_owned();
    }

    let mut out = String::with_capacity(text.len() + 16);
    let mut start = 0;
    for end in memchr_iter(b'\n', bytes) {
        out.push_str(&escape_xml(text[start..end].trim_end_matches('\r')));
        out.push_str("<br/>");
        start = end + 1;
    }
    out.push_str(&escape_xml(text[start..].trim_end_matches('\r')));
    out
}

/// Chapter body as it goes inside the chapter document's `<div>`.
pub fn chapter_body_xhtml(body: &str) -> Cow<'_, str> {
    let body = strip_forbidden_xml_chars(body);
    if looks_like_html(&body) {
        body
    } else {
        Cow::Owned(text_to_xhtml(&body))
    }
}
