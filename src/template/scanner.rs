//! Run-aware token scanner for slide markup.
//!
//! PowerPoint routinely splits visually contiguous text across several
//! `<a:r>` formatting runs, so a placeholder like `{{NAME}}` may be spread
//! over two or three runs with nothing but markup between its characters.
//! Searching the serialized XML for the token literal misses those.
//!
//! The scanner instead reconstructs the slide's rendered text — the
//! concatenation of every run's text content in document order — together
//! with an index mapping each byte of that concatenation back to its
//! `(run, offset)` coordinates. Token patterns are then literal-searched
//! over the rendered text, and each hit is translated back into a
//! [`RunSpan`] the engine can rewrite without touching unrelated markup.

use crate::error::{Result, TemplateError};
use crate::template::tokens::TokenSet;
use memchr::memmem;
use quick_xml::Reader;
use quick_xml::events::Event;
use quick_xml::escape::unescape;
use std::ops::Range;

/// Where a run's text lives in the raw XML.
#[derive(Debug, Clone)]
pub(crate) struct TextLoc {
    /// Byte range of the text content; for an empty `<a:t/>` element this
    /// covers the whole element so a rewrite can expand it in place
    pub(crate) span: Range<usize>,

    /// True when the text element was self-closing (`<a:t/>`)
    pub(crate) empty_elem: bool,

    /// The text element's tag name as written (e.g. "a:t")
    pub(crate) tag: String,
}

/// One formatting run (`<a:r>`) as found in a slide part.
#[derive(Debug, Clone)]
pub(crate) struct Run {
    /// Byte range of the whole `<a:r>...</a:r>` element
    pub(crate) element_span: Range<usize>,

    /// Location of the run's text content, when the run carries a text
    /// element at all
    pub(crate) text_loc: Option<TextLoc>,

    /// Unescaped rendered text of this run
    pub(crate) text: String,
}

/// A located region spelling one complete placeholder token.
///
/// Offsets are byte offsets within the named run's rendered text;
/// `end_offset` is exclusive. A span never crosses a slide-part boundary,
/// and spans produced by one scan never overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpan {
    /// Index of the run the token starts in
    pub start_run: usize,

    /// Byte offset of the token's first character within the start run
    pub start_offset: usize,

    /// Index of the run the token ends in
    pub end_run: usize,

    /// Exclusive byte offset of the token's end within the end run
    pub end_offset: usize,
}

/// One recognized token occurrence.
#[derive(Debug, Clone)]
pub struct TokenMatch {
    /// The token name between the delimiters
    pub name: String,

    /// Run/offset coordinates of the full token literal
    pub span: RunSpan,

    /// Byte offset of the match in the rendered-text concatenation
    pub start: usize,

    /// Byte length of the full token literal
    pub len: usize,
}

/// Result of scanning one slide part.
#[derive(Debug)]
pub struct SlideScan {
    pub(crate) runs: Vec<Run>,

    /// Recognized token occurrences, ordered by position
    matches: Vec<TokenMatch>,

    /// Delimiter-pair bodies that matched no known token, in order of
    /// appearance (duplicates preserved)
    unknown: Vec<String>,

    /// The rendered-text concatenation the matches were found in
    rendered: String,
}

impl SlideScan {
    /// Recognized token occurrences in document order.
    pub fn matches(&self) -> &[TokenMatch] {
        &self.matches
    }

    /// Delimiter-pair bodies that matched no known token.
    pub fn unknown(&self) -> &[String] {
        &self.unknown
    }

    /// The slide's rendered text: all run text concatenated in document
    /// order, ignoring formatting-run boundaries.
    pub fn rendered_text(&self) -> &str {
        &self.rendered
    }
}

/// Scan a slide markup part for placeholder tokens.
pub fn scan(xml: &[u8], tokens: &TokenSet) -> Result<SlideScan> {
    let runs = parse_runs(xml)?;

    // Rendered text plus a per-byte back-index into (run, offset)
    let mut rendered = String::new();
    let mut back: Vec<(usize, usize)> = Vec::new();
    for (run_idx, run) in runs.iter().enumerate() {
        for offset in 0..run.text.len() {
            back.push((run_idx, offset));
        }
        rendered.push_str(&run.text);
    }

    let mut matches = Vec::new();
    for token in tokens.tokens() {
        let literal = tokens.literal(token.name());
        let finder = memmem::Finder::new(literal.as_bytes());
        for start in finder.find_iter(rendered.as_bytes()) {
            let len = literal.len();
            let (start_run, start_offset) = back[start];
            let (end_run, last_offset) = back[start + len - 1];
            matches.push(TokenMatch {
                name: token.name().to_string(),
                span: RunSpan {
                    start_run,
                    start_offset,
                    end_run,
                    end_offset: last_offset + 1,
                },
                start,
                len,
            });
        }
    }
    matches.sort_by_key(|m| m.start);
    debug_assert!(
        matches
            .windows(2)
            .all(|w| w[0].start + w[0].len <= w[1].start),
        "token matches must not overlap"
    );

    let unknown = scan_unknown(&rendered, tokens, &matches);

    Ok(SlideScan {
        runs,
        matches,
        unknown,
        rendered,
    })
}

/// Find delimiter pairs whose body is not a recognized token name.
fn scan_unknown(rendered: &str, tokens: &TokenSet, matches: &[TokenMatch]) -> Vec<String> {
    let open = tokens.open();
    let close = tokens.close();
    let mut unknown = Vec::new();

    let mut pos = 0;
    while let Some(rel) = rendered[pos..].find(open) {
        let open_at = pos + rel;

        // Skip positions already claimed by a recognized token
        if matches
            .iter()
            .any(|m| open_at >= m.start && open_at < m.start + m.len)
        {
            pos = open_at + open.len();
            continue;
        }

        let body_start = open_at + open.len();
        let Some(close_rel) = rendered[body_start..].find(close) else {
            break;
        };
        let body = &rendered[body_start..body_start + close_rel];

        // An opening delimiter inside the body means this pair was not a
        // token at all; resume at the inner opener
        if body.contains(open) {
            pos = body_start;
            continue;
        }

        unknown.push(body.to_string());
        pos = body_start + close_rel + close.len();
    }

    unknown
}

/// Parse the `<a:r>` runs of a slide part, tracking byte spans into the raw
/// XML for both the run elements and their text content.
fn parse_runs(xml: &[u8]) -> Result<Vec<Run>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut runs = Vec::new();
    let mut run_start: Option<usize> = None;
    let mut text_loc: Option<TextLoc> = None;
    let mut run_text = String::new();

    let mut in_t = false;
    let mut t_tag = String::new();
    let mut t_content: Option<Range<usize>> = None;

    loop {
        let pos_before = reader.buffer_position() as usize;
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| TemplateError::Xml(format!("slide parse error: {}", e)))?;
        let pos_after = reader.buffer_position() as usize;

        match event {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"r" if run_start.is_none() => {
                    run_start = Some(pos_before);
                    text_loc = None;
                    run_text.clear();
                },
                b"t" if run_start.is_some() && text_loc.is_none() => {
                    in_t = true;
                    t_tag = std::str::from_utf8(e.name().as_ref())?.to_string();
                    t_content = None;
                },
                _ => {},
            },
            Event::Empty(ref e) => {
                if e.local_name().as_ref() == b"t" && run_start.is_some() && text_loc.is_none() {
                    text_loc = Some(TextLoc {
                        span: pos_before..pos_after,
                        empty_elem: true,
                        tag: std::str::from_utf8(e.name().as_ref())?.to_string(),
                    });
                }
            },
            Event::Text(ref e) if in_t => {
                let raw = std::str::from_utf8(e.as_ref())?;
                let piece =
                    unescape(raw).map_err(|e| TemplateError::Xml(e.to_string()))?;
                run_text.push_str(&piece);
                t_content = Some(match t_content.take() {
                    Some(range) => range.start..pos_after,
                    None => pos_before..pos_after,
                });
            },
            Event::CData(ref e) if in_t => {
                run_text.push_str(std::str::from_utf8(e.as_ref())?);
                t_content = Some(match t_content.take() {
                    Some(range) => range.start..pos_after,
                    None => pos_before..pos_after,
                });
            },
            // Entity and character references arrive as their own events,
            // not as part of the surrounding text
            Event::GeneralRef(ref e) if in_t => {
                let ch = match e.resolve_char_ref()? {
                    Some(ch) => ch,
                    None => match &**e {
                        b"amp" => '&',
                        b"lt" => '<',
                        b"gt" => '>',
                        b"apos" => '\'',
                        b"quot" => '"',
                        name => {
                            return Err(TemplateError::Xml(format!(
                                "unresolvable entity reference '&{};'",
                                String::from_utf8_lossy(name)
                            )));
                        },
                    },
                };
                run_text.push(ch);
                t_content = Some(match t_content.take() {
                    Some(range) => range.start..pos_after,
                    None => pos_before..pos_after,
                });
            },
            Event::End(ref e) => match e.local_name().as_ref() {
                b"t" if in_t => {
                    in_t = false;
                    let span = t_content
                        .take()
                        // <a:t></a:t>: zero-width insertion point before the
                        // closing tag
                        .unwrap_or(pos_before..pos_before);
                    text_loc = Some(TextLoc {
                        span,
                        empty_elem: false,
                        tag: std::mem::take(&mut t_tag),
                    });
                },
                b"r" => {
                    if let Some(start) = run_start.take() {
                        runs.push(Run {
                            element_span: start..pos_after,
                            text_loc: text_loc.take(),
                            text: std::mem::take(&mut run_text),
                        });
                    }
                },
                _ => {},
            },
            Event::Eof => break,
            _ => {},
        }
        buf.clear();
    }

    Ok(runs)
}
