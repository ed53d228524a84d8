//! Substitution engine: applies a replacement record to slide markup.
//!
//! Matches are rewritten in reverse document order so earlier offsets stay
//! valid across edits within the same part. A token fragmented across runs
//! is consolidated into the first spanned run — that run's formatting wins —
//! and the merged-out sibling runs are deleted. Unresolved and unknown
//! tokens are left verbatim in the markup and surfaced through the
//! [`SubstitutionReport`]; they never fail a run.

use crate::error::Result;
use crate::opc::packuri::PackURI;
use crate::template::catalog::Catalog;
use crate::template::scanner::{self, TokenMatch};
use crate::template::tokens::TokenSet;
use quick_xml::escape::escape;
use std::collections::BTreeMap;
use std::ops::Range;

/// A key→value record of replacement values.
///
/// Fields not referenced by any token are ignored; tokens whose field is
/// absent stay in the output verbatim and are reported as unresolved.
#[derive(Debug, Clone, Default)]
pub struct ReplacementRecord {
    values: BTreeMap<String, String>,
}

impl ReplacementRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field's replacement value.
    pub fn set<K: Into<String>, V: Into<String>>(mut self, field: K, value: V) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    /// Get a field's replacement value.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Number of fields in the record.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the record holds no fields.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ReplacementRecord {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Per-slide substitution outcome.
#[derive(Debug, Clone)]
pub struct SlideReport {
    /// Partname of the slide this report covers
    partname: String,

    /// Replacements performed, keyed by record field
    resolved: BTreeMap<String, usize>,

    /// Tokens found in markup whose field was absent from the record,
    /// keyed by record field
    unresolved: BTreeMap<String, usize>,

    /// Delimiter-pair bodies matching no known token, in order of appearance
    unknown: Vec<String>,
}

impl SlideReport {
    /// Partname of the slide this report covers.
    pub fn partname(&self) -> &str {
        &self.partname
    }

    /// Replacements performed, keyed by record field.
    pub fn resolved(&self) -> &BTreeMap<String, usize> {
        &self.resolved
    }

    /// Fields whose tokens were present but had no record value.
    pub fn unresolved(&self) -> &BTreeMap<String, usize> {
        &self.unresolved
    }

    /// Unknown delimiter-pair bodies.
    pub fn unknown(&self) -> &[String] {
        &self.unknown
    }
}

/// Aggregated substitution outcome across all slides.
///
/// A non-empty unresolved or unknown section is a warning state: the
/// template's placeholders and the supplied record disagree, and the
/// offending tokens remain visible in the output document.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionReport {
    slides: Vec<SlideReport>,
}

impl SubstitutionReport {
    /// Per-slide reports in presentation order.
    pub fn slides(&self) -> &[SlideReport] {
        &self.slides
    }

    /// Total number of replacements performed.
    pub fn total_resolved(&self) -> usize {
        self.slides.iter().map(|s| s.resolved.values().sum::<usize>()).sum()
    }

    /// Total number of tokens left unresolved.
    pub fn total_unresolved(&self) -> usize {
        self.slides
            .iter()
            .map(|s| s.unresolved.values().sum::<usize>())
            .sum()
    }

    /// Total number of unknown delimiter pairs.
    pub fn total_unknown(&self) -> usize {
        self.slides.iter().map(|s| s.unknown.len()).sum()
    }

    /// True when every token found was resolved and nothing unknown
    /// appeared.
    pub fn is_clean(&self) -> bool {
        self.total_unresolved() == 0 && self.total_unknown() == 0
    }
}

/// Apply a replacement record to every slide markup part in the catalog.
///
/// Substitution never fails on token-level mismatches; those are aggregated
/// into the returned report. Re-applying the same record to an already
/// substituted catalog is a no-op (the tokens are gone).
pub fn apply(
    catalog: &mut Catalog,
    record: &ReplacementRecord,
    tokens: &TokenSet,
) -> Result<SubstitutionReport> {
    let slides: Vec<PackURI> = catalog.slides().to_vec();
    let mut report = SubstitutionReport::default();

    for slide in slides {
        let xml = catalog.package().part_blob(&slide)?.to_vec();
        let scan = scanner::scan(&xml, tokens)?;

        let mut slide_report = SlideReport {
            partname: slide.as_str().to_string(),
            resolved: BTreeMap::new(),
            unresolved: BTreeMap::new(),
            unknown: scan.unknown().to_vec(),
        };

        let mut resolved: Vec<(&TokenMatch, &str)> = Vec::new();
        for m in scan.matches() {
            // Validated token sets guarantee the name maps to a field
            let Some(field) = tokens.field_for(&m.name) else {
                continue;
            };
            match record.get(field) {
                Some(value) => {
                    resolved.push((m, value));
                    *slide_report.resolved.entry(field.to_string()).or_insert(0) += 1;
                },
                None => {
                    *slide_report
                        .unresolved
                        .entry(field.to_string())
                        .or_insert(0) += 1;
                },
            }
        }

        if !resolved.is_empty() {
            let rewritten = rewrite_slide(&xml, &scan, &resolved)?;
            catalog.package_mut().set_part_blob(&slide, rewritten)?;
        }

        report.slides.push(slide_report);
    }

    Ok(report)
}

/// Per-run edit state while substitutions are applied.
struct RunState {
    text: String,
    modified: bool,
    deleted: bool,
}

/// Rewrite one slide's XML, splicing replacement values into the matched
/// runs and dropping runs emptied by consolidation.
fn rewrite_slide(
    xml: &[u8],
    scan: &scanner::SlideScan,
    resolved: &[(&TokenMatch, &str)],
) -> Result<Vec<u8>> {
    let mut states: Vec<RunState> = scan
        .runs
        .iter()
        .map(|r| RunState {
            text: r.text.clone(),
            modified: false,
            deleted: false,
        })
        .collect();

    // Reverse document order keeps earlier offsets valid across edits
    for (m, value) in resolved.iter().rev() {
        let span = &m.span;
        let suffix = states[span.end_run].text[span.end_offset..].to_string();
        let first = &mut states[span.start_run];
        first.text.truncate(span.start_offset);
        first.text.push_str(value);
        first.text.push_str(&suffix);
        first.modified = true;

        // Runs merged into the first one carry nothing of their own anymore
        for state in &mut states[span.start_run + 1..=span.end_run] {
            state.deleted = true;
        }
    }

    // Translate run states into disjoint byte-range edits against the raw
    // XML, in ascending order
    let mut edits: Vec<(Range<usize>, Vec<u8>)> = Vec::new();
    for (run, state) in scan.runs.iter().zip(states.iter()) {
        if state.deleted {
            edits.push((run.element_span.clone(), Vec::new()));
        } else if state.modified {
            let Some(loc) = &run.text_loc else { continue };
            let escaped = escape(state.text.as_str());
            let replacement = if loc.empty_elem {
                format!("<{tag}>{escaped}</{tag}>", tag = loc.tag).into_bytes()
            } else {
                escaped.into_owned().into_bytes()
            };
            edits.push((loc.span.clone(), replacement));
        }
    }
    edits.sort_by_key(|(range, _)| range.start);

    let mut out = Vec::with_capacity(xml.len());
    let mut cursor = 0;
    for (range, replacement) in edits {
        out.extend_from_slice(&xml[cursor..range.start]);
        out.extend_from_slice(&replacement);
        cursor = range.end;
    }
    out.extend_from_slice(&xml[cursor..]);

    Ok(out)
}
