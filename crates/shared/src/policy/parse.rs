//! Deterministic transcript splitting.
//!
//! An agent transcript is expected to contain an `ANSWER:` section followed
//! by a `FULL_POLICY_DOCUMENT:` section, but neither marker is guaranteed.
//! Parsing is total: malformed input degrades to a best-effort split and is
//! logged, never failed.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::metadata::{Metadata, extract_metadata};

static ANSWER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)ANSWER:\s*(.*?)(?:━+\s*PART\s*2|FULL_POLICY_DOCUMENT:|\z)")
        .expect("answer pattern should compile")
});

static DOCUMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)FULL_POLICY_DOCUMENT:\s*(.*?)(?:━+\s*SOURCE\s+CITATIONS|\z)")
        .expect("document pattern should compile")
});

static DIVIDER_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"━+").expect("divider pattern should compile"));

static PART_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*PART\s+\d+\s*[-–].*$").expect("part header pattern should compile")
});

static RULE_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[-=]{3,}\s*$").expect("rule pattern should compile"));

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub answer: String,
    pub full_document: String,
    pub metadata: Metadata,
}

/// Split a transcript into answer and document sections.
///
/// Fallback policy when markers are missing:
/// - no answer and no document marker: the whole transcript becomes the
///   document;
/// - answer found but no document marker: the document stays empty so the
///   answer text is never duplicated into both fields.
pub fn parse_response(transcript: &str) -> ParsedResponse {
    let answer = ANSWER_RE
        .captures(transcript)
        .and_then(|captures| captures.get(1))
        .map(|section| clean_answer(section.as_str()))
        .unwrap_or_default();

    let mut full_document = DOCUMENT_RE
        .captures(transcript)
        .and_then(|captures| captures.get(1))
        .map(|section| section.as_str().trim().to_string())
        .unwrap_or_default();

    if full_document.is_empty() {
        if answer.is_empty() {
            debug!("transcript has neither section marker; treating it all as document");
            full_document = transcript.trim().to_string();
        } else {
            debug!("transcript has an answer but no document marker; document left empty");
        }
    }

    let metadata = extract_metadata(&full_document);

    ParsedResponse {
        answer,
        full_document,
        metadata,
    }
}

fn clean_answer(raw: &str) -> String {
    let without_dividers = DIVIDER_RUN_RE.replace_all(raw, "");
    let without_part_headers = PART_HEADER_RE.replace_all(&without_dividers, "");
    let without_rules = RULE_LINE_RE.replace_all(&without_part_headers, "");
    without_rules.trim().to_string()
}
