//! Advisory hallucination heuristics.
//!
//! The retrieval agent is instructed to quote verbatim and cite every
//! statement; a transcript that breaks those rules is suspicious but still
//! delivered. Validation only produces warnings for telemetry.

use super::postprocess::CITATION_RE;

const ANSWER_MARKER: &str = "ANSWER:";
const DOCUMENT_MARKER: &str = "FULL_POLICY_DOCUMENT:";

/// Hedging phrases the prompt forbids; their presence suggests the agent
/// answered from model memory instead of retrieved documents.
const SUSPICIOUS_PHRASES: &[&str] = &[
    "based on my knowledge",
    "i believe",
    "typically",
    "usually",
    "generally speaking",
    "in my experience",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub warnings: Vec<String>,
    pub citation_count: usize,
    pub has_answer: bool,
    pub has_document: bool,
}

pub fn validate_response(
    transcript: &str,
    max_response_chars: usize,
    require_two_part: bool,
) -> ValidationReport {
    let mut warnings = Vec::new();

    if transcript.len() > max_response_chars {
        warnings.push(format!(
            "Response exceeds maximum size ({} chars)",
            transcript.len()
        ));
    }

    let citation_count = CITATION_RE.find_iter(transcript).count();
    if citation_count == 0 {
        warnings.push("No citations found - possible hallucination".to_string());
    }

    let has_answer = transcript.contains(ANSWER_MARKER);
    let has_document = transcript.contains(DOCUMENT_MARKER);
    if require_two_part && (!has_answer || !has_document) {
        warnings.push(format!(
            "Missing two-part structure (hasAnswer: {has_answer}, hasDocument: {has_document})"
        ));
    }

    let lowered = transcript.to_lowercase();
    let found_suspicious = SUSPICIOUS_PHRASES
        .iter()
        .filter(|phrase| lowered.contains(*phrase))
        .copied()
        .collect::<Vec<_>>();
    if !found_suspicious.is_empty() {
        warnings.push(format!(
            "Contains suspicious phrases: {}",
            found_suspicious.join(", ")
        ));
    }

    ValidationReport {
        is_valid: warnings.is_empty(),
        warnings,
        citation_count,
        has_answer,
        has_document,
    }
}

#[cfg(test)]
mod tests {
    use super::validate_response;

    const MAX_CHARS: usize = 500_000;

    #[test]
    fn well_formed_cited_transcript_is_valid() {
        let transcript = "ANSWER: X applies【policy.pdf】\n\nFULL_POLICY_DOCUMENT: body【policy.pdf】";
        let report = validate_response(transcript, MAX_CHARS, true);

        assert!(report.is_valid, "unexpected warnings: {:?}", report.warnings);
        assert_eq!(report.citation_count, 2);
        assert!(report.has_answer);
        assert!(report.has_document);
    }

    #[test]
    fn missing_citations_warn_of_possible_hallucination() {
        let report = validate_response("ANSWER: a\n\nFULL_POLICY_DOCUMENT: b", MAX_CHARS, true);

        assert!(!report.is_valid);
        assert_eq!(report.citation_count, 0);
        assert!(
            report
                .warnings
                .iter()
                .any(|warning| warning.contains("possible hallucination"))
        );
    }

    #[test]
    fn missing_structure_warns_only_when_required() {
        let transcript = "just some text【a.pdf】";

        let required = validate_response(transcript, MAX_CHARS, true);
        assert!(
            required
                .warnings
                .iter()
                .any(|warning| warning.contains("two-part structure"))
        );

        let relaxed = validate_response(transcript, MAX_CHARS, false);
        assert!(relaxed.is_valid);
    }

    #[test]
    fn hedging_phrases_are_flagged_case_insensitively() {
        let transcript =
            "ANSWER: Generally Speaking, I Believe this is fine【a.pdf】\n\nFULL_POLICY_DOCUMENT: b";
        let report = validate_response(transcript, MAX_CHARS, true);

        let warning = report
            .warnings
            .iter()
            .find(|warning| warning.contains("suspicious phrases"))
            .expect("hedging phrases should be flagged");
        assert!(warning.contains("generally speaking"));
        assert!(warning.contains("i believe"));
    }

    #[test]
    fn single_citation_two_part_transcript_counts_one_citation() {
        let transcript = "ANSWER: HIPAA requires X【policy.pdf】\n\n\
            FULL_POLICY_DOCUMENT: RUSH UNIVERSITY SYSTEM FOR HEALTH\nPolicy Title: HIPAA Privacy\n";
        let report = validate_response(transcript, MAX_CHARS, true);

        assert_eq!(report.citation_count, 1);
        assert!(report.has_answer);
        assert!(report.has_document);
    }

    #[test]
    fn oversized_transcript_is_flagged() {
        let transcript = format!(
            "ANSWER: a【p.pdf】\n\nFULL_POLICY_DOCUMENT: {}",
            "x".repeat(64)
        );
        let report = validate_response(&transcript, 32, true);

        assert!(
            report
                .warnings
                .iter()
                .any(|warning| warning.contains("maximum size"))
        );
    }
}
