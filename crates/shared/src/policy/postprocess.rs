//! Transcript cleanup for the blocking response path.
//!
//! Inline citation markers are collected (unique, first-seen order),
//! stripped from the body, and re-appended once as a numbered footer.

use std::sync::LazyLock;

use regex::{Captures, Regex};

pub(crate) static CITATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"【([^】]+)】").expect("citation pattern should compile"));

static EXCESS_NEWLINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("newline pattern should compile"));

const FOOTER_DIVIDER: &str =
    "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

pub fn post_process_response(transcript: &str) -> String {
    let mut citations: Vec<String> = Vec::new();
    let body = CITATION_RE.replace_all(transcript, |captures: &Captures| {
        let token = captures[1].to_string();
        if !citations.contains(&token) {
            citations.push(token);
        }
        ""
    });

    let body = body.replace("**", "");
    let mut cleaned = EXCESS_NEWLINES_RE.replace_all(&body, "\n\n").into_owned();

    if !citations.is_empty() {
        cleaned.push_str(&format!("\n\n{FOOTER_DIVIDER}\nSOURCE CITATIONS\n{FOOTER_DIVIDER}\n"));
        for (index, citation) in citations.iter().enumerate() {
            cleaned.push_str(&format!("[{}] {citation}\n", index + 1));
        }
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::post_process_response;

    #[test]
    fn citations_are_deduplicated_in_first_seen_order() {
        let input = "First【a】 middle【b】 again【a】.";
        let output = post_process_response(input);

        assert!(output.contains("[1] a\n"));
        assert!(output.contains("[2] b\n"));
        assert!(!output.contains("[3]"));
        assert!(!output.contains('【'));
    }

    #[test]
    fn citation_stripping_is_idempotent() {
        let input = "Policy text【source†file.pdf】 continues.";
        let once = post_process_response(input);
        let twice = post_process_response(&once);

        assert_eq!(once, twice);
        assert_eq!(once.matches("SOURCE CITATIONS").count(), 1);
    }

    #[test]
    fn bold_markers_are_removed() {
        let output = post_process_response("**I. Policy** applies to **all staff**.");
        assert_eq!(output, "I. Policy applies to all staff.");
    }

    #[test]
    fn runs_of_blank_lines_collapse_to_one() {
        let output = post_process_response("first\n\n\n\n\nsecond");
        assert_eq!(output, "first\n\nsecond");
    }

    #[test]
    fn body_without_citations_gets_no_footer() {
        let output = post_process_response("plain body text");
        assert!(!output.contains("SOURCE CITATIONS"));
    }
}
