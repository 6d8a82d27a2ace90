//! Tolerant extraction of the PolicyTech document header.
//!
//! Every field is matched independently by its own label-anchored pattern;
//! a capture stops at the next known label, a table-cell `|` delimiter, or
//! end-of-line, so adjacent cells never bleed into each other. Extraction
//! never fails: fields that cannot be found surface as the literal
//! "Not specified" sentinel the document format mandates.

use std::sync::LazyLock;

use regex::Regex;

pub const NOT_SPECIFIED: &str = "Not specified";
pub const INSTITUTION_NAME: &str = "RUSH UNIVERSITY SYSTEM FOR HEALTH";
pub const REFERENCE_NOTICE: &str = "Printed copies are for reference only.";

/// Header parsing is bounded: labels past this many lines are not searched.
const MAX_HEADER_LINES: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub policy_number: String,
    pub policy_title: String,
    pub effective_date: String,
    pub department: String,
    pub document_owner: String,
    pub approver: String,
    pub date_created: String,
    pub date_approved: String,
    pub date_updated: String,
    pub review_due: String,
    pub applies_to: String,
    pub institution: String,
    pub notice: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            policy_number: NOT_SPECIFIED.to_string(),
            policy_title: NOT_SPECIFIED.to_string(),
            effective_date: NOT_SPECIFIED.to_string(),
            department: NOT_SPECIFIED.to_string(),
            document_owner: NOT_SPECIFIED.to_string(),
            approver: NOT_SPECIFIED.to_string(),
            date_created: NOT_SPECIFIED.to_string(),
            date_approved: NOT_SPECIFIED.to_string(),
            date_updated: NOT_SPECIFIED.to_string(),
            review_due: NOT_SPECIFIED.to_string(),
            applies_to: NOT_SPECIFIED.to_string(),
            institution: INSTITUTION_NAME.to_string(),
            notice: REFERENCE_NOTICE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    PolicyNumber,
    ReferenceNumber,
    PolicyTitle,
    EffectiveDate,
    Department,
    DocumentOwner,
    Approver,
    DateCreated,
    DateApproved,
    DateUpdated,
    ReviewDue,
    AppliesTo,
}

/// Declarative rule table: one label pattern per field, all evaluated
/// against the same header text with no ordering dependence.
const FIELD_LABELS: &[(Field, &str)] = &[
    (Field::PolicyTitle, r"Policy\s*Title"),
    (Field::PolicyNumber, r"Policy\s*(?:Number|#)"),
    (Field::ReferenceNumber, r"Reference\s*Number"),
    (Field::EffectiveDate, r"Effective\s*Date"),
    (Field::Department, r"Department"),
    (Field::DocumentOwner, r"Document\s*Owner"),
    (Field::Approver, r"Approver(?:\(s\))?"),
    (Field::DateCreated, r"Date\s*Created"),
    (Field::DateApproved, r"Date\s*Approved"),
    (Field::DateUpdated, r"Date\s*Updated"),
    (Field::ReviewDue, r"Review\s*Due"),
    (Field::AppliesTo, r"Applies\s*To"),
];

static FIELD_RULES: LazyLock<Vec<(Field, Regex)>> = LazyLock::new(|| {
    let boundary = FIELD_LABELS
        .iter()
        .map(|(_, label)| format!("(?:{label})"))
        .collect::<Vec<_>>()
        .join("|");

    FIELD_LABELS
        .iter()
        .map(|(field, label)| {
            let pattern =
                format!(r"(?im){label}\s*:?\s*([^|\r\n]*?)\s*(?:\||(?:{boundary})\s*:|$)");
            (
                *field,
                Regex::new(&pattern).expect("metadata field pattern should compile"),
            )
        })
        .collect()
});

pub fn extract_metadata(document: &str) -> Metadata {
    let header = document
        .lines()
        .take(MAX_HEADER_LINES)
        .collect::<Vec<_>>()
        .join("\n");

    let mut metadata = Metadata::default();
    let mut reference_number = None;
    let mut date_approved = None;

    for (field, pattern) in FIELD_RULES.iter() {
        let Some(value) = pattern
            .captures(&header)
            .and_then(|captures| captures.get(1))
            .map(|capture| normalize_value(capture.as_str()))
            .filter(|value| !value.is_empty())
        else {
            continue;
        };

        match field {
            Field::PolicyNumber => metadata.policy_number = value,
            Field::ReferenceNumber => reference_number = Some(value),
            Field::PolicyTitle => metadata.policy_title = value,
            Field::EffectiveDate => metadata.effective_date = value,
            Field::Department => metadata.department = value,
            Field::DocumentOwner => metadata.document_owner = value,
            Field::Approver => metadata.approver = value,
            Field::DateCreated => metadata.date_created = value,
            Field::DateApproved => {
                date_approved = Some(value.clone());
                metadata.date_approved = value;
            }
            Field::DateUpdated => metadata.date_updated = value,
            Field::ReviewDue => metadata.review_due = value,
            Field::AppliesTo => metadata.applies_to = value,
        }
    }

    // Alias fields stand in for their canonical counterpart when the
    // canonical label is absent from the header.
    if metadata.policy_number == NOT_SPECIFIED
        && let Some(reference_number) = reference_number
    {
        metadata.policy_number = reference_number;
    }
    if metadata.effective_date == NOT_SPECIFIED
        && let Some(date_approved) = date_approved
    {
        metadata.effective_date = date_approved;
    }

    metadata
}

fn normalize_value(raw: &str) -> String {
    let value = raw
        .replace("**", "")
        .replace('☒', "[x]")
        .replace('☑', "[x]")
        .replace('☐', "[ ]");
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
