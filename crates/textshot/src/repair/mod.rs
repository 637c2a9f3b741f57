//! Post-recognition text repair.
//!
//! Two specialized stages ([`mcq`], [`math`]) plus a general enhancement
//! driver. Every transform here is total: it operates on best-effort OCR
//! output that can be arbitrarily malformed, so on anything unexpected it
//! degrades to returning its input unchanged instead of failing.

pub mod math;
pub mod mcq;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::table;
use crate::types::RecognitionOptions;

static MCQ_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\d+\s*[.)]\s*.*?\n\s*(?:[A-Z][.)]\s*.*?\n){2,}")
        .expect("MCQ block pattern should compile")
});
static MCQ_OPTION_RUN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)(?:\n\s*[A-Z][.)]\s*.*?){3,}").expect("option run pattern should compile")
});
static MATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\d+\s*[+\-×÷=\^])|(?:\d+\.\d+)|(?:\(\d+\))|(?:[<>]=?)|(?:\d+\s*/\s*\d+)")
        .expect("math pattern should compile")
});

static SPACE_BEFORE_PUNCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+([.,;:!?])").expect("punctuation pattern should compile"));
static HYPHEN_BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)-\n(\w+)").expect("hyphen break pattern should compile"));
static SENTENCE_SPACING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([.!?])([A-Z])").expect("sentence spacing pattern should compile"));
static OPERATOR_SPACING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*([+\-=*/])\s*").expect("operator spacing pattern should compile"));

/// Does the text look like it contains a question with lettered options?
pub fn has_mcq_pattern(text: &str) -> bool {
    MCQ_BLOCK_RE.is_match(text) || MCQ_OPTION_RUN_RE.is_match(text)
}

/// Does the text look like it contains arithmetic or scientific notation?
pub fn has_math_pattern(text: &str) -> bool {
    MATH_RE.is_match(text)
}

/// General enhancement pipeline for recognized text.
///
/// Dispatches to the MCQ and math stages when their patterns match, then
/// tries tabular reconstruction, then applies final cleanups. A text that
/// was replaced by a reconstructed table skips the character-level cleanups,
/// which would corrupt the table's alignment padding and separator rows.
pub fn enhance(text: &str, options: &RecognitionOptions) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut out = text.to_string();

    if has_mcq_pattern(&out) {
        out = mcq::repair(&out);
    }
    if has_math_pattern(&out) {
        out = math::repair(&out);
    }

    let looks_tabular = out.contains('\t')
        || out
            .lines()
            .any(|line| line.contains("  ") && line.chars().any(|c| c.is_ascii_digit()));
    if looks_tabular {
        if let Some(rendered) = table::from_delimited(&out, options.table_format) {
            return rendered.replace("\r\n", "\n");
        }
    } else if options.detect_tables {
        if let Some(rendered) = table::from_implicit(&out) {
            return rendered.replace("\r\n", "\n");
        }
    }

    cleanup(&out)
}

/// Character-level finishing pass: newline normalization, punctuation
/// spacing, hyphenated line-break rejoining, sentence spacing, operator
/// spacing.
fn cleanup(text: &str) -> String {
    let out = text.replace("\r\n", "\n");
    let out = SPACE_BEFORE_PUNCT_RE.replace_all(&out, "$1");
    let out = HYPHEN_BREAK_RE.replace_all(&out, "$1$2\n");
    let out = SENTENCE_SPACING_RE.replace_all(&out, "$1 $2");
    let out = OPERATOR_SPACING_RE.replace_all(&out, " $1 ");
    out.into_owned()
}
