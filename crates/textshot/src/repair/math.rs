//! Repair stage for arithmetic and scientific notation.
//!
//! Total transform, applied when the math pattern matches or an MCQ sheet
//! carries arithmetic. Fixes the notation OCR most often mangles: decimal
//! separators, multiplication glyphs, compound inequalities, unit spacing,
//! and chemical-formula subscripts.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static DECIMAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*[.,;]\s*(\d+)").expect("decimal pattern should compile"));
static EXPONENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*\^\s*(\d+)").expect("exponent pattern should compile"));
static FRACTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*/\s*(\d+)").expect("fraction pattern should compile"));
static MULTIPLY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*[xX*]\s*(\d+)").expect("multiply pattern should compile"));
static EQUALS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*=\s*").expect("equals pattern should compile"));
static UNIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*([µmcdk]?(?:m|g|s|A|K|mol|cd|Hz|N|Pa|J|W|C|V|F|Ω|S|Wb|T|H|lm|lx))\b")
        .expect("unit pattern should compile")
});
static RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*[-\u{2013}\u{2014}]\s*(\d+)").expect("range pattern should compile"));
static SUBSCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z][a-z]?)(\d+)").expect("subscript pattern should compile"));
static SQUARE_METER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*m\s*2\b").expect("square meter pattern should compile"));
static CUBIC_METER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*m\s*3\b").expect("cubic meter pattern should compile"));
static PERCENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*(?:percent|pct|%)").expect("percent pattern should compile"));
static PERCENT_OCR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*[oO0]/[oO0]").expect("percent glyph pattern should compile"));
static COMPOUND_INEQ_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[≤≥<>]\s*=\s*").expect("inequality pattern should compile"));
static EQUATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+\s*[+\-×÷=]").expect("equation pattern should compile"));
static EQUATION_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+\s*[+\-×÷=][^\n]*?)(\n\d+\.)").expect("equation block pattern should compile")
});

fn to_subscript_digits(digits: &str) -> String {
    digits
        .chars()
        .map(|c| match c {
            '0' => '₀',
            '1' => '₁',
            '2' => '₂',
            '3' => '₃',
            '4' => '₄',
            '5' => '₅',
            '6' => '₆',
            '7' => '₇',
            '8' => '₈',
            '9' => '₉',
            other => other,
        })
        .collect()
}

/// Normalize arithmetic and scientific notation in recognized text.
pub fn repair(text: &str) -> String {
    let out = DECIMAL_RE.replace_all(text, "$1.$2");
    let out = EXPONENT_RE.replace_all(&out, "$1^$2");
    let out = FRACTION_RE.replace_all(&out, "$1/$2");
    let out = MULTIPLY_RE.replace_all(&out, "$1 × $2");
    let out = EQUALS_RE.replace_all(&out, " = ");
    let out = UNIT_RE.replace_all(&out, |caps: &Captures| {
        format!("{} {}", &caps[1], caps[2].to_lowercase())
    });
    let out = RANGE_RE.replace_all(&out, "$1-$2");
    let out = SUBSCRIPT_RE.replace_all(&out, |caps: &Captures| {
        format!("{}{}", &caps[1], to_subscript_digits(&caps[2]))
    });
    let out = SQUARE_METER_RE.replace_all(&out, "$1 m²");
    let out = CUBIC_METER_RE.replace_all(&out, "$1 m³");
    let out = PERCENT_RE.replace_all(&out, "$1%");
    let out = PERCENT_OCR_RE.replace_all(&out, "$1%");
    let out = COMPOUND_INEQ_RE.replace_all(&out, |caps: &Captures| {
        let m = caps.get(0).map_or("", |m| m.as_str());
        if m.contains('<') || m.contains('≤') {
            "≤ ".to_string()
        } else {
            "≥ ".to_string()
        }
    });

    // Equation-heavy text: open a blank line before each new numbered line
    // so problem blocks read separately.
    let mut out = out.into_owned();
    if EQUATION_RE.is_match(&out) {
        out = EQUATION_BLOCK_RE.replace_all(&out, "$1\n$2").into_owned();
    }
    out
}
