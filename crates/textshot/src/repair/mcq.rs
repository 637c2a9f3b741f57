//! Repair stage for multiple-choice question sheets.
//!
//! OCR output from photographed aptitude tests arrives with mangled question
//! markers ("O3:", "Q 12"), assorted option styles ("(A)", "○B", "Opts: C."),
//! digits misread as letters, and options flowing into one another. This
//! stage re-segments the text into a strict sequence of question groups:
//! `Q<n>. <question>` followed by `A.`-`D.` options and a blank line.
//!
//! The stage is total. Text with no recognizable question or option
//! structure is returned unchanged.

use once_cell::sync::Lazy;
use regex::Regex;

static QUESTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[QqOo]\s*)?(\d{1,3})\s*[.):]\s*(.*)$")
        .expect("question marker pattern should compile")
});
static OPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:Opts?[:.]?\s*|Options?[:.]?\s*)?(?:\(([A-Da-d])\)|○\s*([A-Da-d])\b|([A-Da-d])\s*[.)])\s*(.*)$")
        .expect("option marker pattern should compile")
});

#[derive(Debug)]
struct Question {
    number: u32,
    text: String,
    options: Vec<(char, String)>,
}

#[derive(Debug)]
enum Block {
    Passthrough(String),
    Question(Question),
}

/// Normalize one MCQ sheet. Returns the input unchanged when no question or
/// option structure is found.
pub fn repair(text: &str) -> String {
    if text.trim().is_empty() {
        return text.to_string();
    }

    let blocks = segment(&normalize_whitespace(text));
    let has_structure = blocks
        .iter()
        .any(|b| matches!(b, Block::Question(_)));
    if !has_structure {
        return text.to_string();
    }

    render(&blocks)
}

/// Collapse runs of spaces and tabs, trim line ends, normalize newlines.
fn normalize_whitespace(text: &str) -> String {
    text.replace("\r\n", "\n")
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Line scanner: classify each line as a question start, an option, or a
/// continuation of whichever came last.
fn segment(text: &str) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();

    for line in text.lines() {
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = OPTION_RE.captures(line) {
            let label = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().chars().next().unwrap_or('A'))
                .unwrap_or('A')
                .to_ascii_uppercase();
            let body = fix_digit_confusions(caps.get(4).map_or("", |m| m.as_str()).trim());

            if let Some(Block::Question(q)) = blocks.last_mut() {
                q.options.push((label, body));
                continue;
            }
            // Option with no preceding question: synthesize an unnumbered
            // group so the option still gets a standard marker.
            blocks.push(Block::Passthrough(format!("{}. {}", label, body)));
            continue;
        }

        if let Some(caps) = QUESTION_RE.captures(line) {
            let number: u32 = caps
                .get(1)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
            let body = fix_digit_confusions(caps.get(2).map_or("", |m| m.as_str()).trim());
            blocks.push(Block::Question(Question {
                number,
                text: isolate_vocab_tokens(&body),
                options: Vec::new(),
            }));
            continue;
        }

        // Continuation: re-attach to the last option, else the question
        // text, else carry the line through untouched.
        let fixed = fix_digit_confusions(line);
        if let Some(Block::Question(q)) = blocks.last_mut() {
            if let Some((_, body)) = q.options.last_mut() {
                if !body.is_empty() {
                    body.push(' ');
                }
                body.push_str(&fixed);
            } else {
                if !q.text.is_empty() {
                    q.text.push(' ');
                }
                q.text.push_str(&isolate_vocab_tokens(&fixed));
            }
            continue;
        }
        blocks.push(Block::Passthrough(fixed));
    }

    blocks
}

fn render(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        match block {
            Block::Passthrough(line) => {
                out.push_str(line);
                out.push('\n');
            }
            Block::Question(q) => {
                if !out.is_empty() && !out.ends_with("\n\n") {
                    out.push('\n');
                }
                out.push_str(&format!("Q{}. {}\n", q.number, q.text));

                let mut options = q.options.clone();
                options.sort_by_key(|(label, _)| *label);
                for (label, body) in &options {
                    out.push_str(&format!("{}. {}\n", label, body));
                }
                out.push('\n');
            }
        }
    }
    out
}

/// Repair digit/letter confusions inside numbers: a letter commonly misread
/// from a digit is mapped back only when both neighbors are digits.
fn fix_digit_confusions(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        let prev_digit = i > 0 && chars[i - 1].is_ascii_digit();
        let next_digit = chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
        let mapped = if prev_digit && next_digit {
            match c {
                'l' | 'I' => '1',
                'O' | 'o' => '0',
                's' | 'S' => '5',
                'z' | 'Z' => '2',
                _ => c,
            }
        } else {
            c
        };
        out.push(mapped);
    }
    out
}

/// Put standalone all-caps tokens (the target words of vocabulary questions)
/// on their own line, set off with blank lines.
fn isolate_vocab_tokens(text: &str) -> String {
    if !text
        .split_whitespace()
        .any(|t| t.len() >= 3 && t.chars().all(|c| c.is_ascii_uppercase()))
    {
        return text.to_string();
    }

    let mut segments: Vec<String> = Vec::new();
    let mut current = String::new();
    for token in text.split_whitespace() {
        if token.len() >= 3 && token.chars().all(|c| c.is_ascii_uppercase()) {
            if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
            segments.push(String::new());
            segments.push(token.to_string());
            segments.push(String::new());
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(token);
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments.join("\n")
}
