//! Marker grammar: one choice per line, correctness given by a line marker.
//!
//! ```text
//! Q: Capital of France?
//! time=20
//! [x] Paris
//! [ ] Lyon
//! - Nice
//! Marseille (correct)
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::{
    Grammar, Line, ParseOptions, ParsedChoice, ParsedQuestion, Rejection, check_choices,
    content_lines, parse_body,
};

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Matches a `time=<seconds>` directive; the value may be garbage.
static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^time\s*=\s*(.*)$").expect("time directive regex")
});

/// Matches `[x] text` / `[X] text`.
static CHECKED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[\s*[xX]\s*\]\s*(.*)$").expect("checked box regex")
});

/// Matches `[ ] text`.
static UNCHECKED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[\s*\]\s*(.*)$").expect("unchecked box regex")
});

/// Matches `+ text` / `* text`.
static PLUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+*](?:\s+|$)(.*)$").expect("plus bullet regex")
});

/// Matches `- text`.
static MINUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-(?:\s+|$)(.*)$").expect("minus bullet regex")
});

/// Matches a trailing `(correct)` / `(richtig)` suffix.
static CORRECT_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*\((?:correct|richtig)\)\s*$").expect("correct suffix regex")
});

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse content with the marker grammar.
///
/// A `time=` directive is recognised on any line after the body; when several
/// are present the last one wins.
pub(crate) fn parse(content: &str, opts: &ParseOptions) -> Result<ParsedQuestion, Rejection> {
    let lines = content_lines(content);
    let (first, rest) = lines.split_first().ok_or(Rejection::Empty)?;
    let text = parse_body(first.text)?;

    let mut time_limit = opts.default_time_limit;
    let mut choices = Vec::new();

    for line in rest {
        if let Some(caps) = TIME_RE.captures(line.text) {
            time_limit = match caps[1].trim().parse::<i64>() {
                Ok(seconds) => opts.clamp(seconds),
                Err(_) => {
                    tracing::debug!(line = line.number, value = &caps[1], "unparsable time directive");
                    opts.default_time_limit
                }
            };
            continue;
        }
        choices.push(classify(line)?);
    }

    check_choices(&choices)?;

    Ok(ParsedQuestion {
        text,
        time_limit,
        choices,
        grammar: Grammar::Marker,
    })
}

/// Classify a single choice line and strip its marker.
fn classify(line: &Line<'_>) -> Result<ParsedChoice, Rejection> {
    let (raw, forced) = match CORRECT_SUFFIX_RE.find(line.text) {
        Some(m) => (&line.text[..m.start()], true),
        None => (line.text, false),
    };

    let (text, marked) = if let Some(caps) = CHECKED_RE.captures(raw) {
        (caps.get(1).map_or("", |m| m.as_str()), true)
    } else if let Some(caps) = UNCHECKED_RE.captures(raw) {
        (caps.get(1).map_or("", |m| m.as_str()), false)
    } else if let Some(caps) = PLUS_RE.captures(raw) {
        (caps.get(1).map_or("", |m| m.as_str()), true)
    } else if let Some(caps) = MINUS_RE.captures(raw) {
        (caps.get(1).map_or("", |m| m.as_str()), false)
    } else {
        (raw, false)
    };

    let text = text.trim();
    if text.is_empty() {
        return Err(Rejection::EmptyChoice { line: line.number });
    }

    Ok(ParsedChoice {
        text: text.to_string(),
        is_correct: marked || forced,
    })
}
