//! Numeric-header grammar used by older question files.
//!
//! ```text
//! Largest planet?
//! 3
//! 0            <- optional extra count, skipped
//! Jupiter
//! true
//! Mars
//! false
//! Venus
//! no
//! ```

use crate::{
    Grammar, ParseOptions, ParsedChoice, ParsedQuestion, Rejection, check_choices,
    content_lines, parse_body,
};

/// Parse content with the numeric-header grammar.
///
/// Returns `None` when the file does not have a numeric header at all, so the
/// caller can report the marker grammar's rejection instead.
pub(crate) fn parse(
    content: &str,
    opts: &ParseOptions,
) -> Option<Result<ParsedQuestion, Rejection>> {
    let lines = content_lines(content);
    let count_line = lines.get(1)?;
    let count: usize = count_line.text.parse().ok()?;

    Some(parse_with_count(&lines, count, opts))
}

fn parse_with_count(
    lines: &[crate::Line<'_>],
    count: usize,
    opts: &ParseOptions,
) -> Result<ParsedQuestion, Rejection> {
    let text = parse_body(lines[0].text)?;

    if count < 2 {
        return Err(Rejection::TooFewChoices { found: count });
    }

    let mut body = &lines[2..];
    let expected = count
        .checked_mul(2)
        .ok_or_else(|| Rejection::Header(format!("count {count} is too large")))?;
    if body.len() == expected + 1 && body[0].text.parse::<u64>().is_ok() {
        body = &body[1..];
    }
    if body.len() != expected {
        return Err(Rejection::Header(format!(
            "count {count} needs {expected} choice lines, found {}",
            body.len()
        )));
    }

    let choices = body
        .chunks_exact(2)
        .map(|pair| {
            let flag = parse_flag(pair[1].text).ok_or_else(|| {
                Rejection::Header(format!(
                    "line {}: '{}' is not a true/false flag",
                    pair[1].number, pair[1].text
                ))
            })?;
            Ok(ParsedChoice {
                text: pair[0].text.to_string(),
                is_correct: flag,
            })
        })
        .collect::<Result<Vec<_>, Rejection>>()?;

    check_choices(&choices)?;

    Ok(ParsedQuestion {
        text,
        time_limit: opts.default_time_limit,
        choices,
        grammar: Grammar::NumericHeader,
    })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
