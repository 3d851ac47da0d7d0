//! Plain-text question file parser.
//!
//! Turns the raw bytes of one question file into a [`ParsedQuestion`] or a
//! [`Rejection`] explaining why the file is not importable. Two grammars are
//! supported, each applied to the whole file:
//!
//! 1. **Marker grammar** (canonical, tried first): body line, optional
//!    `time=<seconds>` directive, then one choice per line classified by
//!    `[x]` / `[ ]` / `+` / `*` / `-` markers or a `(correct)` suffix.
//! 2. **Numeric-header grammar** (legacy fallback): body line, choice count,
//!    optional skipped count, then `N` pairs of text and `true`/`false` flag.
//!
//! Both grammars share the same validation gate: a non-empty body, at least
//! two choices, and at least one correct choice.

mod legacy;
mod marker;

use std::borrow::Cow;
use std::sync::LazyLock;

use quizbank_shared::TimeLimitConfig;
use regex::Regex;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Result of a successful parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuestion {
    /// Question body with any `Q:` / `Question:` prefix removed.
    pub text: String,
    /// Display time limit in seconds, already clamped.
    pub time_limit: u32,
    /// Choices in file order.
    pub choices: Vec<ParsedChoice>,
    /// Grammar that accepted the file.
    pub grammar: Grammar,
}

/// One answer option as written in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChoice {
    pub text: String,
    pub is_correct: bool,
}

/// Which file grammar produced a [`ParsedQuestion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    Marker,
    NumericHeader,
}

impl std::fmt::Display for Grammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Marker => f.write_str("marker"),
            Self::NumericHeader => f.write_str("numeric-header"),
        }
    }
}

/// Why a file is not importable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("file has no content")]
    Empty,

    #[error("question body is empty")]
    EmptyBody,

    #[error("choice on line {line} is empty once its marker is removed")]
    EmptyChoice { line: usize },

    #[error("expected at least 2 choices, found {found}")]
    TooFewChoices { found: usize },

    #[error("no choice is marked correct")]
    NoCorrectChoice,

    #[error("malformed numeric header: {0}")]
    Header(String),
}

/// Time limit handling for the `time=` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub default_time_limit: u32,
    pub min_time_limit: u32,
    pub max_time_limit: u32,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::from(&TimeLimitConfig::default())
    }
}

impl From<&TimeLimitConfig> for ParseOptions {
    fn from(limits: &TimeLimitConfig) -> Self {
        Self {
            default_time_limit: limits.default,
            min_time_limit: limits.min,
            max_time_limit: limits.max,
        }
    }
}

impl ParseOptions {
    /// Clamp a requested time limit into the configured range.
    ///
    /// An inverted range (`min > max`) resolves to `max`.
    pub(crate) fn clamp(&self, seconds: i64) -> u32 {
        let clamped = seconds
            .max(i64::from(self.min_time_limit))
            .min(i64::from(self.max_time_limit));
        u32::try_from(clamped).unwrap_or(self.default_time_limit)
    }
}

// ---------------------------------------------------------------------------
// Shared line handling
// ---------------------------------------------------------------------------

/// Matches a `Q:` or `Question:` body prefix.
static BODY_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:question|q)\s*:\s*").expect("body prefix regex")
});

/// A non-blank, trimmed line with its 1-based line number.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Line<'a> {
    pub number: usize,
    pub text: &'a str,
}

/// Split content into non-blank trimmed lines, keeping original line numbers.
pub(crate) fn content_lines(content: &str) -> Vec<Line<'_>> {
    content
        .lines()
        .enumerate()
        .filter_map(|(i, raw)| {
            let text = raw.trim();
            (!text.is_empty()).then_some(Line { number: i + 1, text })
        })
        .collect()
}

/// Extract the question body from the first line.
pub(crate) fn parse_body(first: &str) -> Result<String, Rejection> {
    let body = BODY_PREFIX_RE.replace(first, "");
    let body = body.trim();
    if body.is_empty() {
        return Err(Rejection::EmptyBody);
    }
    Ok(body.to_string())
}

/// Apply the shared validation gate to a parsed choice list.
pub(crate) fn check_choices(choices: &[ParsedChoice]) -> Result<(), Rejection> {
    if choices.len() < 2 {
        return Err(Rejection::TooFewChoices {
            found: choices.len(),
        });
    }
    if !choices.iter().any(|c| c.is_correct) {
        return Err(Rejection::NoCorrectChoice);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Decode raw file bytes: UTF-8 (BOM stripped), else Latin-1.
pub fn decode(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}

/// Parse the raw bytes of one question file.
pub fn parse_bytes(bytes: &[u8], opts: &ParseOptions) -> Result<ParsedQuestion, Rejection> {
    parse_question(&decode(bytes), opts)
}

/// Parse question file content, trying the marker grammar first and the
/// numeric-header grammar second.
///
/// When the numeric-header grammar does not apply at all (line 2 is not a
/// count), the marker grammar's rejection is returned.
pub fn parse_question(content: &str, opts: &ParseOptions) -> Result<ParsedQuestion, Rejection> {
    let marker_err = match marker::parse(content, opts) {
        Ok(parsed) => return Ok(parsed),
        Err(e) => e,
    };

    match legacy::parse(content, opts) {
        Some(Ok(parsed)) => {
            tracing::debug!(choices = parsed.choices.len(), "accepted by numeric-header grammar");
            Ok(parsed)
        }
        Some(Err(legacy_err)) => Err(legacy_err),
        None => Err(marker_err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> ParseOptions {
        ParseOptions::default()
    }

    #[test]
    fn capital_of_france() {
        let content = "Capital of France?\n[x] Paris\n[ ] Lyon\n[ ] Nice\n";
        let q = parse_question(content, &opts()).expect("parse");
        assert_eq!(q.text, "Capital of France?");
        assert_eq!(q.time_limit, 30);
        assert_eq!(q.choices.len(), 3);
        let correct: Vec<_> = q
            .choices
            .iter()
            .filter(|c| c.is_correct)
            .map(|c| c.text.as_str())
            .collect();
        assert_eq!(correct, vec!["Paris"]);
        assert_eq!(q.grammar, Grammar::Marker);
    }

    #[test]
    fn parsing_is_deterministic() {
        let content = "Q: Pick primes\ntime=45\n+ 2\n* 3\n- 4\n9 (correct)\n";
        let a = parse_question(content, &opts()).expect("first");
        let b = parse_question(content, &opts()).expect("second");
        assert_eq!(a, b);
    }

    #[test]
    fn single_choice_is_rejected() {
        let content = "Capital of France?\n[x] Paris\n";
        assert_eq!(
            parse_question(content, &opts()),
            Err(Rejection::TooFewChoices { found: 1 })
        );
    }

    #[test]
    fn legacy_file_falls_back() {
        let content = "Largest planet?\n3\nJupiter\ntrue\nMars\nfalse\nVenus\nfalse\n";
        let q = parse_question(content, &opts()).expect("parse legacy");
        assert_eq!(q.grammar, Grammar::NumericHeader);
        assert_eq!(q.choices.len(), 3);
        assert!(q.choices[0].is_correct);
    }

    #[test]
    fn legacy_rejection_reported_when_header_present() {
        let content = "Largest planet?\n3\nJupiter\ntrue\nMars\nfalse\n";
        let err = parse_question(content, &opts()).unwrap_err();
        assert!(matches!(err, Rejection::Header(_)));
    }

    #[test]
    fn marker_rejection_reported_without_header() {
        let content = "Capital of France?\nParis\nLyon\n";
        assert_eq!(
            parse_question(content, &opts()),
            Err(Rejection::NoCorrectChoice)
        );
    }

    #[test]
    fn empty_file_rejected() {
        assert_eq!(parse_question("\n  \n", &opts()), Err(Rejection::Empty));
    }

    #[test]
    fn decode_strips_bom() {
        let bytes = b"\xEF\xBB\xBFQ: Hi?\n[x] a\n[ ] b\n";
        let q = parse_bytes(bytes, &opts()).expect("parse");
        assert_eq!(q.text, "Hi?");
    }

    #[test]
    fn decode_falls_back_to_latin1() {
        // "Größe?" in Latin-1
        let mut bytes = b"Gr\xF6\xDFe?\n".to_vec();
        bytes.extend_from_slice(b"[x] gross\n[ ] klein\n");
        let q = parse_bytes(&bytes, &opts()).expect("parse");
        assert_eq!(q.text, "Größe?");
    }

    #[test]
    fn crlf_line_endings() {
        let content = "Capital of France?\r\n[x] Paris\r\n[ ] Lyon\r\n";
        let q = parse_question(content, &opts()).expect("parse");
        assert_eq!(q.choices[1].text, "Lyon");
    }

    #[test]
    fn options_from_time_limit_config() {
        let limits = TimeLimitConfig {
            default: 60,
            min: 10,
            max: 120,
        };
        let o = ParseOptions::from(&limits);
        assert_eq!(o.clamp(5), 10);
        assert_eq!(o.clamp(500), 120);
        assert_eq!(o.clamp(90), 90);
    }

    #[test]
    fn inverted_range_resolves_to_max() {
        let o = ParseOptions {
            default_time_limit: 30,
            min_time_limit: 100,
            max_time_limit: 20,
        };
        assert_eq!(o.clamp(5), 20);
        assert_eq!(o.clamp(500), 20);
        let q = parse_question("Q?\ntime=60\n[x] a\n[ ] b\n", &o).expect("parse");
        assert_eq!(q.time_limit, 20);
    }

    #[test]
    fn huge_header_count_is_a_rejection() {
        let content = "Pick?\n9223372036854775808\nA\ntrue\nB\nfalse\n";
        assert!(matches!(
            parse_question(content, &opts()),
            Err(Rejection::Header(_))
        ));
    }
}
