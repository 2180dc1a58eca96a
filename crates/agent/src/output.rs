//! Output shaping for model answers.
//!
//! Chat answers are flattened to a single line of prose. Recommendation
//! answers are parsed as a JSON array of article ids, falling back to
//! the raw string when the model ignored its format instructions.

use tracing::warn;

/// Collapse an answer to one line.
///
/// Handles both real newlines and the literal `\n` / `\r` escape
/// sequences models sometimes emit, then collapses all runs of
/// whitespace to single spaces. Idempotent.
pub fn normalize_whitespace(text: &str) -> String {
    let unescaped = text.replace("\\n", " ").replace("\\r", " ");
    unescaped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Flatten a single streamed chunk.
///
/// Streaming splits the answer at arbitrary token boundaries, so the
/// full [`normalize_whitespace`] pass cannot run per chunk: trimming or
/// collapsing would glue words together across chunk edges. Instead,
/// newlines and carriage returns (real and literal-escaped) each become
/// one space and everything else is left alone.
pub fn flatten_chunk(chunk: &str) -> String {
    chunk
        .replace("\\n", " ")
        .replace("\\r", " ")
        .replace(['\n', '\r'], " ")
}

/// The shaped output of a recommendation run.
#[derive(Debug, Clone, PartialEq)]
pub enum RecommendationOutput {
    /// The model complied: a list of article ids.
    ArticleIds(Vec<String>),
    /// The model answered in prose; passed through untouched.
    Raw(String),
}

/// Parse a recommendation answer.
///
/// Accepts leading/trailing whitespace around the JSON array. Anything
/// that is not a parseable array of strings falls back to the raw text
/// with a warning — a malformed answer is degraded output, not a
/// failure.
pub fn parse_article_ids(answer: &str) -> RecommendationOutput {
    let trimmed = answer.trim();

    if trimmed.starts_with('[') {
        // Ids are strings; a mixed array is treated as non-compliant output
        match serde_json::from_str::<Vec<String>>(trimmed) {
            Ok(ids) => return RecommendationOutput::ArticleIds(ids),
            Err(e) => {
                warn!(error = %e, "Recommendation answer looked like JSON but did not parse");
            }
        }
    } else {
        warn!("Recommendation answer was not a JSON array, passing through raw");
    }

    RecommendationOutput::Raw(answer.to_string())
}
