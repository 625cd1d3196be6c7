// SPDX-License-Identifier: MIT
//! # Response Normalization
//!
//! Models asked for "only a JSON array" still wrap their answer in markdown
//! fences often enough that the raw text cannot be handed to a JSON parser
//! directly. Two independent transforms undo that:
//!
//! - [`strip_code_fence`]: ```` ```lang\n...\n``` ```` becomes `...`
//! - [`strip_backticks`]: `` `...` `` becomes `...` (exactly one from each end)
//!
//! [`normalize_response`] applies them in that order after trimming. Fence
//! extraction always runs first so that a fenced block is never mistaken for
//! a single-backtick span.

use std::sync::LazyLock;

use regex::Regex;

/// Opening fence with optional language tag, lazily matched body, closing fence.
static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^```(\w*)?\s*\n?(.*?)\n?\s*```$").expect("fence pattern is valid")
});

/// Extracts the content of a fenced block spanning the whole input.
///
/// Input is matched as given (callers trim first). When the input is not a
/// fenced block, or the block is empty, the input is returned unchanged.
///
/// # Examples
///
/// ```rust
/// use food_parse::strip_code_fence;
///
/// assert_eq!(strip_code_fence("```json\n[1, 2]\n```"), "[1, 2]");
/// assert_eq!(strip_code_fence("[1, 2]"), "[1, 2]");
/// ```
pub fn strip_code_fence(text: &str) -> &str {
    match FENCE.captures(text).and_then(|caps| caps.get(2)) {
        Some(body) if !body.as_str().is_empty() => body.as_str().trim(),
        _ => text,
    }
}

/// Removes exactly one backtick from each end when both ends carry one.
///
/// ```rust
/// use food_parse::strip_backticks;
///
/// assert_eq!(strip_backticks("`[]`"), "[]");
/// assert_eq!(strip_backticks("``[]``"), "`[]`");
/// assert_eq!(strip_backticks("[]"), "[]");
/// ```
pub fn strip_backticks(text: &str) -> &str {
    if text.len() >= 2 && text.starts_with('`') && text.ends_with('`') {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// Trims, unwraps a fenced block, then strips a single-backtick span.
pub fn normalize_response(raw: &str) -> &str {
    strip_backticks(strip_code_fence(raw.trim()))
}
