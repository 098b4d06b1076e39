//! Markdown code-fence stripping for LLM output

use std::sync::LazyLock;

use regex::Regex;

static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("fence pattern is valid")
});

/// Replace the first fenced block with its contents and trim the result.
/// Text without a fence is only trimmed.
pub fn strip_code_fence(text: &str) -> String {
    FENCE.replacen(text, 1, "$1").trim().to_string()
}
