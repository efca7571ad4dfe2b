//! Candidate extraction from evaluator replies.

use regex::Regex;
use std::sync::LazyLock;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+#.-]*[ \t]*\r?\n(.*?)```").expect("valid fence regex")
});

/// Pull the candidate source out of an evaluator reply.
///
/// The longest fenced block wins; replies often quote short snippets in
/// their prose before the full rewrite. Returns `None` when the reply has
/// no fenced block.
pub fn extract_code_block(reply: &str) -> Option<String> {
    FENCED_BLOCK
        .captures_iter(reply)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|body| !body.trim().is_empty())
        .max_by_key(|body| body.len())
        .map(str::to_string)
}
