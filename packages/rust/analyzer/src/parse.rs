//! Extraction of labeled sections from free-form model output.

use std::sync::LazyLock;

use regex::Regex;

use trendbot_shared::NO_SAMPLE_CODE;

/// Characters of raw response used as the summary when no section matches.
const FALLBACK_SUMMARY_CHARS: usize = 200;

/// Everything after a summary label, up to a code label or the end of input.
static SUMMARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)\*\*(?:要約|summary).*?\*\*\s*[:：]?\s*(.*?)\s*(?:\*\*(?:サンプルコード|sample\s*code|コード|code)|\z)",
    )
    .expect("valid summary regex")
});

/// Everything after a sample-code label, to the end of input.
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\*\*(?:サンプルコード|sample\s*code).*?\*\*\s*[:：]?\s*(.*)\z")
        .expect("valid code regex")
});

/// Summary section, or the first 200 characters of the response.
pub fn extract_summary(response: &str) -> String {
    SUMMARY_RE
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| truncate_chars(response.trim(), FALLBACK_SUMMARY_CHARS))
}

/// Sample-code section, or `"none"`.
pub fn extract_sample_code(response: &str) -> String {
    let Some(raw) = CODE_RE
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
    else {
        return NO_SAMPLE_CODE.to_string();
    };

    let bare = raw.trim_matches(|c| matches!(c, '"' | '\'' | '`' | '「' | '」'));
    if bare == "なし" || bare.eq_ignore_ascii_case("none") {
        NO_SAMPLE_CODE.to_string()
    } else {
        strip_fence(raw).to_string()
    }
}

/// Drop a surrounding Markdown code fence, keeping the code inside.
fn strip_fence(code: &str) -> &str {
    let Some(rest) = code.strip_prefix("```") else {
        return code;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// First `max` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
