use std::borrow::Cow;

const MAX_API_ERROR_CHARS: usize = 200;
const REDACTED: &str = "[REDACTED]";

/// Token prefixes whose remainder is secret.
const PREFIX_PATTERNS: [&str; 6] = ["sk-", "sk_", "hf_", "ghp_", "AIza", "eyJ"];

/// Markers followed by a secret value.
const MARKER_PATTERNS: [&str; 7] = [
    "Authorization: Bearer ",
    "authorization: bearer ",
    "Bearer ",
    "api_key=",
    "\"api_key\":\"",
    "access_token=",
    "\"access_token\":\"",
];

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '+' | '/' | '=')
}

fn redact_after(scrubbed: &mut String, marker: &str) {
    let mut search_from = 0;
    while let Some(rel) = scrubbed[search_from..].find(marker) {
        let start = search_from + rel;
        let content_start = start + marker.len();
        let end = scrubbed[content_start..]
            .char_indices()
            .find(|(_, c)| !is_secret_char(*c))
            .map_or(scrubbed.len(), |(i, _)| content_start + i);

        if end == content_start {
            search_from = content_start;
            continue;
        }

        scrubbed.replace_range(start..end, REDACTED);
        search_from = start + REDACTED.len();
    }
}

/// Redact API keys and bearer tokens echoed back in provider errors.
pub fn scrub_secret_patterns(input: &str) -> Cow<'_, str> {
    let needs_scrubbing = PREFIX_PATTERNS
        .iter()
        .chain(MARKER_PATTERNS.iter())
        .any(|pattern| input.contains(pattern));
    if !needs_scrubbing {
        return Cow::Borrowed(input);
    }

    let mut scrubbed = input.to_string();
    for marker in MARKER_PATTERNS.iter().chain(PREFIX_PATTERNS.iter()) {
        redact_after(&mut scrubbed, marker);
    }
    Cow::Owned(scrubbed)
}

/// Scrub secrets and truncate provider error bodies for logs and errors.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);
    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed.into_owned();
    }

    let end = scrubbed
        .char_indices()
        .nth(MAX_API_ERROR_CHARS)
        .map_or(scrubbed.len(), |(i, _)| i);
    format!("{}...", &scrubbed[..end])
}
