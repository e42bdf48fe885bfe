use crate::analyzer::parse::strip_code_fence;

/// Labels models like to put in front of the rewritten text.
const LEADING_LABELS: [&str; 4] = [
    "rewritten text:",
    "rewritten version:",
    "rewrite:",
    "here is the rewritten text:",
];

const QUOTE_PAIRS: [(char, char); 4] = [('"', '"'), ('\'', '\''), ('“', '”'), ('‘', '’')];

/// Trim, drop empties, and de-duplicate case-insensitively, keeping the
/// first spelling.
pub fn normalize_keywords<S: AsRef<str>>(keywords: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(keywords.len());
    for keyword in keywords {
        let keyword = keyword.as_ref().trim();
        if keyword.is_empty() || out.iter().any(|k| k.to_lowercase() == keyword.to_lowercase()) {
            continue;
        }
        out.push(keyword.to_string());
    }
    out
}

/// Keywords not found in `text` (case-insensitive substring match).
pub fn missing_keywords(text: &str, keywords: &[String]) -> Vec<String> {
    let haystack = text.to_lowercase();
    keywords
        .iter()
        .filter(|keyword| !haystack.contains(&keyword.to_lowercase()))
        .cloned()
        .collect()
}

/// Strip fences, a leading "Rewritten text:" label and wrapping quotes.
pub fn clean_output(raw: &str) -> String {
    let mut text = strip_code_fence(raw.trim()).trim();

    for label in LEADING_LABELS {
        if text.len() >= label.len()
            && text.is_char_boundary(label.len())
            && text[..label.len()].eq_ignore_ascii_case(label)
        {
            text = text[label.len()..].trim_start();
            break;
        }
    }

    for (open, close) in QUOTE_PAIRS {
        if text.chars().count() >= 2
            && let Some(inner) = text
                .strip_prefix(open)
                .and_then(|rest| rest.strip_suffix(close))
            && !inner.contains(open)
        {
            text = inner.trim();
            break;
        }
    }

    text.to_string()
}
