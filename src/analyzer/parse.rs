use crate::error::ToneError;
use crate::signature::{RawSignature, ToneSignature, validate};
use serde_json::Value;

/// Pull the first JSON object out of a model response that may wrap it in
/// prose or a code fence.
pub fn extract_json_object(response: &str) -> Option<Value> {
    let trimmed = strip_code_fence(response.trim());
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let bytes = trimmed.as_bytes();
    let mut search_from = 0;
    while let Some(rel) = trimmed[search_from..].find('{') {
        let start = search_from + rel;
        if let Some(end) = balanced_object_end(bytes, start)
            && let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&trimmed[start..=end])
        {
            return Some(value);
        }
        search_from = start + 1;
    }
    None
}

/// Remove a surrounding ```lang ... ``` fence, if present.
pub fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Index of the `}` closing the object opened at `start`, skipping braces
/// inside string literals.
fn balanced_object_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0_usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse and validate an analysis response into a signature.
pub fn parse_signature_response(
    response: &str,
    source_fingerprint: &str,
) -> Result<ToneSignature, ToneError> {
    let value = extract_json_object(response)
        .ok_or_else(|| ToneError::Parse("no JSON object in analysis response".into()))?;
    let raw = RawSignature::from_json(&value).map_err(ToneError::Parse)?;
    validate(&raw, source_fingerprint).map_err(|err| ToneError::Parse(err.to_string()))
}

/// Parse a `{"fluency": n}` response into a score in [0, 100].
pub fn parse_fluency_response(response: &str) -> Result<f64, ToneError> {
    let score = match extract_json_object(response) {
        Some(value) => ["fluency", "score"]
            .iter()
            .find_map(|key| match value.get(*key)? {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .ok_or_else(|| ToneError::Parse("fluency response has no score".into()))?,
        None => response
            .trim()
            .parse::<f64>()
            .map_err(|_| ToneError::Parse("fluency response is not JSON".into()))?,
    };

    if score.is_finite() {
        Ok(score.clamp(0.0, 100.0))
    } else {
        Err(ToneError::Parse("fluency score is not finite".into()))
    }
}
