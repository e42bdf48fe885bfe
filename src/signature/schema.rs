use super::types::{
    Dimension, DimensionTable, DimensionValue, MatchKind, ToneSignature, clamp_unit,
};
use crate::error::ValidationError;
use serde_json::Value;
use std::collections::BTreeMap;

/// Default score for an exact label match when the model reports none.
const EXACT_DEFAULT_SCORE: f64 = 1.0;
/// Default score for a synonym match when the model reports none.
const SYNONYM_DEFAULT_SCORE: f64 = 0.75;
const MAX_KEY_PHRASES: usize = 20;

/// Free-text label to canonical label, per dimension. Keys are normalized.
const SYNONYMS: &[(Dimension, &str, &str)] = &[
    (Dimension::Tone, "serious", "formal"),
    (Dimension::Tone, "conversational", "casual"),
    (Dimension::Tone, "relaxed", "casual"),
    (Dimension::Tone, "laid-back", "casual"),
    (Dimension::Tone, "informal", "casual"),
    (Dimension::Tone, "approachable", "friendly"),
    (Dimension::Tone, "welcoming", "friendly"),
    (Dimension::Tone, "cheerful", "friendly"),
    (Dimension::Tone, "businesslike", "professional"),
    (Dimension::Tone, "business", "professional"),
    (Dimension::Tone, "corporate", "professional"),
    (Dimension::Tone, "confident", "authoritative"),
    (Dimension::Tone, "commanding", "authoritative"),
    (Dimension::Tone, "expert", "authoritative"),
    (Dimension::Tone, "empathetic", "warm"),
    (Dimension::Tone, "caring", "warm"),
    (Dimension::Tone, "compassionate", "warm"),
    (Dimension::Tone, "straightforward", "direct"),
    (Dimension::Tone, "blunt", "direct"),
    (Dimension::Tone, "concise", "direct"),
    (Dimension::LanguageStyle, "scientific", "technical"),
    (Dimension::LanguageStyle, "jargon-heavy", "technical"),
    (Dimension::LanguageStyle, "engineering", "technical"),
    (Dimension::LanguageStyle, "casual", "conversational"),
    (Dimension::LanguageStyle, "informal", "conversational"),
    (Dimension::LanguageStyle, "chatty", "conversational"),
    (Dimension::LanguageStyle, "scholarly", "academic"),
    (Dimension::LanguageStyle, "formal", "professional"),
    (Dimension::LanguageStyle, "business", "professional"),
    (Dimension::LanguageStyle, "corporate", "professional"),
    (Dimension::LanguageStyle, "imaginative", "creative"),
    (Dimension::LanguageStyle, "playful", "creative"),
    (Dimension::LanguageStyle, "narrative", "creative"),
    (Dimension::Formality, "very formal", "formal"),
    (Dimension::Formality, "highly formal", "formal"),
    (Dimension::Formality, "professional", "formal"),
    (Dimension::Formality, "semiformal", "semi-formal"),
    (Dimension::Formality, "neutral", "semi-formal"),
    (Dimension::Formality, "moderate", "semi-formal"),
    (Dimension::Formality, "moderately formal", "semi-formal"),
    (Dimension::Formality, "casual", "informal"),
    (Dimension::Formality, "relaxed", "informal"),
    (Dimension::AddressStyle, "second person", "direct"),
    (Dimension::AddressStyle, "second-person", "direct"),
    (Dimension::AddressStyle, "you", "direct"),
    (Dimension::AddressStyle, "implicit", "indirect"),
    (Dimension::AddressStyle, "first person", "personal"),
    (Dimension::AddressStyle, "first-person", "personal"),
    (Dimension::AddressStyle, "third person", "impersonal"),
    (Dimension::AddressStyle, "third-person", "impersonal"),
    (Dimension::AddressStyle, "passive", "impersonal"),
    (Dimension::AddressStyle, "neutral", "impersonal"),
    (Dimension::AddressStyle, "inclusive", "collective"),
    (Dimension::AddressStyle, "we", "collective"),
    (Dimension::AddressStyle, "plural", "collective"),
    (Dimension::EmotionalAppeal, "logical", "rational"),
    (Dimension::EmotionalAppeal, "analytical", "rational"),
    (Dimension::EmotionalAppeal, "factual", "rational"),
    (Dimension::EmotionalAppeal, "informative", "rational"),
    (Dimension::EmotionalAppeal, "neutral", "rational"),
    (Dimension::EmotionalAppeal, "empathetic", "emotional"),
    (Dimension::EmotionalAppeal, "passionate", "emotional"),
    (Dimension::EmotionalAppeal, "motivational", "inspirational"),
    (Dimension::EmotionalAppeal, "aspirational", "inspirational"),
    (Dimension::EmotionalAppeal, "uplifting", "inspirational"),
    (Dimension::EmotionalAppeal, "funny", "humorous"),
    (Dimension::EmotionalAppeal, "witty", "humorous"),
    (Dimension::EmotionalAppeal, "playful", "humorous"),
    (Dimension::EmotionalAppeal, "credible", "authoritative"),
    (Dimension::EmotionalAppeal, "expert", "authoritative"),
    (Dimension::EmotionalAppeal, "trustworthy", "authoritative"),
];

/// One dimension as reported by the model, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDimension {
    pub label: Option<String>,
    pub score: Option<f64>,
}

impl RawDimension {
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            score: None,
        }
    }

    pub fn scored(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: Some(label.into()),
            score: Some(score),
        }
    }
}

/// Unvalidated dimension map plus the model's self-reported extras.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSignature {
    pub dimensions: BTreeMap<String, RawDimension>,
    pub confidence: Option<f64>,
    pub key_phrases: Vec<String>,
}

impl RawSignature {
    pub fn with_dimension(mut self, key: impl Into<String>, value: RawDimension) -> Self {
        self.dimensions.insert(key.into(), value);
        self
    }

    /// Read a raw signature out of a JSON object.
    ///
    /// Dimensions may sit at the top level or under `"dimensions"`; each is
    /// either a bare label string or an object with `label` (or `value`) and
    /// an optional `score`.
    pub fn from_json(value: &Value) -> Result<Self, String> {
        let object = value
            .as_object()
            .ok_or_else(|| "signature must be a JSON object".to_string())?;

        let mut raw = Self {
            confidence: object.get("confidence").and_then(number),
            key_phrases: object
                .get("key_phrases")
                .and_then(Value::as_array)
                .map(|phrases| {
                    phrases
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            ..Self::default()
        };

        let dimension_source = object
            .get("dimensions")
            .and_then(Value::as_object)
            .unwrap_or(object);

        for (key, entry) in dimension_source {
            if matches!(key.as_str(), "confidence" | "key_phrases" | "dimensions") {
                continue;
            }
            let parsed = match entry {
                Value::String(label) => RawDimension::labelled(label.clone()),
                Value::Object(fields) => RawDimension {
                    label: ["label", "value", "name"]
                        .iter()
                        .find_map(|field| fields.get(*field).and_then(Value::as_str))
                        .map(str::to_string),
                    score: ["score", "confidence", "strength"]
                        .iter()
                        .find_map(|field| fields.get(*field).and_then(number)),
                },
                _ => continue,
            };
            raw.dimensions.insert(key.clone(), parsed);
        }

        Ok(raw)
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Lowercase, trim, `_` to `-`, collapse whitespace, drop stray punctuation.
pub fn normalize_label(label: &str) -> String {
    let lowered = label.to_lowercase().replace('_', "-");
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!' | '"' | '\'' | '`'))
        .trim()
        .to_string()
}

/// Map a free-text label onto `dimension`'s label set.
pub fn resolve_label(dimension: Dimension, label: &str) -> Option<(&'static str, MatchKind)> {
    let normalized = normalize_label(label);
    let hyphenated = normalized.replace(' ', "-");

    if let Some(exact) = dimension
        .labels()
        .iter()
        .find(|candidate| **candidate == normalized || **candidate == hyphenated)
    {
        return Some((exact, MatchKind::Exact));
    }

    SYNONYMS
        .iter()
        .find(|(dim, from, _)| *dim == dimension && (*from == normalized || *from == hyphenated))
        .map(|(_, _, to)| (*to, MatchKind::Synonym))
}

/// Validate a raw dimension map into a complete [`ToneSignature`].
///
/// Every dimension is always present in the output. Dimensions the model
/// left out or labelled with something unmappable receive their fallback
/// label with score 0, and overall confidence shrinks by the fraction of
/// dimensions that were not exact matches. Only a map with no recognizable
/// dimension key at all is rejected.
pub fn validate(
    raw: &RawSignature,
    source_fingerprint: impl Into<String>,
) -> Result<ToneSignature, ValidationError> {
    let mut resolved: BTreeMap<Dimension, &RawDimension> = BTreeMap::new();
    for (key, value) in &raw.dimensions {
        let Some(dimension) = Dimension::from_key(key) else {
            tracing::debug!(key = key.as_str(), "Ignoring unknown signature dimension");
            continue;
        };
        let canonical = super::types::normalize_key(key) == dimension.key();
        if canonical || !resolved.contains_key(&dimension) {
            resolved.insert(dimension, value);
        }
    }

    if resolved.is_empty() {
        return Err(ValidationError::NoDimensions);
    }

    let mut non_exact = 0_u32;
    let values = Dimension::ALL.map(|dimension| {
        let matched = resolved.get(&dimension).and_then(|entry| {
            let label = entry.label.as_deref()?;
            let (canonical, kind) = resolve_label(dimension, label)?;
            Some((canonical, kind, entry.score))
        });

        match matched {
            Some((label, kind, score)) => {
                let default = if kind == MatchKind::Exact {
                    EXACT_DEFAULT_SCORE
                } else {
                    non_exact += 1;
                    SYNONYM_DEFAULT_SCORE
                };
                DimensionValue {
                    label: label.to_string(),
                    score: score.map_or(default, clamp_unit),
                    match_kind: kind,
                }
            }
            None => {
                non_exact += 1;
                DimensionValue::fallback(dimension)
            }
        }
    });

    let base = raw.confidence.map_or(1.0, clamp_unit);
    #[allow(clippy::cast_precision_loss)]
    let confidence = base * (1.0 - f64::from(non_exact) / Dimension::ALL.len() as f64);

    let mut key_phrases: Vec<String> = Vec::new();
    for phrase in &raw.key_phrases {
        let phrase = phrase.trim();
        if phrase.is_empty()
            || key_phrases
                .iter()
                .any(|existing| existing.eq_ignore_ascii_case(phrase))
        {
            continue;
        }
        key_phrases.push(phrase.to_string());
        if key_phrases.len() == MAX_KEY_PHRASES {
            break;
        }
    }

    Ok(ToneSignature::new(
        DimensionTable::from_values(values),
        confidence,
        source_fingerprint.into(),
        key_phrases,
    ))
}
