use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Minimum weight an assigned label keeps in the signature embedding, so a
/// zero-score label still points somewhere in label space.
const LABEL_FLOOR: f32 = 0.05;

/// The five fixed tone dimensions, in signature order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Dimension {
    Tone,
    LanguageStyle,
    Formality,
    AddressStyle,
    EmotionalAppeal,
}

impl Dimension {
    pub const ALL: [Self; 5] = [
        Self::Tone,
        Self::LanguageStyle,
        Self::Formality,
        Self::AddressStyle,
        Self::EmotionalAppeal,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            Self::Tone => "tone",
            Self::LanguageStyle => "language_style",
            Self::Formality => "formality",
            Self::AddressStyle => "address_style",
            Self::EmotionalAppeal => "emotional_appeal",
        }
    }

    /// Alternate keys models use for the same dimension.
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Tone => &["overall_tone"],
            Self::LanguageStyle => &["style", "language"],
            Self::Formality => &["formality_level", "level_of_formality"],
            Self::AddressStyle => &["forms_of_address", "form_of_address", "address"],
            Self::EmotionalAppeal => &["appeal", "emotion"],
        }
    }

    pub const fn labels(self) -> &'static [&'static str] {
        match self {
            Self::Tone => &[
                "formal",
                "casual",
                "friendly",
                "professional",
                "authoritative",
                "warm",
                "direct",
            ],
            Self::LanguageStyle => &[
                "technical",
                "conversational",
                "academic",
                "professional",
                "creative",
            ],
            Self::Formality => &["formal", "semi-formal", "informal"],
            Self::AddressStyle => &["direct", "indirect", "personal", "impersonal", "collective"],
            Self::EmotionalAppeal => &[
                "rational",
                "emotional",
                "inspirational",
                "humorous",
                "authoritative",
            ],
        }
    }

    /// Label assigned when the model's answer cannot be mapped.
    pub const fn fallback_label(self) -> &'static str {
        match self {
            Self::Tone | Self::Formality => "formal",
            Self::LanguageStyle => "professional",
            Self::AddressStyle => "direct",
            Self::EmotionalAppeal => "rational",
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Resolve a canonical key or alias (case/separator-insensitive).
    pub fn from_key(key: &str) -> Option<Self> {
        let normalized = normalize_key(key);
        Self::ALL.into_iter().find(|dimension| {
            dimension.key() == normalized || dimension.aliases().contains(&normalized.as_str())
        })
    }

    pub fn is_allowed(self, label: &str) -> bool {
        self.labels().contains(&label)
    }

    /// Offset of this dimension's first slot in the signature embedding.
    fn embedding_offset(self) -> usize {
        Self::ALL[..self.index()]
            .iter()
            .map(|dimension| dimension.labels().len())
            .sum()
    }
}

pub(crate) fn normalize_key(key: &str) -> String {
    key.trim()
        .to_ascii_lowercase()
        .replace(['-', ' '], "_")
}

/// Number of slots in a signature embedding (one per dimension label).
pub fn embedding_dimensions() -> usize {
    Dimension::ALL
        .iter()
        .map(|dimension| dimension.labels().len())
        .sum()
}

/// How a dimension's label was resolved from model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Synonym,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionValue {
    pub label: String,
    pub score: f64,
    pub match_kind: MatchKind,
}

impl DimensionValue {
    pub(crate) fn fallback(dimension: Dimension) -> Self {
        Self {
            label: dimension.fallback_label().to_string(),
            score: 0.0,
            match_kind: MatchKind::Fallback,
        }
    }
}

/// All five dimension values, indexed by [`Dimension::index`].
///
/// Serialized as a map keyed by dimension; deserialization rejects a map that
/// is missing a dimension or carries a label outside the dimension's set.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionTable([DimensionValue; 5]);

impl DimensionTable {
    pub(crate) fn from_values(values: [DimensionValue; 5]) -> Self {
        Self(values)
    }

    pub fn get(&self, dimension: Dimension) -> &DimensionValue {
        &self.0[dimension.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, &DimensionValue)> {
        Dimension::ALL.into_iter().zip(self.0.iter())
    }

    fn from_map(mut map: BTreeMap<Dimension, DimensionValue>) -> Result<Self, String> {
        let mut values = Vec::with_capacity(Dimension::ALL.len());
        for dimension in Dimension::ALL {
            let value = map
                .remove(&dimension)
                .ok_or_else(|| format!("missing dimension {dimension}"))?;
            if !dimension.is_allowed(&value.label) {
                return Err(format!(
                    "label {:?} is not valid for dimension {dimension}",
                    value.label
                ));
            }
            if !(0.0..=1.0).contains(&value.score) {
                return Err(format!("score for {dimension} is outside [0, 1]"));
            }
            values.push(value);
        }
        let values: [DimensionValue; 5] = values
            .try_into()
            .map_err(|_| "dimension count mismatch".to_string())?;
        Ok(Self(values))
    }
}

impl Serialize for DimensionTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (dimension, value) in self.iter() {
            map.serialize_entry(dimension.key(), value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DimensionTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<Dimension, DimensionValue>::deserialize(deserializer)?;
        Self::from_map(map).map_err(D::Error::custom)
    }
}

/// Why a signature carries no real tone information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DegradationReason {
    ParseFailed,
    ProviderUnavailable,
}

/// Immutable tone representation of one analyzed text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneSignature {
    dimensions: DimensionTable,
    confidence: f64,
    source_fingerprint: String,
    #[serde(default)]
    key_phrases: Vec<String>,
    #[serde(default)]
    degraded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    degradation: Option<DegradationReason>,
}

impl ToneSignature {
    pub(crate) fn new(
        dimensions: DimensionTable,
        confidence: f64,
        source_fingerprint: String,
        key_phrases: Vec<String>,
    ) -> Self {
        Self {
            dimensions,
            confidence: clamp_unit(confidence),
            source_fingerprint,
            key_phrases,
            degraded: false,
            degradation: None,
        }
    }

    /// Every dimension at its fallback label with zero confidence.
    pub fn degraded(source_fingerprint: String, reason: DegradationReason) -> Self {
        Self {
            dimensions: DimensionTable::from_values(Dimension::ALL.map(DimensionValue::fallback)),
            confidence: 0.0,
            source_fingerprint,
            key_phrases: Vec::new(),
            degraded: true,
            degradation: Some(reason),
        }
    }

    pub fn dimension(&self, dimension: Dimension) -> &DimensionValue {
        self.dimensions.get(dimension)
    }

    pub fn dimensions(&self) -> impl Iterator<Item = (Dimension, &DimensionValue)> {
        self.dimensions.iter()
    }

    pub fn label(&self, dimension: Dimension) -> &str {
        &self.dimension(dimension).label
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn source_fingerprint(&self) -> &str {
        &self.source_fingerprint
    }

    pub fn key_phrases(&self) -> &[String] {
        &self.key_phrases
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn degradation(&self) -> Option<DegradationReason> {
        self.degradation
    }

    /// `tone=formal, language_style=professional, ...`
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for (dimension, value) in self.dimensions() {
            if !out.is_empty() {
                out.push_str(", ");
            }
            let _ = write!(out, "{}={}", dimension.key(), value.label);
        }
        out
    }

    /// Label-space vector used for brand similarity search.
    pub fn embedding(&self) -> Vec<f32> {
        let mut vector = vec![0.0_f32; embedding_dimensions()];
        for (dimension, value) in self.dimensions() {
            let Some(position) = dimension
                .labels()
                .iter()
                .position(|label| *label == value.label)
            else {
                continue;
            };
            #[allow(clippy::cast_possible_truncation)]
            let weight = (value.score as f32).max(LABEL_FLOOR);
            vector[dimension.embedding_offset() + position] = weight;
        }
        vector
    }

    /// Per-dimension agreement with `target` in [0, 1]: `1 - |Δscore| / 2`
    /// when the labels match, otherwise 0.
    pub fn agreement_with(&self, target: &Self) -> BTreeMap<Dimension, f64> {
        Dimension::ALL
            .into_iter()
            .map(|dimension| {
                let ours = self.dimension(dimension);
                let theirs = target.dimension(dimension);
                let agreement = if ours.label == theirs.label {
                    1.0 - (ours.score - theirs.score).abs() / 2.0
                } else {
                    0.0
                };
                (dimension, agreement)
            })
            .collect()
    }

    /// Mean of [`Self::agreement_with`].
    pub fn alignment_with(&self, target: &Self) -> f64 {
        let agreement = self.agreement_with(target);
        #[allow(clippy::cast_precision_loss)]
        let count = agreement.len() as f64;
        agreement.values().sum::<f64>() / count
    }
}

pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Hex SHA-256 prefix identifying the analyzed text.
pub fn fingerprint(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(&digest[..16])
}
