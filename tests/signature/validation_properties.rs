use brandvoice::error::ValidationError;
use brandvoice::signature::{Dimension, MatchKind, RawDimension, RawSignature, validate};

use super::tone_harness::DeterministicRng;

const SYNONYMS: [(Dimension, &[&str]); 5] = [
    (Dimension::Tone, &["serious", "conversational", "approachable", "blunt"]),
    (Dimension::LanguageStyle, &["scientific", "chatty", "scholarly", "playful"]),
    (Dimension::Formality, &["very formal", "neutral", "casual"]),
    (Dimension::AddressStyle, &["second person", "we", "passive"]),
    (Dimension::EmotionalAppeal, &["logical", "witty", "uplifting"]),
];

const GARBAGE: &[&str] = &["bewildering", "zzz", "", "42", "formalish", "n/a"];

fn synonyms(dimension: Dimension) -> &'static [&'static str] {
    SYNONYMS
        .iter()
        .find(|(candidate, _)| *candidate == dimension)
        .map(|(_, labels)| *labels)
        .unwrap_or_default()
}

fn decorate_key(rng: &mut DeterministicRng, key: &str) -> String {
    match rng.next_bounded(4) {
        0 => key.to_string(),
        1 => key.to_ascii_uppercase(),
        2 => key.replace('_', "-"),
        _ => format!("  {}  ", key.replace('_', " ")),
    }
}

fn decorate_label(rng: &mut DeterministicRng, label: &str) -> String {
    match rng.next_bounded(5) {
        0 => label.to_string(),
        1 => label.to_uppercase(),
        2 => label.replace('-', "_"),
        3 => format!("  {label} "),
        _ => format!("{label}."),
    }
}

#[allow(clippy::cast_precision_loss)]
fn random_score(rng: &mut DeterministicRng) -> Option<f64> {
    match rng.next_bounded(5) {
        0 => None,
        1 => Some(f64::NAN),
        _ => Some(rng.next_bounded(2001) as f64 / 1000.0 - 0.5),
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

struct Expected {
    kind: MatchKind,
    label: Option<&'static str>,
    score: f64,
}

#[test]
fn validate_always_yields_five_allowed_dimensions() {
    let mut rng = DeterministicRng::new(0x51_6A_7E);
    let mut rejected = 0;

    for case in 0..300 {
        let mut raw = RawSignature {
            confidence: random_score(&mut rng),
            ..RawSignature::default()
        };
        if rng.next_bounded(4) == 0 {
            raw.dimensions
                .insert("vibe".into(), RawDimension::labelled("chill"));
        }

        let mut expected = Vec::new();
        let mut present = 0;
        for dimension in Dimension::ALL {
            if rng.next_bounded(4) == 0 {
                expected.push(Expected {
                    kind: MatchKind::Fallback,
                    label: Some(dimension.fallback_label()),
                    score: 0.0,
                });
                continue;
            }
            present += 1;

            let key = if rng.next_bounded(2) == 0 {
                decorate_key(&mut rng, dimension.key())
            } else {
                let alias = *rng.pick(dimension.aliases());
                decorate_key(&mut rng, alias)
            };
            let score = random_score(&mut rng);

            let (value, expectation) = match rng.next_bounded(4) {
                0 => {
                    let label = *rng.pick(dimension.labels());
                    (
                        RawDimension {
                            label: Some(decorate_label(&mut rng, label)),
                            score,
                        },
                        Expected {
                            kind: MatchKind::Exact,
                            label: Some(label),
                            score: score.map_or(1.0, clamp_unit),
                        },
                    )
                }
                1 => {
                    let label = *rng.pick(synonyms(dimension));
                    (
                        RawDimension {
                            label: Some(decorate_label(&mut rng, label)),
                            score,
                        },
                        Expected {
                            kind: MatchKind::Synonym,
                            label: None,
                            score: score.map_or(0.75, clamp_unit),
                        },
                    )
                }
                2 => (
                    RawDimension {
                        label: Some((*rng.pick(GARBAGE)).to_string()),
                        score,
                    },
                    Expected {
                        kind: MatchKind::Fallback,
                        label: Some(dimension.fallback_label()),
                        score: 0.0,
                    },
                ),
                _ => (
                    RawDimension { label: None, score },
                    Expected {
                        kind: MatchKind::Fallback,
                        label: Some(dimension.fallback_label()),
                        score: 0.0,
                    },
                ),
            };
            raw.dimensions.insert(key, value);
            expected.push(expectation);
        }

        let result = validate(&raw, format!("case-{case}"));
        if present == 0 {
            assert_eq!(result, Err(ValidationError::NoDimensions), "case {case}");
            rejected += 1;
            continue;
        }
        let signature = result.unwrap_or_else(|err| panic!("case {case}: {err}"));

        assert_eq!(signature.dimensions().count(), 5, "case {case}");
        let mut non_exact = 0_u32;
        for ((dimension, value), expectation) in signature.dimensions().zip(&expected) {
            assert!(
                dimension.is_allowed(&value.label),
                "case {case}: {dimension}={}",
                value.label
            );
            assert_eq!(value.match_kind, expectation.kind, "case {case}: {dimension}");
            if let Some(label) = expectation.label {
                assert_eq!(value.label, label, "case {case}: {dimension}");
            }
            assert!(
                (value.score - expectation.score).abs() < 1e-12,
                "case {case}: {dimension} score {}",
                value.score
            );
            if value.match_kind != MatchKind::Exact {
                non_exact += 1;
            }
        }

        let base = raw.confidence.map_or(1.0, clamp_unit);
        let expected_confidence = base * (1.0 - f64::from(non_exact) / 5.0);
        assert!(
            (signature.confidence() - expected_confidence).abs() < 1e-12,
            "case {case}: {} vs {expected_confidence}",
            signature.confidence()
        );
    }

    assert!(rejected < 300);
}
