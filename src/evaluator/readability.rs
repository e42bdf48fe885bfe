//! Flesch Reading Ease, computed locally.

/// `206.835 − 1.015·(words/sentences) − 84.6·(syllables/words)`, clamped to
/// [0, 100]. Text without words scores 0.
#[allow(clippy::cast_precision_loss)]
pub fn flesch_reading_ease(text: &str) -> f64 {
    let words: Vec<&str> = text
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|word| !word.is_empty())
        .collect();
    if words.is_empty() {
        return 0.0;
    }

    let sentences = count_sentences(text).max(1);
    let syllables: usize = words.iter().map(|word| count_syllables(word)).sum();

    let words_per_sentence = words.len() as f64 / sentences as f64;
    let syllables_per_word = syllables as f64 / words.len() as f64;
    let score = 206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word;
    score.clamp(0.0, 100.0)
}

/// Runs of terminal punctuation end a sentence; trailing text without one
/// still counts.
fn count_sentences(text: &str) -> usize {
    let mut count = 0;
    let mut in_sentence = false;
    for c in text.chars() {
        if matches!(c, '.' | '!' | '?') {
            if in_sentence {
                count += 1;
                in_sentence = false;
            }
        } else if c.is_alphanumeric() {
            in_sentence = true;
        }
    }
    if in_sentence {
        count += 1;
    }
    count
}

/// Vowel-group heuristic with a silent trailing `e`. Never below 1.
fn count_syllables(word: &str) -> usize {
    let word = word.to_lowercase();
    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');

    let mut groups = 0;
    let mut previous_vowel = false;
    for c in word.chars() {
        let vowel = is_vowel(c);
        if vowel && !previous_vowel {
            groups += 1;
        }
        previous_vowel = vowel;
    }

    if groups > 1 && word.ends_with('e') && !word.ends_with("le") {
        groups -= 1;
    }
    groups.max(1)
}
