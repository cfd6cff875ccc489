//! Reference-answer metrics for generative questions.
//!
//! - token F1: SQuAD-normalized bag-of-words overlap, best reference wins
//! - BLEU: corpus-level, clipped n-gram precision against all references,
//!   brevity penalty from the shortest reference, no smoothing
//! - ROUGE-L: LCS F-measure, best reference wins
//!
//! Blank references are ignored everywhere. All scores are in `[0, 1]`.

use std::collections::HashMap;

/// Lowercased words with punctuation and articles removed.
fn normalize_answer(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();
    cleaned
        .split_whitespace()
        .filter(|w| !matches!(*w, "a" | "an" | "the"))
        .map(str::to_string)
        .collect()
}

/// Word runs plus one token per punctuation mark, case kept.
fn bleu_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    for c in text.chars() {
        if c.is_alphanumeric() {
            word.push(c);
            continue;
        }
        if !word.is_empty() {
            tokens.push(std::mem::take(&mut word));
        }
        if !c.is_whitespace() {
            tokens.push(c.to_string());
        }
    }
    if !word.is_empty() {
        tokens.push(word);
    }
    tokens
}

/// Lowercased alphanumeric runs.
fn rouge_tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_blank(references: &[String]) -> impl Iterator<Item = &String> {
    references.iter().filter(|r| !r.trim().is_empty())
}

/// Token-overlap F1 between a prediction and one reference.
pub fn token_f1(prediction: &str, reference: &str) -> f64 {
    let predicted = normalize_answer(prediction);
    let gold = normalize_answer(reference);
    if predicted.is_empty() || gold.is_empty() {
        return if predicted == gold { 1.0 } else { 0.0 };
    }

    let mut gold_counts: HashMap<&str, usize> = HashMap::new();
    for token in &gold {
        *gold_counts.entry(token.as_str()).or_default() += 1;
    }
    let mut common = 0;
    for token in &predicted {
        if let Some(count) = gold_counts.get_mut(token.as_str()) {
            if *count > 0 {
                *count -= 1;
                common += 1;
            }
        }
    }
    if common == 0 {
        return 0.0;
    }

    let precision = common as f64 / predicted.len() as f64;
    let recall = common as f64 / gold.len() as f64;
    2.0 * precision * recall / (precision + recall)
}

/// Best F1 of the prediction against any non-blank reference.
pub fn best_token_f1(prediction: &str, references: &[String]) -> f64 {
    non_blank(references)
        .map(|r| token_f1(prediction, r))
        .fold(0.0, f64::max)
}

fn ngram_counts(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    for gram in tokens.windows(n) {
        *counts.entry(gram).or_default() += 1;
    }
    counts
}

/// Corpus BLEU up to `max_order`-grams over `(prediction, references)` pairs.
///
/// Pairs without a non-blank reference are skipped. Any order with no
/// clipped match makes the score zero.
pub fn corpus_bleu<'a, I>(samples: I, max_order: usize) -> f64
where
    I: IntoIterator<Item = (&'a str, &'a [String])>,
{
    let max_order = max_order.max(1);
    let mut matches = vec![0usize; max_order];
    let mut possible = vec![0usize; max_order];
    let mut translation_length = 0usize;
    let mut reference_length = 0usize;

    for (prediction, references) in samples {
        let references: Vec<Vec<String>> = non_blank(references).map(|r| bleu_tokens(r)).collect();
        let Some(shortest) = references.iter().map(Vec::len).min() else {
            continue;
        };
        let candidate = bleu_tokens(prediction);
        translation_length += candidate.len();
        reference_length += shortest;

        for n in 1..=max_order {
            let mut max_reference: HashMap<&[String], usize> = HashMap::new();
            for reference in &references {
                for (gram, count) in ngram_counts(reference, n) {
                    let best = max_reference.entry(gram).or_default();
                    *best = (*best).max(count);
                }
            }
            for (gram, count) in ngram_counts(&candidate, n) {
                matches[n - 1] += count.min(max_reference.get(gram).copied().unwrap_or(0));
            }
            possible[n - 1] += (candidate.len() + 1).saturating_sub(n);
        }
    }

    if translation_length == 0 || reference_length == 0 {
        return 0.0;
    }

    let mut log_sum = 0.0;
    for (matched, total) in matches.iter().zip(&possible) {
        if *matched == 0 || *total == 0 {
            return 0.0;
        }
        log_sum += (*matched as f64 / *total as f64).ln();
    }
    let geo_mean = (log_sum / max_order as f64).exp();

    let ratio = translation_length as f64 / reference_length as f64;
    let brevity_penalty = if ratio > 1.0 {
        1.0
    } else {
        (1.0 - 1.0 / ratio).exp()
    };
    geo_mean * brevity_penalty
}

/// Longest common subsequence length, two-row DP.
fn lcs_length(a: &[String], b: &[String]) -> usize {
    let (short, long) = if a.len() < b.len() { (a, b) } else { (b, a) };

    let mut prev = vec![0usize; short.len() + 1];
    let mut curr = vec![0usize; short.len() + 1];

    for item in long {
        for j in 1..=short.len() {
            curr[j] = if *item == short[j - 1] {
                prev[j - 1] + 1
            } else {
                prev[j].max(curr[j - 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[short.len()]
}

/// ROUGE-L F-measure of the prediction against its best reference.
pub fn rouge_l(prediction: &str, references: &[String]) -> f64 {
    let candidate = rouge_tokens(prediction);
    if candidate.is_empty() {
        return 0.0;
    }

    non_blank(references)
        .map(|reference| {
            let reference = rouge_tokens(reference);
            let lcs = lcs_length(&reference, &candidate);
            if lcs == 0 {
                return 0.0;
            }
            let precision = lcs as f64 / candidate.len() as f64;
            let recall = lcs as f64 / reference.len() as f64;
            2.0 * precision * recall / (precision + recall)
        })
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn close(actual: f64, expected: f64) -> bool {
        (actual - expected).abs() < 1e-6
    }

    #[test]
    fn test_token_f1() {
        assert_eq!(token_f1("The old man", "old man"), 1.0);
        assert_eq!(token_f1("nothing shared", "entirely different"), 0.0);
        let partial = token_f1("red fox jumps", "red fox");
        assert!((partial - 0.8).abs() < 1e-9);
        assert_eq!(best_token_f1("Paris.", &refs(&["London", "paris"])), 1.0);
    }

    #[test]
    fn test_bleu_unigram_precision() {
        let references = refs(&["the cat is on the mat"]);
        let bleu1 = corpus_bleu([("the cat sat on the mat", references.as_slice())], 1);
        assert!(close(bleu1, 5.0 / 6.0), "{bleu1}");
    }

    #[test]
    fn test_bleu4_needs_a_four_gram_match() {
        let references = refs(&["the cat is on the mat"]);
        let samples = [("the cat sat on the mat", references.as_slice())];
        assert_eq!(corpus_bleu(samples, 4), 0.0);

        let exact = refs(&["the cat sat on the mat"]);
        let bleu4 = corpus_bleu([("the cat sat on the mat", exact.as_slice())], 4);
        assert!(close(bleu4, 1.0), "{bleu4}");
    }

    #[test]
    fn test_bleu_brevity_penalty() {
        let references = refs(&["the cat sat on the mat"]);
        let bleu1 = corpus_bleu([("the cat", references.as_slice())], 1);
        assert!(close(bleu1, (-2.0f64).exp()), "{bleu1}");
    }

    #[test]
    fn test_bleu_clips_against_best_reference() {
        // "the" clips to 2; the shorter reference sets the length
        let references = refs(&["the cat", "the the dog", "  "]);
        let bleu1 = corpus_bleu([("the the the", references.as_slice())], 1);
        assert!(close(bleu1, 2.0 / 3.0), "{bleu1}");
    }

    #[test]
    fn test_bleu_without_references_is_zero() {
        let blank = refs(&[""]);
        assert_eq!(corpus_bleu([("anything", blank.as_slice())], 1), 0.0);
    }

    #[test]
    fn test_rouge_l() {
        let score = rouge_l("The cat sat on the mat.", &refs(&["dog", "the cat is on the mat"]));
        assert!(close(score, 5.0 / 6.0), "{score}");
        assert_eq!(rouge_l("", &refs(&["the cat"])), 0.0);
        assert_eq!(rouge_l("a dog", &refs(&["the cat"])), 0.0);
    }

    #[test]
    fn test_lcs_length() {
        let a = refs(&["a", "b", "c", "d"]);
        let b = refs(&["b", "x", "d"]);
        assert_eq!(lcs_length(&a, &b), 2);
        assert_eq!(lcs_length(&b, &a), 2);
        assert_eq!(lcs_length(&a, &[]), 0);
    }
}
