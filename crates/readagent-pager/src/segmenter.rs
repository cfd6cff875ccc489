//! Sentence segmentation.
//!
//! Splits raw text on Unicode (UAX #29) sentence boundaries. UAX #29 has no
//! abbreviation list and breaks after "Dr." or an initial followed by a
//! capitalized word; a unit ending in a known title or a single capital
//! initial is joined with the unit after it. Other abbreviations still
//! split, so boundaries can differ from a trained tokenizer's.
//!
//! Units longer than the word bound are cut into consecutive fixed-size
//! word chunks so no emitted unit exceeds it and no text is dropped.

use tracing::{debug, trace};
use unicode_segmentation::UnicodeSegmentation;

use readagent_types::{count_words, Sentence};

/// Titles that precede a capitalized name, lowercase without the period.
const TITLES: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "mt", "gen", "col", "capt", "lt", "sgt",
    "rev", "gov", "sen", "rep", "hon",
];

/// Split `text` into sentences of at most `max_words` words each.
///
/// Whitespace-only spans are skipped; everything else is emitted in input
/// order. `max_words` of zero is treated as one.
pub fn segment(text: &str, max_words: usize) -> Vec<Sentence> {
    let max_words = max_words.max(1);
    let mut sentences = Vec::new();
    let mut pending = String::new();

    for raw in text.split_sentence_bounds() {
        let unit = raw.trim();
        if unit.is_empty() {
            continue;
        }

        let unit = if pending.is_empty() {
            unit.to_string()
        } else {
            format!("{} {}", std::mem::take(&mut pending), unit)
        };
        if ends_with_title(&unit) {
            pending = unit;
            continue;
        }
        push_bounded(&mut sentences, &unit, max_words);
    }
    if !pending.is_empty() {
        push_bounded(&mut sentences, &pending, max_words);
    }

    debug!(sentences = sentences.len(), "Segmented text");
    sentences
}

fn push_bounded(sentences: &mut Vec<Sentence>, unit: &str, max_words: usize) {
    if count_words(unit) <= max_words {
        sentences.push(Sentence::new(unit));
        return;
    }

    let words: Vec<&str> = unit.split_whitespace().collect();
    trace!(
        words = words.len(),
        max_words,
        "Chunking oversized sentence"
    );
    for chunk in words.chunks(max_words) {
        sentences.push(Sentence::new(chunk.join(" ")));
    }
}

/// Whether the unit's last word is a title or an initial such as "J.".
fn ends_with_title(unit: &str) -> bool {
    let Some(stem) = unit
        .split_whitespace()
        .last()
        .and_then(|word| word.strip_suffix('.'))
    else {
        return false;
    };
    let stem = stem.trim_start_matches(|c: char| !c.is_alphanumeric());

    let mut chars = stem.chars();
    match (chars.next(), chars.next()) {
        (Some(initial), None) => initial.is_uppercase(),
        _ => TITLES.contains(&stem.to_lowercase().as_str()),
    }
}
