//! Word-frequency lexical scorer for domain labels.

use crate::NameScorer;

/// Common English words with relative frequency weights in `(0.0, 1.0]`.
///
/// Keys are lowercase. Weights approximate how common/readable a word is;
/// they shape the score but coverage (how much of the label segments into
/// known words) dominates.
const WORD_WEIGHTS: &[(&str, f64)] = &[
    // High-frequency everyday words
    ("the", 1.0),
    ("and", 1.0),
    ("you", 1.0),
    ("all", 0.95),
    ("new", 0.95),
    ("one", 0.95),
    ("now", 0.9),
    ("day", 0.9),
    ("way", 0.9),
    ("get", 0.9),
    ("top", 0.85),
    ("best", 0.85),
    ("good", 0.85),
    ("easy", 0.8),
    ("fast", 0.8),
    ("free", 0.85),
    ("big", 0.8),
    ("live", 0.8),
    ("real", 0.8),
    ("true", 0.75),
    ("smart", 0.75),
    ("super", 0.75),
    ("first", 0.8),
    ("world", 0.8),
    ("life", 0.8),
    ("time", 0.85),
    ("home", 0.85),
    ("house", 0.8),
    ("work", 0.8),
    ("play", 0.75),
    ("game", 0.75),
    ("games", 0.7),
    ("word", 0.7),
    ("words", 0.65),
    ("example", 0.6),
    ("sample", 0.55),
    ("test", 0.7),
    ("demo", 0.5),
    // Commerce and services
    ("shop", 0.8),
    ("store", 0.75),
    ("buy", 0.8),
    ("sell", 0.75),
    ("sale", 0.75),
    ("deal", 0.7),
    ("deals", 0.7),
    ("price", 0.7),
    ("market", 0.7),
    ("trade", 0.65),
    ("pay", 0.75),
    ("cash", 0.7),
    ("money", 0.75),
    ("bank", 0.7),
    ("loan", 0.6),
    ("fund", 0.6),
    ("coin", 0.6),
    ("gold", 0.65),
    ("card", 0.65),
    ("gift", 0.65),
    ("book", 0.7),
    ("news", 0.75),
    ("blog", 0.6),
    ("mail", 0.65),
    ("chat", 0.65),
    ("talk", 0.65),
    ("search", 0.65),
    ("find", 0.7),
    ("guide", 0.6),
    ("help", 0.7),
    ("expert", 0.55),
    ("pro", 0.65),
    ("plus", 0.6),
    ("hub", 0.55),
    ("lab", 0.55),
    ("labs", 0.5),
    ("zone", 0.55),
    ("spot", 0.55),
    ("place", 0.6),
    ("point", 0.6),
    ("link", 0.6),
    ("list", 0.6),
    ("club", 0.6),
    ("group", 0.6),
    ("team", 0.65),
    ("crew", 0.5),
    // Technology
    ("tech", 0.65),
    ("data", 0.65),
    ("code", 0.6),
    ("web", 0.65),
    ("net", 0.6),
    ("site", 0.6),
    ("page", 0.6),
    ("app", 0.65),
    ("apps", 0.6),
    ("cloud", 0.6),
    ("host", 0.55),
    ("server", 0.5),
    ("cyber", 0.5),
    ("crypto", 0.55),
    ("digital", 0.55),
    ("mobile", 0.55),
    ("phone", 0.6),
    ("video", 0.6),
    ("photo", 0.6),
    ("music", 0.65),
    ("media", 0.6),
    ("stream", 0.55),
    ("email", 0.55),
    ("robot", 0.5),
    ("auto", 0.6),
    // Lifestyle and sectors
    ("health", 0.65),
    ("fit", 0.6),
    ("fitness", 0.55),
    ("food", 0.7),
    ("eat", 0.65),
    ("cook", 0.6),
    ("drink", 0.6),
    ("coffee", 0.6),
    ("travel", 0.65),
    ("trip", 0.6),
    ("hotel", 0.6),
    ("flight", 0.55),
    ("car", 0.7),
    ("cars", 0.65),
    ("bike", 0.6),
    ("pet", 0.6),
    ("pets", 0.55),
    ("dog", 0.65),
    ("cat", 0.65),
    ("kids", 0.6),
    ("baby", 0.6),
    ("style", 0.6),
    ("beauty", 0.55),
    ("art", 0.65),
    ("design", 0.6),
    ("garden", 0.55),
    ("green", 0.65),
    ("solar", 0.5),
    ("energy", 0.55),
    ("legal", 0.5),
    ("law", 0.6),
    ("med", 0.5),
    ("care", 0.65),
    ("learn", 0.6),
    ("study", 0.6),
    ("school", 0.6),
    ("job", 0.65),
    ("jobs", 0.6),
    ("hire", 0.55),
    ("space", 0.6),
    ("star", 0.6),
    ("city", 0.65),
    ("town", 0.6),
    ("local", 0.6),
    ("global", 0.55),
];

fn longest_match(slice: &str) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for &(word, weight) in WORD_WEIGHTS {
        if slice.starts_with(word) && best.map_or(true, |(len, _)| word.len() > len) {
            best = Some((word.len(), weight));
        }
    }
    best
}

/// Scores a label by how much of it segments into common English words.
///
/// The label is reduced to its alphabetic characters, then scanned left to
/// right taking the longest dictionary match at each position (unmatched
/// characters advance by one). The score scales coverage by the average
/// frequency weight of the matched words:
///
/// `100 * coverage * (0.6 + 0.4 * avg_weight)`, clamped to `[0, 100]`.
///
/// An all-gibberish label scores 0; a label fully covered by very common
/// words approaches 100.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordFrequencyScorer;

impl NameScorer for WordFrequencyScorer {
    fn score(&self, label: &str) -> f64 {
        let cleaned: String = label
            .to_lowercase()
            .chars()
            .filter(char::is_ascii_alphabetic)
            .collect();
        if cleaned.is_empty() {
            return 0.0;
        }

        let total = cleaned.len();
        let mut pos = 0;
        let mut covered = 0usize;
        let mut weight_sum = 0.0;
        let mut matches = 0usize;

        while pos < total {
            if let Some((len, weight)) = longest_match(&cleaned[pos..]) {
                covered += len;
                weight_sum += weight;
                matches += 1;
                pos += len;
            } else {
                pos += 1;
            }
        }

        if matches == 0 {
            return 0.0;
        }

        #[allow(clippy::cast_precision_loss)]
        let coverage = covered as f64 / total as f64;
        let avg_weight = weight_sum / matches as f64;
        (100.0 * coverage * (0.6 + 0.4 * avg_weight)).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_label_scores_zero() {
        assert_eq!(WordFrequencyScorer.score(""), 0.0);
    }

    #[test]
    fn gibberish_scores_zero() {
        assert_eq!(WordFrequencyScorer.score("xqzvkj"), 0.0);
    }

    #[test]
    fn digits_only_label_scores_zero() {
        assert_eq!(WordFrequencyScorer.score("12345"), 0.0);
    }

    #[test]
    fn dictionary_word_scores_high() {
        let score = WordFrequencyScorer.score("example");
        assert!(score > 50.0, "expected high score, got {score}");
    }

    #[test]
    fn two_word_compound_scores_high() {
        let score = WordFrequencyScorer.score("bestshop");
        assert!(score > 60.0, "expected high score, got {score}");
    }

    #[test]
    fn partial_coverage_scores_between() {
        // "shop" matches, "qzv" does not.
        let score = WordFrequencyScorer.score("shopqzv");
        assert!(
            score > 0.0 && score < 80.0,
            "expected intermediate score, got {score}"
        );
    }

    #[test]
    fn hyphens_and_digits_are_ignored() {
        let with_noise = WordFrequencyScorer.score("best-shop1");
        let clean = WordFrequencyScorer.score("bestshop");
        assert!((with_noise - clean).abs() < 1e-9);
    }

    #[test]
    fn score_stays_in_bounds() {
        for label in ["a", "thethethethe", "bestshopdealfree", "x1-2_3"] {
            let score = WordFrequencyScorer.score(label);
            assert!(
                (0.0..=100.0).contains(&score),
                "out of bounds for {label}: {score}"
            );
        }
    }

    #[test]
    fn scoring_is_deterministic() {
        let a = WordFrequencyScorer.score("supermarket");
        let b = WordFrequencyScorer.score("supermarket");
        assert!((a - b).abs() < f64::EPSILON);
    }
}
