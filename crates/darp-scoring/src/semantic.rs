//! Commercial-keyword semantic scorer for domain labels.

use crate::NameScorer;

/// Commercial keyword weights in `(0.0, 1.0]`.
///
/// A keyword matching anywhere inside the label signals topical or
/// commercial intent; the strongest match drives the score. Ordered
/// roughly by sector.
const KEYWORD_WEIGHTS: &[(&str, f64)] = &[
    // Finance
    ("bank", 0.95),
    ("finance", 0.9),
    ("invest", 0.9),
    ("loan", 0.9),
    ("insur", 0.9),
    ("credit", 0.85),
    ("pay", 0.85),
    ("money", 0.85),
    ("capital", 0.8),
    ("wealth", 0.8),
    ("crypto", 0.85),
    ("coin", 0.7),
    ("trade", 0.75),
    ("tax", 0.8),
    // Technology
    ("ai", 0.9),
    ("tech", 0.8),
    ("cloud", 0.8),
    ("data", 0.8),
    ("soft", 0.7),
    ("app", 0.75),
    ("dev", 0.7),
    ("code", 0.7),
    ("cyber", 0.75),
    ("host", 0.7),
    ("vpn", 0.75),
    ("seo", 0.7),
    ("web", 0.65),
    ("digital", 0.7),
    ("smart", 0.7),
    ("robot", 0.65),
    // Commerce
    ("shop", 0.9),
    ("store", 0.85),
    ("market", 0.8),
    ("deal", 0.75),
    ("sale", 0.75),
    ("buy", 0.8),
    ("sell", 0.75),
    ("price", 0.7),
    ("brand", 0.7),
    ("retail", 0.7),
    // Health and professional services
    ("health", 0.9),
    ("medic", 0.85),
    ("dental", 0.8),
    ("clinic", 0.8),
    ("care", 0.75),
    ("fit", 0.7),
    ("diet", 0.7),
    ("legal", 0.85),
    ("law", 0.8),
    ("consult", 0.7),
    ("agency", 0.65),
    // Travel, property, lifestyle
    ("travel", 0.8),
    ("hotel", 0.8),
    ("flight", 0.75),
    ("rent", 0.75),
    ("realty", 0.8),
    ("estate", 0.75),
    ("property", 0.75),
    ("home", 0.7),
    ("auto", 0.7),
    ("car", 0.65),
    ("food", 0.7),
    ("restaurant", 0.7),
    ("casino", 0.8),
    ("bet", 0.75),
    ("game", 0.65),
    ("sport", 0.7),
    ("edu", 0.65),
    ("learn", 0.65),
    ("job", 0.7),
    ("energy", 0.7),
    ("solar", 0.7),
];

fn best_keyword(cleaned: &str) -> Option<f64> {
    KEYWORD_WEIGHTS
        .iter()
        .filter(|(kw, _)| cleaned.contains(kw))
        .map(|&(_, weight)| weight)
        .fold(None, |acc, w| Some(acc.map_or(w, |a: f64| a.max(w))))
}

fn brevity_bonus(len: usize) -> f64 {
    match len {
        0 => 0.0,
        1..=5 => 30.0,
        6..=8 => 20.0,
        9..=12 => 10.0,
        _ => 0.0,
    }
}

/// Scores a label by commercial/topical relevance.
///
/// The strongest matching keyword contributes up to 70 points; short,
/// brandable labels earn up to 30 more. A long label with no keyword
/// scores 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordValueScorer;

impl NameScorer for KeywordValueScorer {
    fn score(&self, label: &str) -> f64 {
        let cleaned: String = label
            .to_lowercase()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect();
        if cleaned.is_empty() {
            return 0.0;
        }

        let keyword_points = best_keyword(&cleaned).map_or(0.0, |w| 70.0 * w);
        (keyword_points + brevity_bonus(cleaned.len())).clamp(0.0, 100.0)
    }
}
