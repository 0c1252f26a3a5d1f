//! The auction scoring pipeline: filter predicates, pluggable name scorers,
//! import parsing, and batch orchestration over the database layer.

pub mod age;
pub mod error;
pub mod filter;
pub mod import;
pub mod lexical;
pub mod pipeline;
pub mod semantic;

pub use age::AgeCurve;
pub use error::PipelineError;
pub use filter::{FilterReason, FilterRules};
pub use import::{parse_csv, parse_json, ParsedBatch, SkippedRecord};
pub use lexical::WordFrequencyScorer;
pub use pipeline::{BatchOutcome, ImportOutcome, ScoringPipeline};
pub use semantic::KeywordValueScorer;

/// A pluggable 0-100 scoring strategy over a domain's registrable label
/// (the part left of the TLD, lowercased).
///
/// Implementations must be pure: the same label always yields the same
/// score, and the result is always within `[0.0, 100.0]`.
pub trait NameScorer: Send + Sync {
    fn score(&self, label: &str) -> f64;
}
