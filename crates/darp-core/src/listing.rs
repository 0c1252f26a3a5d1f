//! Shared listing types passed between the importer and the database layer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One auction listing as parsed from a CSV/JSON export, before it has been
/// staged or merged. Carries no derived scoring state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawListing {
    pub domain_name: String,
    pub start_date: Option<DateTime<Utc>>,
    pub expiration_date: DateTime<Utc>,
    pub current_bid: Option<Decimal>,
    pub offer_type: Option<String>,
    pub source_data: serde_json::Value,
    pub link: Option<String>,
}

/// A domain name split into its registrable label and TLD, lowercased.
///
/// Only the last dot is significant: `shop.example.co.uk` yields label
/// `shop.example.co` and tld `uk`. Auction exports list registrable
/// domains, so in practice the label is a single registrable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainName {
    pub label: String,
    pub tld: String,
}

impl DomainName {
    /// Parses `name` into label + TLD. Returns `None` when there is no dot
    /// or either side is empty.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase();
        let (label, tld) = normalized.rsplit_once('.')?;
        if label.is_empty() || tld.is_empty() {
            return None;
        }
        Some(Self {
            label: label.to_string(),
            tld: tld.to_string(),
        })
    }

    /// The full `label.tld` form.
    #[must_use]
    pub fn full(&self) -> String {
        format!("{}.{}", self.label, self.tld)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_on_last_dot() {
        let d = DomainName::parse("example.com").expect("parse");
        assert_eq!(d.label, "example");
        assert_eq!(d.tld, "com");
    }

    #[test]
    fn parse_lowercases_and_trims() {
        let d = DomainName::parse("  ExAmPle.COM ").expect("parse");
        assert_eq!(d.label, "example");
        assert_eq!(d.tld, "com");
    }

    #[test]
    fn parse_multi_label_keeps_prefix_in_label() {
        let d = DomainName::parse("shop.example.co.uk").expect("parse");
        assert_eq!(d.label, "shop.example.co");
        assert_eq!(d.tld, "uk");
    }

    #[test]
    fn parse_rejects_missing_dot() {
        assert!(DomainName::parse("localhost").is_none());
    }

    #[test]
    fn parse_rejects_empty_sides() {
        assert!(DomainName::parse(".com").is_none());
        assert!(DomainName::parse("example.").is_none());
        assert!(DomainName::parse("").is_none());
    }

    #[test]
    fn full_round_trips() {
        let d = DomainName::parse("example.com").expect("parse");
        assert_eq!(d.full(), "example.com");
    }
}
