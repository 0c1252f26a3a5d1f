//! Parsing of CSV/JSON auction-site exports into [`RawListing`] batches.
//!
//! Validation is per-record: a record missing a domain name or carrying an
//! unparseable date is skipped (with a reason), and its siblings proceed.
//! Only a structurally unusable file (missing required columns, non-array
//! JSON) fails the whole batch.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use darp_core::{DomainName, RawListing};

use crate::PipelineError;

const DOMAIN_ALIASES: &[&str] = &["domain", "domain_name", "name"];
const START_ALIASES: &[&str] = &["start_date", "startdate", "auction_start", "start"];
const EXPIRATION_ALIASES: &[&str] = &[
    "expiration_date",
    "end_date",
    "expires",
    "auction_end",
    "end",
];
const BID_ALIASES: &[&str] = &["current_bid", "price", "bid", "min_bid"];
const OFFER_ALIASES: &[&str] = &["offer_type", "offering_type", "auction_type"];
const LINK_ALIASES: &[&str] = &["link", "url"];

/// A record rejected during parsing, with its 1-based position and reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub record: usize,
    pub reason: String,
}

/// The outcome of parsing one upload: valid listings plus skipped records.
#[derive(Debug, Clone, Default)]
pub struct ParsedBatch {
    pub listings: Vec<RawListing>,
    pub skipped: Vec<SkippedRecord>,
}

/// Parses a CSV export. Headers are matched case-insensitively against the
/// alias lists above; a file without a recognizable domain or expiration
/// column is rejected whole.
///
/// # Errors
///
/// Returns [`PipelineError::Validation`] for a structurally unusable file.
pub fn parse_csv(data: &str, default_offer_type: Option<&str>) -> Result<ParsedBatch, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PipelineError::Validation(format!("unreadable CSV header: {e}")))?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let find = |aliases: &[&str]| -> Option<usize> {
        headers
            .iter()
            .position(|h| aliases.contains(&h.as_str()))
    };

    let domain_idx = find(DOMAIN_ALIASES).ok_or_else(|| {
        PipelineError::Validation("CSV is missing a domain column".to_string())
    })?;
    let expiration_idx = find(EXPIRATION_ALIASES).ok_or_else(|| {
        PipelineError::Validation("CSV is missing an expiration-date column".to_string())
    })?;
    let start_idx = find(START_ALIASES);
    let bid_idx = find(BID_ALIASES);
    let offer_idx = find(OFFER_ALIASES);
    let link_idx = find(LINK_ALIASES);

    let mut batch = ParsedBatch::default();

    for (i, record) in reader.records().enumerate() {
        let position = i + 1;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                batch.skipped.push(SkippedRecord {
                    record: position,
                    reason: format!("unreadable row: {e}"),
                });
                continue;
            }
        };

        let field = |idx: Option<usize>| -> Option<&str> {
            idx.and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };

        let mut source_data = serde_json::Map::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            source_data.insert(header.clone(), serde_json::Value::from(value.trim()));
        }

        match build_listing(
            field(Some(domain_idx)),
            field(start_idx),
            field(Some(expiration_idx)),
            field(bid_idx),
            field(offer_idx).or(default_offer_type),
            field(link_idx),
            serde_json::Value::Object(source_data),
        ) {
            Ok(listing) => batch.listings.push(listing),
            Err(reason) => batch.skipped.push(SkippedRecord {
                record: position,
                reason,
            }),
        }
    }

    Ok(batch)
}

/// Parses a JSON export: either a top-level array of objects or an object
/// with a `listings` array. Key matching uses the same aliases as CSV.
///
/// # Errors
///
/// Returns [`PipelineError::Validation`] if the payload is not valid JSON
/// or carries no listings array.
pub fn parse_json(
    data: &str,
    default_offer_type: Option<&str>,
) -> Result<ParsedBatch, PipelineError> {
    let value: serde_json::Value = serde_json::from_str(data)
        .map_err(|e| PipelineError::Validation(format!("invalid JSON: {e}")))?;

    let records = match &value {
        serde_json::Value::Array(items) => items.as_slice(),
        serde_json::Value::Object(map) => map
            .get("listings")
            .and_then(serde_json::Value::as_array)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                PipelineError::Validation("JSON object has no 'listings' array".to_string())
            })?,
        _ => {
            return Err(PipelineError::Validation(
                "JSON payload must be an array of listings".to_string(),
            ))
        }
    };

    let mut batch = ParsedBatch::default();

    for (i, record) in records.iter().enumerate() {
        let position = i + 1;
        let Some(map) = record.as_object() else {
            batch.skipped.push(SkippedRecord {
                record: position,
                reason: "listing is not a JSON object".to_string(),
            });
            continue;
        };

        let lookup = |aliases: &[&str]| -> Option<String> {
            map.iter()
                .find(|(k, _)| aliases.contains(&k.to_lowercase().as_str()))
                .and_then(|(_, v)| match v {
                    serde_json::Value::String(s) => Some(s.trim().to_string()),
                    serde_json::Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .filter(|s| !s.is_empty())
        };

        match build_listing(
            lookup(DOMAIN_ALIASES).as_deref(),
            lookup(START_ALIASES).as_deref(),
            lookup(EXPIRATION_ALIASES).as_deref(),
            lookup(BID_ALIASES).as_deref(),
            lookup(OFFER_ALIASES).as_deref().or(default_offer_type),
            lookup(LINK_ALIASES).as_deref(),
            record.clone(),
        ) {
            Ok(listing) => batch.listings.push(listing),
            Err(reason) => batch.skipped.push(SkippedRecord {
                record: position,
                reason,
            }),
        }
    }

    Ok(batch)
}

fn build_listing(
    domain: Option<&str>,
    start: Option<&str>,
    expiration: Option<&str>,
    bid: Option<&str>,
    offer_type: Option<&str>,
    link: Option<&str>,
    source_data: serde_json::Value,
) -> Result<RawListing, String> {
    let domain = domain.ok_or_else(|| "missing domain name".to_string())?;
    let parsed = DomainName::parse(domain)
        .ok_or_else(|| format!("'{domain}' is not a valid domain name"))?;

    let expiration = expiration.ok_or_else(|| "missing expiration date".to_string())?;
    let expiration_date =
        parse_date(expiration).ok_or_else(|| format!("unparseable expiration date '{expiration}'"))?;

    let start_date = match start {
        Some(raw) => {
            Some(parse_date(raw).ok_or_else(|| format!("unparseable start date '{raw}'"))?)
        }
        None => None,
    };

    let current_bid = match bid {
        Some(raw) => Some(parse_bid(raw).ok_or_else(|| format!("unparseable bid '{raw}'"))?),
        None => None,
    };

    Ok(RawListing {
        domain_name: parsed.full(),
        start_date,
        expiration_date,
        current_bid,
        offer_type: offer_type.map(str::to_string),
        source_data,
        link: link.map(str::to_string),
    })
}

/// Accepts RFC 3339 plus the date/datetime layouts auction exports use.
/// Bare dates are taken as midnight UTC.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
        }
    }
    None
}

fn parse_bid(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    Decimal::from_str(&cleaned).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
domain,start_date,end_date,price,url
example1.com,2026-01-01,2026-12-01,150.00,https://auctions.test/example1
example2.xyz,2026-01-02,2026-12-02,1200.50,https://auctions.test/example2
,2026-01-03,2026-12-03,10.00,https://auctions.test/missing
ex.com,2026-01-04,not-a-date,10.00,https://auctions.test/baddate
";

    #[test]
    fn parse_csv_keeps_valid_and_skips_invalid() {
        let batch = parse_csv(CSV, None).expect("parse");
        assert_eq!(batch.listings.len(), 2);
        assert_eq!(batch.skipped.len(), 2);

        assert_eq!(batch.listings[0].domain_name, "example1.com");
        assert_eq!(
            batch.listings[0].current_bid,
            Some(Decimal::from_str("150.00").expect("decimal"))
        );
        assert_eq!(
            batch.listings[0].link.as_deref(),
            Some("https://auctions.test/example1")
        );

        assert!(batch.skipped[0].reason.contains("missing domain"));
        assert!(batch.skipped[1].reason.contains("unparseable expiration"));
    }

    #[test]
    fn parse_csv_records_source_payload() {
        let batch = parse_csv(CSV, None).expect("parse");
        let payload = &batch.listings[0].source_data;
        assert_eq!(payload["domain"], "example1.com");
        assert_eq!(payload["price"], "150.00");
    }

    #[test]
    fn parse_csv_applies_default_offer_type() {
        let batch = parse_csv(CSV, Some("bid")).expect("parse");
        assert_eq!(batch.listings[0].offer_type.as_deref(), Some("bid"));
    }

    #[test]
    fn parse_csv_without_domain_column_fails_whole_file() {
        let result = parse_csv("foo,bar\n1,2\n", None);
        assert!(
            matches!(result, Err(PipelineError::Validation(_))),
            "expected Validation error, got {result:?}"
        );
    }

    #[test]
    fn parse_csv_normalizes_domain_case() {
        let batch = parse_csv("domain,end_date\nExAmPlE.COM,2026-12-01\n", None).expect("parse");
        assert_eq!(batch.listings[0].domain_name, "example.com");
    }

    #[test]
    fn parse_json_accepts_top_level_array() {
        let data = r#"[
            {"domain": "example.com", "expires": "2026-12-01", "bid": 42},
            {"name": "other.net", "end_date": "2026-11-15T12:00:00Z"}
        ]"#;
        let batch = parse_json(data, None).expect("parse");
        assert_eq!(batch.listings.len(), 2);
        assert!(batch.skipped.is_empty());
        assert_eq!(batch.listings[0].current_bid, Some(Decimal::from(42)));
        assert_eq!(batch.listings[1].domain_name, "other.net");
    }

    #[test]
    fn parse_json_accepts_listings_wrapper() {
        let data = r#"{"listings": [{"domain": "example.com", "expires": "2026-12-01"}]}"#;
        let batch = parse_json(data, None).expect("parse");
        assert_eq!(batch.listings.len(), 1);
    }

    #[test]
    fn parse_json_skips_invalid_records() {
        let data = r#"[
            {"domain": "example.com", "expires": "2026-12-01"},
            {"expires": "2026-12-01"},
            "not-an-object"
        ]"#;
        let batch = parse_json(data, None).expect("parse");
        assert_eq!(batch.listings.len(), 1);
        assert_eq!(batch.skipped.len(), 2);
    }

    #[test]
    fn parse_json_rejects_scalar_payload() {
        let result = parse_json("42", None);
        assert!(
            matches!(result, Err(PipelineError::Validation(_))),
            "expected Validation error, got {result:?}"
        );
    }

    #[test]
    fn parse_date_accepts_common_layouts() {
        for raw in [
            "2026-12-01",
            "2026-12-01 10:30:00",
            "2026-12-01T10:30:00",
            "2026-12-01T10:30:00Z",
            "12/01/2026",
        ] {
            assert!(parse_date(raw).is_some(), "failed to parse {raw}");
        }
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert!(parse_date("tomorrow").is_none());
    }

    #[test]
    fn parse_bid_strips_currency_noise() {
        assert_eq!(
            parse_bid("$1,200.50"),
            Some(Decimal::from_str("1200.50").expect("decimal"))
        );
    }
}
