//! Cheap boolean filter predicates applied before complex scoring.

use std::collections::HashSet;

use darp_core::{AppConfig, DomainName};

/// Why a listing failed the filter stage, in predicate precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason {
    Tld,
    Length,
    SpecialChars,
    Numbers,
}

impl FilterReason {
    /// The value persisted into `filter_reason`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FilterReason::Tld => "tld",
            FilterReason::Length => "length",
            FilterReason::SpecialChars => "special_chars",
            FilterReason::Numbers => "numbers",
        }
    }
}

/// The configured filter rules. Evaluation is a pure function of the rules
/// and the domain name, so re-running a batch produces identical verdicts.
#[derive(Debug, Clone)]
pub struct FilterRules {
    allowed_tlds: HashSet<String>,
    min_length: usize,
    max_length: usize,
    allow_hyphens: bool,
    allow_digits: bool,
}

impl FilterRules {
    #[must_use]
    pub fn new(
        allowed_tlds: impl IntoIterator<Item = String>,
        min_length: usize,
        max_length: usize,
        allow_hyphens: bool,
        allow_digits: bool,
    ) -> Self {
        Self {
            allowed_tlds: allowed_tlds.into_iter().map(|t| t.to_lowercase()).collect(),
            min_length,
            max_length,
            allow_hyphens,
            allow_digits,
        }
    }

    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(
            config.allowed_tlds.iter().cloned(),
            config.min_name_length,
            config.max_name_length,
            config.allow_hyphens,
            config.allow_digits,
        )
    }

    /// Applies the predicates in fixed precedence order, stopping at the
    /// first failure: TLD allow-list, label length bounds, disallowed
    /// special characters, then digits.
    ///
    /// Length and character checks run over the registrable label only;
    /// the TLD is judged solely by the allow-list.
    ///
    /// # Errors
    ///
    /// Returns the first failing predicate's [`FilterReason`].
    pub fn evaluate(&self, domain: &DomainName) -> Result<(), FilterReason> {
        if !self.allowed_tlds.contains(&domain.tld) {
            return Err(FilterReason::Tld);
        }

        let label = &domain.label;
        if label.chars().count() < self.min_length || label.chars().count() > self.max_length {
            return Err(FilterReason::Length);
        }

        for c in label.chars() {
            if c == '-' {
                if !self.allow_hyphens {
                    return Err(FilterReason::SpecialChars);
                }
            } else if !c.is_ascii_alphanumeric() {
                return Err(FilterReason::SpecialChars);
            }
        }

        if !self.allow_digits && label.chars().any(|c| c.is_ascii_digit()) {
            return Err(FilterReason::Numbers);
        }

        Ok(())
    }
}
