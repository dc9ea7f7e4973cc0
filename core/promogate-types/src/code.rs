//! Code types and canonical code normalization.
//!
//! Human-readable codes look like `LT-AB12-CD34`. Users type them with any
//! casing, spacing or hyphenation, so every comparison happens on the
//! canonical form: uppercase with whitespace and separators removed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator used in the human-readable code format.
pub const CODE_SEPARATOR: char = '-';

/// The entitlement a code grants.
///
/// The prefix is public information: it is only used to pick which hashed
/// set to consult, never as proof of validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeType {
    /// Permanent premium access.
    Lifetime,
    /// One calendar month of premium access.
    TimeLimited,
}

impl CodeType {
    /// All code types, in a stable order.
    pub const ALL: [CodeType; 2] = [CodeType::Lifetime, CodeType::TimeLimited];

    /// Returns the textual prefix carried by codes of this type.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Lifetime => "LT",
            Self::TimeLimited => "MO",
        }
    }

    /// Classifies a canonical code by its prefix.
    ///
    /// Returns `None` for unprefixed (legacy) codes.
    #[must_use]
    pub fn classify(code: &CanonicalCode) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| code.as_str().starts_with(t.prefix()))
    }

    /// Returns true if codes of this type never expire.
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        matches!(self, Self::Lifetime)
    }

    /// Returns the stable lowercase name used in config and on the CLI.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lifetime => "lifetime",
            Self::TimeLimited => "time_limited",
        }
    }
}

impl fmt::Display for CodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodeType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lifetime" | "lt" => Ok(Self::Lifetime),
            "time_limited" | "time-limited" | "monthly" | "mo" => Ok(Self::TimeLimited),
            other => Err(crate::Error::UnknownCodeType(other.to_string())),
        }
    }
}

/// A promo code in canonical form.
///
/// Derived deterministically from raw input, so `lt-ab12-cd34`,
/// `LT AB12 CD34` and `LTAB12CD34` all produce the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalCode(String);

impl CanonicalCode {
    /// Normalizes raw user input.
    ///
    /// The result may be empty; callers reject that case themselves.
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        let canonical = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != CODE_SEPARATOR)
            .flat_map(char::to_uppercase)
            .collect();
        Self(canonical)
    }

    /// Returns true if normalization left nothing behind.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the canonical string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the canonical bytes (the input to hashing).
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Returns a form safe for logs: the prefix followed by a mask.
    #[must_use]
    pub fn redacted(&self) -> String {
        let visible: String = self.0.chars().take(2).collect();
        format!("{visible}***")
    }

    /// Formats the code for humans, e.g. `LT-AB12-CD34`.
    ///
    /// The prefix is split off when recognized and the body is grouped in
    /// blocks of four.
    #[must_use]
    pub fn display_form(&self) -> String {
        let (prefix, body) = match CodeType::classify(self) {
            Some(t) => (Some(t.prefix()), &self.0[t.prefix().len()..]),
            None => (None, self.0.as_str()),
        };

        let mut groups: Vec<String> = Vec::new();
        if let Some(p) = prefix {
            groups.push(p.to_string());
        }
        let chars: Vec<char> = body.chars().collect();
        for chunk in chars.chunks(4) {
            groups.push(chunk.iter().collect());
        }
        groups.join(&CODE_SEPARATOR.to_string())
    }
}

impl fmt::Display for CanonicalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CanonicalCode {
    fn from(raw: &str) -> Self {
        Self::normalize(raw)
    }
}

impl AsRef<[u8]> for CanonicalCode {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_form_groups_body() {
        let code = CanonicalCode::normalize("ltab12cd34");
        assert_eq!(code.display_form(), "LT-AB12-CD34");
    }

    #[test]
    fn display_form_legacy() {
        let code = CanonicalCode::normalize("abcd efgh");
        assert_eq!(code.display_form(), "ABCD-EFGH");
    }

    #[test]
    fn redacted_hides_body() {
        let code = CanonicalCode::normalize("LT-AB12-CD34");
        assert_eq!(code.redacted(), "LT***");
    }
}
