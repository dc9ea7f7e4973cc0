//! Compiled-in digests of every issued code.
//!
//! Sets are partitioned by code type and are append-only once shipped: a
//! released registry must be a subset of every later one.

use crate::error::{RedeemError, RedeemResult};
use promogate_crypto::{set_contains, CodeDigest};
use promogate_types::{CanonicalCode, CodeType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

const BUILTIN_LIFETIME: &[&str] = &[
    "a8c59afb876883a5e5052cdde868ad4669eb036ae449f1212cf12fc521ab94d2",
    "9f890daad9ae940ec2f833b99d54fb3db8ecac798951f7df6046cd9b2d4e228a",
    "38045e469615b4b51bfbc08bbebe08d69e2ff7dec788e13c2aab3b9b0824ef4d",
    "7ff39cdb7cd829ce729586f462b647bf7c96eea36ba31c8761c2f0fef6ed8391",
    "f7e8ba8bd0c1ab68503c6e134f853a524c97bc5c3957b85aee08b8e977db3f19",
    "ac94ef3e1aea779cfaf9c989cd8470b10e5126aae4756a9081f09c902b84f7f6",
];

const BUILTIN_TIME_LIMITED: &[&str] = &[
    "49fa15cf28800232593b5e27d7e4a0e01bd2313ccb0130c1dfddf3f824be01e0",
    "550f87dbcbd6733c7047f22be4a44e8bdd328367a6b613323c5be88a73ce2b08",
    "afbbb32c4182022bd43e38180fc573256a8fc880f211604535adeba911ef384d",
    "0041f906bfe9883a20c072999e17c91b70bb4e95cb7997914fad966d0fa6b9af",
    "8f4427be3779e745a198e6e3123418d30101acdabd9621e6e5c00301196f0594",
    "7ff0fd1e38b594e1253f69efce0a5d95241bc12714f4e3b60f6dffd99abe412b",
];

const BUILTIN_LEGACY: &[&str] = &[];

/// On-disk form of a registry: hex digests per set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryFile {
    #[serde(default)]
    pub lifetime: Vec<String>,
    #[serde(default)]
    pub time_limited: Vec<String>,
    #[serde(default)]
    pub legacy: Vec<String>,
}

/// Immutable digest sets for every code type, plus the legacy set.
#[derive(Debug, Clone, Default)]
pub struct HashRegistry {
    lifetime: Vec<CodeDigest>,
    time_limited: Vec<CodeDigest>,
    legacy: Vec<CodeDigest>,
}

impl HashRegistry {
    /// The registry shipped with this binary.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            lifetime: parse_builtin(BUILTIN_LIFETIME),
            time_limited: parse_builtin(BUILTIN_TIME_LIMITED),
            legacy: parse_builtin(BUILTIN_LEGACY),
        }
    }

    /// Parses a registry emitted by the admin tool.
    pub fn from_json(json: &str) -> RedeemResult<Self> {
        let file: RegistryFile =
            serde_json::from_str(json).map_err(|e| RedeemError::Config(e.to_string()))?;
        Self::from_file(&file)
    }

    /// Builds a registry from its on-disk form.
    ///
    /// # Errors
    ///
    /// Fails on malformed hex or on a digest that appears in more than one
    /// set.
    pub fn from_file(file: &RegistryFile) -> RedeemResult<Self> {
        let lifetime = parse_set(&file.lifetime)?;
        let time_limited = parse_set(&file.time_limited)?;
        let legacy = parse_set(&file.legacy)?;

        let mut seen = HashSet::new();
        for digest in lifetime.iter().chain(&time_limited).chain(&legacy) {
            if !seen.insert(*digest.as_bytes()) {
                return Err(RedeemError::Config(format!(
                    "digest {} listed in more than one set",
                    digest.to_hex()
                )));
            }
        }

        Ok(Self {
            lifetime,
            time_limited,
            legacy,
        })
    }

    /// Hashes plaintext codes into a registry. Used by tooling and tests.
    ///
    /// Legacy codes that start with a type prefix are dropped with a
    /// warning: the validator classifies them as prefixed, so their digest
    /// in the legacy set could never match.
    #[must_use]
    pub fn from_codes(lifetime: &[&str], time_limited: &[&str], legacy: &[&str]) -> Self {
        let hash_all = |codes: &[&str]| {
            codes
                .iter()
                .map(|c| CodeDigest::of(&CanonicalCode::normalize(c)))
                .collect()
        };
        let legacy = legacy
            .iter()
            .map(|c| CanonicalCode::normalize(c))
            .filter(|code| match CodeType::classify(code) {
                Some(code_type) => {
                    warn!(
                        code = %code.redacted(),
                        prefix = code_type.prefix(),
                        "Dropping legacy code that carries a type prefix"
                    );
                    false
                }
                None => true,
            })
            .map(|code| CodeDigest::of(&code))
            .collect();
        Self {
            lifetime: hash_all(lifetime),
            time_limited: hash_all(time_limited),
            legacy,
        }
    }

    /// Returns the on-disk form.
    #[must_use]
    pub fn to_file(&self) -> RegistryFile {
        let encode = |set: &[CodeDigest]| set.iter().map(CodeDigest::to_hex).collect();
        RegistryFile {
            lifetime: encode(&self.lifetime),
            time_limited: encode(&self.time_limited),
            legacy: encode(&self.legacy),
        }
    }

    /// Digests of issued codes of `code_type`.
    #[must_use]
    pub fn digests(&self, code_type: CodeType) -> &[CodeDigest] {
        match code_type {
            CodeType::Lifetime => &self.lifetime,
            CodeType::TimeLimited => &self.time_limited,
        }
    }

    /// Digests of unprefixed legacy codes.
    #[must_use]
    pub fn legacy_digests(&self) -> &[CodeDigest] {
        &self.legacy
    }

    /// Total number of digests across all sets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lifetime.len() + self.time_limited.len() + self.legacy.len()
    }

    /// Returns true if no codes were ever issued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if every digest of `shipped` is still present in the
    /// same set here.
    #[must_use]
    pub fn is_superset_of(&self, shipped: &HashRegistry) -> bool {
        let keeps = |ours: &[CodeDigest], theirs: &[CodeDigest]| {
            theirs
                .iter()
                .all(|d| set_contains(ours.iter(), d.as_bytes()))
        };
        keeps(&self.lifetime, &shipped.lifetime)
            && keeps(&self.time_limited, &shipped.time_limited)
            && keeps(&self.legacy, &shipped.legacy)
    }

    /// Appends new digests to the set for `code_type`, skipping any that are
    /// already present.
    pub fn append(&mut self, code_type: CodeType, digests: impl IntoIterator<Item = CodeDigest>) {
        let set = match code_type {
            CodeType::Lifetime => &mut self.lifetime,
            CodeType::TimeLimited => &mut self.time_limited,
        };
        for digest in digests {
            if !set.contains(&digest) {
                set.push(digest);
            }
        }
    }
}

fn parse_set(hexes: &[String]) -> RedeemResult<Vec<CodeDigest>> {
    let mut out: Vec<CodeDigest> = Vec::with_capacity(hexes.len());
    for hex in hexes {
        let digest = CodeDigest::from_hex(hex)?;
        if !out.contains(&digest) {
            out.push(digest);
        }
    }
    Ok(out)
}

fn parse_builtin(hexes: &[&str]) -> Vec<CodeDigest> {
    hexes
        .iter()
        .filter_map(|hex| match CodeDigest::from_hex(hex) {
            Ok(d) => Some(d),
            Err(e) => {
                warn!("Skipping malformed built-in digest: {}", e);
                None
            }
        })
        .collect()
}
