//! Property-based tests for the crypto module.
//!
//! These tests verify properties that must always hold:
//! - Constant-time equality agrees with ordinary equality
//! - Set membership agrees with a naive lookup and visits every element
//! - Digests are deterministic and format-insensitive
//! - Integrity tokens bind every fact

use chrono::{TimeZone, Utc};
use promogate_crypto::{
    bytes_equal, set_contains, strings_equal, AccessIntegrityToken, CodeDigest, EntitlementFacts,
};
use promogate_types::CanonicalCode;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

fn code_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("(LT|MO)[A-Z2-9]{8}").unwrap()
}

fn code_set_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(code_strategy(), 0..64)
}

/// Wraps a set element and counts how often it is inspected.
struct Counted<'a> {
    value: &'a [u8],
    visits: &'a AtomicUsize,
}

impl AsRef<[u8]> for Counted<'_> {
    fn as_ref(&self) -> &[u8] {
        self.visits.fetch_add(1, Ordering::Relaxed);
        self.value
    }
}

fn counted_scan(set: &[String], needle: &str) -> (bool, usize) {
    let visits = AtomicUsize::new(0);
    let found = set_contains(
        set.iter().map(|s| Counted {
            value: s.as_bytes(),
            visits: &visits,
        }),
        needle.as_bytes(),
    );
    (found, visits.load(Ordering::Relaxed))
}

// =============================================================================
// MATCHER PROPERTIES
// =============================================================================

mod matcher_properties {
    use super::*;

    proptest! {
        /// Constant-time equality agrees with `==`.
        #[test]
        fn strings_equal_matches_eq(a in code_strategy(), b in code_strategy()) {
            prop_assert_eq!(strings_equal(&a, &b), a == b);
            prop_assert!(strings_equal(&a, &a));
        }

        /// Arbitrary bytes, including different lengths.
        #[test]
        fn bytes_equal_matches_eq(
            a in prop::collection::vec(any::<u8>(), 0..40),
            b in prop::collection::vec(any::<u8>(), 0..40),
        ) {
            prop_assert_eq!(bytes_equal(&a, &b), a == b);
        }

        /// Membership agrees with a naive lookup.
        #[test]
        fn set_contains_matches_naive(set in code_set_strategy(), needle in code_strategy()) {
            let expected = set.contains(&needle);
            prop_assert_eq!(set_contains(&set, needle.as_bytes()), expected);
        }

        /// Every element is inspected exactly once, hit or miss.
        #[test]
        fn set_contains_visits_every_element(set in code_set_strategy(), pick in any::<prop::sample::Index>()) {
            let (_, misses) = counted_scan(&set, "XX00000000");
            prop_assert_eq!(misses, set.len());

            if !set.is_empty() {
                let needle = set[pick.index(set.len())].clone();
                let (found, hits) = counted_scan(&set, &needle);
                prop_assert!(found);
                prop_assert_eq!(hits, set.len());
            }
        }
    }

    #[test]
    fn scan_work_independent_of_match_position() {
        let set: Vec<String> = (0..100).map(|i| format!("LTCODE{i:04}")).collect();

        let (first, first_visits) = counted_scan(&set, "LTCODE0000");
        let (last, last_visits) = counted_scan(&set, "LTCODE0099");
        let (none, none_visits) = counted_scan(&set, "LTCODE9999");

        assert!(first && last && !none);
        assert_eq!(first_visits, 100);
        assert_eq!(last_visits, 100);
        assert_eq!(none_visits, 100);
    }

    #[test]
    fn empty_set_contains_nothing() {
        let set: Vec<String> = Vec::new();
        assert!(!set_contains(&set, b"LTAB12CD34"));
    }
}

// =============================================================================
// DIGEST PROPERTIES
// =============================================================================

mod digest_properties {
    use super::*;

    proptest! {
        /// Formatting variants hash identically.
        #[test]
        fn digest_ignores_formatting(code in code_strategy()) {
            let pretty = format!("{}-{}-{}", &code[..2], &code[2..6], &code[6..]).to_lowercase();
            prop_assert_eq!(
                CodeDigest::of(&CanonicalCode::normalize(&code)),
                CodeDigest::of(&CanonicalCode::normalize(&pretty))
            );
        }

        /// Distinct codes produce distinct digests.
        #[test]
        fn distinct_codes_distinct_digests(a in code_strategy(), b in code_strategy()) {
            prop_assume!(a != b);
            prop_assert_ne!(
                CodeDigest::of(&CanonicalCode::normalize(&a)),
                CodeDigest::of(&CanonicalCode::normalize(&b))
            );
        }
    }
}

// =============================================================================
// INTEGRITY TOKEN PROPERTIES
// =============================================================================

mod integrity_properties {
    use super::*;

    proptest! {
        /// Changing the expiry invalidates the token.
        #[test]
        fn token_binds_expiry(secs in 1_700_000_000i64..1_900_000_000, delta in 1i64..10_000_000) {
            let at = Utc.timestamp_opt(secs, 0).unwrap();
            let facts = EntitlementFacts::subscription(at);
            let token = AccessIntegrityToken::compute(&facts);

            prop_assert!(token.verify(&facts));

            let extended = EntitlementFacts::subscription(Utc.timestamp_opt(secs + delta, 0).unwrap());
            prop_assert!(!token.verify(&extended));
        }
    }

    #[test]
    fn token_binds_flags() {
        let facts = EntitlementFacts::subscription(Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap());
        let token = AccessIntegrityToken::compute(&facts);

        let mut forged = facts;
        forged.has_lifetime = true;
        assert!(!token.verify(&forged));

        let lifetime = AccessIntegrityToken::compute(&EntitlementFacts::lifetime());
        assert!(lifetime.verify(&EntitlementFacts::lifetime()));
        assert_ne!(lifetime, token);
    }

    #[test]
    fn token_serializes_as_hex_string() {
        let token = AccessIntegrityToken::compute(&EntitlementFacts::lifetime());
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json.len(), 64 + 2);
        let parsed: AccessIntegrityToken = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, token);
    }
}
