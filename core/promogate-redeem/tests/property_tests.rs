//! Property-based tests for validation and rate limiting.
//!
//! - Any hyphenation, spacing or casing of an issued code validates
//! - Codes outside the registry never validate and always count
//! - The limiter never holds more attempts than fit in its window

mod common;

use chrono::Duration;
use common::{registry, start, LIFETIME_CODES, MONTHLY_CODES};
use promogate_redeem::{CodeValidator, RateLimiter, RedemptionConfig, Rejection};
use promogate_types::LedgerSnapshot;
use proptest::prelude::*;

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

fn issued_code() -> impl Strategy<Value = &'static str> {
    prop::sample::select(
        LIFETIME_CODES
            .iter()
            .chain(&MONTHLY_CODES)
            .copied()
            .collect::<Vec<_>>(),
    )
}

/// Re-formats a code the way a user might type it.
fn mangle(code: &str, separators: &[u8], lowercase: &[bool]) -> String {
    let mut out = String::new();
    for (i, c) in code.chars().enumerate() {
        match separators.get(i).copied().unwrap_or(0) % 4 {
            1 => out.push('-'),
            2 => out.push(' '),
            3 => out.push('\t'),
            _ => {}
        }
        if lowercase.get(i).copied().unwrap_or(false) {
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn formatting_never_changes_validity(
        code in issued_code(),
        separators in prop::collection::vec(any::<u8>(), 10),
        lowercase in prop::collection::vec(any::<bool>(), 10),
    ) {
        let validator = CodeValidator::new(registry(), false);
        let mut limiter = RateLimiter::new(&RedemptionConfig::default());
        let typed = mangle(code, &separators, &lowercase);

        let result = validator.validate(&typed, &LedgerSnapshot::default(), &mut limiter, start());
        prop_assert!(result.is_valid(), "{:?} rejected", typed);
        prop_assert_eq!(limiter.attempts_in_window(start()), 0);
    }

    #[test]
    fn unissued_codes_never_validate(body in "[A-Z2-9]{8}", prefix in "(LT|MO)") {
        let code = format!("{prefix}{body}");
        prop_assume!(!LIFETIME_CODES.contains(&code.as_str()));
        prop_assume!(!MONTHLY_CODES.contains(&code.as_str()));

        let validator = CodeValidator::new(registry(), false);
        let mut limiter = RateLimiter::new(&RedemptionConfig::default());
        let result = validator.validate(&code, &LedgerSnapshot::default(), &mut limiter, start());

        prop_assert_eq!(result.rejection(), Some(Rejection::UnrecognizedCode));
        prop_assert_eq!(limiter.attempts_in_window(start()), 1);
    }

    #[test]
    fn window_bounds_attempt_count(offsets in prop::collection::vec(0i64..600, 1..40)) {
        let config = RedemptionConfig {
            max_attempts: 1000,
            attempt_window_secs: 60,
            ..RedemptionConfig::default()
        };
        let mut limiter = RateLimiter::new(&config);
        let mut offsets = offsets;
        offsets.sort_unstable();

        for (i, offset) in offsets.iter().enumerate() {
            let now = start() + Duration::seconds(*offset);
            limiter.record_attempt(now);
            let expected = offsets[..=i]
                .iter()
                .filter(|o| **o > *offset - 60)
                .count();
            prop_assert_eq!(limiter.attempts_in_window(now), expected);
        }
    }
}
