//! Constant-time comparison and set membership.
//!
//! These are deliberately slower than a hash lookup: every call does the
//! same amount of work no matter where, or whether, a match occurs. Sets are
//! small (hundreds of entries) and the path runs at human typing speed.

use subtle::{Choice, ConstantTimeEq};

/// Compares two byte strings without exiting early inside the loop.
///
/// Unequal lengths return false immediately. Length is not secret here:
/// every canonical code of a given type has the same length.
#[must_use]
pub fn bytes_equal(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Compares two strings in constant time. See [`bytes_equal`].
#[must_use]
pub fn strings_equal(a: &str, b: &str) -> bool {
    bytes_equal(a.as_bytes(), b.as_bytes())
}

/// Tests whether `needle` is in `set`, visiting every element.
///
/// Results are OR-combined rather than short-circuited, so total work is
/// O(|set|) regardless of match position.
#[must_use]
pub fn set_contains<I, T>(set: I, needle: &[u8]) -> bool
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut found = Choice::from(0);
    for candidate in set {
        found |= candidate.as_ref().ct_eq(needle);
    }
    found.into()
}
