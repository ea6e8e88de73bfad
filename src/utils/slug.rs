//! Slug generation and validation.
//!
//! Slugs are short random tokens used as the public lookup key of a stored
//! URL.

use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

/// Length of a generated slug.
pub const SLUG_LENGTH: usize = 8;

const CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Shape accepted for incoming slugs: ASCII alphanumerics, not starting
/// with a digit.
static SLUG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][0-9A-Za-z]*$").expect("slug regex is valid"));

/// Generates a random slug of [`SLUG_LENGTH`] characters.
///
/// The first character is always a letter so a slug never parses as a
/// number.
///
/// # Examples
///
/// ```ignore
/// let slug = generate_slug();
/// assert_eq!(slug.len(), 8);
/// assert!(slug.chars().next().unwrap().is_ascii_alphabetic());
/// ```
pub fn generate_slug() -> String {
    let mut rng = rand::rng();
    let mut slug = String::with_capacity(SLUG_LENGTH);

    while slug.len() < SLUG_LENGTH {
        let c = CHARSET[rng.random_range(0..CHARSET.len())] as char;
        if slug.is_empty() && c.is_ascii_digit() {
            continue;
        }
        slug.push(c);
    }

    slug
}

/// Returns true if `slug` could have been issued by this service.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty() && slug.len() <= 64 && SLUG_REGEX.is_match(slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_slug_has_correct_length() {
        assert_eq!(generate_slug().len(), SLUG_LENGTH);
    }

    #[test]
    fn test_generate_slug_never_starts_with_digit() {
        for _ in 0..1000 {
            let slug = generate_slug();
            assert!(!slug.chars().next().unwrap().is_ascii_digit(), "{slug}");
        }
    }

    #[test]
    fn test_generate_slug_charset() {
        for _ in 0..100 {
            assert!(generate_slug().chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_generate_slug_uniqueness() {
        let slugs: HashSet<String> = (0..1000).map(|_| generate_slug()).collect();

        assert_eq!(slugs.len(), 1000);
    }

    #[test]
    fn test_generated_slugs_are_valid() {
        for _ in 0..100 {
            assert!(is_valid_slug(&generate_slug()));
        }
    }

    #[test]
    fn test_is_valid_slug_rejects_bad_input() {
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("1abcdefg"));
        assert!(!is_valid_slug("abc/def"));
        assert!(!is_valid_slug("abc-def"));
        assert!(!is_valid_slug(&"a".repeat(65)));
    }
}
