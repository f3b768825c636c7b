//! Password hashing and strength rules.
//!
//! The rules mirror the usual web-framework defaults: minimum length, a
//! common-password blocklist, no all-digit passwords, and no passwords that
//! are too close to the user's own attributes.

use std::collections::{HashMap, HashSet};

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use once_cell::sync::Lazy;

pub const MIN_LENGTH: usize = 8;

/// Similarity ratio at or above which a password is rejected.
const MAX_SIMILARITY: f64 = 0.7;

/// Lower-cased blocklist, one password per line.
static COMMON_PASSWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    include_str!("../data/common-passwords.txt")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
});

/// User attributes a password must not resemble, with the label used in
/// the error message.
pub struct UserAttributes<'a> {
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
}

impl<'a> UserAttributes<'a> {
    fn labelled(&self) -> [(&'static str, &'a str); 4] {
        [
            ("username", self.username),
            ("first name", self.first_name),
            ("last name", self.last_name),
            ("email address", self.email),
        ]
    }
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

/// False for a wrong password and for an unparsable stored hash alike.
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Every strength rule `password` breaks, as user-facing messages.
pub fn validate_password(password: &str, attrs: &UserAttributes<'_>) -> Vec<String> {
    let mut errors = Vec::new();

    if let Some(label) = too_similar(password, attrs) {
        errors.push(format!("The password is too similar to the {}.", label));
    }
    if password.chars().count() < MIN_LENGTH {
        errors.push(format!(
            "This password is too short. It must contain at least {} characters.",
            MIN_LENGTH
        ));
    }
    let normalized = password.trim().to_lowercase();
    if COMMON_PASSWORDS.contains(normalized.as_str()) {
        errors.push("This password is too common.".to_string());
    }
    if !password.is_empty() && password.chars().all(char::is_numeric) {
        errors.push("This password is entirely numeric.".to_string());
    }

    errors
}

fn too_similar(password: &str, attrs: &UserAttributes<'_>) -> Option<&'static str> {
    let password = password.to_lowercase();
    for (label, value) in attrs.labelled() {
        if value.is_empty() {
            continue;
        }
        let value = value.to_lowercase();
        let parts = value
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .chain(std::iter::once(value.as_str()));
        for part in parts {
            if exceeds_length_ratio(&password, part) {
                continue;
            }
            if quick_ratio(&password, part) >= MAX_SIMILARITY {
                return Some(label);
            }
        }
    }
    None
}

/// A password ten times longer than the attribute can't be "too similar" to
/// it in any meaningful way.
fn exceeds_length_ratio(password: &str, value: &str) -> bool {
    let pwd_len = password.chars().count() as f64;
    let value_len = value.chars().count() as f64;
    pwd_len >= 10.0 * value_len && value_len < MAX_SIMILARITY / 2.0 * pwd_len
}

/// Upper bound on the matching-blocks similarity: twice the size of the
/// character multiset intersection over the combined length.
fn quick_ratio(a: &str, b: &str) -> f64 {
    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return 1.0;
    }
    let mut available: HashMap<char, usize> = HashMap::new();
    for c in b.chars() {
        *available.entry(c).or_default() += 1;
    }
    let mut matches = 0usize;
    for c in a.chars() {
        if let Some(n) = available.get_mut(&c) {
            if *n > 0 {
                *n -= 1;
                matches += 1;
            }
        }
    }
    2.0 * matches as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOBODY: UserAttributes<'static> = UserAttributes {
        username: "",
        first_name: "",
        last_name: "",
        email: "",
    };

    #[test]
    fn strong_password_passes() {
        assert!(validate_password("q1w2e3R$", &NOBODY).is_empty());
        assert!(validate_password("correct horse battery", &NOBODY).is_empty());
    }

    #[test]
    fn short_password_fails() {
        let errors = validate_password("x9!k", &NOBODY);
        assert_eq!(
            errors,
            ["This password is too short. It must contain at least 8 characters."]
        );
    }

    #[test]
    fn common_password_fails_case_insensitively() {
        let errors = validate_password("PassWord123", &NOBODY);
        assert_eq!(errors, ["This password is too common."]);
    }

    #[test]
    fn blocklist_covers_longer_entries() {
        for common in ["asdfasdf", "qwer1234", "iloveyou2", "Charlie1"] {
            assert_eq!(validate_password(common, &NOBODY), ["This password is too common."], "{common}");
        }
        assert!(COMMON_PASSWORDS.len() > 5000);
    }

    #[test]
    fn numeric_password_collects_every_message() {
        let errors = validate_password("12345678", &NOBODY);
        assert!(errors.contains(&"This password is too common.".to_string()));
        assert!(errors.contains(&"This password is entirely numeric.".to_string()));

        let errors = validate_password("90817263", &NOBODY);
        assert_eq!(errors, ["This password is entirely numeric."]);
    }

    #[test]
    fn similar_to_username_fails() {
        let attrs = UserAttributes {
            username: "margaret_hamilton",
            ..NOBODY
        };
        let errors = validate_password("hamilton_margaret", &attrs);
        assert_eq!(errors, ["The password is too similar to the username."]);
    }

    #[test]
    fn similar_to_email_part_fails() {
        let attrs = UserAttributes {
            email: "grace.hopper@navy.example",
            ..NOBODY
        };
        let errors = validate_password("hoppergrace", &attrs);
        assert_eq!(errors, ["The password is too similar to the email address."]);
    }

    #[test]
    fn dissimilar_attributes_pass() {
        let attrs = UserAttributes {
            username: "test_user",
            first_name: "Ivan",
            last_name: "Ivanov",
            email: "test@test.com",
        };
        assert!(validate_password("q1w2e3R$", &attrs).is_empty());
    }

    #[test]
    fn hash_roundtrip() {
        let hash = hash_password("s3cret-enough").unwrap();
        assert_ne!(hash, "s3cret-enough");
        assert!(verify_password("s3cret-enough", &hash));
        assert!(!verify_password("wrong-password", &hash));
        assert!(!verify_password("s3cret-enough", "not-a-phc-string"));
    }

    #[test]
    fn quick_ratio_bounds() {
        assert_eq!(quick_ratio("abc", "abc"), 1.0);
        assert_eq!(quick_ratio("abc", "xyz"), 0.0);
        assert!((quick_ratio("ab", "bc") - 0.5).abs() < f64::EPSILON);
    }
}
