use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use validator::ValidateEmail;

use crate::error::FieldErrors;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";

pub const TITLE_MAX_LEN: usize = 255;
pub const NAME_MAX_LEN: usize = 150;
pub const EMAIL_MAX_LEN: usize = 254;

/// Trimmed, non-blank text. Records `REQUIRED` when absent and `required`
/// is set, `BLANK` when present but empty.
pub fn text(errors: &mut FieldErrors, field: &str, value: Option<String>, required: bool) -> Option<String> {
    match value {
        None => {
            if required {
                errors.add(field, REQUIRED);
            }
            None
        }
        Some(v) => {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                errors.add(field, BLANK);
                None
            } else {
                Some(trimmed.to_string())
            }
        }
    }
}

/// A `title` field: [`text`] capped at [`TITLE_MAX_LEN`].
pub fn title(errors: &mut FieldErrors, value: Option<String>, required: bool) -> Option<String> {
    let title = text(errors, "title", value, required)?;
    max_len(errors, "title", &title, TITLE_MAX_LEN).then_some(title)
}

/// Like [`text`] but without trimming, for secrets.
pub fn password(errors: &mut FieldErrors, field: &str, value: Option<String>) -> Option<String> {
    match value {
        None => {
            errors.add(field, REQUIRED);
            None
        }
        Some(v) if v.is_empty() => {
            errors.add(field, BLANK);
            None
        }
        Some(v) => Some(v),
    }
}

pub fn max_len(errors: &mut FieldErrors, field: &str, value: &str, max: usize) -> bool {
    if value.chars().count() > max {
        errors.add(
            field,
            format!("Ensure this field has no more than {} characters.", max),
        );
        return false;
    }
    true
}

/// Letters, digits and `@ . + - _`, at most 150 characters.
pub fn username(errors: &mut FieldErrors, value: &str) -> bool {
    if !max_len(errors, "username", value, NAME_MAX_LEN) {
        return false;
    }
    let valid = value
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    if !valid {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
    valid
}

pub fn email(errors: &mut FieldErrors, value: &str) -> bool {
    if !max_len(errors, "email", value, EMAIL_MAX_LEN) {
        return false;
    }
    if !is_valid_email(value) {
        errors.add("email", "Enter a valid email address.");
        return false;
    }
    true
}

/// RFC 5322 syntax check, tightened to a dot-atom local part and a
/// domain with at least two labels.
fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    value.validate_email()
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
        && domain.contains('.')
}

/// ISO 8601 timestamp. Offset-less values are taken as UTC, bare dates as
/// midnight UTC.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn datetime(errors: &mut FieldErrors, field: &str, value: &str) -> Option<DateTime<Utc>> {
    let parsed = parse_datetime(value);
    if parsed.is_none() {
        errors.add(
            field,
            "Datetime has wrong format. Use one of these formats instead: YYYY-MM-DDThh:mm[:ss[.uuuuuu]][+HH:MM|-HH:MM|Z].",
        );
    }
    parsed
}

/// Parse a choice field, recording DRF's "not a valid choice" message.
pub fn choice<T: std::str::FromStr>(errors: &mut FieldErrors, field: &str, value: &str) -> Option<T> {
    let parsed = value.parse().ok();
    if parsed.is_none() {
        errors.add(field, format!("\"{}\" is not a valid choice.", value));
    }
    parsed
}

pub fn missing_object(id: i64) -> String {
    format!("Invalid pk \"{}\" - object does not exist.", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use todolist_types::Priority;

    #[test]
    fn text_trims_and_flags_blank() {
        let mut errors = FieldErrors::default();
        assert_eq!(text(&mut errors, "title", Some("  hi ".into()), true).as_deref(), Some("hi"));
        assert!(errors.is_empty());

        assert_eq!(text(&mut errors, "title", Some("   ".into()), true), None);
        assert_eq!(text(&mut errors, "name", None, true), None);
        assert_eq!(text(&mut errors, "optional", None, false), None);

        let expected = {
            let mut e = FieldErrors::default();
            e.add("title", BLANK);
            e.add("name", REQUIRED);
            e
        };
        assert_eq!(errors, expected);
    }

    #[test]
    fn passwords_are_not_trimmed() {
        let mut errors = FieldErrors::default();
        assert_eq!(password(&mut errors, "password", Some(" pw ".into())).as_deref(), Some(" pw "));
        assert!(errors.is_empty());
    }

    #[test]
    fn usernames() {
        let mut errors = FieldErrors::default();
        assert!(username(&mut errors, "test.user+tag@home-1_x"));
        assert!(!username(&mut errors, "has space"));
        assert!(!username(&mut errors, &"a".repeat(151)));
        assert_eq!(
            serde_json::to_value(&errors).unwrap()["username"].as_array().map(Vec::len),
            Some(2)
        );
    }

    #[test]
    fn emails() {
        for ok in ["test@test.com", "a.b+c@sub.example.org"] {
            assert!(is_valid_email(ok), "{ok}");
        }
        for bad in [
            "invalid_email",
            "@test.com",
            "a@b",
            "a@.com",
            "a b@test.com",
            "a@-x.com",
            "a..b@x.com",
            "a,b@x.com",
            "a<b>@x.com",
            ".a@x.com",
            "a.@x.com",
        ] {
            assert!(!is_valid_email(bad), "{bad}");
        }
    }

    #[test]
    fn datetimes() {
        let dt = parse_datetime("2024-03-01T10:30:00+05:00").unwrap();
        assert_eq!(dt.hour(), 5);

        let naive = parse_datetime("2024-03-01T10:30:00.250").unwrap();
        assert_eq!(naive.hour(), 10);

        let date = parse_datetime("2024-03-01").unwrap();
        assert_eq!((date.day(), date.hour()), (1, 0));

        assert!(parse_datetime("tomorrow").is_none());
    }

    #[test]
    fn choices() {
        let mut errors = FieldErrors::default();
        assert_eq!(choice::<Priority>(&mut errors, "priority", "high"), Some(Priority::High));
        assert_eq!(choice::<Priority>(&mut errors, "priority", "urgent"), None);
        assert_eq!(
            errors,
            FieldErrors::single("priority", "\"urgent\" is not a valid choice.")
        );
    }
}
