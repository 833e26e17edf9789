//! Cross-type comparison and LIKE matching
//!
//! Comparisons never fail: values of incompatible types are simply not
//! comparable (`None`), which makes the enclosing predicate false.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::types::Value;

/// Compares two values, widening where a lossless interpretation exists.
///
/// - long/double compare numerically
/// - textual values compare lexicographically
/// - text is parsed when compared with a number, a boolean or a datetime
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Long(a), Value::Long(b)) => Some(a.cmp(b)),
        (a, b) if a.is_numeric() && b.is_numeric() => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
        (a, b) if a.is_textual() && b.is_textual() => Some(a.as_str()?.cmp(b.as_str()?)),

        (Value::DateTime(a), b) if b.is_textual() => parse_datetime(b.as_str()?).map(|b| a.cmp(&b)),
        (a, Value::DateTime(b)) if a.is_textual() => parse_datetime(a.as_str()?).map(|a| a.cmp(b)),

        (Value::Boolean(a), b) if b.is_textual() => parse_bool(b.as_str()?).map(|b| a.cmp(&b)),
        (a, Value::Boolean(b)) if a.is_textual() => parse_bool(a.as_str()?).map(|a| a.cmp(b)),

        (a, b) if a.is_numeric() && b.is_textual() => {
            let b = b.as_str()?.trim().parse::<f64>().ok()?;
            a.as_f64()?.partial_cmp(&b)
        }
        (a, b) if a.is_textual() && b.is_numeric() => {
            let a = a.as_str()?.trim().parse::<f64>().ok()?;
            a.partial_cmp(&b.as_f64()?)
        }
        _ => None,
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Compiled LIKE pattern.
///
/// `%` matches any sequence, `_` any single character, `\` escapes the next
/// character.
#[derive(Debug, Clone)]
pub struct LikePattern {
    regex: Regex,
}

impl LikePattern {
    /// Compiles a LIKE pattern
    pub fn compile(pattern: &str) -> Result<Self, regex::Error> {
        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push_str("(?s)^");

        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            match c {
                '%' => expr.push_str(".*"),
                '_' => expr.push('.'),
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        expr.push_str(&regex::escape(&escaped.to_string()));
                    }
                }
                other => expr.push_str(&regex::escape(&other.to_string())),
            }
        }
        expr.push('$');

        Ok(Self {
            regex: Regex::new(&expr)?,
        })
    }

    /// Returns true if the text matches the whole pattern
    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_numeric_widening() {
        assert_eq!(
            compare_values(&Value::Long(2), &Value::Double(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_values(&Value::Double(3.0), &Value::Long(3)),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn test_text_parsed_against_number() {
        assert_eq!(
            compare_values(&Value::from("10"), &Value::Long(9)),
            Some(Ordering::Greater)
        );
        assert_eq!(compare_values(&Value::from("abc"), &Value::Long(9)), None);
    }

    #[test]
    fn test_incompatible_types_not_comparable() {
        assert_eq!(compare_values(&Value::Boolean(true), &Value::Long(1)), None);
    }

    #[test]
    fn test_datetime_against_text() {
        let dt = Utc.with_ymd_and_hms(2010, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            compare_values(&Value::DateTime(dt), &Value::from("2010-01-02T03:04:05Z")),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn test_like_wildcards() {
        let pattern = LikePattern::compile("re%rt_").unwrap();
        assert!(pattern.matches("report1"));
        assert!(pattern.matches("rert2"));
        assert!(!pattern.matches("report"));
    }

    #[test]
    fn test_like_escape_and_regex_metacharacters() {
        let pattern = LikePattern::compile(r"100\%.txt").unwrap();
        assert!(pattern.matches("100%.txt"));
        assert!(!pattern.matches("100abc.txt"));
        assert!(!pattern.matches("100%xtxt"));
    }
}
