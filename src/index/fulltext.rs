//! Full-text expressions and term-frequency scoring
//!
//! Expression grammar: whitespace separated terms, `"quoted phrases"`, and a
//! leading `-` to exclude a term or phrase. Every non-excluded term must be
//! present. Matching is case-insensitive over alphanumeric tokens.

/// Parsed search expression
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FullTextExpression {
    required: Vec<Vec<String>>,
    excluded: Vec<Vec<String>>,
}

impl FullTextExpression {
    pub fn parse(expression: &str) -> Self {
        let mut parsed = Self::default();
        let mut chars = expression.chars().peekable();

        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                chars.next();
                continue;
            }

            let negated = c == '-';
            if negated {
                chars.next();
            }

            let mut raw = String::new();
            if chars.peek() == Some(&'"') {
                chars.next();
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                    raw.push(c);
                }
            } else {
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() {
                        break;
                    }
                    raw.push(c);
                    chars.next();
                }
            }

            let phrase = tokenize(&raw);
            if phrase.is_empty() {
                continue;
            }
            if negated {
                parsed.excluded.push(phrase);
            } else {
                parsed.required.push(phrase);
            }
        }
        parsed
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.excluded.is_empty()
    }

    /// Score of a token stream, `None` when it does not match.
    ///
    /// The score is the number of occurrences of the required phrases; an
    /// expression with only exclusions scores 1 on a match.
    pub fn score(&self, tokens: &[String]) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        if self.excluded.iter().any(|p| count_phrase(tokens, p) > 0) {
            return None;
        }

        let mut total = 0usize;
        for phrase in &self.required {
            match count_phrase(tokens, phrase) {
                0 => return None,
                n => total += n,
            }
        }
        Some(total.max(1) as f64)
    }
}

/// Lowercased alphanumeric tokens
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn count_phrase(tokens: &[String], phrase: &[String]) -> usize {
    if phrase.is_empty() || tokens.len() < phrase.len() {
        return 0;
    }
    tokens
        .windows(phrase.len())
        .filter(|window| *window == phrase)
        .count()
}
