//! Query text tokenizer

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Bare identifier or keyword; may contain `:` (`cmis:name`)
    Ident(String),
    /// `"..."` identifier
    QuotedIdent(String),
    /// `'...'` string literal, quotes removed and escapes resolved
    Str(String),
    /// Unsigned numeric literal as written
    Number(String),
    /// `$name`
    Variable(String),
    LParen,
    RParen,
    Comma,
    Dot,
    Star,
    Minus,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(s) => write!(f, "'{}'", s),
            TokenKind::QuotedIdent(s) => write!(f, "\"{}\"", s),
            TokenKind::Str(s) => write!(f, "string '{}'", s),
            TokenKind::Number(s) => write!(f, "number {}", s),
            TokenKind::Variable(s) => write!(f, "variable ${}", s),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Eq => write!(f, "'='"),
            TokenKind::NotEq => write!(f, "'<>'"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::LtEq => write!(f, "'<='"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::GtEq => write!(f, "'>='"),
            TokenKind::Eof => write!(f, "end of query"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset in the query text
    pub offset: usize,
}

/// Lexer failure: message and byte offset
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub offset: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == ':'
}

/// Splits query text into tokens, always ending with `Eof`
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let kind = match c {
            '(' | ')' | ',' | '.' | '*' | '-' | '=' => {
                chars.next();
                match c {
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    ',' => TokenKind::Comma,
                    '.' => TokenKind::Dot,
                    '*' => TokenKind::Star,
                    '-' => TokenKind::Minus,
                    _ => TokenKind::Eq,
                }
            }
            '<' => {
                chars.next();
                match chars.peek().map(|&(_, c)| c) {
                    Some('=') => {
                        chars.next();
                        TokenKind::LtEq
                    }
                    Some('>') => {
                        chars.next();
                        TokenKind::NotEq
                    }
                    _ => TokenKind::Lt,
                }
            }
            '>' => {
                chars.next();
                if chars.peek().map(|&(_, c)| c) == Some('=') {
                    chars.next();
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            '!' => {
                chars.next();
                if chars.peek().map(|&(_, c)| c) == Some('=') {
                    chars.next();
                    TokenKind::NotEq
                } else {
                    return Err(LexError {
                        message: "expected '=' after '!'".into(),
                        offset,
                    });
                }
            }
            '\'' => {
                chars.next();
                TokenKind::Str(quoted(&mut chars, '\'', offset)?)
            }
            '"' => {
                chars.next();
                TokenKind::QuotedIdent(quoted(&mut chars, '"', offset)?)
            }
            '$' => {
                chars.next();
                let mut name = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !is_ident_char(c) {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                if name.is_empty() {
                    return Err(LexError {
                        message: "expected a variable name after '$'".into(),
                        offset,
                    });
                }
                TokenKind::Variable(name)
            }
            c if c.is_ascii_digit() => {
                let mut number = String::new();
                let mut seen_dot = false;
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_digit() {
                        number.push(c);
                    } else if c == '.' && !seen_dot {
                        seen_dot = true;
                        number.push(c);
                    } else if c == 'e' || c == 'E' {
                        number.push(c);
                        chars.next();
                        if let Some(&(_, sign)) = chars.peek() {
                            if sign == '+' || sign == '-' {
                                number.push(sign);
                                chars.next();
                            }
                        }
                        continue;
                    } else {
                        break;
                    }
                    chars.next();
                }
                TokenKind::Number(number)
            }
            c if is_ident_start(c) => {
                let mut ident = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !is_ident_char(c) {
                        break;
                    }
                    ident.push(c);
                    chars.next();
                }
                TokenKind::Ident(ident)
            }
            other => {
                return Err(LexError {
                    message: format!("unexpected character '{}'", other),
                    offset,
                })
            }
        };
        tokens.push(Token { kind, offset });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        offset: input.len(),
    });
    Ok(tokens)
}

/// Reads up to the closing quote. A doubled quote or a backslash escapes
/// the next character.
fn quoted(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    quote: char,
    start: usize,
) -> Result<String, LexError> {
    let mut out = String::new();
    while let Some((_, c)) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some((_, escaped)) => {
                    // LIKE escapes are kept for the pattern compiler
                    if escaped != quote && escaped != '\\' {
                        out.push('\\');
                    }
                    out.push(escaped);
                }
                None => break,
            }
        } else if c == quote {
            if chars.peek().map(|&(_, c)| c) == Some(quote) {
                chars.next();
                out.push(quote);
            } else {
                return Ok(out);
            }
        } else {
            out.push(c);
        }
    }
    Err(LexError {
        message: "unterminated quoted text".into(),
        offset: start,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_operators_and_names() {
        assert_eq!(
            kinds("d.cmis:name <> 'x' AND n >= 2.5"),
            vec![
                TokenKind::Ident("d".into()),
                TokenKind::Dot,
                TokenKind::Ident("cmis:name".into()),
                TokenKind::NotEq,
                TokenKind::Str("x".into()),
                TokenKind::Ident("AND".into()),
                TokenKind::Ident("n".into()),
                TokenKind::GtEq,
                TokenKind::Number("2.5".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(kinds("'it''s'")[0], TokenKind::Str("it's".into()));
        assert_eq!(kinds(r"'it\'s'")[0], TokenKind::Str("it's".into()));
        assert_eq!(kinds(r"'50\%'")[0], TokenKind::Str(r"50\%".into()));
    }

    #[test]
    fn test_variables() {
        assert_eq!(kinds("$limit")[0], TokenKind::Variable("limit".into()));
        assert!(tokenize("$ x").is_err());
    }

    #[test]
    fn test_errors_carry_offset() {
        let err = tokenize("a = 'open").unwrap_err();
        assert_eq!(err.offset, 4);
        assert_eq!(tokenize("a # b").unwrap_err().offset, 2);
    }
}
