//! Lexer (tokenizer) for the netlist DSL.

use crate::error::{CckError, Result};

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The token's text
    pub text: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

/// Token types in the DSL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// An identifier (element name, vertex name, flag, parameter key)
    Identifier,
    /// A number (integer or floating point, possibly with suffix)
    Number,
    /// A directive (starts with '.')
    Directive,
    /// Equals sign '='
    Equals,
    /// Newline
    Newline,
    /// End of file
    Eof,
}

/// Lexer for tokenizing netlist input.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn token(&self, kind: TokenKind, text: impl Into<String>, line: usize, column: usize) -> Token {
        Token {
            kind,
            text: text.into(),
            line,
            column,
        }
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();

        let line = self.line;
        let column = self.column;

        let Some(&ch) = self.chars.peek() else {
            return Ok(self.token(TokenKind::Eof, "", line, column));
        };

        let token = match ch {
            '\n' => {
                self.advance();
                self.token(TokenKind::Newline, "\n", line, column)
            }
            '.' => {
                self.advance();
                let name = self.read_word();
                if name.is_empty() {
                    return Err(CckError::lexer(line, column, "directive name expected after '.'"));
                }
                let text = format!(".{}", name);
                if parse_value(&text).is_some() {
                    self.token(TokenKind::Number, text, line, column)
                } else {
                    self.token(TokenKind::Directive, text, line, column)
                }
            }
            '=' => {
                self.advance();
                self.token(TokenKind::Equals, "=", line, column)
            }
            _ if ch.is_alphanumeric() || matches!(ch, '_' | '-' | '+') => {
                let text = self.read_word();
                // Vertex names may start with a digit ("0", "2b"); only words
                // that read as a value are numbers.
                let kind = if parse_value(&text).is_some() {
                    TokenKind::Number
                } else {
                    TokenKind::Identifier
                };
                self.token(kind, text, line, column)
            }
            _ => {
                return Err(CckError::lexer(
                    line,
                    column,
                    format!("unexpected character '{}'", ch),
                ));
            }
        };

        Ok(token)
    }

    /// Collect every token up to and including `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if ch == ' ' || ch == '\t' || ch == '\r' {
                self.advance();
            } else if ch == '#' || ch == ';' {
                // Skip comment until end of line
                while let Some(&c) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    /// Read a name or number. Signs are only taken at the start or right
    /// after an exponent marker so `1e-9` stays one word.
    fn read_word(&mut self) -> String {
        let mut text = String::new();
        while let Some(&ch) = self.chars.peek() {
            let sign_ok = matches!(ch, '-' | '+')
                && (text.is_empty()
                    || (text.ends_with(|c: char| c == 'e' || c == 'E')
                        && text.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+')));
            if ch.is_alphanumeric() || ch == '_' || ch == '.' || sign_ok {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        text
    }
}

/// Parse a number string with optional unit suffix.
pub fn parse_value(text: &str) -> Option<f64> {
    let text = text.trim();
    let last = text.chars().last()?;

    let multiplier = match last {
        'p' => 1e-12,
        'n' => 1e-9,
        'u' | 'µ' => 1e-6,
        'm' => 1e-3,
        'k' | 'K' => 1e3,
        'M' => 1e6,
        'G' => 1e9,
        _ => 1.0,
    };
    let num_str = if multiplier != 1.0 {
        &text[..text.len() - last.len_utf8()]
    } else {
        text
    };

    // Reject words like "inf" or "nan" that f64 parsing would accept
    if !num_str.starts_with(|c: char| c.is_ascii_digit() || c == '.' || c == '-' || c == '+') {
        return None;
    }
    num_str.parse::<f64>().ok().map(|v| v * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_value() {
        assert_relative_eq!(parse_value("10k").unwrap(), 10_000.0);
        assert_relative_eq!(parse_value("100n").unwrap(), 100e-9);
        assert_relative_eq!(parse_value("4.7u").unwrap(), 4.7e-6);
        assert_relative_eq!(parse_value("1M").unwrap(), 1_000_000.0);
        assert_relative_eq!(parse_value("2.2").unwrap(), 2.2);
        assert_relative_eq!(parse_value("1e-9").unwrap(), 1e-9);
        assert_relative_eq!(parse_value("-3").unwrap(), -3.0);
        assert_eq!(parse_value("top"), None);
        assert_eq!(parse_value("inf"), None);
        assert_eq!(parse_value("2b"), None);
    }

    #[test]
    fn test_lexer_basic() {
        let input = "R1 top 0 10k";
        let tokens = Lexer::new(input).tokenize().unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Number,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
        assert_eq!(tokens[0].text, "R1");
        assert_eq!(tokens[3].column, 10);
    }

    #[test]
    fn test_lexer_params_and_comments() {
        let input = "F1 a b 2 delay=10m ; slow blow\n# whole line\n";
        let tokens = Lexer::new(input).tokenize().unwrap();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["F1", "a", "b", "2", "delay", "=", "10m", "\n", "\n", ""]);
        assert_eq!(tokens[8].line, 2);
    }

    #[test]
    fn test_lexer_directive() {
        let tokens = Lexer::new(".options dt=1m trap").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Directive);
        assert_eq!(tokens[0].text, ".options");
    }

    #[test]
    fn test_lexer_rejects_stray_characters() {
        let err = Lexer::new("R1 a b 10 @").tokenize().unwrap_err();
        assert!(matches!(err, CckError::LexerError { line: 1, column: 11, .. }));
    }
}
