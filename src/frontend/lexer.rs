//! Lexer for the C subset
//!
//! Converts source code into a stream of tokens carrying line numbers.
//! Comments and preprocessor lines are skipped.

use crate::frontend::token::{Token, TokenKind};
use crate::utils::{Error, Result, Span};

/// The lexer state
pub struct Lexer {
    /// Source code as chars
    source: Vec<char>,
    /// Current position in source
    pos: usize,
    /// Start position of current token
    start: usize,
    /// Current line (1-based)
    line: u32,
    /// Line the current token started on
    start_line: u32,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            start: 0,
            line: 1,
            start_line: 1,
        }
    }

    /// Get the current character without advancing
    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    /// Get the next character without advancing
    fn peek_next(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    /// Advance to the next character
    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c == Some('\n') {
            self.line += 1;
        }
        self.pos += 1;
        c
    }

    /// Consume `expected` if it is next
    fn matches(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Check if we've reached the end of input
    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Create a span from start to current position
    fn make_span(&self) -> Span {
        Span::new(self.start, self.pos, self.start_line)
    }

    /// Create a token with the current span
    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.make_span())
    }

    /// Skip whitespace, comments and preprocessor lines
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                // Line comment or directive
                '/' if self.peek_next() == Some('/') => self.skip_line(),
                '#' => self.skip_line(),
                // Block comment
                '/' if self.peek_next() == Some('*') => {
                    self.advance(); // skip /
                    self.advance(); // skip *
                    while !self.is_at_end() {
                        if self.peek() == Some('*') && self.peek_next() == Some('/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let text: String = self.source[self.start..self.pos].iter().collect();

        // Check if it's a keyword
        let kind = TokenKind::keyword_from_str(&text).unwrap_or(TokenKind::Ident(text));

        self.make_token(kind)
    }

    /// Consume a run of decimal digits, returning how many were read
    fn read_digits(&mut self) -> usize {
        let mut count = 0;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
                count += 1;
            } else {
                break;
            }
        }
        count
    }

    /// Read a number literal (integer or float)
    ///
    /// A literal that does not denote a representable value (an integer
    /// beyond `i64`, an exponent without digits, a float that overflows)
    /// is rejected rather than read as zero.
    fn read_number(&mut self) -> Result<Token> {
        let mut is_float = false;
        let mut exponent_ok = true;

        self.read_digits();

        // Check for decimal point
        if self.peek() == Some('.') && self.peek_next().map_or(false, |c| c.is_ascii_digit()) {
            is_float = true;
            self.advance(); // consume '.'
            self.read_digits();
        }

        // Check for exponent
        if matches!(self.peek(), Some('e') | Some('E')) {
            is_float = true;
            self.advance();

            if matches!(self.peek(), Some('+') | Some('-')) {
                self.advance();
            }
            exponent_ok = self.read_digits() > 0;
        }

        let text: String = self.source[self.start..self.pos].iter().collect();
        let kind = if is_float {
            match text.parse::<f64>() {
                Ok(value) if exponent_ok && value.is_finite() => Some(TokenKind::FloatLit(value)),
                _ => None,
            }
        } else {
            text.parse::<i64>().ok().map(TokenKind::IntLit)
        };

        match kind {
            Some(kind) => Ok(self.make_token(kind)),
            None => Err(Error::InvalidNumber { text, span: self.make_span() }),
        }
    }

    /// Decode the character after a backslash
    fn read_escape(&mut self) -> char {
        match self.advance() {
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some('0') => '\0',
            Some(c) => c,
            None => '\0',
        }
    }

    /// Read a string literal
    fn read_string(&mut self) -> Token {
        self.advance(); // consume opening quote

        let mut value = String::new();

        while let Some(c) = self.peek() {
            if c == '"' {
                self.advance(); // consume closing quote
                break;
            } else if c == '\\' {
                self.advance();
                value.push(self.read_escape());
            } else if c == '\n' {
                // Unterminated string
                break;
            } else {
                value.push(c);
                self.advance();
            }
        }

        self.make_token(TokenKind::StringLit(value))
    }

    /// Read a character literal; only single-byte characters are accepted
    fn read_char(&mut self) -> Result<Token> {
        self.advance(); // consume opening quote

        let c = if self.peek() == Some('\\') {
            self.advance();
            self.read_escape()
        } else {
            self.advance().unwrap_or('\0')
        };

        // Consume closing quote
        if self.peek() == Some('\'') {
            self.advance();
        }

        match u8::try_from(c) {
            Ok(byte) => Ok(self.make_token(TokenKind::CharLit(byte))),
            Err(_) => Err(Error::InvalidCharLiteral { ch: c, span: self.make_span() }),
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();
        self.start = self.pos;
        self.start_line = self.line;

        let Some(c) = self.peek() else {
            return Ok(Token::eof(self.make_span()));
        };

        // Identifiers and keywords
        if c.is_alphabetic() || c == '_' {
            return Ok(self.read_identifier());
        }

        // Numbers
        if c.is_ascii_digit() {
            return self.read_number();
        }

        // String literals
        if c == '"' {
            return Ok(self.read_string());
        }

        // Character literals
        if c == '\'' {
            return self.read_char();
        }

        self.advance();

        // Operators and punctuation
        let kind = match c {
            '+' => {
                if self.matches('+') {
                    TokenKind::PlusPlus
                } else if self.matches('=') {
                    TokenKind::PlusEq
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.matches('-') {
                    TokenKind::MinusMinus
                } else if self.matches('=') {
                    TokenKind::MinusEq
                } else {
                    TokenKind::Minus
                }
            }
            '*' => {
                if self.matches('=') {
                    TokenKind::StarEq
                } else {
                    TokenKind::Star
                }
            }
            '/' => {
                if self.matches('=') {
                    TokenKind::SlashEq
                } else {
                    TokenKind::Slash
                }
            }
            '%' => {
                if self.matches('=') {
                    TokenKind::PercentEq
                } else {
                    TokenKind::Percent
                }
            }
            '=' => {
                if self.matches('=') {
                    TokenKind::EqEq
                } else {
                    TokenKind::Eq
                }
            }
            '!' => {
                if self.matches('=') {
                    TokenKind::Ne
                } else {
                    TokenKind::Not
                }
            }
            '<' => {
                if self.matches('=') {
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.matches('=') {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '~' => TokenKind::Tilde,
            '?' => TokenKind::Question,
            ':' => TokenKind::Colon,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            _ => TokenKind::Unknown(c),
        };

        Ok(self.make_token(kind))
    }

    /// Tokenize the entire source, stopping at the first malformed literal
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_simple_tokens() {
        let mut lexer = Lexer::new("int main() { }");
        let tokens = lexer.tokenize().unwrap();

        assert!(matches!(tokens[0].kind, TokenKind::Int));
        assert!(matches!(tokens[1].kind, TokenKind::Ident(ref s) if s == "main"));
        assert!(matches!(tokens[2].kind, TokenKind::LParen));
        assert!(matches!(tokens[3].kind, TokenKind::RParen));
        assert!(matches!(tokens[4].kind, TokenKind::LBrace));
        assert!(matches!(tokens[5].kind, TokenKind::RBrace));
        assert!(matches!(tokens[6].kind, TokenKind::Eof));
    }

    #[test]
    fn test_numbers() {
        let mut lexer = Lexer::new("42 3.14 2.0e1");
        let tokens = lexer.tokenize().unwrap();

        assert!(matches!(tokens[0].kind, TokenKind::IntLit(42)));
        assert!(matches!(tokens[1].kind, TokenKind::FloatLit(f) if (f - 3.14).abs() < 0.001));
        assert!(matches!(tokens[2].kind, TokenKind::FloatLit(f) if (f - 20.0).abs() < 0.001));
    }

    #[test]
    fn test_char_and_string() {
        let mut lexer = Lexer::new(r#"'a' '\n' "hi\t""#);
        let tokens = lexer.tokenize().unwrap();

        assert!(matches!(tokens[0].kind, TokenKind::CharLit(b'a')));
        assert!(matches!(tokens[1].kind, TokenKind::CharLit(b'\n')));
        assert!(matches!(tokens[2].kind, TokenKind::StringLit(ref s) if s == "hi\t"));
    }

    #[test]
    fn test_compound_operators() {
        let mut lexer = Lexer::new("++ -- += -= *= /= %= <= >= == !=");
        let kinds: Vec<TokenKind> = lexer.tokenize().unwrap().into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::PlusEq,
                TokenKind::MinusEq,
                TokenKind::StarEq,
                TokenKind::SlashEq,
                TokenKind::PercentEq,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::EqEq,
                TokenKind::Ne,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lines_skip_comments_and_directives() {
        let source = "#include <stdio.h>\n// note\nint a; /* multi\nline */\nfloat b;";
        let tokens = Lexer::new(source).tokenize().unwrap();

        assert!(matches!(tokens[0].kind, TokenKind::Int));
        assert_eq!(tokens[0].span.line, 3);
        assert!(matches!(tokens[3].kind, TokenKind::Float));
        assert_eq!(tokens[3].span.line, 5);
    }

    #[test]
    fn test_malformed_numbers_are_rejected() {
        let cases = [
            ("99999999999999999999", "99999999999999999999"),
            ("1e", "1e"),
            ("2.5e+;", "2.5e+"),
            ("1e999", "1e999"),
        ];
        for (source, text) in cases {
            let err = Lexer::new(source).tokenize().unwrap_err();
            assert_eq!(
                err,
                Error::InvalidNumber { text: text.to_string(), span: Span::new(0, text.len(), 1) }
            );
        }

        let tokens = Lexer::new("9223372036854775807").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::IntLit(i64::MAX));
    }

    #[test]
    fn test_char_literal_must_fit_a_byte() {
        let err = Lexer::new("c = '€';").tokenize().unwrap_err();
        assert!(matches!(err, Error::InvalidCharLiteral { ch: '€', ref span } if span.line == 1));

        let tokens = Lexer::new("'\u{e9}'").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::CharLit(0xE9));
    }
}
