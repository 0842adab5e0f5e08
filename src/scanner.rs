//! Lexer for Lox source text.
//!
//! [`Scanner`] walks a byte buffer and yields one `Result<Token>` per call to
//! `next`.  Whitespace and `//` comments are skipped between tokens, a bad
//! character or an unterminated string yields an `Err` for that spot only,
//! and scanning carries on afterwards so every lexical error in a file can be
//! reported in one pass.  The last item is always a single `EOF` token.
//!
//! Source is treated as UTF‑8.  Only string literals may contain non‑ASCII
//! text; anywhere else a multi‑byte character is one "Unexpected character"
//! error.
//!
//! ```rust
//! use rox_runtime::scanner::Scanner;
//! use rox_runtime::token::TokenType;
//!
//! let kinds: Vec<TokenType> = Scanner::new(b"a ? b : c")
//!     .filter_map(Result::ok)
//!     .map(|t| t.token_type)
//!     .collect();
//!
//! assert_eq!(kinds.len(), 6);
//! assert_eq!(kinds[1], TokenType::QUESTION);
//! ```

use std::iter::FusedIterator;

use log::{debug, info};
use memchr::{memchr, memchr_iter};
use phf::phf_map;

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};

/// Reserved words.  Anything else made of letters, digits and `_` is an
/// identifier.
static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"     => TokenType::AND,
    b"class"   => TokenType::CLASS,
    b"else"    => TokenType::ELSE,
    b"extends" => TokenType::EXTENDS,
    b"false"   => TokenType::FALSE,
    b"fun"     => TokenType::FUN,
    b"for"     => TokenType::FOR,
    b"if"      => TokenType::IF,
    b"nil"     => TokenType::NIL,
    b"or"      => TokenType::OR,
    b"print"   => TokenType::PRINT,
    b"return"  => TokenType::RETURN,
    b"super"   => TokenType::SUPER,
    b"this"    => TokenType::THIS,
    b"true"    => TokenType::TRUE,
    b"var"     => TokenType::VAR,
    b"while"   => TokenType::WHILE,
};

pub struct Scanner<'a> {
    src: &'a [u8],
    /// First byte of the lexeme being scanned.
    start: usize,
    /// Next byte to look at.
    pos: usize,
    line: usize,
    finished: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a [u8]) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            start: 0,
            pos: 0,
            line: 1,
            finished: false,
        }
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte: u8 = self.peek_at(0)?;
        self.pos += 1;
        Some(byte)
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.peek_at(0) == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_while(&mut self, pred: impl Fn(u8) -> bool) {
        while self.peek_at(0).is_some_and(&pred) {
            self.pos += 1;
        }
    }

    /// Steps over whitespace, newlines and line comments.
    fn skip_trivia(&mut self) {
        while let Some(byte) = self.peek_at(0) {
            match byte {
                b' ' | b'\r' | b'\t' => self.pos += 1,
                b'\n' => {
                    self.line += 1;
                    self.pos += 1;
                }
                b'/' if self.peek_at(1) == Some(b'/') => {
                    // Leave the newline for the next iteration to count.
                    self.pos = memchr(b'\n', &self.src[self.pos..])
                        .map_or(self.src.len(), |offset| self.pos + offset);
                }
                _ => return,
            }
        }
    }

    fn lexeme(&self) -> &'a [u8] {
        &self.src[self.start..self.pos]
    }

    fn token(&self, token_type: TokenType) -> Token {
        // Lexemes outside strings are ASCII, and strings were validated.
        let text: String = String::from_utf8_lossy(self.lexeme()).into_owned();
        Token::new(token_type, text, self.line)
    }

    /// `second` when the next byte is `=`, otherwise `first`.
    fn with_equals(&mut self, first: TokenType, second: TokenType) -> TokenType {
        if self.eat(b'=') {
            second
        } else {
            first
        }
    }

    fn scan_token(&mut self) -> Result<Token> {
        let Some(byte) = self.bump() else {
            return Ok(self.token(TokenType::EOF));
        };

        let token_type: TokenType = match byte {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,
            b'/' => TokenType::SLASH,
            b'?' => TokenType::QUESTION,
            b':' => TokenType::COLON,
            b'!' => self.with_equals(TokenType::BANG, TokenType::BANG_EQUAL),
            b'=' => self.with_equals(TokenType::EQUAL, TokenType::EQUAL_EQUAL),
            b'<' => self.with_equals(TokenType::LESS, TokenType::LESS_EQUAL),
            b'>' => self.with_equals(TokenType::GREATER, TokenType::GREATER_EQUAL),
            b'"' => self.string()?,
            b'0'..=b'9' => self.number(),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),
            other => return Err(self.unexpected(other)),
        };

        Ok(self.token(token_type))
    }

    /// Body of a string literal; the opening quote is already consumed.
    /// Strings may span lines, and the token reports the closing line.
    fn string(&mut self) -> Result<TokenType> {
        let rest: &[u8] = &self.src[self.pos..];

        let Some(len) = memchr(b'"', rest) else {
            let opened_on: usize = self.line;
            self.line += memchr_iter(b'\n', rest).count();
            self.pos = self.src.len();
            return Err(LoxError::lex(opened_on, "Unterminated string."));
        };

        let body: &[u8] = &rest[..len];
        self.line += memchr_iter(b'\n', body).count();
        self.pos += len + 1;

        let text: &str = std::str::from_utf8(body)
            .map_err(|_| LoxError::lex(self.line, "Invalid UTF-8 in string literal."))?;

        Ok(TokenType::STRING(text.to_owned()))
    }

    /// `123` or `12.5`.  A trailing `.` without digits is left for the next
    /// token, so `1.foo` is a number followed by a property access.
    fn number(&mut self) -> TokenType {
        self.eat_while(|b| b.is_ascii_digit());

        if self.peek_at(0) == Some(b'.') && self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
            self.eat_while(|b| b.is_ascii_digit());
        }

        let value: f64 = std::str::from_utf8(self.lexeme())
            .ok()
            .and_then(|digits| digits.parse().ok())
            .unwrap_or_default();

        TokenType::NUMBER(value)
    }

    fn identifier(&mut self) -> TokenType {
        self.eat_while(|b| b.is_ascii_alphanumeric() || b == b'_');

        KEYWORDS
            .get(self.lexeme())
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }

    /// Consumes the rest of a multi‑byte character so it is reported once.
    fn unexpected(&mut self, first: u8) -> LoxError {
        let width: usize = match first {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        self.pos = (self.start + width).min(self.src.len());

        let shown: String = match std::str::from_utf8(self.lexeme()) {
            Ok(text) => text.to_owned(),
            Err(_) => format!("\\x{:02x}", first),
        };

        LoxError::lex(self.line, format!("Unexpected character: {}", shown))
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        self.skip_trivia();
        self.start = self.pos;

        let result: Result<Token> = self.scan_token();

        match &result {
            Ok(token) if token.token_type == TokenType::EOF => {
                debug!("Reached end of input on line {}", self.line);
                self.finished = true;
            }
            Ok(token) => debug!("Scanned {:?} on line {}", token.token_type, token.line),
            Err(e) => debug!("Lex error: {}", e),
        }

        Some(result)
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
