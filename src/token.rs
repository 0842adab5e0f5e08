use std::borrow::Cow;
use std::fmt;
use std::mem;

use log::debug;
use serde::Serialize;

/// Lexical categories.  `STRING` and `NUMBER` carry the decoded literal;
/// every other kind is identified by its variant alone, which is also how
/// two kinds compare equal (see the `PartialEq` impl).
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Serialize)]
pub enum TokenType {
    // Punctuation.
    LEFT_PAREN,
    RIGHT_PAREN,
    LEFT_BRACE,
    RIGHT_BRACE,
    COMMA,
    DOT,
    MINUS,
    PLUS,
    SEMICOLON,
    SLASH,
    STAR,
    QUESTION,
    COLON,

    // Operators that may take a trailing `=`.
    BANG,
    BANG_EQUAL,
    EQUAL,
    EQUAL_EQUAL,
    GREATER,
    GREATER_EQUAL,
    LESS,
    LESS_EQUAL,

    // Literals.
    IDENTIFIER,
    STRING(String),
    NUMBER(f64),

    // Keywords.
    AND,
    CLASS,
    ELSE,
    EXTENDS,
    FALSE,
    FUN,
    FOR,
    IF,
    NIL,
    OR,
    PRINT,
    RETURN,
    SUPER,
    THIS,
    TRUE,
    VAR,
    WHILE,

    EOF,
}

impl TokenType {
    /// Kind name as printed by `rox tokenize`, e.g. `LEFT_PAREN`.
    pub fn name(&self) -> &'static str {
        use TokenType::*;

        match self {
            LEFT_PAREN => "LEFT_PAREN",
            RIGHT_PAREN => "RIGHT_PAREN",
            LEFT_BRACE => "LEFT_BRACE",
            RIGHT_BRACE => "RIGHT_BRACE",
            COMMA => "COMMA",
            DOT => "DOT",
            MINUS => "MINUS",
            PLUS => "PLUS",
            SEMICOLON => "SEMICOLON",
            SLASH => "SLASH",
            STAR => "STAR",
            QUESTION => "QUESTION",
            COLON => "COLON",
            BANG => "BANG",
            BANG_EQUAL => "BANG_EQUAL",
            EQUAL => "EQUAL",
            EQUAL_EQUAL => "EQUAL_EQUAL",
            GREATER => "GREATER",
            GREATER_EQUAL => "GREATER_EQUAL",
            LESS => "LESS",
            LESS_EQUAL => "LESS_EQUAL",
            IDENTIFIER => "IDENTIFIER",
            STRING(_) => "STRING",
            NUMBER(_) => "NUMBER",
            AND => "AND",
            CLASS => "CLASS",
            ELSE => "ELSE",
            EXTENDS => "EXTENDS",
            FALSE => "FALSE",
            FUN => "FUN",
            FOR => "FOR",
            IF => "IF",
            NIL => "NIL",
            OR => "OR",
            PRINT => "PRINT",
            RETURN => "RETURN",
            SUPER => "SUPER",
            THIS => "THIS",
            TRUE => "TRUE",
            VAR => "VAR",
            WHILE => "WHILE",
            EOF => "EOF",
        }
    }
}

impl PartialEq for TokenType {
    /// Payloads are ignored: any two `NUMBER`s are the same kind.
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

/// One lexeme with its kind and the line it ended on.  The lexeme is owned so
/// the tree built from tokens does not borrow the source buffer.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub line: usize,
}

impl Token {
    pub fn new<S: Into<String>>(token_type: TokenType, lexeme: S, line: usize) -> Self {
        let lexeme: String = lexeme.into();
        debug!("Token {} '{}' on line {}", token_type.name(), lexeme, line);

        Self {
            token_type,
            lexeme,
            line,
        }
    }

    /// An identifier that never appeared in source, such as the implicit
    /// `this` a bound method looks up.
    pub fn synthetic(lexeme: &str, line: usize) -> Self {
        Self {
            token_type: TokenType::IDENTIFIER,
            lexeme: lexeme.to_owned(),
            line,
        }
    }
}

impl fmt::Display for Token {
    /// `KIND lexeme literal`, where the literal column is `null` for tokens
    /// without a value and numbers always show a fraction (`7` → `7.0`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let literal: Cow<'_, str> = match &self.token_type {
            TokenType::STRING(text) => Cow::Borrowed(text.as_str()),
            TokenType::NUMBER(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                let mut digits: itoa::Buffer = itoa::Buffer::new();
                Cow::Owned(format!("{}.0", digits.format(*n as i64)))
            }
            TokenType::NUMBER(n) => Cow::Owned(n.to_string()),
            _ => Cow::Borrowed("null"),
        };

        write!(f, "{} {} {}", self.token_type.name(), self.lexeme, literal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_compare_without_payload() {
        assert_eq!(TokenType::NUMBER(1.0), TokenType::NUMBER(2.0));
        assert_eq!(TokenType::STRING("a".into()), TokenType::STRING("b".into()));
        assert_ne!(TokenType::LESS, TokenType::LESS_EQUAL);
    }

    #[test]
    fn display_shows_kind_lexeme_and_literal() {
        let number: Token = Token::new(TokenType::NUMBER(7.0), "7", 1);
        let text: Token = Token::new(TokenType::STRING("hi".into()), "\"hi\"", 1);
        let colon: Token = Token::new(TokenType::COLON, ":", 1);

        assert_eq!(number.to_string(), "NUMBER 7 7.0");
        assert_eq!(text.to_string(), "STRING \"hi\" hi");
        assert_eq!(colon.to_string(), "COLON : null");
    }
}
