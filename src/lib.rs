pub mod ast;
pub mod ast_printer;
pub mod callable;
pub mod class;
pub mod environment;
pub mod error;
pub mod function;
pub mod interpreter;
pub mod parser;
pub mod scanner;
pub mod token;
pub mod value;

use error::LoxError;
use parser::Parser;
use scanner::Scanner;
use token::Token;

/// Scans the whole buffer.  Scanning does not stop at the first bad
/// character, so all lexical errors come back together.
pub fn scan(source: &[u8]) -> Result<Vec<Token>, Vec<LoxError>> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut errors: Vec<LoxError> = Vec::new();

    for result in Scanner::new(source) {
        match result {
            Ok(token) => tokens.push(token),
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

/// Scans and parses a whole program.
pub fn parse_program(source: &[u8]) -> Result<Vec<ast::Stmt>, Vec<LoxError>> {
    Parser::new(scan(source)?).parse()
}
