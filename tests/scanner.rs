#[cfg(test)]
mod scanner_tests {
    use rox_runtime as lox;

    use lox::error::LoxError;
    use lox::scanner::*;
    use lox::token::*;

    fn kinds_and_lexemes(source: &str) -> Vec<(TokenType, String)> {
        Scanner::new(source.as_bytes())
            .map(|result| result.expect("source should scan cleanly"))
            .map(|token| (token.token_type, token.lexeme))
            .collect()
    }

    fn assert_scans_to(source: &str, expected: &[(TokenType, &str)]) {
        let actual = kinds_and_lexemes(source);

        assert_eq!(actual.len(), expected.len(), "tokens: {:?}", actual);

        for ((kind, lexeme), (expected_kind, expected_lexeme)) in actual.iter().zip(expected) {
            assert_eq!(kind, expected_kind);
            assert_eq!(lexeme, expected_lexeme);
        }
    }

    #[test]
    fn conditional_and_comma_punctuation() {
        assert_scans_to(
            "x = a ? b : (c, d);",
            &[
                (TokenType::IDENTIFIER, "x"),
                (TokenType::EQUAL, "="),
                (TokenType::IDENTIFIER, "a"),
                (TokenType::QUESTION, "?"),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::COLON, ":"),
                (TokenType::LEFT_PAREN, "("),
                (TokenType::IDENTIFIER, "c"),
                (TokenType::COMMA, ","),
                (TokenType::IDENTIFIER, "d"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn operators_take_the_longest_match() {
        assert_scans_to(
            "!= ! == = <= < >= > / //gone",
            &[
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::BANG, "!"),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::EQUAL, "="),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::LESS, "<"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::GREATER, ">"),
                (TokenType::SLASH, "/"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn class_header_keywords() {
        assert_scans_to(
            "class Circle extends Shape { class unit() { return super.make(this); } }",
            &[
                (TokenType::CLASS, "class"),
                (TokenType::IDENTIFIER, "Circle"),
                (TokenType::EXTENDS, "extends"),
                (TokenType::IDENTIFIER, "Shape"),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::CLASS, "class"),
                (TokenType::IDENTIFIER, "unit"),
                (TokenType::LEFT_PAREN, "("),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::RETURN, "return"),
                (TokenType::SUPER, "super"),
                (TokenType::DOT, "."),
                (TokenType::IDENTIFIER, "make"),
                (TokenType::LEFT_PAREN, "("),
                (TokenType::THIS, "this"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn keyword_prefixes_stay_identifiers() {
        assert_scans_to(
            "classy extended _this or2",
            &[
                (TokenType::IDENTIFIER, "classy"),
                (TokenType::IDENTIFIER, "extended"),
                (TokenType::IDENTIFIER, "_this"),
                (TokenType::IDENTIFIER, "or2"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn number_followed_by_dot_is_not_a_fraction() {
        assert_scans_to(
            "1.5 2.x",
            &[
                (TokenType::NUMBER(0.0), "1.5"),
                (TokenType::NUMBER(0.0), "2"),
                (TokenType::DOT, "."),
                (TokenType::IDENTIFIER, "x"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn literals_and_line_numbers() {
        let tokens: Vec<Token> = Scanner::new(b"12.5\n\"hi\nthere\" 7 // note\nnil")
            .collect::<Result<_, _>>()
            .expect("source scans cleanly");

        assert_eq!(tokens[0].to_string(), "NUMBER 12.5 12.5");
        assert_eq!(tokens[0].line, 1);

        // A multi-line string reports the line it closes on.
        assert_eq!(tokens[1].to_string(), "STRING \"hi\nthere\" hi\nthere");
        assert_eq!(tokens[1].line, 3);

        assert_eq!(tokens[2].to_string(), "NUMBER 7 7.0");
        assert_eq!(tokens[3].token_type, TokenType::NIL);
        assert_eq!(tokens[3].line, 4);
        assert_eq!(tokens[4].token_type, TokenType::EOF);
    }

    #[test]
    fn unicode_is_allowed_inside_strings() {
        let tokens: Vec<Token> = Scanner::new("print \"héllo ✓\";".as_bytes())
            .collect::<Result<_, _>>()
            .expect("source scans cleanly");

        assert!(matches!(&tokens[1].token_type, TokenType::STRING(s) if s == "héllo ✓"));
    }

    #[test]
    fn unterminated_string_reports_its_opening_line() {
        let results: Vec<_> = Scanner::new(b"var s;\n\"never\nclosed").collect();

        let errors: Vec<&LoxError> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            LoxError::Lex { message, line: 2 } if message.contains("Unterminated")
        ));

        let last = results.last().expect("scanner yields EOF");
        assert!(matches!(last, Ok(t) if t.token_type == TokenType::EOF && t.line == 3));
    }

    #[test]
    fn bad_characters_are_reported_once_each_and_scanning_continues() {
        let results: Vec<_> = Scanner::new("a @ é b".as_bytes()).collect();

        let messages: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .map(|e| e.to_string())
            .collect();
        assert_eq!(
            messages,
            vec![
                "[line 1] Error: Unexpected character: @".to_string(),
                "[line 1] Error: Unexpected character: é".to_string(),
            ]
        );

        let lexemes: Vec<String> = results
            .into_iter()
            .filter_map(Result::ok)
            .map(|t| t.lexeme)
            .collect();
        assert_eq!(lexemes, vec!["a", "b", ""]);
    }

    #[test]
    fn exactly_one_eof_then_nothing() {
        let mut scanner = Scanner::new(b"   \n ");

        let eof = scanner.next().expect("an EOF item").expect("EOF is a token");
        assert_eq!(eof.token_type, TokenType::EOF);
        assert_eq!(eof.line, 2);
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }
}
