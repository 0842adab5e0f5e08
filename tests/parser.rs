use rox_runtime as lox;

use lox::ast::{Expr, LiteralValue, Stmt};
use lox::ast_printer::AstPrinter;
use lox::error::LoxError;
use lox::parser::Parser;

fn parse(source: &str) -> Vec<Stmt> {
    lox::parse_program(source.as_bytes()).expect("program should parse")
}

fn parse_errors(source: &str) -> Vec<LoxError> {
    lox::parse_program(source.as_bytes()).expect_err("program should not parse")
}

fn expression(source: &str) -> Expr {
    let tokens = lox::scan(source.as_bytes()).expect("source should scan");
    Parser::new(tokens)
        .parse_expression()
        .expect("expression should parse")
}

#[test]
fn precedence_and_grouping_print_in_prefix_form() {
    let expr = expression("1 + 2 * (3 - 4)");

    assert_eq!(
        AstPrinter::print(&expr),
        "(+ 1.0 (* 2.0 (group (- 3.0 4.0))))"
    );
}

#[test]
fn comma_operator_collects_operands_in_order() {
    let expr = expression("a = 1, b, 3");

    let Expr::Comma(parts) = &expr else {
        panic!("expected comma expression, got {:?}", expr);
    };
    assert_eq!(parts.len(), 3);
    assert!(matches!(parts[0], Expr::Assign { .. }));
    assert_eq!(AstPrinter::print(&expr), "(, (= a 1.0) b 3.0)");
}

#[test]
fn call_arguments_are_not_comma_expressions() {
    let expr = expression("f(1, 2)");

    let Expr::Call { arguments, .. } = &expr else {
        panic!("expected call, got {:?}", expr);
    };
    assert_eq!(arguments.len(), 2);
}

#[test]
fn ternary_is_right_associative() {
    let expr = expression("a ? 1 : b ? 2 : 3");

    assert_eq!(AstPrinter::print(&expr), "(?: a 1.0 (?: b 2.0 3.0))");
}

#[test]
fn ternary_binds_looser_than_or() {
    let expr = expression("x or y ? 1 : 2");

    let Expr::Ternary { condition, .. } = &expr else {
        panic!("expected ternary, got {:?}", expr);
    };
    assert!(matches!(**condition, Expr::Logical { .. }));
}

#[test]
fn class_with_superclass_and_class_methods() {
    let program = parse(
        "class A {}
         class B extends A {
           init(x) { this.x = x; }
           class make() { return B(1); }
         }
         class C < B {}",
    );

    assert_eq!(program.len(), 3);

    let Stmt::Class {
        name,
        superclass,
        methods,
        class_methods,
    } = &program[1]
    else {
        panic!("expected class, got {:?}", program[1]);
    };

    assert_eq!(name.lexeme, "B");
    assert!(matches!(superclass, Some(Expr::Variable(t)) if t.lexeme == "A"));
    assert_eq!(methods.len(), 1);
    assert_eq!(methods[0].params.len(), 1);
    assert_eq!(class_methods.len(), 1);
    assert_eq!(class_methods[0].name.lexeme, "make");

    assert!(matches!(
        &program[2],
        Stmt::Class { superclass: Some(Expr::Variable(t)), .. } if t.lexeme == "B"
    ));
}

#[test]
fn property_assignment_becomes_set() {
    let program = parse("a.b.c = 3;");

    let Stmt::Expression(Expr::Set { object, name, value }) = &program[0] else {
        panic!("expected set, got {:?}", program[0]);
    };
    assert_eq!(name.lexeme, "c");
    assert!(matches!(**object, Expr::Get { .. }));
    assert_eq!(**value, Expr::Literal(LiteralValue::Number(3.0)));
}

#[test]
fn statements_print_as_s_expressions() {
    let program = parse("var a = 1; if (a) print a; else { print -a; }");

    let printed: Vec<String> = program.iter().map(AstPrinter::print_stmt).collect();
    assert_eq!(
        printed,
        vec![
            "(var a = 1.0)".to_string(),
            "(if-else a (print a) (block (print (- a))))".to_string(),
        ]
    );
}

#[test]
fn invalid_assignment_target_is_an_error() {
    let errors = parse_errors("1 + 2 = 3;");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("Invalid assignment target"));
}

#[test]
fn class_cannot_inherit_from_itself() {
    let errors = parse_errors("class A < A {}");

    assert!(errors[0].to_string().contains("inherit from itself"));
}

#[test]
fn parser_recovers_and_reports_every_bad_statement() {
    let errors = parse_errors("var = 1;\nprint 2;\nvar b = ;\n");

    assert_eq!(errors.len(), 2);
    assert!(matches!(errors[0], LoxError::Parse { line: 1, .. }));
    assert!(matches!(errors[1], LoxError::Parse { line: 3, .. }));
}

#[test]
fn ast_serializes_to_json() {
    let program = parse("print 1;");

    let json = serde_json::to_value(&program).expect("AST serializes");
    assert_eq!(json[0]["Print"]["value"]["Literal"]["Number"], 1.0);
}
