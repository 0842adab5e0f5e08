use rox_runtime as lox;

use lox::error::RuntimeError;
use lox::interpreter::{Interpreter, OutputBuffer};

fn run(source: &str) -> (Vec<String>, Vec<RuntimeError>) {
    let program = lox::parse_program(source.as_bytes()).expect("program should parse");
    let output = OutputBuffer::new();
    let mut interpreter = Interpreter::with_output(Box::new(output.clone()));

    let errors = interpreter.interpret(&program).err().unwrap_or_default();

    (output.lines(), errors)
}

fn run_ok(source: &str) -> Vec<String> {
    let (lines, errors) = run(source);
    assert!(errors.is_empty(), "unexpected runtime errors: {:?}", errors);
    lines
}

#[test]
fn inherited_initializer_and_method_share_instance_state() {
    let lines = run_ok(
        r#"
        class A { init(x) { this.v = x; } get() { return this.v; } }
        class B extends A {}
        var b = B(5);
        print b.get();
        "#,
    );

    assert_eq!(lines, vec!["5"]);
}

#[test]
fn method_resolution_prefers_nearest_ancestor() {
    let lines = run_ok(
        r#"
        class A { m() { return "A"; } n() { return "A.n"; } }
        class B < A { m() { return "B"; } }
        class C < B {}
        var c = C();
        print c.m();
        print c.n();
        "#,
    );

    assert_eq!(lines, vec!["B", "A.n"]);
}

#[test]
fn bound_methods_keep_their_own_receiver() {
    let lines = run_ok(
        r#"
        class Counter {
          init() { this.n = 0; }
          bump() { this.n = this.n + 1; return this.n; }
        }
        var a = Counter();
        var b = Counter();
        var bumpA1 = a.bump;
        var bumpA2 = a.bump;
        var bumpB = b.bump;
        print bumpA1();
        print bumpA2();
        print bumpB();
        print a.n;
        print b.n;
        "#,
    );

    assert_eq!(lines, vec!["1", "2", "1", "2", "1"]);
}

#[test]
fn method_access_yields_a_fresh_bound_function_each_time() {
    let lines = run_ok(
        r#"
        class A { m() {} }
        var a = A();
        print a.m == a.m;
        var m = a.m;
        print m == m;
        "#,
    );

    assert_eq!(lines, vec!["false", "true"]);
}

#[test]
fn fields_shadow_methods_per_instance() {
    let lines = run_ok(
        r#"
        class A { name() { return "method"; } }
        var shadowed = A();
        var plain = A();
        shadowed.name = "field";
        print shadowed.name;
        print plain.name();
        "#,
    );

    assert_eq!(lines, vec!["field", "method"]);
}

#[test]
fn constructor_without_init_takes_no_arguments() {
    let (lines, errors) = run(
        r#"
        class Empty {}
        print Empty();
        Empty(1);
        "#,
    );

    assert_eq!(lines, vec!["Empty instance"]);
    assert_eq!(
        errors,
        vec![RuntimeError::ArityMismatch {
            expected: 0,
            got: 1,
            line: 4
        }]
    );
}

#[test]
fn class_arity_comes_from_inherited_init() {
    let (_, errors) = run(
        r#"
        class A { init(a, b) {} }
        class B < A {}
        B(1);
        "#,
    );

    assert!(matches!(
        errors.as_slice(),
        [RuntimeError::ArityMismatch { expected: 2, got: 1, .. }]
    ));
}

#[test]
fn initializer_always_yields_the_instance() {
    let lines = run_ok(
        r#"
        class A {
          init() { this.x = 1; return; }
        }
        var a = A();
        print a;
        print a.init();
        print a.init() == a;
        "#,
    );

    assert_eq!(lines, vec!["A instance", "A instance", "true"]);
}

#[test]
fn initializer_ignores_an_explicit_return_value() {
    let lines = run_ok(
        r#"
        class A {
          init() { this.ready = true; return 7; }
        }
        var a = A();
        print a;
        print a.ready;
        print a.init();
        "#,
    );

    assert_eq!(lines, vec!["A instance", "true", "A instance"]);
}

#[test]
fn undefined_property_is_reported() {
    let (_, errors) = run(
        r#"
        class A {}
        A().missing;
        "#,
    );

    assert_eq!(
        errors,
        vec![RuntimeError::UndefinedProperty {
            name: "missing".into(),
            line: 3
        }]
    );
}

#[test]
fn properties_only_exist_on_objects() {
    let (_, errors) = run("var n = 1; n.x = 2; print n.x;");

    assert_eq!(
        errors,
        vec![
            RuntimeError::NotAnObject { line: 1 },
            RuntimeError::NotAnObject { line: 1 }
        ]
    );
}

#[test]
fn super_calls_the_superclass_method_with_current_this() {
    let lines = run_ok(
        r#"
        class A {
          init(x) { this.x = x; }
          describe() { return "A:" + this.x; }
        }
        class B < A {
          init(x) { super.init(x * 10); }
          describe() { return "B/" + super.describe(); }
        }
        class C < B {}
        print C(2).describe();
        "#,
    );

    assert_eq!(lines, vec!["B/A:20"]);
}

#[test]
fn superclass_must_be_a_class() {
    let (_, errors) = run("var NotAClass = 1;\nclass Sub < NotAClass {}");

    assert_eq!(errors, vec![RuntimeError::InvalidSuperclass { line: 2 }]);
}

#[test]
fn class_methods_live_on_the_metaclass() {
    let lines = run_ok(
        r#"
        class Math {
          class square(n) { return n * n; }
        }
        class Geometry < Math {
          class cube(n) { return n * this.square(n); }
        }
        print Math.square(3);
        print Geometry.square(4);
        print Geometry.cube(2);
        "#,
    );

    assert_eq!(lines, vec!["9", "16", "8"]);
}

#[test]
fn class_level_fields() {
    let lines = run_ok(
        r#"
        class Config {
          class describe() { return "level " + this.level; }
        }
        Config.level = 3;
        print Config.level;
        print Config.describe();
        "#,
    );

    assert_eq!(lines, vec!["3", "level 3"]);
}

#[test]
fn instance_methods_are_not_class_properties() {
    let (_, errors) = run(
        r#"
        class A { m() {} }
        A.m();
        "#,
    );

    assert!(matches!(
        errors.as_slice(),
        [RuntimeError::UndefinedProperty { name, .. }] if name == "m"
    ));
}

#[test]
fn methods_close_over_the_class_scope() {
    let lines = run_ok(
        r#"
        fun make() {
          var greeting = "hi";
          class Greeter { say() { return greeting; } }
          return Greeter;
        }
        var G = make();
        print G().say();
        print G;
        "#,
    );

    assert_eq!(lines, vec!["hi", "Greeter"]);
}
