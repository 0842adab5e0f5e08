use crate::ast::{Expr, FunctionDecl, LiteralValue, Stmt};

/// Converts expressions and statements to the Crafting‑Interpreters
/// parenthesised prefix form, e.g. `(+ 1.0 (group (* 2.0 3.0)))`.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.clone(),

                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        // 3 → 3.0
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }
            },

            // ── grouping ────────────────────────────────────────────────
            Expr::Grouping(inner) => format!("(group {})", Self::print(inner)),

            // ── unary operator ──────────────────────────────────────────
            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            // ── binary / logical operator ───────────────────────────────
            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(left),
                Self::print(right)
            ),

            // ── comma / ternary ─────────────────────────────────────────
            Expr::Comma(exprs) => Self::parenthesize(",", exprs.iter().map(Self::print)),

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => format!(
                "(?: {} {} {})",
                Self::print(condition),
                Self::print(then_branch),
                Self::print(else_branch)
            ),

            // ── variables / calls / objects ─────────────────────────────
            Expr::Variable(name) => name.lexeme.clone(),

            Expr::Assign { name, value } => format!("(= {} {})", name.lexeme, Self::print(value)),

            Expr::Call {
                callee, arguments, ..
            } => Self::parenthesize(
                "call",
                std::iter::once(Self::print(callee)).chain(arguments.iter().map(Self::print)),
            ),

            Expr::Get { object, name } => format!("(. {} {})", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),

            Expr::This(_) => "this".into(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),
        }
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Block(statements) => {
                Self::parenthesize("block", statements.iter().map(Self::print_stmt))
            }

            Stmt::Expression(expr) => format!("(; {})", Self::print(expr)),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if-else {} {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch),
                    Self::print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch)
                ),
            },

            Stmt::Print { value, .. } => format!("(print {})", Self::print(value)),

            Stmt::Var { name, initializer } => match initializer {
                Some(init) => format!("(var {} = {})", name.lexeme, Self::print(init)),
                None => format!("(var {})", name.lexeme),
            },

            Stmt::While { condition, body } => format!(
                "(while {} {})",
                Self::print(condition),
                Self::print_stmt(body)
            ),

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => format!(
                "(for {} {} {} {})",
                initializer
                    .as_deref()
                    .map_or_else(|| ";".to_string(), Self::print_stmt),
                condition.as_ref().map_or_else(String::new, Self::print),
                increment.as_ref().map_or_else(String::new, Self::print),
                Self::print_stmt(body)
            ),

            Stmt::Function(decl) => Self::print_function("fun", decl),

            Stmt::Return { value, .. } => match value {
                Some(value) => format!("(return {})", Self::print(value)),
                None => "(return)".into(),
            },

            Stmt::Class {
                name,
                superclass,
                methods,
                class_methods,
            } => {
                let mut head: String = format!("class {}", name.lexeme);
                if let Some(superclass) = superclass {
                    head.push_str(&format!(" < {}", Self::print(superclass)));
                }
                Self::parenthesize(
                    &head,
                    class_methods
                        .iter()
                        .map(|m| Self::print_function("class", m))
                        .chain(methods.iter().map(|m| Self::print_function("method", m))),
                )
            }
        }
    }

    fn print_function(kind: &str, decl: &FunctionDecl) -> String {
        let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme.as_str()).collect();
        Self::parenthesize(
            &format!("{} {}({})", kind, decl.name.lexeme, params.join(" ")),
            decl.body.iter().map(Self::print_stmt),
        )
    }

    fn parenthesize(name: &str, parts: impl Iterator<Item = String>) -> String {
        let mut s: String = format!("({}", name);
        for part in parts {
            s.push(' ');
            s.push_str(&part);
        }
        s.push(')');
        s
    }
}
