//! Renders an AST back into canonical Lox source.
//!
//! Parsing the output yields the same tree (up to expression ids), so the
//! printer doubles as a round‑trip check for the parser.  `for` loops come
//! out in their desugared `while` form.

use std::fmt::{self, Write};

use crate::ast::{Expr, FunctionDecl, LiteralValue, Stmt};
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

const INDENT: &str = "    ";

pub struct Ast;

impl Ast {
    /// Print a whole program, one top‑level declaration per line.
    pub fn print_program(&self, statements: &[Stmt]) -> String {
        let mut out: String = String::new();

        // Writing into a String cannot fail.
        let _ = statements
            .iter()
            .try_for_each(|stmt| self.write_stmt(&mut out, stmt, 0));

        out
    }

    pub fn print(&self, expr: &Expr) -> String {
        let mut out: String = String::new();
        let _ = self.write_expr(&mut out, expr);
        out
    }

    fn write_expr(&self, out: &mut String, expr: &Expr) -> fmt::Result {
        ensure_sufficient_stack(|| match expr {
            Expr::Literal(literal) => match literal {
                // Same formatting as `print`, which the scanner reads back.
                LiteralValue::Number(n) => write!(out, "{}", Value::Number(*n)),
                LiteralValue::Str(s) => write!(out, "\"{}\"", s),
                LiteralValue::True => out.write_str("true"),
                LiteralValue::False => out.write_str("false"),
                LiteralValue::Nil => out.write_str("nil"),
            },

            Expr::Grouping(inner) => {
                out.write_char('(')?;
                self.write_expr(out, inner)?;
                out.write_char(')')
            }

            Expr::Unary { operator, right } => {
                out.write_str(&operator.lexeme)?;
                self.write_expr(out, right)
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => {
                self.write_expr(out, left)?;
                write!(out, " {} ", operator.lexeme)?;
                self.write_expr(out, right)
            }

            Expr::Variable { name, .. } => out.write_str(&name.lexeme),

            Expr::Assign { name, value, .. } => {
                write!(out, "{} = ", name.lexeme)?;
                self.write_expr(out, value)
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.write_expr(out, callee)?;
                out.write_char('(')?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        out.write_str(", ")?;
                    }
                    self.write_expr(out, argument)?;
                }
                out.write_char(')')
            }

            Expr::Get { object, name } => {
                self.write_expr(out, object)?;
                write!(out, ".{}", name.lexeme)
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                self.write_expr(out, object)?;
                write!(out, ".{} = ", name.lexeme)?;
                self.write_expr(out, value)
            }

            Expr::This { .. } => out.write_str("this"),

            Expr::Super { method, .. } => write!(out, "super.{}", method.lexeme),
        })
    }

    fn write_stmt(&self, out: &mut String, stmt: &Stmt, depth: usize) -> fmt::Result {
        ensure_sufficient_stack(|| {
            out.push_str(&INDENT.repeat(depth));

            match stmt {
                Stmt::Expression(expr) => {
                    self.write_expr(out, expr)?;
                    out.write_str(";\n")
                }

                Stmt::Print(expr) => {
                    out.write_str("print ")?;
                    self.write_expr(out, expr)?;
                    out.write_str(";\n")
                }

                Stmt::Var { name, initializer } => {
                    write!(out, "var {}", name.lexeme)?;
                    if let Some(init) = initializer {
                        out.write_str(" = ")?;
                        self.write_expr(out, init)?;
                    }
                    out.write_str(";\n")
                }

                Stmt::Block(statements) => {
                    out.write_str("{\n")?;
                    for s in statements {
                        self.write_stmt(out, s, depth + 1)?;
                    }
                    writeln!(out, "{}}}", INDENT.repeat(depth))
                }

                Stmt::If {
                    condition,
                    then_branch,
                    else_branch,
                } => {
                    out.write_str("if (")?;
                    self.write_expr(out, condition)?;
                    out.write_str(")\n")?;
                    self.write_stmt(out, then_branch, depth + 1)?;
                    if let Some(else_branch) = else_branch {
                        writeln!(out, "{}else", INDENT.repeat(depth))?;
                        self.write_stmt(out, else_branch, depth + 1)?;
                    }
                    Ok(())
                }

                Stmt::While { condition, body } => {
                    out.write_str("while (")?;
                    self.write_expr(out, condition)?;
                    out.write_str(")\n")?;
                    self.write_stmt(out, body, depth + 1)
                }

                Stmt::Function(function) => {
                    out.write_str("fun ")?;
                    self.write_function(out, function, depth)
                }

                Stmt::Return { value, .. } => {
                    out.write_str("return")?;
                    if let Some(value) = value {
                        out.write_char(' ')?;
                        self.write_expr(out, value)?;
                    }
                    out.write_str(";\n")
                }

                Stmt::Class {
                    name,
                    superclass,
                    methods,
                } => {
                    write!(out, "class {}", name.lexeme)?;
                    if let Some(superclass) = superclass {
                        out.write_str(" < ")?;
                        self.write_expr(out, superclass)?;
                    }
                    out.write_str(" {\n")?;
                    for method in methods {
                        out.push_str(&INDENT.repeat(depth + 1));
                        self.write_function(out, method, depth + 1)?;
                    }
                    writeln!(out, "{}}}", INDENT.repeat(depth))
                }
            }
        })
    }

    /// `name(params) { body }` without the leading `fun`; the caller has
    /// already written the indentation.
    fn write_function(&self, out: &mut String, function: &FunctionDecl, depth: usize) -> fmt::Result {
        let params: Vec<&str> = function.params.iter().map(|p| p.lexeme.as_str()).collect();

        writeln!(out, "{}({}) {{", function.name.lexeme, params.join(", "))?;
        for stmt in &function.body {
            self.write_stmt(out, stmt, depth + 1)?;
        }
        writeln!(out, "{}}}", INDENT.repeat(depth))
    }
}
