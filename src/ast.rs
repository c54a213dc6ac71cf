//! Abstract syntax tree produced by the [`crate::parser::Parser`].
//!
//! Nodes that name a variable (`Variable`, `Assign`, `This`, `Super`) carry an
//! [`ExprId`].  The resolver never mutates the tree; it records binding
//! distances in a side table keyed by that id.
//!
//! Dropping a tree never recurses: children are detached onto a worklist
//! first, so nesting depth is bounded only by memory.

use std::mem;
use std::rc::Rc;

use crate::token::Token;

/// Stable identity of a name‑bearing expression node.  Unique within one
/// interpreter session, including across REPL lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub usize);

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal ‑ stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    True,

    False,

    Nil,
}

/// Every kind of *expression* in Lox.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(LiteralValue),

    /// Prefix unary operator expression: `!isReady` or `-42`.
    Unary {
        operator: Token,
        right: Box<Expr>,
    },

    /// Infix binary operator expression: `a + b`, `x <= y`.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Parenthesised sub‑expression.
    Grouping(Box<Expr>),

    /// Variable access.
    Variable { id: ExprId, name: Token },

    /// `identifier "=" expression`
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Function‑ or method‑call expression.
    Call {
        callee: Box<Expr>,
        /// The closing `)` token ‑ retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// object.property
    Get { object: Box<Expr>, name: Token },

    /// object.property = value
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    This { id: ExprId, keyword: Token },

    /// `super.method`
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },
}

/// A function or method declaration.  Shared between the tree and every
/// runtime function created from it.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,

    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<Token>,

    pub body: Vec<Stmt>,
}

/// Complete executable constructs.  A program is a sequence of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    Print(Expr),

    /// `"var" IDENT ("=" initializer)? ";"`
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `while` loop; `for` loops are desugared into this.
    While { condition: Expr, body: Box<Stmt> },

    Function(Rc<FunctionDecl>),

    Return {
        /// The `return` keyword token (for error locations).
        keyword: Token,

        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    Class {
        name: Token,
        /// Always an [`Expr::Variable`] when present.
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
    },
}

/// A detached subtree awaiting teardown.
enum Pending {
    Expr(Expr),
    Stmt(Stmt),
}

const NIL: Expr = Expr::Literal(LiteralValue::Nil);

fn take_expr(slot: &mut Expr) -> Pending {
    Pending::Expr(mem::replace(slot, NIL))
}

fn take_stmt(slot: &mut Stmt) -> Pending {
    Pending::Stmt(mem::replace(slot, Stmt::Block(Vec::new())))
}

/// Queue a declaration's body, unless something else still shares it.
fn take_body(decl: &mut Rc<FunctionDecl>, out: &mut Vec<Pending>) {
    if let Some(decl) = Rc::get_mut(decl) {
        out.extend(decl.body.drain(..).map(Pending::Stmt));
    }
}

impl Expr {
    fn detach_children(&mut self, out: &mut Vec<Pending>) {
        match self {
            Expr::Literal(_) | Expr::Variable { .. } | Expr::This { .. } | Expr::Super { .. } => {}

            Expr::Unary { right: inner, .. }
            | Expr::Grouping(inner)
            | Expr::Assign { value: inner, .. }
            | Expr::Get { object: inner, .. } => out.push(take_expr(inner)),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                out.push(take_expr(left));
                out.push(take_expr(right));
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                out.push(take_expr(callee));
                out.extend(arguments.drain(..).map(Pending::Expr));
            }

            Expr::Set { object, value, .. } => {
                out.push(take_expr(object));
                out.push(take_expr(value));
            }
        }
    }
}

impl Stmt {
    fn detach_children(&mut self, out: &mut Vec<Pending>) {
        match self {
            Stmt::Expression(expr) | Stmt::Print(expr) => out.push(take_expr(expr)),

            Stmt::Var { initializer, .. } => out.extend(initializer.take().map(Pending::Expr)),

            Stmt::Block(statements) => out.extend(statements.drain(..).map(Pending::Stmt)),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                out.push(take_expr(condition));
                out.push(take_stmt(then_branch));
                out.extend(else_branch.take().map(|branch| Pending::Stmt(*branch)));
            }

            Stmt::While { condition, body } => {
                out.push(take_expr(condition));
                out.push(take_stmt(body));
            }

            Stmt::Function(decl) => take_body(decl, out),

            Stmt::Return { value, .. } => out.extend(value.take().map(Pending::Expr)),

            Stmt::Class {
                superclass,
                methods,
                ..
            } => {
                out.extend(superclass.take().map(Pending::Expr));
                for method in methods.iter_mut() {
                    take_body(method, out);
                }
            }
        }
    }
}

impl Pending {
    fn detach_children(&mut self, out: &mut Vec<Pending>) {
        match self {
            Pending::Expr(expr) => expr.detach_children(out),
            Pending::Stmt(stmt) => stmt.detach_children(out),
        }
    }
}

/// Drop every queued node after emptying it, so each drop is shallow.
fn tear_down(mut pending: Vec<Pending>) {
    while let Some(mut node) = pending.pop() {
        node.detach_children(&mut pending);
    }
}

impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending: Vec<Pending> = Vec::new();
        self.detach_children(&mut pending);
        tear_down(pending);
    }
}

impl Drop for Stmt {
    fn drop(&mut self) {
        let mut pending: Vec<Pending> = Vec::new();
        self.detach_children(&mut pending);
        tear_down(pending);
    }
}
