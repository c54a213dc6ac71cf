//! A tree-walking interpreter for the Lox language.
//!
//! Source text flows through [`scanner`] → [`parser`] → [`resolver`] →
//! [`interpreter`].  [`Lox`] ties the stages together over one persistent
//! interpreter, which is what both the file runner and the REPL use.

pub mod ast;
pub mod ast_printer;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod object;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stack;
pub mod token;
pub mod value;

use std::io::Write;

use log::{debug, info};

use crate::ast::Stmt;
use crate::error::{LoxError, RunError};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::scan_tokens;
use crate::value::Value;

/// An interpreter session.  Globals defined by one [`Lox::run`] stay visible
/// to the next.
pub struct Lox {
    interpreter: Interpreter,
    next_id: usize,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    pub fn new() -> Self {
        Self::from_interpreter(Interpreter::new())
    }

    /// A session whose `print` output goes to `out` instead of stdout.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        Self::from_interpreter(Interpreter::with_output(out))
    }

    fn from_interpreter(interpreter: Interpreter) -> Self {
        Self {
            interpreter,
            next_id: 0,
        }
    }

    /// Scan, parse, resolve and execute `source`.
    ///
    /// Nothing is executed if any lex, parse or resolve diagnostic is raised;
    /// they are all returned together.
    pub fn run(&mut self, source: &str) -> Result<(), RunError> {
        let statements: Vec<Stmt> = self.compile(source)?;

        info!("Executing {} statement(s)", statements.len());

        self.interpreter.interpret(&statements)?;

        Ok(())
    }

    /// Run one REPL line.  A line that is not a valid program but is a single
    /// bare expression (`1 + 2`, no `;`) is evaluated and its value returned.
    pub fn run_line(&mut self, line: &str) -> Result<Option<Value>, RunError> {
        let (tokens, lex_errors) = scan_tokens(line);

        let mut parser: Parser<'_> = Parser::with_first_id(&tokens, self.next_id);
        let statements: Vec<Stmt> = parser.parse();
        let program_errors: Vec<LoxError> = parser.take_errors();
        self.next_id = parser.next_id();

        if lex_errors.is_empty() && !program_errors.is_empty() {
            let mut parser: Parser<'_> = Parser::with_first_id(&tokens, self.next_id);
            let expression = parser.parse_expression();
            self.next_id = parser.next_id();

            if let Some(expr) = expression {
                debug!("REPL line is a bare expression");

                let mut resolver = Resolver::new(&mut self.interpreter);
                resolver.resolve_expression(&expr);
                let errors: Vec<LoxError> = resolver.take_errors();
                if !errors.is_empty() {
                    return Err(RunError::Static(errors));
                }

                return Ok(Some(self.interpreter.evaluate(&expr)?));
            }
        }

        let mut errors: Vec<LoxError> = lex_errors;
        errors.extend(program_errors);
        if !errors.is_empty() {
            return Err(RunError::Static(errors));
        }

        self.resolve(&statements)?;
        self.interpreter.interpret(&statements)?;

        Ok(None)
    }

    /// Scan and parse `source` without resolving or running it.
    pub fn parse(&mut self, source: &str) -> Result<Vec<Stmt>, RunError> {
        let (tokens, mut errors) = scan_tokens(source);

        let mut parser: Parser<'_> = Parser::with_first_id(&tokens, self.next_id);
        let statements: Vec<Stmt> = parser.parse();
        errors.extend(parser.take_errors());
        self.next_id = parser.next_id();

        if errors.is_empty() {
            Ok(statements)
        } else {
            Err(RunError::Static(errors))
        }
    }

    fn compile(&mut self, source: &str) -> Result<Vec<Stmt>, RunError> {
        let statements: Vec<Stmt> = self.parse(source)?;
        self.resolve(&statements)?;
        Ok(statements)
    }

    fn resolve(&mut self, statements: &[Stmt]) -> Result<(), RunError> {
        let mut resolver = Resolver::new(&mut self.interpreter);
        resolver.resolve(statements);

        let errors: Vec<LoxError> = resolver.take_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(RunError::Static(errors))
        }
    }
}
