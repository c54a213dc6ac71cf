//! Diagnostics for every stage of the interpreter.
//!
//! Scanner, parser and resolver problems are [`LoxError`]s; a stage keeps
//! going after one and all of them are reported together.  A [`RuntimeError`]
//! ends the program that raised it.  [`RunError`] is what a session hands the
//! driver, which picks the exit code from it.  Nothing here prints.

use thiserror::Error;

use log::info;

use crate::token::{Token, TokenType};

/// A static diagnostic, displayed in the `[line N] Error…: message` form.
#[derive(Debug, Error)]
pub enum LoxError {
    /// Bad character or unterminated string.  Carries no location because
    /// there is no token to point at.
    #[error("[line {line}] Error: {message}")]
    Lex { message: String, line: usize },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        line: usize,
        /// ` at 'lexeme'` or ` at end`.
        location: String,
    },

    /// Static‑analysis failure (scope misuse found by the resolver).
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        line: usize,
        location: String,
    },
}

impl LoxError {
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**, located at `token`.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        LoxError::Parse {
            message,
            line: token.line,
            location: location(token),
        }
    }

    /// Helper constructor for the **resolver**, located at `token`.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", token.line, message);

        LoxError::Resolve {
            message,
            line: token.line,
            location: location(token),
        }
    }
}

fn location(token: &Token) -> String {
    if token.token_type == TokenType::EOF {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

/// An error raised while executing a program.  Always fatal to the current
/// run, never to the host process.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}\n[line {line}]")]
pub struct RuntimeError {
    pub message: String,
    pub line: usize,
}

impl RuntimeError {
    pub fn new<S: Into<String>>(token: &Token, msg: S) -> Self {
        Self::at_line(token.line, msg)
    }

    pub fn at_line<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", line, message);

        RuntimeError { message, line }
    }
}

/// Outcome of a failed [`crate::Lox::run`].
#[derive(Debug, Error)]
pub enum RunError {
    /// Lex, parse or resolve diagnostics; the program was not executed.
    #[error("{} error(s) found before execution", .0.len())]
    Static(Vec<LoxError>),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl RunError {
    /// Conventional `sysexits` code for the failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Static(_) => 65,
            RunError::Runtime(_) => 70,
        }
    }

    /// Every diagnostic in reporting order.
    pub fn diagnostics(&self) -> Vec<String> {
        match self {
            RunError::Static(errors) => errors.iter().map(ToString::to_string).collect(),
            RunError::Runtime(e) => vec![e.to_string()],
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
