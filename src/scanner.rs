//! Streaming lexer for Lox source text.
//!
//! [`Scanner`] is a fused iterator of `Result<Token>`.  A bad character or an
//! unterminated string yields one `Err` and scanning carries on after it, so a
//! single pass reports every lexical problem.  The last item is always a
//! single `EOF` token.
//!
//! ```rust
//! use rox::scanner::Scanner;
//!
//! for result in Scanner::new("print 123; // example") {
//!     match result {
//!         Ok(token) => println!("{}", token),
//!         Err(err) => eprintln!("{}", err),
//!     }
//! }
//! ```

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

/// Reserved words, looked up once an identifier-shaped lexeme is complete.
static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"fun"    => TokenType::FUN,
    b"for"    => TokenType::FOR,
    b"if"     => TokenType::IF,
    b"nil"    => TokenType::NIL,
    b"or"     => TokenType::OR,
    b"print"  => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super"  => TokenType::SUPER,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"var"    => TokenType::VAR,
    b"while"  => TokenType::WHILE,
};

pub struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    /// First byte of the lexeme being scanned.
    start: usize,
    /// Next byte to look at.
    pos: usize,
    line: usize,
    finished: bool,
}

/// Scan the whole of `source`, returning every token (always ending in `EOF`)
/// together with the lexical diagnostics met on the way.
pub fn scan_tokens(source: &str) -> (Vec<Token>, Vec<LoxError>) {
    let (tokens, errors): (Vec<_>, Vec<_>) = Scanner::new(source).partition(|r| r.is_ok());

    let tokens: Vec<Token> = tokens.into_iter().filter_map(|r| r.ok()).collect();
    let errors: Vec<LoxError> = errors.into_iter().filter_map(|r| r.err()).collect();

    info!(
        "Scanned {} token(s) with {} error(s)",
        tokens.len(),
        errors.len()
    );

    (tokens, errors)
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        info!("Scanner created over {} bytes", text.len());

        Self {
            text,
            bytes: text.as_bytes(),
            start: 0,
            pos: 0,
            line: 1,
            finished: false,
        }
    }

    #[inline(always)]
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Byte `offset` places ahead of the cursor, `0` past the end.
    #[inline(always)]
    fn look(&self, offset: usize) -> u8 {
        self.bytes.get(self.pos + offset).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn bump(&mut self) -> u8 {
        let b: u8 = self.look(0);
        self.pos += 1;
        b
    }

    /// `long` if the next byte is `=` (consuming it), otherwise `short`.
    #[inline(always)]
    fn with_equals(&mut self, long: TokenType, short: TokenType) -> TokenType {
        if self.look(0) == b'=' {
            self.pos += 1;
            long
        } else {
            short
        }
    }

    #[inline(always)]
    fn lexeme(&self) -> &'a str {
        // Lexemes start and end on ASCII bytes or whole characters.
        &self.text[self.start..self.pos]
    }

    /// Skip spaces, newlines and `//` comments up to the next lexeme.
    fn skip_trivia(&mut self) {
        loop {
            match self.look(0) {
                b' ' | b'\r' | b'\t' => self.pos += 1,

                b'\n' => {
                    self.line += 1;
                    self.pos += 1;
                }

                b'/' if self.look(1) == b'/' => {
                    self.pos = match memchr(b'\n', &self.bytes[self.pos..]) {
                        Some(offset) => self.pos + offset,
                        None => self.bytes.len(),
                    };
                }

                _ => return,
            }
        }
    }

    /// Recognise the lexeme starting at `self.start`.
    fn scan_token(&mut self) -> Result<TokenType> {
        let kind: TokenType = match self.bump() {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,
            b'/' => TokenType::SLASH,

            b'!' => self.with_equals(TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.with_equals(TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.with_equals(TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.with_equals(TokenType::GREATER_EQUAL, TokenType::GREATER),

            b'"' => self.string()?,
            b'0'..=b'9' => self.number(),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            _ => {
                let c: char = self.text[self.start..]
                    .chars()
                    .next()
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                self.pos = self.start + c.len_utf8();

                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", c),
                ));
            }
        };

        Ok(kind)
    }

    /// Body of a `"…"` literal; newlines are allowed inside.
    fn string(&mut self) -> Result<TokenType> {
        let opening_line: usize = self.line;

        loop {
            match self.look(0) {
                _ if self.at_end() => {
                    return Err(LoxError::lex(opening_line, "Unterminated string."));
                }
                b'"' => break,
                b'\n' => self.line += 1,
                _ => {}
            }
            self.pos += 1;
        }

        self.pos += 1;

        let body: &str = &self.text[self.start + 1..self.pos - 1];
        Ok(TokenType::STRING(body.to_owned()))
    }

    /// `123` or `12.5`; a `.` not followed by a digit is left for `DOT`.
    fn number(&mut self) -> TokenType {
        while self.look(0).is_ascii_digit() {
            self.pos += 1;
        }

        if self.look(0) == b'.' && self.look(1).is_ascii_digit() {
            self.pos += 1;
            while self.look(0).is_ascii_digit() {
                self.pos += 1;
            }
        }

        TokenType::NUMBER(self.lexeme().parse().unwrap_or(0.0))
    }

    fn identifier(&mut self) -> TokenType {
        while matches!(self.look(0), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') {
            self.pos += 1;
        }

        KEYWORDS
            .get(self.lexeme().as_bytes())
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        self.skip_trivia();
        self.start = self.pos;

        if self.at_end() {
            self.finished = true;
            return Some(Ok(Token::new(TokenType::EOF, "", self.line)));
        }

        let result: Result<Token> = self
            .scan_token()
            .map(|kind| Token::new(kind, self.lexeme(), self.line));

        if let Ok(token) = &result {
            debug!("Scanned {} on line {}", token.token_type.name(), token.line);
        }

        Some(result)
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
