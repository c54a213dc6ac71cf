#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use rox::error::RunError;
use rox::Lox;

/// A `print` sink the test can read back after handing it to the interpreter.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A fresh session plus the buffer its `print` statements write to.
pub fn session() -> (Lox, SharedBuffer) {
    let buffer = SharedBuffer::default();
    (Lox::with_output(Box::new(buffer.clone())), buffer)
}

/// Run `source` in a fresh session; returns everything printed and the outcome.
pub fn run(source: &str) -> (String, Result<(), RunError>) {
    let (mut lox, buffer) = session();
    let result = lox.run(source);
    (buffer.contents(), result)
}

/// Run `source`, which must succeed, and return its printed lines.
pub fn output_of(source: &str) -> Vec<String> {
    let (output, result) = run(source);
    if let Err(e) = result {
        panic!("program failed: {:?}\noutput so far:\n{}", e.diagnostics(), output);
    }
    output.lines().map(str::to_string).collect()
}

/// Run `source`, which must fail with a runtime error, and return its message.
pub fn runtime_error_of(source: &str) -> String {
    match run(source).1 {
        Err(RunError::Runtime(e)) => e.message,
        other => panic!("expected a runtime error, got {:?}", other),
    }
}

/// Run `source`, which must fail before execution, and return the diagnostics.
pub fn static_errors_of(source: &str) -> Vec<String> {
    match run(source) {
        (output, Err(RunError::Static(errors))) => {
            assert_eq!(output, "", "nothing may run when static errors exist");
            errors.iter().map(ToString::to_string).collect()
        }
        (_, other) => panic!("expected static errors, got {:?}", other),
    }
}
