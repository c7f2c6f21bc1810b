//! Where commands write their output.
//!
//! Standard subcommands never print directly; they ask for the [`Output`]
//! registered under [`OUTPUT_KEY`] and write to it. Applications get stdout
//! by default and can swap in a buffer to capture what a run printed.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// Extra-data key the app's [`Output`] is registered under.
pub const OUTPUT_KEY: &str = "output";

enum Sink {
    Stdout,
    Buffer(Vec<u8>),
}

/// A shared, cloneable output handle.
#[derive(Clone)]
pub struct Output {
    sink: Rc<RefCell<Sink>>,
}

impl Output {
    pub fn stdout() -> Self {
        Self {
            sink: Rc::new(RefCell::new(Sink::Stdout)),
        }
    }

    /// An in-memory sink; read it back with [`Output::contents`].
    pub fn buffer() -> Self {
        Self {
            sink: Rc::new(RefCell::new(Sink::Buffer(Vec::new()))),
        }
    }

    /// Everything written so far. Always empty for stdout.
    pub fn contents(&self) -> String {
        match &*self.sink.borrow() {
            Sink::Stdout => String::new(),
            Sink::Buffer(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    /// True if output goes to an interactive terminal that accepts colors.
    pub fn supports_styling(&self) -> bool {
        match &*self.sink.borrow() {
            Sink::Stdout => console::Term::stdout().is_term() && console::colors_enabled(),
            Sink::Buffer(_) => false,
        }
    }

    pub fn write_str(&self, text: &str) -> io::Result<()> {
        match &mut *self.sink.borrow_mut() {
            Sink::Stdout => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(text.as_bytes())?;
                stdout.flush()
            }
            Sink::Buffer(bytes) => {
                bytes.extend_from_slice(text.as_bytes());
                Ok(())
            }
        }
    }

    pub fn line(&self, text: &str) -> io::Result<()> {
        self.write_str(text)?;
        self.write_str("\n")
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::stdout()
    }
}

impl std::fmt::Debug for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &*self.sink.borrow() {
            Sink::Stdout => f.write_str("Output(stdout)"),
            Sink::Buffer(bytes) => write!(f, "Output(buffer, {} bytes)", bytes.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_collects_lines() {
        let output = Output::buffer();
        output.line("one").unwrap();
        output.write_str("two").unwrap();
        assert_eq!(output.contents(), "one\ntwo");
    }

    #[test]
    fn test_clones_share_the_sink() {
        let output = Output::buffer();
        output.clone().line("shared").unwrap();
        assert_eq!(output.contents(), "shared\n");
        assert!(!output.supports_styling());
    }
}
