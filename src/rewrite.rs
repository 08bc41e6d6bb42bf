//! Golden-file rewriting.
//!
//! In rewrite mode the reader echoes every line it consumes except the
//! expectation blocks into a [`RewriteBuffer`]; the executor then appends the
//! actual output of each directive in place of the old expectation. Once the
//! whole file has run, the buffer replaces the file content.

use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};

/// Separator between a directive's input and its expected output.
pub const SEPARATOR: &str = "----";

/// Accumulates the rewritten content of one test file.
#[derive(Debug, Default)]
pub struct RewriteBuffer {
    buf: String,
}

impl RewriteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `line` and a line terminator.
    pub fn emit(&mut self, line: &str) {
        self.buf.push_str(line);
        self.buf.push('\n');
    }

    /// Append the expectation block for `actual`.
    ///
    /// `actual` is either empty or ends in a line terminator. If it contains
    /// a blank line, or starts with a separator line that would be read back
    /// as the opening of a fenced block, the block is fenced by doubled
    /// separators. Either form is followed by one blank line.
    ///
    /// Output containing two consecutive separator lines cannot be fenced
    /// and does not read back unchanged.
    pub fn emit_expectation(&mut self, actual: &str) {
        self.emit(SEPARATOR);
        if needs_fence(actual) {
            self.emit(SEPARATOR);
            self.buf.push_str(actual);
            self.emit(SEPARATOR);
            self.emit(SEPARATOR);
            self.emit("");
        } else {
            self.emit(actual);
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// The final content, minus one trailing blank line if present.
    pub fn finish(self) -> String {
        let mut data = self.buf;
        if data.len() > 2 && data.ends_with("\n\n") {
            data.pop();
        }
        data
    }
}

/// Whether `actual` must use the fenced form to be read back unchanged.
pub fn needs_fence(actual: &str) -> bool {
    has_blank_line(actual) || actual.lines().next() == Some(SEPARATOR)
}

/// Whether any line of `s` is empty after trimming whitespace.
pub fn has_blank_line(s: &str) -> bool {
    s.lines().any(|line| line.trim().is_empty())
}

/// Replace the whole content of `file` with `data` and flush it to disk.
pub fn write_file(file: &mut File, data: &str) -> io::Result<()> {
    file.seek(SeekFrom::Start(0))?;
    file.write_all(data.as_bytes())?;
    file.set_len(data.len() as u64)?;
    file.sync_all()
}
