//! Test file reader.
//!
//! Turns the text of a test file into a stream of [`TestData`] records:
//!
//! ```text
//! # comment
//! <command> [args]... [\]
//! <input>
//! ----
//! <expected output, ended by a blank line>
//! ```
//!
//! Expected output that itself contains blank lines is fenced by doubled
//! separators:
//!
//! ```text
//! <command> [args]...
//! ----
//! ----
//! <expected>
//!
//! <more expected>
//! ----
//! ----
//! ```
//!
//! Subtest markers are single-line records with no input or expectation.
//! Directive lines ending in `\` continue on the next line.

use crate::args;
use crate::case::Abort;
use crate::rewrite::{RewriteBuffer, SEPARATOR};
use crate::test_data::TestData;

/// Command that opens and closes a subtest.
pub const SUBTEST: &str = "subtest";

/// Argument of [`SUBTEST`] that closes the current subtest.
pub const SUBTEST_END: &str = "end";

/// Reads records from one test file.
#[derive(Debug)]
pub struct Reader {
    source_name: String,
    lines: Vec<String>,
    next_line: usize,
    data: TestData,
    rewrite: Option<RewriteBuffer>,
}

impl Reader {
    /// A reader over `contents`, echoing into a rewrite buffer if `rewrite`.
    pub fn new(source_name: &str, contents: &str, rewrite: bool) -> Self {
        Self {
            source_name: source_name.to_string(),
            lines: contents.lines().map(str::to_string).collect(),
            next_line: 0,
            data: TestData::default(),
            rewrite: rewrite.then(RewriteBuffer::new),
        }
    }

    /// The current record.
    pub fn data(&self) -> &TestData {
        &self.data
    }

    /// Append `line` to the rewrite buffer, if rewriting.
    pub fn emit(&mut self, line: &str) {
        if let Some(buf) = &mut self.rewrite {
            buf.emit(line);
        }
    }

    pub fn rewrite_mut(&mut self) -> Option<&mut RewriteBuffer> {
        self.rewrite.as_mut()
    }

    pub fn take_rewrite(&mut self) -> Option<RewriteBuffer> {
        self.rewrite.take()
    }

    fn scan(&mut self) -> Option<String> {
        let line = self.lines.get(self.next_line)?.clone();
        self.next_line += 1;
        Some(line)
    }

    fn peek(&self) -> Option<&str> {
        self.lines.get(self.next_line).map(String::as_str)
    }

    /// Advance to the next record. Returns `false` at end of input.
    pub fn advance(&mut self) -> Result<bool, Abort> {
        while let Some(raw) = self.scan() {
            self.emit(&raw);
            self.data = TestData {
                pos: format!("{}:{}", self.source_name, self.next_line),
                ..Default::default()
            };

            let mut line = raw.trim().to_string();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            while line.ends_with('\\') {
                let Some(next) = self.scan() else { break };
                self.emit(&next);
                line.pop();
                line.push(' ');
                line.push_str(next.trim());
            }

            let (cmd, cmd_args) = args::parse_directive(&line).map_err(|e| self.data.fatal(e))?;
            self.data.cmd = cmd;
            self.data.cmd_args = cmd_args;
            if self.data.cmd == SUBTEST {
                return Ok(true);
            }

            let mut input = String::new();
            let mut separator = false;
            while let Some(line) = self.scan() {
                if line == SEPARATOR {
                    separator = true;
                    break;
                }
                self.emit(&line);
                input.push_str(&line);
                input.push('\n');
            }
            self.data.input = input.trim().to_string();
            if separator {
                self.read_expected()?;
            }
            log::trace!("{}: read {}", self.data.pos, self.data.cmd);
            return Ok(true);
        }
        Ok(false)
    }

    fn read_expected(&mut self) -> Result<(), Abort> {
        let mut expected = String::new();
        let Some(first) = self.scan() else {
            return Ok(());
        };

        if first == SEPARATOR {
            loop {
                let Some(line) = self.scan() else {
                    return Err(self
                        .data
                        .fatal("EOF encountered inside double ---- separator section"));
                };
                if line == SEPARATOR && self.peek() == Some(SEPARATOR) {
                    self.scan();
                    // The blank line ending the record is part of the block.
                    if self.peek().is_some_and(|l| l.trim().is_empty()) {
                        self.scan();
                    }
                    break;
                }
                expected.push_str(&line);
                expected.push('\n');
            }
        } else {
            let mut line = first;
            while !line.trim().is_empty() {
                expected.push_str(&line);
                expected.push('\n');
                match self.scan() {
                    Some(next) => line = next,
                    None => break,
                }
            }
        }

        self.data.expected = expected;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(contents: &str) -> Vec<TestData> {
        let mut reader = Reader::new("test", contents, false);
        let mut records = Vec::new();
        while reader.advance().unwrap() {
            records.push(reader.data().clone());
        }
        records
    }

    #[test]
    fn reads_records_with_positions() {
        let records = read_all(
            "# leading comment\n\
             \n\
             echo a=1\n\
             hello\n\
             ----\n\
             hello\n\
             \n\
             noop\n\
             ----\n",
        );
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].pos, "test:3");
        assert_eq!(records[0].cmd, "echo");
        assert_eq!(records[0].cmd_args[0].to_string(), "a=1");
        assert_eq!(records[0].input, "hello");
        assert_eq!(records[0].expected, "hello\n");
        assert_eq!(records[1].pos, "test:8");
        assert_eq!(records[1].input, "");
        assert_eq!(records[1].expected, "");
    }

    #[test]
    fn input_may_contain_blank_lines() {
        let records = read_all("cat\n  one\n\ntwo  \n----\none\n\ntwo\n");
        assert_eq!(records[0].input, "one\n\ntwo");
        assert_eq!(records[0].expected, "one\n");
    }

    #[test]
    fn directive_without_separator_takes_rest_as_input() {
        let records = read_all("cmd\nsome input\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].input, "some input");
        assert_eq!(records[0].expected, "");
    }

    #[test]
    fn continued_directive_line() {
        let records = read_all("cmd a=1 \\\n   b=2\n----\nok\n");
        assert_eq!(records[0].pos, "test:1");
        assert_eq!(records[0].cmd_args.len(), 2);
        assert_eq!(records[0].cmd_args[1].to_string(), "b=2");
        assert_eq!(records[0].expected, "ok\n");
    }

    #[test]
    fn double_separator_keeps_blank_lines() {
        let records = read_all(
            "cmd\n----\n----\na\n\nb\n----\n----\n\nnext\n----\nx\n",
        );
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].expected, "a\n\nb\n");
        assert_eq!(records[1].cmd, "next");
        assert_eq!(records[1].pos, "test:10");
    }

    #[test]
    fn double_separator_then_directive_without_blank_line() {
        let records = read_all("cmd\n----\n----\na\n\nb\n----\n----\nnext\n----\nx\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].cmd, "next");
        assert_eq!(records[1].expected, "x\n");
    }

    #[test]
    fn double_separator_single_inner_separator_is_content() {
        let records = read_all("cmd\n----\n----\na\n----\nb\n----\n----\n");
        assert_eq!(records[0].expected, "a\n----\nb\n");
    }

    #[test]
    fn double_separator_requires_closing_pair() {
        let mut reader = Reader::new("test", "cmd\n----\n----\na\n", false);
        let err = reader.advance().unwrap_err();
        assert_eq!(
            err,
            Abort::Fatal("test:1: EOF encountered inside double ---- separator section".into())
        );
    }

    #[test]
    fn subtest_markers_stand_alone() {
        let records = read_all("subtest foo\ncmd\n----\nx\n\nsubtest end foo\n");
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].cmd, SUBTEST);
        assert_eq!(records[0].cmd_args[0].key, "foo");
        assert_eq!(records[1].cmd, "cmd");
        assert_eq!(records[2].cmd_args.len(), 2);
        assert_eq!(records[2].pos, "test:6");
    }

    #[test]
    fn bad_directive_is_fatal_with_position() {
        let mut reader = Reader::new("test", "\ncmd k=(a\n", false);
        match reader.advance().unwrap_err() {
            Abort::Fatal(msg) => assert!(msg.starts_with("test:2: unbalanced"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn echoes_everything_but_expectations() {
        let mut reader = Reader::new(
            "test",
            "# c\n\ncmd \\\n  a\ninput\n----\nold\n\nlast\n----\nold\n",
            true,
        );
        while reader.advance().unwrap() {}
        let buf = reader.take_rewrite().unwrap();
        assert_eq!(buf.as_str(), "# c\n\ncmd \\\n  a\ninput\nlast\n");
    }
}
