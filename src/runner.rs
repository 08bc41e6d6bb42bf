//! Test execution engine.
//!
//! Drives a [`Reader`] over one test file, running every directive through a
//! handler and either comparing its output with the recorded expectation or,
//! in rewrite mode, collecting a rewritten copy of the file.

use crate::case::{Abort, Case};
use crate::reader::{Reader, SUBTEST, SUBTEST_END};
use crate::rewrite;
use crate::schema::Config;
use crate::test_data::TestData;
use similar::TextDiff;
use std::fs::{File, OpenOptions};
use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

/// Run the test file at `path`.
///
/// Each directive in the file is passed to `f`, which returns the actual
/// output for it. In rewrite mode the file is updated in place once every
/// directive has run. The file is only opened for writing in rewrite mode,
/// so read-only files can still be checked.
///
/// A handler that fails `case` softly (see [`Case::error`]) stops the rest of
/// the file, since later directives cannot be expected to start from a
/// consistent state.
pub fn run_test<F>(
    case: &mut Case,
    path: impl AsRef<Path>,
    config: &Config,
    f: F,
) -> Result<(), Abort>
where
    F: FnMut(&mut Case, &TestData) -> Result<String, Abort>,
{
    let path = path.as_ref();
    let source_name = path.display().to_string();
    let mut file = OpenOptions::new()
        .read(true)
        .write(config.rewrite)
        .open(path)
        .map_err(|e| Abort::Fatal(format!("{source_name}: {e}")))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| Abort::Fatal(format!("{source_name}: {e}")))?;

    run_test_internal(case, &source_name, &contents, Some(&mut file), config, f)
}

/// Run a test given as a string. Nothing is written back; in rewrite mode
/// the rewritten text is logged on `case`.
pub fn run_test_from_string<F>(
    case: &mut Case,
    input: &str,
    config: &Config,
    f: F,
) -> Result<(), Abort>
where
    F: FnMut(&mut Case, &TestData) -> Result<String, Abort>,
{
    run_test_internal(case, "<string>", input, None, config, f)
}

fn run_test_internal<F>(
    case: &mut Case,
    source_name: &str,
    contents: &str,
    dest: Option<&mut File>,
    config: &Config,
    f: F,
) -> Result<(), Abort>
where
    F: FnMut(&mut Case, &TestData) -> Result<String, Abort>,
{
    let mut driver = Driver {
        reader: Reader::new(source_name, contents, config.rewrite),
        config,
        f,
    };
    while driver.reader.advance()? {
        driver.run_directive_or_subtest(case, "")?;
    }

    if let Some(buf) = driver.reader.take_rewrite() {
        let data = buf.finish();
        match dest {
            Some(file) => {
                rewrite::write_file(file, &data)
                    .map_err(|e| Abort::Fatal(format!("{source_name}: {e}")))?;
                log::info!("rewrote {source_name}");
            }
            None => case.log(format!("input is not a file; rewritten output is:\n{data}")),
        }
    }
    Ok(())
}

struct Driver<'a, F> {
    reader: Reader,
    config: &'a Config,
    f: F,
}

impl<F> Driver<'_, F>
where
    F: FnMut(&mut Case, &TestData) -> Result<String, Abort>,
{
    /// Run the current record, either as a subtest or as a directive.
    /// `prefix` is the prefix every subtest name must carry at this level.
    fn run_directive_or_subtest(&mut self, case: &mut Case, prefix: &str) -> Result<(), Abort> {
        match self.subtest_start(prefix)? {
            Some(name) => self.run_subtest(case, name)?,
            None => self.run_directive(case)?,
        }
        if case.failed() {
            return Err(case.fail_now());
        }
        Ok(())
    }

    fn subtest_start(&self, prefix: &str) -> Result<Option<String>, Abort> {
        let d = self.reader.data();
        if d.cmd != SUBTEST {
            return Ok(None);
        }
        let [arg] = d.cmd_args.as_slice() else {
            return Err(d.fatal("invalid syntax for subtest"));
        };
        if arg.key == SUBTEST_END {
            return Err(d.fatal("subtest end without corresponding start"));
        }
        if !arg.key.starts_with(prefix) {
            return Err(d.fatal(format!("name of nested subtest must begin with {prefix:?}")));
        }
        Ok(Some(arg.key.clone()))
    }

    /// Whether the current record closes the subtest `open`.
    fn subtest_end(&self, open: &str) -> Result<bool, Abort> {
        let d = self.reader.data();
        if d.cmd != SUBTEST || d.cmd_args.first().is_none_or(|a| a.key != SUBTEST_END) {
            return Ok(false);
        }
        if d.cmd_args.len() > 2 {
            return Err(d.fatal("invalid syntax for subtest end"));
        }
        if let Some(given) = d.cmd_args.get(1)
            && given.key != open
        {
            return Err(d.fatal(format!(
                "mismatched subtest end directive: expected {open:?}, got {:?}",
                given.key
            )));
        }
        Ok(true)
    }

    fn run_subtest(&mut self, case: &mut Case, name: String) -> Result<(), Abort> {
        let start_pos = self.reader.data().pos.clone();
        let prefix = format!("{name}/");
        let mut seen_end = false;
        let mut skipped = false;

        log::debug!("{start_pos}: subtest {name}");
        case.run(&name, |sub| {
            let body = self.subtest_body(sub, &name, &prefix);
            // A skip after a soft failure leaves the case failed, not
            // skipped, so look at the abort itself.
            skipped = matches!(body, Err(Abort::Skipped(_)));
            seen_end = matches!(body, Ok(true));
            body.map(|_| ())
        });

        if skipped {
            // Honoring a skip here would mean consuming records up to the
            // matching end while keeping their original text for rewrites.
            return Err(self.reader.data().fatal(format!(
                "cannot use skip inside subtest\n{start_pos}: subtest started here"
            )));
        }
        // Any earlier failure has already stopped reading, so a missing end
        // is only reported on its own.
        if !seen_end && !case.failed() {
            return Err(self.reader.data().fatal(format!(
                "EOF encountered without subtest end directive\n{start_pos}: subtest started here"
            )));
        }
        Ok(())
    }

    /// Run records until the end of subtest `name`. Returns whether the end
    /// marker was seen before EOF.
    fn subtest_body(
        &mut self,
        sub: &mut Case,
        name: &str,
        prefix: &str,
    ) -> Result<bool, Abort> {
        while self.reader.advance()? {
            if self.subtest_end(name)? {
                return Ok(true);
            }
            self.run_directive_or_subtest(sub, prefix)?;
        }
        Ok(false)
    }

    fn run_directive(&mut self, case: &mut Case) -> Result<(), Abort> {
        let d = self.reader.data().clone();
        log::debug!("{}: {}", d.pos, d.cmd);

        let f = &mut self.f;
        let result = panic::catch_unwind(AssertUnwindSafe(|| f(&mut *case, &d)));
        let mut actual = match result {
            Ok(Ok(actual)) => actual,
            Ok(Err(abort)) => {
                case.log(format!("{} during {}:\n{}", abort.kind(), d.pos, d.input));
                return Err(abort);
            }
            Err(payload) => {
                eprintln!("\npanic during {}:\n{}", d.pos, d.input);
                panic::resume_unwind(payload);
            }
        };
        if !actual.is_empty() && !actual.ends_with('\n') {
            actual.push('\n');
        }

        // The handler reported its own failure; its output cannot be trusted.
        if case.failed() {
            return Err(case.fail_now());
        }

        if let Some(buf) = self.reader.rewrite_mut() {
            buf.emit_expectation(&actual);
        } else if d.expected != actual {
            return Err(Abort::Fatal(mismatch_message(&d, &actual)));
        } else if self.config.verbose {
            let input = if d.input.is_empty() {
                "<no input to command>"
            } else {
                &d.input
            };
            println!(
                "\n{}:\n{} [{} args]\n{input}\n----\n{actual}",
                d.pos,
                d.cmd,
                d.cmd_args.len()
            );
        }
        Ok(())
    }
}

fn mismatch_message(d: &TestData, actual: &str) -> String {
    let diff = TextDiff::from_lines(d.expected.as_str(), actual);
    let mut unified = diff.unified_diff();
    let unified = unified.header("expected", "found").to_string();
    format!(
        "\n{}: {}\nexpected:\n{}\nfound:\n{actual}\ndiff:\n{unified}",
        d.pos, d.input, d.expected
    )
}
