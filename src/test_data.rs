//! One directive parsed from a test file.

use crate::args::{CmdArg, Dest, ScanValue};
use crate::case::Abort;
use serde::Serialize;
use std::fmt;

/// A single directive together with its input and expected output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestData {
    /// `<file>:<line>` of the directive line, for logs and error messages.
    pub pos: String,
    /// First token of the directive line.
    pub cmd: String,
    /// Arguments to the command.
    pub cmd_args: Vec<CmdArg>,
    /// Text between the directive line and the `----` separator.
    pub input: String,
    /// Text below the separator. A handler may return it unchanged to
    /// signal that nothing changed.
    pub expected: String,
}

impl TestData {
    /// Whether an argument with `key` is present.
    pub fn has_arg(&self, key: &str) -> bool {
        self.cmd_args.iter().any(|a| a.key == key)
    }

    /// The first argument with `key`.
    pub fn find_arg(&self, key: &str) -> Option<&CmdArg> {
        self.cmd_args.iter().find(|a| a.key == key)
    }

    /// Scan the first argument with `key` into `dests`, in order.
    ///
    /// For `cmd a=50 b=(1, 2, 3)`:
    ///
    /// ```
    /// # use datadriven::{Dest, TestData, CmdArg};
    /// # let d = TestData {
    /// #     cmd_args: vec![CmdArg::parse("a=50"), CmdArg::parse("b=(1, 2, 3)")],
    /// #     ..Default::default()
    /// # };
    /// let (mut a, mut x, mut y, mut z) = (0i64, 0u64, 0u64, 0u64);
    /// d.scan_args("a", &mut [Dest::Int(&mut a)]).unwrap();
    /// d.scan_args("b", &mut [Dest::from(&mut x), Dest::from(&mut y), Dest::from(&mut z)])
    ///     .unwrap();
    /// assert_eq!((a, x, y, z), (50, 1, 2, 3));
    /// ```
    ///
    /// A missing key, a destination count that differs from the value count,
    /// or an unconvertible value is fatal.
    pub fn scan_args(&self, key: &str, dests: &mut [Dest<'_>]) -> Result<(), Abort> {
        let Some(arg) = self.find_arg(key) else {
            return Err(self.fatal(format!("missing argument: {key}")));
        };
        if dests.len() != arg.vals.len() {
            return Err(self.fatal(format!(
                "{key}: got {} destinations, but {} values",
                dests.len(),
                arg.vals.len()
            )));
        }
        for (i, dest) in dests.iter_mut().enumerate() {
            arg.scan(i, dest).map_err(|e| self.fatal(e))?;
        }
        Ok(())
    }

    /// Scan the single value of the first argument with `key`.
    pub fn arg<T: ScanValue>(&self, key: &str) -> Result<T, Abort> {
        let Some(arg) = self.find_arg(key) else {
            return Err(self.fatal(format!("missing argument: {key}")));
        };
        match arg.vals.as_slice() {
            [val] => T::scan_from(val).map_err(|e| {
                self.fatal(format!(
                    "{key}: cannot scan {val:?} into destination #1 ({}): {e}",
                    T::KIND
                ))
            }),
            vals => Err(self.fatal(format!(
                "{key}: got 1 destinations, but {} values",
                vals.len()
            ))),
        }
    }

    /// A fatal abort prefixed with this directive's position.
    pub fn fatal(&self, msg: impl fmt::Display) -> Abort {
        Abort::Fatal(format!("{}: {msg}", self.pos))
    }
}
