//! Directive arguments.
//!
//! A directive line looks like
//!
//! ```text
//! <command>[,<command>...] [arg | arg=val | arg=(val1, val2, ...)]...
//! ```
//!
//! Each argument becomes a [`CmdArg`]. Values are plain strings until a test
//! scans them into typed destinations with [`CmdArg::scan`].

use serde::Serialize;
use std::fmt;

/// An argument on the directive line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CmdArg {
    pub key: String,
    pub vals: Vec<String>,
}

impl fmt::Display for CmdArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.vals.as_slice() {
            [] => write!(f, "{}", self.key),
            [val] => write!(f, "{}={val}", self.key),
            vals => write!(f, "{}=({})", self.key, vals.join(", ")),
        }
    }
}

impl CmdArg {
    /// Parse one `key`, `key=value` or `key=(v1, v2, ...)` token.
    pub fn parse(token: &str) -> Self {
        let Some((key, val)) = token.split_once('=') else {
            return Self {
                key: token.to_string(),
                vals: Vec::new(),
            };
        };
        let vals = if val.len() > 2 && val.starts_with('(') && val.ends_with(')') {
            val[1..val.len() - 1]
                .split(',')
                .map(|v| v.trim().to_string())
                .collect()
        } else {
            vec![val.to_string()]
        };
        Self {
            key: key.to_string(),
            vals,
        }
    }

    /// Scan the value at index `i` into `dest`.
    pub fn scan(&self, i: usize, dest: &mut Dest<'_>) -> Result<(), String> {
        let Some(val) = self.vals.get(i) else {
            return Err(format!("cannot scan index {i} of key {}", self.key));
        };
        dest.set(val).map_err(|e| {
            format!(
                "{}: cannot scan {val:?} into destination #{} ({}): {e}",
                self.key,
                i + 1,
                dest.kind()
            )
        })
    }
}

/// Split a directive line into the command and its arguments.
///
/// Tokens are separated by whitespace outside parentheses, so
/// `k=(a, b)` stays one argument.
pub fn parse_directive(line: &str) -> Result<(String, Vec<CmdArg>), String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for c in line.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                if depth == 0 {
                    return Err(format!("unbalanced ')' in directive: {line}"));
                }
                depth -= 1;
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if depth != 0 {
        return Err(format!("unbalanced '(' in directive: {line}"));
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    let mut tokens = tokens.into_iter();
    let Some(cmd) = tokens.next() else {
        return Err("empty directive".to_string());
    };
    Ok((cmd, tokens.map(|t| CmdArg::parse(&t)).collect()))
}

/// A typed destination for one argument value.
#[derive(Debug)]
pub enum Dest<'a> {
    Text(&'a mut String),
    Int(&'a mut i64),
    Uint(&'a mut u64),
    Bool(&'a mut bool),
}

impl Dest<'_> {
    /// Name of the destination kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Dest::Text(_) => String::KIND,
            Dest::Int(_) => i64::KIND,
            Dest::Uint(_) => u64::KIND,
            Dest::Bool(_) => bool::KIND,
        }
    }

    fn set(&mut self, val: &str) -> Result<(), String> {
        match self {
            Dest::Text(d) => **d = String::scan_from(val)?,
            Dest::Int(d) => **d = i64::scan_from(val)?,
            Dest::Uint(d) => **d = u64::scan_from(val)?,
            Dest::Bool(d) => **d = bool::scan_from(val)?,
        }
        Ok(())
    }
}

impl<'a> From<&'a mut String> for Dest<'a> {
    fn from(d: &'a mut String) -> Self {
        Dest::Text(d)
    }
}

impl<'a> From<&'a mut i64> for Dest<'a> {
    fn from(d: &'a mut i64) -> Self {
        Dest::Int(d)
    }
}

impl<'a> From<&'a mut u64> for Dest<'a> {
    fn from(d: &'a mut u64) -> Self {
        Dest::Uint(d)
    }
}

impl<'a> From<&'a mut bool> for Dest<'a> {
    fn from(d: &'a mut bool) -> Self {
        Dest::Bool(d)
    }
}

/// Value types an argument can be scanned into.
pub trait ScanValue: Sized {
    const KIND: &'static str;

    fn scan_from(val: &str) -> Result<Self, String>;
}

impl ScanValue for String {
    const KIND: &'static str = "string";

    fn scan_from(val: &str) -> Result<Self, String> {
        Ok(val.to_string())
    }
}

impl ScanValue for i64 {
    const KIND: &'static str = "i64";

    fn scan_from(val: &str) -> Result<Self, String> {
        val.parse().map_err(|e| format!("{e}"))
    }
}

impl ScanValue for u64 {
    const KIND: &'static str = "u64";

    fn scan_from(val: &str) -> Result<Self, String> {
        val.parse().map_err(|e| format!("{e}"))
    }
}

impl ScanValue for bool {
    const KIND: &'static str = "bool";

    fn scan_from(val: &str) -> Result<Self, String> {
        parse_bool(val).ok_or_else(|| "invalid boolean".to_string())
    }
}

/// Parse the boolean spellings accepted in test files.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
