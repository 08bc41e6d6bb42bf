//! Case tree.
//!
//! Every test file, directory, and subtest runs inside a [`Case`]. Cases form
//! an explicit tree: a parent owns its children in the order they ran, and a
//! child's path is its parent's path joined with its own name by `/`.
//!
//! A case body returns `Result<(), Abort>`; [`Case::run`] contains the abort
//! inside the child so that sibling cases keep running.

use serde::Serialize;
use std::fmt;

/// Non-local exit from a case body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Abort {
    /// Stop the case with a failure message.
    #[error("{0}")]
    Fatal(String),
    /// Stop the case; its failure has already been recorded.
    #[error("case already failed")]
    FailNow,
    /// Stop the case and mark it skipped.
    #[error("skipped: {0}")]
    Skipped(String),
}

impl Abort {
    /// Short name of the abort kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Abort::Fatal(_) => "fatal error",
            Abort::FailNow => "failure",
            Abort::Skipped(_) => "skip",
        }
    }
}

/// Final state of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
}

/// A named node in the case tree.
#[derive(Debug, Clone, Serialize)]
pub struct Case {
    name: String,
    path: String,
    outcome: Outcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    messages: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<Case>,
}

impl Case {
    /// Create a root case. An empty name keeps child paths unprefixed.
    pub fn root(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: name.clone(),
            name,
            outcome: Outcome::Passed,
            messages: Vec::new(),
            children: Vec::new(),
        }
    }

    fn child(&self, name: &str) -> Self {
        let path = if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}/{name}", self.path)
        };
        Self {
            name: name.to_string(),
            path,
            outcome: Outcome::Passed,
            messages: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Run `body` in a new child case named `name`.
    ///
    /// Any abort returned by the body ends the child only. A failed child
    /// marks this case failed as well.
    pub fn run<F>(&mut self, name: &str, body: F) -> Outcome
    where
        F: FnOnce(&mut Case) -> Result<(), Abort>,
    {
        let mut child = self.child(name);
        log::debug!("=== RUN {}", child.path);
        let result = body(&mut child);
        child.finish(result);
        let outcome = child.outcome;
        log::debug!("--- {outcome:?}: {}", child.path);
        if outcome == Outcome::Failed {
            self.outcome = Outcome::Failed;
        }
        self.children.push(child);
        outcome
    }

    /// Record the result of this case's body.
    pub fn finish(&mut self, result: Result<(), Abort>) {
        match result {
            Ok(()) => {}
            Err(Abort::Fatal(msg)) => {
                self.messages.push(msg);
                self.outcome = Outcome::Failed;
            }
            Err(Abort::FailNow) => self.outcome = Outcome::Failed,
            Err(Abort::Skipped(msg)) => {
                self.messages.push(msg);
                if self.outcome != Outcome::Failed {
                    self.outcome = Outcome::Skipped;
                }
            }
        }
    }

    /// Mark the case failed and keep going.
    pub fn error(&mut self, msg: impl Into<String>) {
        self.messages.push(msg.into());
        self.outcome = Outcome::Failed;
    }

    /// Build a fatal abort. The message is recorded when the abort reaches
    /// the enclosing [`Case::run`].
    pub fn fatal(&self, msg: impl Into<String>) -> Abort {
        Abort::Fatal(msg.into())
    }

    /// Mark the case failed and stop it.
    pub fn fail_now(&mut self) -> Abort {
        self.outcome = Outcome::Failed;
        Abort::FailNow
    }

    /// Build a skip abort.
    pub fn skip(&self, msg: impl Into<String>) -> Abort {
        Abort::Skipped(msg.into())
    }

    /// Attach an informational message.
    pub fn log(&mut self, msg: impl Into<String>) {
        self.messages.push(msg.into());
    }

    pub fn failed(&self) -> bool {
        self.outcome == Outcome::Failed
    }

    pub fn skipped(&self) -> bool {
        self.outcome == Outcome::Skipped
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Slash-joined names from the root to this case.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn children(&self) -> &[Case] {
        &self.children
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let mut depth = depth;
        if !self.path.is_empty() && self.outcome != Outcome::Passed {
            let indent = "    ".repeat(depth);
            let status = match self.outcome {
                Outcome::Failed => "FAIL",
                _ => "SKIP",
            };
            writeln!(f, "{indent}--- {status}: {}", self.path)?;
            for msg in &self.messages {
                for line in msg.lines() {
                    writeln!(f, "{indent}    {line}")?;
                }
            }
            depth += 1;
        }
        for child in &self.children {
            child.render(f, depth)?;
        }
        Ok(())
    }
}

/// Renders the failed and skipped cases of the tree with their messages.
impl fmt::Display for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, 0)
    }
}

/// Run `body` under a fresh root case and panic with the rendered report if
/// it failed. Meant for `#[test]` functions.
///
/// # Panics
///
/// Panics if the root case failed.
pub fn run_root<F>(name: &str, body: F)
where
    F: FnOnce(&mut Case) -> Result<(), Abort>,
{
    let mut root = Case::root(name);
    let result = body(&mut root);
    root.finish(result);
    if root.failed() {
        panic!("\n{root}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_paths_join_names() {
        let mut root = Case::root("TestFiles");
        root.run("logprops", |c| {
            c.run("scan", |_| Ok(()));
            Ok(())
        });

        let logprops = &root.children()[0];
        assert_eq!(logprops.path(), "TestFiles/logprops");
        assert_eq!(logprops.children()[0].path(), "TestFiles/logprops/scan");
        assert_eq!(logprops.children()[0].name(), "scan");
    }

    #[test]
    fn empty_root_name_leaves_paths_unprefixed() {
        let mut root = Case::root("");
        root.run("a", |c| {
            c.run("b", |_| Ok(()));
            Ok(())
        });
        assert_eq!(root.children()[0].children()[0].path(), "a/b");
    }

    #[test]
    fn fatal_is_contained_in_child() {
        let mut root = Case::root("t");
        let first = root.run("first", |c| Err(c.fatal("boom")));
        let second = root.run("second", |_| Ok(()));

        assert_eq!(first, Outcome::Failed);
        assert_eq!(second, Outcome::Passed);
        assert!(root.failed());
        assert_eq!(root.children()[0].messages(), ["boom"]);
    }

    #[test]
    fn soft_error_marks_failed_without_stopping() {
        let mut root = Case::root("t");
        let mut reached = false;
        root.run("c", |c| {
            c.error("first problem");
            reached = true;
            Ok(())
        });
        assert!(reached);
        assert!(root.failed());
    }

    #[test]
    fn skip_does_not_fail_parent() {
        let mut root = Case::root("t");
        let outcome = root.run("c", |c| Err(c.skip("not today")));
        assert_eq!(outcome, Outcome::Skipped);
        assert!(!root.failed());
        assert!(root.children()[0].skipped());
    }

    #[test]
    fn skip_after_error_stays_failed() {
        let mut root = Case::root("t");
        let outcome = root.run("c", |c| {
            c.error("bad");
            Err(c.skip("later"))
        });
        assert_eq!(outcome, Outcome::Failed);
    }

    #[test]
    fn display_lists_failures_with_messages() {
        let mut root = Case::root("t");
        root.run("ok", |_| Ok(()));
        root.run("bad", |c| Err(c.fatal("line one\nline two")));

        let report = root.to_string();
        assert!(report.contains("--- FAIL: t\n"));
        assert!(report.contains("    --- FAIL: t/bad\n"));
        assert!(report.contains("        line one\n        line two\n"));
        assert!(!report.contains("t/ok"));
    }

    #[test]
    fn serializes_outcomes() {
        let mut root = Case::root("t");
        root.run("bad", |c| Err(c.fatal("boom")));
        let json = serde_json::to_value(&root).unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["children"][0]["messages"][0], "boom");
    }

    #[test]
    fn run_root_passes_quietly() {
        run_root("quiet", |c| {
            c.run("inner", |_| Ok(()));
            Ok(())
        });
    }

    #[test]
    #[should_panic(expected = "--- FAIL: loud")]
    fn run_root_panics_on_failure() {
        run_root("loud", |c| Err(c.fatal("nope")));
    }
}
