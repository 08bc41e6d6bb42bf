//! Directory walking.
//!
//! Maps a directory hierarchy onto nested cases, one per path segment, and
//! calls a function for every leaf file. Given
//!
//! ```text
//! testdata/typing
//! testdata/logprops/scan
//! testdata/logprops/select
//! ```
//!
//! walking `testdata/typing` calls the function once with no sub-case;
//! walking `testdata/logprops` calls it in sub-cases `scan` and `select`;
//! walking `testdata` calls it in `typing`, `logprops/scan` and
//! `logprops/select`.

use crate::case::{Abort, Case};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

// Editor temp files and hidden files: .XXX, XXX~, #XXX#
static TEMP_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^\..*)|(.*~$)|(^#.*#$)").expect("valid temp file pattern"));

/// Whether `name` is a hidden or editor temp file that is never walked.
pub fn is_temp_file(name: &str) -> bool {
    TEMP_FILE_RE.is_match(name)
}

/// Call `f` for `path` if it is a file, or for every file below it, each in
/// a sub-case named after its path segments. Directory entries are visited
/// in file name order.
pub fn walk<F>(case: &mut Case, path: impl AsRef<Path>, mut f: F) -> Result<(), Abort>
where
    F: FnMut(&mut Case, &Path) -> Result<(), Abort>,
{
    walk_inner(case, path.as_ref(), &mut f)
}

fn walk_inner<F>(case: &mut Case, path: &Path, f: &mut F) -> Result<(), Abort>
where
    F: FnMut(&mut Case, &Path) -> Result<(), Abort>,
{
    let metadata =
        fs::metadata(path).map_err(|e| Abort::Fatal(format!("{}: {e}", path.display())))?;
    if !metadata.is_dir() {
        return f(case, path);
    }

    let mut names = Vec::new();
    let entries =
        fs::read_dir(path).map_err(|e| Abort::Fatal(format!("{}: {e}", path.display())))?;
    for entry in entries {
        let entry = entry.map_err(|e| Abort::Fatal(format!("{}: {e}", path.display())))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();

    for name in names {
        if is_temp_file(&name) {
            log::trace!("skipping {}", path.join(&name).display());
            continue;
        }
        let child = path.join(&name);
        case.run(&name, |sub| walk_inner(sub, &child, f));
    }
    Ok(())
}
