use clap::{Parser, Subcommand, ValueEnum};
use datadriven::{Case, Config, Outcome, TestData, loader, schema};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with checkmarks
    #[default]
    Human,
    /// Machine-readable JSON output
    Json,
    /// JUnit XML output for CI systems
    Junit,
}

#[derive(Parser)]
#[command(name = "datadriven")]
#[command(about = "Checks and rewrites data-driven test files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check test files by replaying their recorded output
    Check {
        /// Path to test files (file or directory)
        path: PathBuf,
        /// Rewrite every file into canonical form
        #[arg(long)]
        rewrite: bool,
        /// Print every directive as it is checked
        #[arg(short, long)]
        verbose: bool,
        /// Output format
        #[arg(short, long, default_value = "human")]
        output: OutputFormat,
        /// Config file (.yaml, .yml or .toml); defaults to the environment
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Output the config file schema
    Schema,
}

/// Outcome of one test file.
struct FileResult {
    file: PathBuf,
    case: Case,
    duration: Duration,
}

impl FileResult {
    fn passed(&self) -> bool {
        !self.case.failed()
    }
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Check {
            path,
            rewrite,
            verbose,
            output,
            config,
        } => {
            let loaded = match config {
                Some(ref file) => loader::load_config(file),
                None => loader::config_from_env(),
            };
            let config = match loaded {
                Ok(c) => c.with_overrides(rewrite, verbose),
                Err(e) => {
                    eprintln!("Error loading config: {e}");
                    std::process::exit(1);
                }
            };

            let (root, results) = check(&path, &config);
            if results.is_empty() {
                if root.failed() {
                    eprint!("{root}");
                } else {
                    eprintln!("No test files found at: {}", path.display());
                }
                std::process::exit(1);
            }

            let total_passed = results.iter().filter(|r| r.passed()).count();
            let total_failed = results.len() - total_passed;

            match output {
                OutputFormat::Human => {
                    for result in &results {
                        if result.passed() {
                            println!("✓ {} ({:.2?})", result.file.display(), result.duration);
                        } else {
                            println!("✗ {} ({:.2?})", result.file.display(), result.duration);
                            for line in result.case.to_string().lines() {
                                println!("    {line}");
                            }
                        }
                    }
                    println!("\n{total_passed} passed, {total_failed} failed");
                }
                OutputFormat::Json => {
                    let files: Vec<_> = results
                        .iter()
                        .map(|r| {
                            serde_json::json!({
                                "file": r.file.display().to_string(),
                                "passed": r.passed(),
                                "case": r.case,
                            })
                        })
                        .collect();
                    let output = serde_json::json!({
                        "passed": total_passed,
                        "failed": total_failed,
                        "results": files,
                    });
                    match serde_json::to_string_pretty(&output) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing results: {e}");
                            std::process::exit(1);
                        }
                    }
                }
                OutputFormat::Junit => {
                    print!("{}", format_junit_xml(&results));
                }
            }

            if total_failed > 0 {
                std::process::exit(1);
            }
        }
        Command::Schema => {
            let schema = schema::generate_schema();
            match serde_json::to_string_pretty(&schema) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error serializing schema: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}

/// Returns the directive's recorded output, so a file passes as long as it
/// parses and its subtests are well formed.
fn replay(_: &mut Case, d: &TestData) -> Result<String, datadriven::Abort> {
    Ok(d.expected.clone())
}

/// Run every file under `path`, collecting one result per file.
fn check(path: &Path, config: &Config) -> (Case, Vec<FileResult>) {
    let mut root = Case::root("");
    let mut results = Vec::new();
    // Name the top case after the path so a single file still gets a
    // non-empty case path in reports.
    root.run(&path.display().to_string(), |top| {
        datadriven::walk(top, path, |case, file| {
            let start = Instant::now();
            let result = datadriven::run_test(case, file, config, replay);

            let mut snapshot = case.clone();
            snapshot.finish(result.clone());
            results.push(FileResult {
                file: file.to_path_buf(),
                case: snapshot,
                duration: start.elapsed(),
            });
            result
        })
    });
    (root, results)
}

/// Format file results as JUnit XML, one test case per file.
fn format_junit_xml(results: &[FileResult]) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

    let tests = results.len();
    let failures = results.iter().filter(|r| !r.passed()).count();
    let skipped = results
        .iter()
        .filter(|r| r.case.outcome() == Outcome::Skipped)
        .count();
    let total_time: Duration = results.iter().map(|r| r.duration).sum();

    let _ = writeln!(
        xml,
        "<testsuite name=\"datadriven\" tests=\"{tests}\" failures=\"{failures}\" skipped=\"{skipped}\" time=\"{:.3}\">",
        total_time.as_secs_f64()
    );

    for result in results {
        let _ = writeln!(
            xml,
            "  <testcase name=\"{}\" time=\"{:.3}\">",
            escape_xml(&result.file.display().to_string()),
            result.duration.as_secs_f64()
        );
        let report = result.case.to_string();
        match result.case.outcome() {
            Outcome::Passed => {}
            Outcome::Failed => {
                let message = report
                    .lines()
                    .find(|l| !l.trim().is_empty() && !l.trim_start().starts_with("--- "))
                    .unwrap_or("Test failed");
                let _ = writeln!(
                    xml,
                    "    <failure message=\"{}\">",
                    escape_xml(message.trim())
                );
                xml.push_str(&escape_xml(&report));
                xml.push_str("    </failure>\n");
            }
            Outcome::Skipped => {
                xml.push_str("    <skipped/>\n");
            }
        }
        xml.push_str("  </testcase>\n");
    }

    xml.push_str("</testsuite>\n");
    xml
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
