use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use delta_patcher::accessor::{write_pieces, FileAccessor, WriteError, WriteOptions};
use delta_patcher::config::{
    apply_deltas, load_from_path, ApplicationError, ApplyMode, DeltaResult,
};
use delta_patcher::delta::{DeltaError, DeltaOptions, Operation, TrailingNewline};
use delta_patcher::logging;
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "delta-patcher")]
#[command(about = "Apply line-context deltas to text files", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (overridden by DELTA_PATCHER_LOG / RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply one batch of operations (JSON) to one file
    Apply {
        /// File to patch (created if it does not exist)
        #[arg(short, long)]
        file: PathBuf,

        /// JSON file holding an array of operations
        #[arg(short, long)]
        ops: PathBuf,

        /// Dry run - compute the result without modifying the file
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Final newline policy
        #[arg(long, default_value = "preserve")]
        trailing_newline: TrailingNewline,

        /// Write the patched content to stdout
        #[arg(long)]
        print: bool,
    },

    /// Apply delta files to a workspace
    Run {
        /// Path to workspace root (defaults to the current directory)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Specific delta file to apply (otherwise applies all in deltas/)
        #[arg(short = 'D', long)]
        deltas: Option<PathBuf>,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Check that delta files still apply cleanly, without writing
    Check {
        /// Path to workspace root (defaults to the current directory)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Specific delta file to check (otherwise checks all in deltas/)
        #[arg(short = 'D', long)]
        deltas: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(err) = logging::init(cli.verbose) {
        eprintln!("{}", format!("Warning: logging disabled: {err}").yellow());
    }

    match cli.command {
        Commands::Apply {
            file,
            ops,
            dry_run,
            diff,
            trailing_newline,
            print,
        } => cmd_apply(&file, &ops, dry_run, diff, trailing_newline, print),

        Commands::Run {
            workspace,
            deltas,
            dry_run,
            diff,
        } => cmd_run(workspace, deltas, dry_run, diff),

        Commands::Check { workspace, deltas } => cmd_check(workspace, deltas),
    }
}

fn resolve_workspace(cli_workspace: Option<PathBuf>) -> Result<PathBuf> {
    let path = match cli_workspace {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    path.canonicalize()
        .with_context(|| format!("workspace {} does not exist", path.display()))
}

/// Discover all .toml delta files in `<workspace>/deltas`.
fn discover_delta_files(workspace: &Path) -> Result<Vec<PathBuf>> {
    let deltas_dir = workspace.join("deltas");
    if !deltas_dir.exists() {
        anyhow::bail!(
            "No deltas directory at {} (pass --deltas <file>)",
            deltas_dir.display()
        );
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&deltas_dir).max_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
        {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No .toml delta files found in {}", deltas_dir.display());
    }
    Ok(files)
}

fn delta_files(workspace: &Path, deltas: Option<PathBuf>) -> Result<Vec<PathBuf>> {
    match deltas {
        Some(path) => Ok(vec![path]),
        None => discover_delta_files(workspace),
    }
}

fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
        if change.missing_newline() {
            println!();
            println!("{}", "\\ No newline at end of file".dimmed());
        }
    }
}

/// Extra context for engine rejections.
fn explain_delta_error(err: &DeltaError) {
    match err {
        DeltaError::ContextNotFound { block, .. } => {
            eprintln!("  {}", "CONFLICT: context lines not found".red());
            for line in block {
                eprintln!("    | {}", line);
            }
            eprintln!("  Possible causes:");
            eprintln!("    - Context lines were edited or removed");
            eprintln!("    - Indentation or whitespace changed");
        }
        DeltaError::OverlapConflict { first, second, .. } => {
            eprintln!(
                "  {}",
                format!("CONFLICT: operations {first} and {second} touch the same lines").red()
            );
            eprintln!("  Action: merge them into one operation or move one of the anchors");
        }
        _ => {}
    }
}

fn cmd_apply(
    file: &Path,
    ops: &Path,
    dry_run: bool,
    show_diff: bool,
    trailing_newline: TrailingNewline,
    print: bool,
) -> Result<()> {
    let json = fs::read_to_string(ops)
        .with_context(|| format!("failed to read operations from {}", ops.display()))?;
    let operations: Vec<Operation> = serde_json::from_str(&json)
        .with_context(|| format!("invalid operations in {}", ops.display()))?;

    let options = WriteOptions {
        delta: DeltaOptions { trailing_newline },
        dry_run,
        return_content: false,
    };

    let accessor = FileAccessor::new(file);
    let report = match write_pieces(&accessor, &operations, &options) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("{} {}: {}", "✗".red(), file.display(), err);
            if let WriteError::Delta(delta_err) = &err {
                explain_delta_error(delta_err);
            }
            std::process::exit(1);
        }
    };

    if show_diff && report.changed {
        display_diff(file, &report.original, &report.patched);
    }

    if print {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(report.patched.as_bytes())?;
        stdout.flush()?;
    } else if !report.changed {
        println!("{} {}: No change", "⊙".yellow(), report.location);
    } else if dry_run {
        println!(
            "{} {}: Would write {} bytes ({} operations)",
            "✓".green(),
            report.location,
            report.bytes_written,
            operations.len()
        );
    } else {
        println!(
            "{} {}: Wrote {} bytes ({} operations)",
            "✓".green(),
            report.location,
            report.bytes_written,
            operations.len()
        );
    }

    Ok(())
}

#[derive(Default)]
struct Tally {
    applied: usize,
    unchanged: usize,
    failed: usize,
}

fn report_results(
    results: Vec<(String, Result<DeltaResult, ApplicationError>)>,
    mode: ApplyMode,
    show_diff: bool,
    tally: &mut Tally,
) {
    for (delta_id, result) in results {
        match result {
            Ok(DeltaResult::Applied {
                file,
                bytes_written,
                original,
                patched,
            }) => {
                let verb = match mode {
                    ApplyMode::Apply => "Applied to",
                    ApplyMode::Check => "Would apply to",
                };
                println!(
                    "{} {}: {} {} ({} bytes)",
                    "✓".green(),
                    delta_id,
                    verb,
                    file.display(),
                    bytes_written
                );
                tally.applied += 1;

                if show_diff {
                    display_diff(&file, &original, &patched);
                }
            }
            Ok(DeltaResult::Unchanged { file }) => {
                println!(
                    "{} {}: No change to {}",
                    "⊙".yellow(),
                    delta_id,
                    file.display()
                );
                tally.unchanged += 1;
            }
            Err(e) => {
                eprintln!("{} {}: Error - {}", "✗".red(), delta_id, e);
                tally.failed += 1;
                if let ApplicationError::Delta { source, .. } = &e {
                    explain_delta_error(source);
                }
            }
        }
    }
}

fn print_summary(tally: &Tally, mode: ApplyMode) {
    let applied_label = match mode {
        ApplyMode::Apply => "applied",
        ApplyMode::Check => "would apply",
    };

    println!("{}", "Summary:".bold());
    println!("  {} {}", format!("{}", tally.applied).green(), applied_label);
    println!("  {} unchanged", format!("{}", tally.unchanged).yellow());
    println!("  {} failed", format!("{}", tally.failed).red());
}

fn run_delta_files(
    files: Vec<PathBuf>,
    workspace: &Path,
    mode: ApplyMode,
    show_diff: bool,
) -> Result<Tally> {
    let mut tally = Tally::default();

    for delta_file in files {
        println!("Loading deltas from {}...", delta_file.display());
        let config = load_from_path(&delta_file)?;

        if mode == ApplyMode::Check {
            println!("{}", "  [DRY RUN - nothing will be written]".cyan());
        }

        let results = apply_deltas(&config, workspace, mode);
        report_results(results, mode, show_diff, &mut tally);
        println!();
    }

    Ok(tally)
}

fn cmd_run(
    workspace: Option<PathBuf>,
    deltas: Option<PathBuf>,
    dry_run: bool,
    show_diff: bool,
) -> Result<()> {
    let workspace = resolve_workspace(workspace)?;
    let files = delta_files(&workspace, deltas)?;
    let mode = if dry_run {
        ApplyMode::Check
    } else {
        ApplyMode::Apply
    };

    println!("Workspace: {}", workspace.display());
    println!();

    let tally = run_delta_files(files, &workspace, mode, show_diff)?;
    print_summary(&tally, mode);

    if tally.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_check(workspace: Option<PathBuf>, deltas: Option<PathBuf>) -> Result<()> {
    let workspace = resolve_workspace(workspace)?;
    let files = delta_files(&workspace, deltas)?;

    println!("{}", "Checking deltas...".bold());
    println!("Workspace: {}", workspace.display());
    println!();

    let tally = run_delta_files(files, &workspace, ApplyMode::Check, false)?;
    print_summary(&tally, ApplyMode::Check);

    if tally.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
