//! Main entry point for the arcx CLI app

use std::process::ExitCode;

use arcx::archive::ArchiveReader;
use arcx::cli::{self, Commands};
use arcx::extract::{extract_archive_with_progress, ExtractOptions};
use arcx::progress::{ProgressCallback, ProgressState};
use arcx::report::{format_size, write_error_log, RunReport};
use arcx::scan::scan_stats;
use arcx::workers::{create_archive_with_progress, CreateOptions};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run_app() {
        // 0: every file succeeded; 2: run completed with file-level failures.
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(2),
        // 1: fatal abort, no usable output produced.
        Err(e) => {
            if e.downcast_ref::<clap::Error>().is_none() {
                eprintln!("Error: {}", e);
            }
            ExitCode::from(1)
        }
    }
}

/// Runs the selected command and returns the number of file-level failures.
fn run_app() -> Result<usize, Box<dyn std::error::Error>> {
    let command = cli::run()?;

    match command {
        Commands::Create {
            input,
            output,
            level,
            category_levels,
            threads,
            deterministic,
            progress,
            report,
            error_log,
        } => {
            let options = CreateOptions {
                threads,
                level_override: level,
                category_levels,
                deterministic,
            };
            let cb = progress.then(|| cli_progress_callback("CREATE"));
            let run = create_archive_with_progress(&input, &output, &options, cb)?;
            print_summary("Archived", &run);
            flush_outputs(&run, report.as_deref(), error_log.as_deref())?;
            Ok(run.failures.len())
        }
        Commands::Extract {
            archive,
            output,
            threads,
            progress,
            report,
            error_log,
        } => {
            let options = ExtractOptions { threads };
            let cb = progress.then(|| cli_progress_callback("EXTRACT"));
            let run = extract_archive_with_progress(&archive, &output, &options, cb)?;
            print_summary("Restored", &run);
            flush_outputs(&run, report.as_deref(), error_log.as_deref())?;
            Ok(run.failures.len())
        }
        Commands::List { archive } => {
            let reader = ArchiveReader::open(&archive)?;
            let manifest = &reader.manifest;
            if let Some(created) = chrono::DateTime::from_timestamp(manifest.created, 0) {
                println!("Created: {}  ({})", created.to_rfc3339(), manifest.tool);
            }
            println!("Container contents ({} files):", manifest.entries.len());
            for entry in &manifest.entries {
                println!(
                    "- {} [{}] {} -> {} (level {})",
                    entry.path,
                    entry.category,
                    format_size(entry.original_size),
                    format_size(entry.compressed_size),
                    entry.level
                );
            }
            Ok(0)
        }
        Commands::Scan { input } => {
            let stats = scan_stats(&input);
            println!(
                "{} files, {} total",
                stats.files,
                format_size(stats.total_bytes)
            );
            for (category, slot) in &stats.categories {
                println!(
                    "{}: {} files, {}",
                    category,
                    slot.files,
                    format_size(slot.original_bytes)
                );
            }
            for failure in &stats.failures {
                eprintln!("unreadable: {} ({})", failure.path, failure.message);
            }
            Ok(stats.failures.len())
        }
    }
}

/// Single-line progress renderer; updates in place and breaks the line when
/// the last file completes.
fn cli_progress_callback(operation: &'static str) -> Box<ProgressCallback> {
    use std::io::Write;
    Box::new(move |state: ProgressState| {
        eprint!(
            "\r[{}] {:>5.1}% | {}/{} files | {:.1} MB/s",
            operation,
            state.percent(),
            state.processed_files,
            state.total_files,
            state.speed_mbps
        );
        if state.processed_files >= state.total_files {
            eprintln!();
        }
        std::io::stderr().flush().ok();
    })
}

fn print_summary(verb: &str, run: &RunReport) {
    println!(
        "{} {} files | {} -> {} (ratio {:.2}x) | {} failed | {:.2}s",
        verb,
        run.succeeded.len(),
        format_size(run.total_original_bytes),
        format_size(run.total_compressed_bytes),
        run.ratio(),
        run.failures.len(),
        run.elapsed_secs
    );
}

fn flush_outputs(
    run: &RunReport,
    report: Option<&std::path::Path>,
    error_log: Option<&std::path::Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = report {
        run.write_json(path)?;
    }
    if let Some(path) = error_log {
        write_error_log(&run.failures, path)?;
    }
    Ok(())
}
